//! Text protocol understood by BitBar/xbar/SwiftBar plugins.
//!
//! Lines before the first `---` cycle in the menu bar; everything after it
//! forms the dropdown. `| key=value` suffixes are rendering hints for the host,
//! and a leading `--` nests a line one level under the previous item.

use std::fmt::Write;

use crate::collector::{Collection, ProjectFailure};
use crate::pipelines::{partition, Pipeline, IDLE_ICON};
use crate::status::JobStatus;

const SEPARATOR: &str = "---";
const PIPELINE_ICON: &str = "🚀";
const WARNING_ICON: &str = "⚠️";
const REFRESH: &str = "Update now | refresh=true";

/// Renders the menu-bar lines and the dropdown for one refresh.
///
/// With nothing running and nothing failing, the output is the idle icon only.
pub fn render(collection: &Collection, self_identity: Option<&str>) -> String {
    let pipelines = &collection.pipelines;

    if pipelines.is_empty() && collection.failures.is_empty() {
        return format!("{IDLE_ICON}\n");
    }

    let split = partition(pipelines, self_identity);
    let total = pipelines.len();
    let mut out = String::new();

    for (index, pipeline) in split.mine.iter().enumerate() {
        if total > 1 {
            line(
                &mut out,
                format_args!("{PIPELINE_ICON} {}/{total} {}", index + 1, escape(&pipeline.display_name())),
            );
        } else {
            line(
                &mut out,
                format_args!("{PIPELINE_ICON} {}", escape(&pipeline.display_name())),
            );
        }
    }

    if split.mine.is_empty() {
        if pipelines.is_empty() {
            out.push_str(WARNING_ICON);
        } else {
            out.push_str("CI");
        }
        out.push('\n');
    }

    line(&mut out, format_args!("{SEPARATOR}"));

    if split.mine.is_empty() {
        line(&mut out, format_args!("You don't have any running pipelines"));
        line(&mut out, format_args!("{SEPARATOR}"));
    } else {
        line(&mut out, format_args!("My pipelines:"));
        line(&mut out, format_args!("{SEPARATOR}"));
        render_pipelines(&mut out, &split.mine);
    }

    if !split.other.is_empty() {
        line(&mut out, format_args!("Other pipelines:"));
        line(&mut out, format_args!("{SEPARATOR}"));
        render_pipelines(&mut out, &split.other);
    }

    if !collection.failures.is_empty() {
        line(&mut out, format_args!("Failed projects:"));
        line(&mut out, format_args!("{SEPARATOR}"));
        render_failures(&mut out, &collection.failures);
    }

    line(&mut out, format_args!("{SEPARATOR}"));
    line(&mut out, format_args!("{REFRESH}"));

    out
}

/// Output for a run that could not start at all, e.g. a broken config file.
pub fn render_error(error: &anyhow::Error) -> String {
    let mut out = String::new();
    line(&mut out, format_args!("{WARNING_ICON}"));
    line(&mut out, format_args!("{SEPARATOR}"));
    line(&mut out, format_args!("{} | color=red", escape(&format!("{error:#}"))));
    line(&mut out, format_args!("{SEPARATOR}"));
    line(&mut out, format_args!("{REFRESH}"));
    out
}

fn render_pipelines(out: &mut String, pipelines: &[&Pipeline]) {
    for pipeline in pipelines {
        line(
            out,
            format_args!(
                "{PIPELINE_ICON} {} - {}",
                escape(&pipeline.project.name),
                escape(&pipeline.ref_)
            ),
        );
        line(
            out,
            format_args!("-- commit: {}", escape(pipeline.commit_title.as_deref().unwrap_or("-"))),
        );
        line(
            out,
            format_args!("-- author: {}", escape(pipeline.commit_author.as_deref().unwrap_or("-"))),
        );
        line(out, format_args!("{SEPARATOR}"));

        for job in &pipeline.jobs {
            let color = match job.status {
                JobStatus::Success => " | color=green",
                JobStatus::Running => " | color=blue",
                _ => "",
            };
            line(
                out,
                format_args!("{} {}{color}", job.status.icon(), escape(&job.display_name())),
            );
            line(out, format_args!("-- Open on web | href={}", job.url));
        }
    }
}

fn render_failures(out: &mut String, failures: &[ProjectFailure]) {
    for failure in failures {
        line(
            out,
            format_args!(
                "{WARNING_ICON} {} ({}) | color=red",
                escape(&failure.project),
                escape(&failure.instance)
            ),
        );
        line(out, format_args!("-- {}", escape(&failure.reason)));
    }
}

fn line(out: &mut String, args: std::fmt::Arguments<'_>) {
    // Writing into a String cannot fail
    let _ = out.write_fmt(args);
    out.push('\n');
}

/// Keeps free text from being read as a `|` annotation or a new line.
fn escape(text: &str) -> String {
    text.replace('|', "¦").replace(['\r', '\n'], " ")
}
