use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Color as TableColor, ContentArrangement, Table};
use std::fmt::Write;

use super::styling::{bright, bright_red, cyan, dim};
use crate::collector::Collection;
use crate::pipelines::{partition, Pipeline};
use crate::status::JobStatus;

fn create_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

fn status_cell(status: JobStatus) -> Cell {
    let text = format!("{} {status}", status.icon());
    match status {
        JobStatus::Success => Cell::new(text).fg(TableColor::Green),
        JobStatus::Running => Cell::new(text).fg(TableColor::Blue),
        JobStatus::Failed => Cell::new(text).fg(TableColor::Red),
        _ => Cell::new(text),
    }
}

fn pipeline_table(pipeline: &Pipeline) -> Table {
    let mut table = create_table();
    table.set_header(vec![
        Cell::new("Job").fg(TableColor::Cyan),
        Cell::new("Status").fg(TableColor::Cyan),
        Cell::new("Duration").fg(TableColor::Cyan),
        Cell::new("Link").fg(TableColor::Cyan),
    ]);

    for job in &pipeline.jobs {
        let duration = if job.duration > 0 {
            format!("{}s", job.duration)
        } else {
            "-".to_string()
        };
        table.add_row(vec![
            Cell::new(&job.name),
            status_cell(job.status),
            Cell::new(duration),
            Cell::new(&job.url),
        ]);
    }

    table
}

/// Human-readable view of a collection for use in a terminal.
#[allow(clippy::format_push_string)]
pub fn render(collection: &Collection, self_identity: Option<&str>) -> String {
    let mut output = String::new();

    if collection.pipelines.is_empty() {
        output.push_str(&format!("{}\n", dim("No running pipelines.")));
    }

    let split = partition(&collection.pipelines, self_identity);
    let groups = [("My pipelines", split.mine), ("Other pipelines", split.other)];

    for (title, pipelines) in groups {
        if pipelines.is_empty() {
            continue;
        }

        output.push_str(&format!("{}\n", bright(title).underlined()));

        for pipeline in pipelines {
            let _ = writeln!(
                output,
                "  {} {} {}",
                cyan(&pipeline.project.name),
                dim("@"),
                pipeline.ref_
            );
            let _ = writeln!(
                output,
                "  {} {}",
                dim("commit:"),
                pipeline.commit_title.as_deref().unwrap_or("-")
            );
            let _ = writeln!(
                output,
                "  {} {}",
                dim("author:"),
                pipeline.commit_author.as_deref().unwrap_or("-")
            );
            let _ = writeln!(output, "{}", pipeline_table(pipeline));
        }
    }

    if !collection.failures.is_empty() {
        output.push_str(&format!("{}\n", bright_red("Failed projects").underlined()));
        for failure in &collection.failures {
            let _ = writeln!(
                output,
                "  {} ({}): {}",
                failure.project,
                dim(&failure.instance),
                failure.reason
            );
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::ProjectFailure;
    use crate::pipelines::tests::pipeline;

    #[test]
    fn test_render_lists_pipelines_and_failures() {
        let collection = Collection {
            pipelines: vec![
                pipeline("Alpha", 1, "me@x.com"),
                pipeline("Beta", 2, "you@x.com"),
            ],
            failures: vec![ProjectFailure {
                instance: "https://gitlab.example.com".to_string(),
                project: "Gamma".to_string(),
                reason: "timed out".to_string(),
            }],
        };

        let output = console::strip_ansi_codes(&render(&collection, Some("me@x.com"))).to_string();

        assert!(output.contains("My pipelines"));
        assert!(output.contains("Other pipelines"));
        assert!(output.contains("Alpha"));
        assert!(output.contains("running"));
        assert!(output.contains("Gamma"));
        assert!(output.contains("timed out"));
        assert!(output.find("Alpha").unwrap() < output.find("Beta").unwrap());
    }

    #[test]
    fn test_render_empty() {
        let output = console::strip_ansi_codes(&render(&Collection::default(), None)).to_string();
        assert_eq!(output, "No running pipelines.\n");
    }
}
