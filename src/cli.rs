use anyhow::Result;
use chrono::Local;
use clap::Parser;
use log::info;
use std::path::PathBuf;

use crate::collector;
use crate::config::{Config, OutputFormat};
use crate::output;

#[derive(Parser)]
#[command(name = "gitlab-ci-bar")]
#[command(author, version, about = "Running GitLab CI pipelines for your status bar", long_about = None)]
pub struct Cli {
    /// Configuration file (TOML, JSON or YAML)
    #[arg(short, long, env = "GITLAB_CI_BAR_CONFIG")]
    config: Option<PathBuf>,

    /// Commit author email whose pipelines are listed as yours
    #[arg(short = 's', long = "self", env = "GITLAB_CI_BAR_SELF")]
    self_identity: Option<String>,

    /// Output format, defaults to the configured one
    #[arg(short, long, value_enum)]
    format: Option<OutputFormat>,

    #[arg(short, long, default_value_t = false)]
    pretty: bool,
}

impl Cli {
    /// Output format after applying the config file default.
    pub fn format(&self, config: Option<&Config>) -> OutputFormat {
        self.format
            .or_else(|| config.map(|c| c.output.format))
            .unwrap_or_default()
    }

    fn load_config(&self) -> Result<Config> {
        let mut config = Config::load(self.config.as_deref())?;
        if let Some(identity) = &self.self_identity {
            config.self_identity = Some(identity.clone());
        }
        Ok(config)
    }

    pub async fn execute(&self) -> Result<()> {
        let config = self.load_config()?;
        let format = self.format(Some(&config));

        info!(
            "Polling {} GitLab instances, output format {format:?}",
            config.instances.len()
        );

        let collection = collector::collect(&config, Local::now().date_naive()).await?;
        let self_identity = config.self_identity.as_deref();

        let rendered = match format {
            OutputFormat::Bar => output::bitbar::render(&collection, self_identity),
            OutputFormat::Table => output::render_table(&collection, self_identity),
            OutputFormat::Json => {
                if self.pretty || config.output.pretty {
                    serde_json::to_string_pretty(&collection)?
                } else {
                    serde_json::to_string(&collection)?
                }
            }
        };

        print!("{rendered}");
        if format == OutputFormat::Json {
            println!();
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flags() {
        let cli = Cli::try_parse_from([
            "gitlab-ci-bar",
            "--config",
            "bar.toml",
            "--self",
            "me@example.com",
            "--format",
            "table",
        ])
        .unwrap();

        assert_eq!(cli.config, Some(PathBuf::from("bar.toml")));
        assert_eq!(cli.self_identity.as_deref(), Some("me@example.com"));
        assert_eq!(cli.format(None), OutputFormat::Table);
    }

    #[test]
    fn test_format_falls_back_to_config() {
        let cli = Cli::try_parse_from(["gitlab-ci-bar"]).unwrap();
        assert_eq!(cli.format(None), OutputFormat::Bar);

        let mut config = Config::default();
        config.output.format = OutputFormat::Json;
        assert_eq!(cli.format(Some(&config)), OutputFormat::Json);
    }
}
