mod auth;
mod cli;
mod collector;
mod config;
mod error;
mod output;
mod pipelines;
mod providers;
mod status;

use anyhow::Result;
use clap::Parser;
use cli::Cli;
use config::OutputFormat;
use log::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr; stdout belongs to the status bar
    env_logger::init();

    let cli = Cli::parse();
    info!("Starting gitlab-ci-bar");

    if let Err(e) = cli.execute().await {
        if cli.format(None) == OutputFormat::Bar {
            print!("{}", output::bitbar::render_error(&e));
        }
        return Err(e);
    }

    Ok(())
}
