//! rapid-preload CLI - predictive page-asset warming
//!
//! The binary is a thin wrapper around [`run`]; command implementations live
//! in separate modules, one per subcommand.

use anyhow::Result;
use clap::Parser;

mod cli;
mod commands;
mod utils;

use cli::{Cli, Commands};
use utils::logging::initialize_logging;

/// Execute the rapid-preload CLI with the current arguments and environment.
///
/// # Errors
///
/// Returns an error if logging setup, configuration loading, or the selected
/// command fails.
pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    initialize_logging(&cli)?;
    execute_command(&cli).await
}

async fn execute_command(cli: &Cli) -> Result<()> {
    match &cli.command {
        Commands::Warm { urls, origin } => commands::warm(cli, urls, origin.as_deref()).await,
        Commands::Pages {
            page_url,
            first_only,
        } => commands::pages(cli, page_url, *first_only).await,
        Commands::Crawl { page_url, limit } => commands::crawl(cli, page_url, *limit).await,
        Commands::Sweep => commands::sweep(cli),
        Commands::Status { json } => commands::status(cli, *json),
        Commands::Clear { force } => commands::clear(cli, *force),
    }
}
