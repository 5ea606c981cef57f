//! Warm every page linked from a start page.

use anyhow::Result;
use colored::Colorize;

use super::warm::render_report;
use super::{load_config, open_session, origin_of};
use crate::cli::Cli;

/// Crawl one level of same-origin links from `page_url`.
pub async fn crawl(cli: &Cli, page_url: &str, limit: Option<usize>) -> Result<()> {
    let origin = origin_of(page_url)?;
    let config = load_config(cli)?;
    let limit = limit.unwrap_or(config.dispatch.crawl_limit);
    let session = open_session(cli, config, &origin)?;
    session.open();

    let report = rapid_core::crawl(&session, page_url, limit).await?;
    for warmed in &report.warmed {
        println!("{}", render_report(warmed));
    }

    let total_assets: usize = report.warmed.iter().map(|w| w.assets).sum();
    println!(
        "{} Warmed {} of {} linked pages ({} assets)",
        "✓".green(),
        report.warmed.len(),
        report.discovered,
        total_assets
    );
    if report.skipped > 0 {
        println!(
            "{} {} pages left out by --limit {limit}",
            "ℹ".blue(),
            report.skipped
        );
    }
    Ok(())
}
