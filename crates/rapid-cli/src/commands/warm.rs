//! Warm pages the way a hover would.

use std::sync::Arc;

use anyhow::{Context, Result};
use colored::Colorize;
use rapid_core::{HoverDispatcher, HoverOutcome, WarmReport};

use super::{load_config, open_session, origin_of};
use crate::cli::Cli;

/// Dispatch a hover for each URL in turn.
pub async fn warm(cli: &Cli, urls: &[String], origin: Option<&str>) -> Result<()> {
    let origin = match origin {
        Some(origin) => origin_of(origin)?,
        None => origin_of(urls.first().context("No URL given")?)?,
    };
    let session = Arc::new(open_session(cli, load_config(cli)?, &origin)?);
    session.open();

    let dispatcher = HoverDispatcher::new(Arc::clone(&session));
    for url in urls {
        match dispatcher.on_hover(url).await {
            HoverOutcome::Warmed(report) => println!("{}", render_report(&report)),
            HoverOutcome::CoolingDown => {
                println!("{} {url} (already warmed moments ago)", "·".dimmed());
            },
            HoverOutcome::Ignored => {
                println!("{} {url} is not a page on {origin}", "✗".red());
            },
        }
    }
    Ok(())
}

/// One line per warmed page.
pub fn render_report(report: &WarmReport) -> String {
    if report.assets == 0 {
        format!("{} {} (no assets found)", "⚠".yellow(), report.url)
    } else {
        format!(
            "{} {} ({} assets, {} preloaded)",
            "✓".green(),
            report.url,
            report.assets,
            report.dispatched
        )
    }
}
