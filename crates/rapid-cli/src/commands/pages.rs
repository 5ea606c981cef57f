//! Warm the pagination links of a listing page.

use anyhow::{Context, Result};
use colored::Colorize;
use rapid_core::{PaginationMode, preload_pagination};

use super::warm::render_report;
use super::{load_config, open_session, origin_of};
use crate::cli::Cli;

/// Fetch `page_url`, find its pagination links and warm them.
pub async fn pages(cli: &Cli, page_url: &str, first_only: bool) -> Result<()> {
    let origin = origin_of(page_url)?;
    let mut config = load_config(cli)?;
    if first_only {
        config.dispatch.pagination = PaginationMode::FirstOnly;
    }
    let session = open_session(cli, config, &origin)?;
    session.open();

    let page_url = session.normalizer().normalize(page_url);
    let markup = session
        .fetcher()
        .fetch_markup(&page_url)
        .await
        .with_context(|| format!("Failed to fetch {page_url}"))?;

    let reports = preload_pagination(&session, &markup, &page_url).await;
    if reports.is_empty() {
        println!("{} No pagination links on {page_url}", "ℹ".blue());
    }
    for report in &reports {
        println!("{}", render_report(report));
    }
    Ok(())
}
