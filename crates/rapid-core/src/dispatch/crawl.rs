//! One-level crawl: warm the same-origin pages a start page links to.

use serde::Serialize;
use tracing::info;

use crate::Result;
use crate::session::{PreloadSession, WarmReport};

/// Summary of one crawl.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CrawlReport {
    /// Normalized start page.
    pub start_url: String,
    /// Distinct same-origin page links found on the start page.
    pub discovered: usize,
    /// Pages warmed, in link order.
    pub warmed: Vec<WarmReport>,
    /// Links left out because of the limit.
    pub skipped: usize,
}

/// Warm every same-origin page linked from `start_url`, one at a time.
///
/// At most `limit` pages are warmed. Fails only when the start page itself
/// cannot be retrieved; failures of linked pages show up as empty reports.
pub async fn crawl(session: &PreloadSession, start_url: &str, limit: usize) -> Result<CrawlReport> {
    let start_url = session.normalizer().normalize(start_url);
    let markup = session.fetcher().fetch_markup(&start_url).await?;
    let links: Vec<String> = session
        .store()
        .extractor()
        .extract_links(&markup, &start_url)
        .into_iter()
        .filter(|link| *link != start_url)
        .collect();

    let mut report = CrawlReport {
        start_url,
        discovered: links.len(),
        skipped: links.len().saturating_sub(limit),
        ..CrawlReport::default()
    };
    for link in links.iter().take(limit) {
        report.warmed.push(session.warm(link).await);
    }

    info!(
        start = %report.start_url,
        discovered = report.discovered,
        warmed = report.warmed.len(),
        "crawl finished"
    );
    Ok(report)
}
