//! "Next page" warming for listing pages.
//!
//! Pagination links are `page-N` paths or `?page=N` queries; [`PaginationMode`]
//! decides whether all of them or only the first are warmed.

use futures::future::join_all;
use tracing::debug;

use crate::config::PaginationMode;
use crate::session::{PreloadSession, WarmReport};

/// Apply `mode` to pagination links found in document order.
#[must_use]
pub fn select_pagination_links(mut links: Vec<String>, mode: PaginationMode) -> Vec<String> {
    if mode == PaginationMode::FirstOnly {
        links.truncate(1);
    }
    links
}

/// Warm the pagination links of the page at `page_url`, concurrently.
///
/// `markup` is the page's own HTML. Which links are warmed follows
/// `dispatch.pagination`.
pub async fn preload_pagination(
    session: &PreloadSession,
    markup: &str,
    page_url: &str,
) -> Vec<WarmReport> {
    let found = session
        .store()
        .extractor()
        .find_pagination_links(markup, page_url);
    let links = select_pagination_links(found, session.config().dispatch.pagination);
    debug!(page = %page_url, links = links.len(), "warming pagination links");
    join_all(links.iter().map(|link| session.warm(link))).await
}
