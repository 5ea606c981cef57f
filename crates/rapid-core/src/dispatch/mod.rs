//! Triggers that decide which pages to warm.
//!
//! - [`HoverDispatcher`]: warm a link when the pointer rests on it
//! - [`preload_pagination`]: warm "next page" links of a listing
//! - [`crawl`]: warm every same-origin page linked from a start page

mod crawl;
mod hover;
mod pagination;

pub use crawl::{CrawlReport, crawl};
pub use hover::{HoverDispatcher, HoverOutcome};
pub use pagination::{preload_pagination, select_pagination_links};
