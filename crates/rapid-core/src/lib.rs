//! # rapid-core
//!
//! Core functionality for rapid-preload - a predictive asset-preloading cache.
//!
//! When a visitor is about to navigate (pointer resting on a link, a "next
//! page" control in view), this crate retrieves the target page's markup,
//! lists the images, stylesheets and scripts it references, remembers that
//! list for a while, and warms those assets so the navigation lands on a hot
//! cache.
//!
//! ## Architecture
//!
//! - **Normalization**: every URL is canonicalized against the document origin
//! - **Extraction**: HTML parsing with speculative image format variants
//! - **Page Cache**: TTL-bounded persisted asset lists with a per-URL fetch state
//! - **Preloading**: concurrent best-effort loads, deduplicated per session
//! - **Dispatch**: hover, pagination and crawl triggers
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use rapid_core::{Config, PreloadSession};
//!
//! # async fn run() -> rapid_core::Result<()> {
//! let session = PreloadSession::builder("https://example.com/", Config::load()?).build()?;
//! session.open();
//!
//! let report = session.warm("https://example.com/blog/next-post").await;
//! println!("{} assets known, {} preloads issued", report.assets, report.dispatched);
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! Cache lookups and preloads never fail; they degrade to "nothing to warm".
//! Construction, configuration and crawling return [`Result<T, Error>`]:
//!
//! ```rust
//! use rapid_core::{Config, Error, PreloadSession};
//!
//! match PreloadSession::builder("not a url", Config::default()).ephemeral().build() {
//!     Ok(_) => println!("ready"),
//!     Err(Error::InvalidUrl(msg)) => eprintln!("bad origin: {msg}"),
//!     Err(e) => eprintln!("{} error: {e}", e.category()),
//! }
//! ```

/// Persistent key/value stores
pub mod backend;
/// Wall-clock abstraction
pub mod clock;
/// Configuration loading and defaults
pub mod config;
/// Hover, pagination and crawl triggers
pub mod dispatch;
/// Error types and result aliases
pub mod error;
/// Sub-resource and link discovery in markup
pub mod extract;
/// HTTP page fetcher and asset loader
pub mod fetcher;
/// Persisted session snapshot
pub mod meta;
/// URL canonicalization
pub mod normalize;
/// TTL cache of page asset lists
pub mod page_cache;
/// Asset preload scheduling
pub mod preload;
/// Session wiring and lifecycle
pub mod session;

// Re-export commonly used types
pub use backend::{CacheBackend, FileBackend, MemoryBackend};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{
    CacheConfig, Config, DispatchConfig, FetchConfig, InFlightPolicy, PaginationMode, PathsConfig,
    PreloadConfig, ReservationPolicy,
};
pub use dispatch::{CrawlReport, HoverDispatcher, HoverOutcome, crawl, preload_pagination};
pub use error::{Error, Result};
pub use extract::AssetExtractor;
pub use fetcher::{
    AssetKind, AssetLoader, HttpAssetLoader, HttpClient, HttpPageFetcher, PageFetcher,
};
pub use normalize::UrlNormalizer;
pub use page_cache::{CacheMetaSnapshot, PageCacheEntry, PageCacheStore, PageFetchState};
pub use preload::PreloadScheduler;
pub use session::{OpenReport, PreloadSession, SessionBuilder, WarmReport};
