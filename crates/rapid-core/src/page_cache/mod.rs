//! TTL-bounded cache of per-page asset lists.
//!
//! [`PageCacheStore`] answers "which assets does this page reference?" by
//! serving a persisted entry when one is still fresh, and otherwise retrieving
//! the page markup once, extracting its assets and persisting the result.
//! Concurrent requests for the same page share one retrieval.
//!
//! ## Key Types
//!
//! - [`PageCacheStore`]: the cache itself, cheap to clone
//! - [`PageCacheEntry`]: one page's asset list and extraction instant
//! - [`PageFetchState`]: per-URL fetch lifecycle
//! - [`CacheMetaSnapshot`]: persisted projection of session state
//!
//! ## Persisted Layout
//!
//! ```text
//! rapid-preload:page:<normalized url>  {"timestamp": <ms>, "assets": [...]}
//! rapid-preload:meta                   {"preloaded": [...], "state": {...}, "time": <ms>}
//! ```

mod store;
mod types;

pub use store::PageCacheStore;
pub use types::{
    CACHE_KEY_PREFIX, CacheMetaSnapshot, META_KEY, PageCacheEntry, PageFetchState, cache_key,
    stored_timestamp,
};
