//! Type definitions for the page cache.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Prefix of every persisted page entry key.
pub const CACHE_KEY_PREFIX: &str = "rapid-preload:page:";

/// Key of the persisted meta snapshot.
pub const META_KEY: &str = "rapid-preload:meta";

/// Persisted key for a normalized page URL.
#[must_use]
pub fn cache_key(url: &str) -> String {
    format!("{CACHE_KEY_PREFIX}{url}")
}

/// Fetch lifecycle of one page URL.
///
/// ```text
/// Idle ──fetch──▶ Loading ──ok──▶ Cached ──expiry + fetch──▶ Loading
///                    │
///                    └──failure──▶ Error ──new fetch──▶ Loading
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageFetchState {
    /// Never fetched in this session.
    #[default]
    Idle,
    /// A retrieval is in flight.
    Loading,
    /// Assets are known, persisted or in memory.
    Cached,
    /// The last retrieval failed.
    Error,
}

impl fmt::Display for PageFetchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Idle => "idle",
            Self::Loading => "loading",
            Self::Cached => "cached",
            Self::Error => "error",
        };
        f.write_str(label)
    }
}

/// The asset list of one page, stamped with the instant it was extracted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageCacheEntry {
    /// Normalized page URL.
    pub url: String,
    /// Extraction instant, epoch milliseconds.
    pub timestamp: i64,
    /// Normalized asset URLs in extraction order.
    pub assets: Vec<String>,
}

/// Persisted form of [`PageCacheEntry`]; the URL lives in the key.
#[derive(Debug, Serialize, Deserialize)]
struct StoredEntry {
    timestamp: i64,
    assets: Vec<String>,
}

impl PageCacheEntry {
    /// Create an entry.
    #[must_use]
    pub const fn new(url: String, timestamp: i64, assets: Vec<String>) -> Self {
        Self {
            url,
            timestamp,
            assets,
        }
    }

    /// Whether the entry is still within `ttl_ms` at `now_ms`.
    #[must_use]
    pub const fn is_valid_at(&self, now_ms: i64, ttl_ms: i64) -> bool {
        now_ms.saturating_sub(self.timestamp) < ttl_ms
    }

    /// Serialize to the persisted JSON document.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&StoredEntry {
            timestamp: self.timestamp,
            assets: self.assets.clone(),
        })?)
    }

    /// Parse a persisted JSON document for `url`.
    pub fn from_json(url: &str, json: &str) -> Result<Self> {
        let stored: StoredEntry = serde_json::from_str(json)
            .map_err(|e| Error::Parse(format!("Unreadable cache entry for {url}: {e}")))?;
        Ok(Self::new(url.to_string(), stored.timestamp, stored.assets))
    }
}

/// Read just the timestamp of a persisted entry.
///
/// `None` when the document is not JSON or has no integer `timestamp`.
#[must_use]
pub fn stored_timestamp(json: &str) -> Option<i64> {
    serde_json::from_str::<serde_json::Value>(json)
        .ok()?
        .get("timestamp")?
        .as_i64()
}

/// Persisted projection of session state, rewritten after every mutation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheMetaSnapshot {
    /// Assets that have had a preload issued.
    pub preloaded: Vec<String>,
    /// Fetch state per normalized page URL.
    pub state: BTreeMap<String, PageFetchState>,
    /// When the snapshot was written, epoch milliseconds.
    pub time: i64,
}
