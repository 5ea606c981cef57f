//! Page cache store: fresh-entry lookup, single retrieval per page, sweeps.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use tracing::{debug, info, warn};

use crate::backend::CacheBackend;
use crate::clock::{Clock, duration_ms};
use crate::config::{CacheConfig, InFlightPolicy};
use crate::extract::AssetExtractor;
use crate::fetcher::PageFetcher;
use crate::meta::MetaJournal;
use crate::normalize::UrlNormalizer;
use crate::page_cache::{
    CACHE_KEY_PREFIX, PageCacheEntry, PageFetchState, cache_key, stored_timestamp,
};

type SharedRetrieval = Shared<BoxFuture<'static, Vec<String>>>;

/// Cache of page asset lists keyed by normalized page URL.
///
/// All failures degrade to an empty asset list; nothing here returns an
/// error to the caller.
///
/// ## Thread Safety
///
/// In-memory state sits behind a mutex that is never held across an
/// `.await`. Clones share the same state.
#[derive(Clone)]
pub struct PageCacheStore {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    backend: Arc<dyn CacheBackend>,
    fetcher: Arc<dyn PageFetcher>,
    extractor: AssetExtractor,
    clock: Arc<dyn Clock>,
    journal: Arc<MetaJournal>,
    settings: CacheConfig,
    state: Mutex<StoreState>,
}

#[derive(Default)]
struct StoreState {
    states: HashMap<String, PageFetchState>,
    failed_at: HashMap<String, i64>,
    in_flight: HashMap<String, SharedRetrieval>,
}

enum Plan {
    Start(SharedRetrieval),
    Join(SharedRetrieval),
    Skip,
    CoolingDown,
}

impl PageCacheStore {
    /// Create a store.
    pub fn new(
        backend: Arc<dyn CacheBackend>,
        fetcher: Arc<dyn PageFetcher>,
        extractor: AssetExtractor,
        clock: Arc<dyn Clock>,
        journal: Arc<MetaJournal>,
        settings: CacheConfig,
    ) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                backend,
                fetcher,
                extractor,
                clock,
                journal,
                settings,
                state: Mutex::default(),
            }),
        }
    }

    /// The normalizer every key passes through.
    #[must_use]
    pub fn normalizer(&self) -> &UrlNormalizer {
        self.inner.extractor.normalizer()
    }

    /// The extractor applied to retrieved markup.
    #[must_use]
    pub fn extractor(&self) -> &AssetExtractor {
        &self.inner.extractor
    }

    /// Assets referenced by the page at `url`.
    ///
    /// Serves a fresh persisted entry without touching the network. Otherwise
    /// retrieves the markup once, extracts, persists and returns the assets.
    /// Returns an empty list for asset URLs, failed retrievals, pages inside
    /// their error cooldown, and (under [`InFlightPolicy::Skip`]) pages that
    /// are already being retrieved.
    pub async fn get_assets(&self, url: &str) -> Vec<String> {
        let normalizer = self.normalizer();
        if !normalizer.is_page_url(url) {
            debug!(%url, "not a page url, skipping");
            return Vec::new();
        }
        let url = normalizer.normalize(url);

        if let Some(entry) = self.inner.fresh_entry(&url) {
            debug!(%url, assets = entry.assets.len(), "cache hit");
            self.inner.mark_cached(&url);
            return entry.assets;
        }

        match self.plan(&url) {
            Plan::Start(retrieval) => {
                self.inner.record_states();
                retrieval.await
            },
            Plan::Join(retrieval) => {
                debug!(%url, "joining in-flight retrieval");
                retrieval.await
            },
            Plan::Skip => {
                debug!(%url, "retrieval already in flight, skipping");
                Vec::new()
            },
            Plan::CoolingDown => {
                debug!(%url, "page failed recently, skipping");
                Vec::new()
            },
        }
    }

    /// Decide what to do for a URL with no fresh entry, and mark `Loading`
    /// when a retrieval starts.
    fn plan(&self, url: &str) -> Plan {
        let now = self.inner.clock.now_ms();
        let mut state = self.inner.lock();
        match state.states.get(url).copied() {
            Some(PageFetchState::Loading) => match self.inner.settings.in_flight {
                InFlightPolicy::Skip => Plan::Skip,
                InFlightPolicy::Share => state
                    .in_flight
                    .get(url)
                    .cloned()
                    .map_or(Plan::Skip, Plan::Join),
            },
            Some(PageFetchState::Error) if self.inner.cooling_down(&state, url, now) => {
                Plan::CoolingDown
            },
            _ => {
                let inner = Arc::clone(&self.inner);
                let owned = url.to_string();
                let retrieval = async move { inner.retrieve(owned).await }
                    .boxed()
                    .shared();
                state.states.insert(url.to_string(), PageFetchState::Loading);
                state.in_flight.insert(url.to_string(), retrieval.clone());
                Plan::Start(retrieval)
            },
        }
    }

    /// Remove persisted entries that are expired or unreadable.
    ///
    /// Returns the number of entries removed.
    pub fn cleanup_expired_caches(&self) -> usize {
        let now = self.inner.clock.now_ms();
        let ttl_ms = duration_ms(self.inner.settings.ttl());
        let keys = match self.inner.backend.keys() {
            Ok(keys) => keys,
            Err(e) => {
                warn!(error = %e, "failed to enumerate cache entries");
                return 0;
            },
        };

        let mut removed = 0;
        for key in keys.iter().filter(|key| key.starts_with(CACHE_KEY_PREFIX)) {
            let expired = match self.inner.backend.get(key) {
                Ok(Some(json)) => {
                    stored_timestamp(&json).is_none_or(|ts| now.saturating_sub(ts) >= ttl_ms)
                },
                Ok(None) => false,
                Err(e) => {
                    debug!(%key, error = %e, "unreadable cache entry");
                    true
                },
            };
            if !expired {
                continue;
            }
            match self.inner.backend.remove(key) {
                Ok(()) => removed += 1,
                Err(e) => warn!(%key, error = %e, "failed to remove expired cache entry"),
            }
        }

        info!(removed, "swept expired page entries");
        removed
    }

    /// Seed fetch states from a previous snapshot.
    ///
    /// `Loading` cannot survive a restart and is restored as `Idle`. States
    /// already known in memory win.
    pub fn restore_states(&self, states: impl IntoIterator<Item = (String, PageFetchState)>) {
        {
            let mut state = self.inner.lock();
            for (url, fetch_state) in states {
                let fetch_state = match fetch_state {
                    PageFetchState::Loading => PageFetchState::Idle,
                    other => other,
                };
                state.states.entry(url).or_insert(fetch_state);
            }
        }
        self.inner.record_states();
    }

    /// Current fetch state of `url`, `Idle` when never seen.
    #[must_use]
    pub fn state(&self, url: &str) -> PageFetchState {
        let url = self.normalizer().normalize(url);
        self.inner
            .lock()
            .states
            .get(&url)
            .copied()
            .unwrap_or_default()
    }

    /// Every known fetch state, ordered by URL.
    #[must_use]
    pub fn states(&self) -> BTreeMap<String, PageFetchState> {
        self.inner.states_snapshot()
    }

    /// Every readable persisted entry, ordered by URL.
    #[must_use]
    pub fn cached_entries(&self) -> Vec<PageCacheEntry> {
        let keys = self.inner.backend.keys().unwrap_or_else(|e| {
            warn!(error = %e, "failed to enumerate cache entries");
            Vec::new()
        });
        let mut entries: Vec<PageCacheEntry> = keys
            .iter()
            .filter_map(|key| {
                let url = key.strip_prefix(CACHE_KEY_PREFIX)?;
                let json = self.inner.backend.get(key).ok()??;
                PageCacheEntry::from_json(url, &json).ok()
            })
            .collect();
        entries.sort_by(|a, b| a.url.cmp(&b.url));
        entries
    }

    /// Whether `entry` is still within its TTL.
    #[must_use]
    pub fn is_fresh(&self, entry: &PageCacheEntry) -> bool {
        entry.is_valid_at(
            self.inner.clock.now_ms(),
            duration_ms(self.inner.settings.ttl()),
        )
    }
}

impl StoreInner {
    fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn fresh_entry(&self, url: &str) -> Option<PageCacheEntry> {
        let json = match self.backend.get(&cache_key(url)) {
            Ok(json) => json?,
            Err(e) => {
                warn!(%url, error = %e, "failed to read cache entry");
                return None;
            },
        };
        let entry = match PageCacheEntry::from_json(url, &json) {
            Ok(entry) => entry,
            Err(e) => {
                debug!(%url, error = %e, "ignoring unreadable cache entry");
                return None;
            },
        };
        let ttl_ms = duration_ms(self.settings.ttl());
        entry
            .is_valid_at(self.clock.now_ms(), ttl_ms)
            .then_some(entry)
    }

    fn cooling_down(&self, state: &StoreState, url: &str, now: i64) -> bool {
        let Some(cooldown) = self.settings.error_retry_cooldown() else {
            return false;
        };
        state
            .failed_at
            .get(url)
            .is_some_and(|failed| now.saturating_sub(*failed) < duration_ms(cooldown))
    }

    fn mark_cached(&self, url: &str) {
        let changed = {
            let mut state = self.lock();
            match state.states.get(url) {
                // the in-flight retrieval settles the state
                Some(PageFetchState::Loading | PageFetchState::Cached) => false,
                _ => {
                    state.states.insert(url.to_string(), PageFetchState::Cached);
                    true
                },
            }
        };
        if changed {
            self.record_states();
        }
    }

    async fn retrieve(&self, url: String) -> Vec<String> {
        info!(%url, "retrieving page markup");
        match self.fetcher.fetch_markup(&url).await {
            Ok(markup) => {
                let assets = self.extractor.extract(&markup, &url);
                debug!(%url, assets = assets.len(), "extracted page assets");
                self.persist_entry(&url, &assets);
                self.settle(&url, PageFetchState::Cached);
                assets
            },
            Err(e) => {
                debug!(%url, category = e.category(), error = %e, "page retrieval failed");
                self.settle(&url, PageFetchState::Error);
                Vec::new()
            },
        }
    }

    fn persist_entry(&self, url: &str, assets: &[String]) {
        let entry = PageCacheEntry::new(url.to_string(), self.clock.now_ms(), assets.to_vec());
        let result = entry
            .to_json()
            .and_then(|json| self.backend.set(&cache_key(url), &json));
        match result {
            Ok(()) => {},
            Err(e) if e.is_quota_exceeded() => {
                warn!(%url, error = %e, "storage quota exceeded, clearing persistent store");
                if let Err(e) = self.backend.clear() {
                    warn!(error = %e, "failed to clear persistent store");
                }
            },
            Err(e) => warn!(%url, error = %e, "failed to persist cache entry"),
        }
    }

    fn settle(&self, url: &str, outcome: PageFetchState) {
        {
            let mut state = self.lock();
            state.in_flight.remove(url);
            state.states.insert(url.to_string(), outcome);
            if outcome == PageFetchState::Error {
                state.failed_at.insert(url.to_string(), self.clock.now_ms());
            } else {
                state.failed_at.remove(url);
            }
        }
        self.record_states();
    }

    fn states_snapshot(&self) -> BTreeMap<String, PageFetchState> {
        self.lock()
            .states
            .iter()
            .map(|(url, state)| (url.clone(), *state))
            .collect()
    }

    fn record_states(&self) {
        self.journal.record_states(self.states_snapshot());
    }
}
