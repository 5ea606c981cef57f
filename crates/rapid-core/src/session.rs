//! A preload session: one page cache and one preload registry per origin.
//!
//! [`PreloadSession`] wires the collaborators together from a [`Config`] and
//! owns the session lifecycle: sweep and restore on open, warm pages on
//! demand, sweep again once the document has settled.
//!
//! ```rust,no_run
//! use rapid_core::{Config, PreloadSession};
//!
//! # async fn run() -> rapid_core::Result<()> {
//! let session = PreloadSession::builder("https://example.com/", Config::load()?).build()?;
//! session.open();
//! let report = session.warm("/blog/page-2").await;
//! println!("{} assets, {} preloads dispatched", report.assets, report.dispatched);
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use crate::Result;
use crate::backend::{CacheBackend, FileBackend, MemoryBackend};
use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::extract::AssetExtractor;
use crate::fetcher::{AssetLoader, HttpAssetLoader, HttpClient, HttpPageFetcher, PageFetcher};
use crate::meta::MetaJournal;
use crate::normalize::UrlNormalizer;
use crate::page_cache::{CacheMetaSnapshot, PageCacheStore};
use crate::preload::PreloadScheduler;

/// What [`PreloadSession::open`] found and did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OpenReport {
    /// Expired or unreadable entries removed by the sweep.
    pub swept: usize,
    /// Page fetch states restored from the snapshot.
    pub restored_states: usize,
    /// Registry entries restored from the snapshot.
    pub restored_preloaded: usize,
}

/// Outcome of warming one page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WarmReport {
    /// Normalized page URL.
    pub url: String,
    /// Assets the page references.
    pub assets: usize,
    /// Preloads dispatched for them; already-preloaded assets are skipped.
    pub dispatched: usize,
}

/// Builder for [`PreloadSession`]. Unset collaborators get HTTP and file
/// system defaults.
pub struct SessionBuilder {
    origin: String,
    config: Config,
    backend: Option<Arc<dyn CacheBackend>>,
    fetcher: Option<Arc<dyn PageFetcher>>,
    loader: Option<Arc<dyn AssetLoader>>,
    clock: Option<Arc<dyn Clock>>,
}

impl SessionBuilder {
    /// Use a specific store.
    #[must_use]
    pub fn backend(mut self, backend: Arc<dyn CacheBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Keep everything in memory; nothing survives the process.
    #[must_use]
    pub fn ephemeral(self) -> Self {
        let backend = self
            .config
            .cache
            .quota_bytes
            .map_or_else(MemoryBackend::new, MemoryBackend::with_quota);
        self.backend(Arc::new(backend))
    }

    /// Use a specific page fetcher.
    #[must_use]
    pub fn fetcher(mut self, fetcher: Arc<dyn PageFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    /// Use a specific asset loader.
    #[must_use]
    pub fn loader(mut self, loader: Arc<dyn AssetLoader>) -> Self {
        self.loader = Some(loader);
        self
    }

    /// Use a specific clock.
    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Assemble the session.
    ///
    /// Fails when the origin is not an absolute URL or the HTTP client cannot
    /// be built.
    pub fn build(self) -> Result<PreloadSession> {
        let normalizer = UrlNormalizer::new(&self.origin)?;
        let config = self.config;

        let backend = match self.backend {
            Some(backend) => backend,
            None => Arc::new(
                FileBackend::new(&config.paths.root).with_quota(config.cache.quota_bytes),
            ),
        };
        let (fetcher, loader) = match (self.fetcher, self.loader) {
            (Some(fetcher), Some(loader)) => (fetcher, loader),
            (fetcher, loader) => {
                let http = HttpClient::from_config(&config.fetch)?;
                (
                    fetcher.unwrap_or_else(|| Arc::new(HttpPageFetcher::new(http.clone()))),
                    loader.unwrap_or_else(|| Arc::new(HttpAssetLoader::new(http))),
                )
            },
        };
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));

        let journal = Arc::new(MetaJournal::new(Arc::clone(&backend), Arc::clone(&clock)));
        let store = PageCacheStore::new(
            Arc::clone(&backend),
            Arc::clone(&fetcher),
            AssetExtractor::new(normalizer.clone()),
            Arc::clone(&clock),
            Arc::clone(&journal),
            config.cache.clone(),
        );
        let scheduler = PreloadScheduler::new(
            loader,
            normalizer,
            Arc::clone(&journal),
            config.preload.reservation,
        );

        Ok(PreloadSession {
            config,
            backend,
            fetcher,
            clock,
            journal,
            store,
            scheduler,
        })
    }
}

/// Page cache, preload registry and their shared collaborators.
pub struct PreloadSession {
    config: Config,
    backend: Arc<dyn CacheBackend>,
    fetcher: Arc<dyn PageFetcher>,
    clock: Arc<dyn Clock>,
    journal: Arc<MetaJournal>,
    store: PageCacheStore,
    scheduler: PreloadScheduler,
}

impl PreloadSession {
    /// Start building a session for documents served from `origin`.
    pub fn builder(origin: impl Into<String>, config: Config) -> SessionBuilder {
        SessionBuilder {
            origin: origin.into(),
            config,
            backend: None,
            fetcher: None,
            loader: None,
            clock: None,
        }
    }

    /// Sweep expired entries, then restore state from the last snapshot.
    ///
    /// Call once before the first [`warm`](Self::warm).
    pub fn open(&self) -> OpenReport {
        let swept = self.store.cleanup_expired_caches();
        let mut report = OpenReport {
            swept,
            ..OpenReport::default()
        };

        let Some(snapshot) = self.journal.load() else {
            debug!("no cache snapshot to restore");
            return report;
        };
        report.restored_states = snapshot.state.len();
        self.store.restore_states(snapshot.state);
        if self.config.cache.restore_preloaded {
            report.restored_preloaded = snapshot.preloaded.len();
            self.scheduler.restore(snapshot.preloaded);
        }

        info!(
            swept = report.swept,
            states = report.restored_states,
            preloaded = report.restored_preloaded,
            "opened preload session"
        );
        report
    }

    /// Look up the assets of `url` and preload the ones not yet preloaded.
    pub async fn warm(&self, url: &str) -> WarmReport {
        let assets = self.store.get_assets(url).await;
        let dispatched = self.scheduler.preload_all(&assets).await;
        WarmReport {
            url: self.normalizer().normalize(url),
            assets: assets.len(),
            dispatched,
        }
    }

    /// Wait for the configured settle delay, then sweep again.
    pub async fn on_document_loaded(&self) -> usize {
        tokio::time::sleep(self.config.cache.post_load_sweep_delay()).await;
        self.store.cleanup_expired_caches()
    }

    /// Wipe the persistent store, entries and snapshot alike.
    pub fn clear(&self) -> Result<()> {
        self.backend.clear()
    }

    /// Latest persisted projection of the session.
    #[must_use]
    pub fn snapshot(&self) -> CacheMetaSnapshot {
        self.journal.current()
    }

    /// Previous session's snapshot as persisted, without restoring it.
    #[must_use]
    pub fn stored_snapshot(&self) -> Option<CacheMetaSnapshot> {
        self.journal.load()
    }

    /// Session configuration.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// The page cache.
    #[must_use]
    pub const fn store(&self) -> &PageCacheStore {
        &self.store
    }

    /// The preload scheduler.
    #[must_use]
    pub const fn scheduler(&self) -> &PreloadScheduler {
        &self.scheduler
    }

    /// Page fetcher shared with the cache, for glue that needs raw markup.
    #[must_use]
    pub fn fetcher(&self) -> &dyn PageFetcher {
        self.fetcher.as_ref()
    }

    /// Session clock.
    #[must_use]
    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    /// Normalizer bound to the session origin.
    #[must_use]
    pub fn normalizer(&self) -> &UrlNormalizer {
        self.store.normalizer()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::fetcher::AssetKind;
    use crate::page_cache::{PageFetchState, cache_key};
    use crate::{Error, Result};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    pub(crate) const START: i64 = 1_700_000_000_000;

    /// Serves fixed markup per URL and counts requests.
    #[derive(Default)]
    pub(crate) struct StaticSite {
        pages: HashMap<String, String>,
        pub(crate) fetches: AtomicUsize,
    }

    impl StaticSite {
        pub(crate) fn new(pages: &[(&str, &str)]) -> Self {
            Self {
                pages: pages
                    .iter()
                    .map(|(url, markup)| ((*url).to_string(), (*markup).to_string()))
                    .collect(),
                fetches: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl PageFetcher for StaticSite {
        async fn fetch_markup(&self, url: &str) -> Result<String> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            self.pages
                .get(url)
                .cloned()
                .ok_or_else(|| Error::NotFound(url.to_string()))
        }
    }

    /// Records every load.
    #[derive(Default)]
    pub(crate) struct LoadLog {
        pub(crate) loads: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl AssetLoader for LoadLog {
        async fn load(&self, url: &str, _kind: AssetKind) -> Result<()> {
            self.loads.lock().unwrap().push(url.to_string());
            Ok(())
        }
    }

    pub(crate) struct Fixture {
        pub(crate) session: PreloadSession,
        pub(crate) site: Arc<StaticSite>,
        pub(crate) loads: Arc<LoadLog>,
        pub(crate) backend: Arc<MemoryBackend>,
        pub(crate) clock: Arc<ManualClock>,
    }

    pub(crate) fn fixture_with(
        pages: &[(&str, &str)],
        config: Config,
        backend: Arc<MemoryBackend>,
    ) -> Fixture {
        let site = Arc::new(StaticSite::new(pages));
        let loads = Arc::new(LoadLog::default());
        let clock = Arc::new(ManualClock::new(START));
        let session = PreloadSession::builder("https://example.com/", config)
            .backend(backend.clone())
            .fetcher(site.clone())
            .loader(loads.clone())
            .clock(clock.clone())
            .build()
            .unwrap();
        Fixture {
            session,
            site,
            loads,
            backend,
            clock,
        }
    }

    pub(crate) fn fixture(pages: &[(&str, &str)]) -> Fixture {
        fixture_with(pages, Config::default(), Arc::new(MemoryBackend::new()))
    }

    const POST: &str = "https://example.com/post";

    #[tokio::test]
    async fn test_warm_fetches_and_preloads() {
        let f = fixture(&[(POST, r#"<img src="/a.png"><script src="/app.js"></script>"#)]);
        f.session.open();

        let report = f.session.warm("/post").await;
        assert_eq!(report.url, POST);
        assert_eq!(report.assets, 3);
        assert_eq!(report.dispatched, 3);

        let again = f.session.warm(POST).await;
        assert_eq!(again.assets, 3);
        assert_eq!(again.dispatched, 0);
        assert_eq!(f.site.fetches.load(Ordering::SeqCst), 1);
        assert_eq!(f.loads.loads.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_open_sweeps_then_restores() {
        let backend = Arc::new(MemoryBackend::new());
        {
            let first = fixture_with(
                &[(POST, r#"<img src="/a.gif">"#)],
                Config::default(),
                backend.clone(),
            );
            first.session.open();
            first.session.warm(POST).await;
        }
        backend
            .set(
                &cache_key("https://example.com/stale"),
                r#"{"timestamp":0,"assets":[]}"#,
            )
            .unwrap();

        let second = fixture_with(&[], Config::default(), backend);
        let report = second.session.open();
        assert_eq!(report.swept, 1);
        assert_eq!(report.restored_states, 1);
        assert_eq!(report.restored_preloaded, 1);
        assert!(second.session.scheduler().is_preloaded("/a.gif"));
        assert_eq!(second.session.store().state(POST), PageFetchState::Cached);

        // served from the persisted entry, nothing reloaded
        let warm = second.session.warm(POST).await;
        assert_eq!(warm.assets, 1);
        assert_eq!(warm.dispatched, 0);
        assert_eq!(second.site.fetches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_restore_preloaded_can_be_disabled() {
        let backend = Arc::new(MemoryBackend::new());
        let first = fixture_with(
            &[(POST, r#"<img src="/a.gif">"#)],
            Config::default(),
            backend.clone(),
        );
        first.session.warm(POST).await;

        let mut config = Config::default();
        config.cache.restore_preloaded = false;
        let second = fixture_with(&[], config, backend);
        let report = second.session.open();
        assert_eq!(report.restored_preloaded, 0);
        assert!(!second.session.scheduler().is_preloaded("/a.gif"));
    }

    #[tokio::test]
    async fn test_post_load_sweep_runs_after_delay() {
        let mut config = Config::default();
        config.cache.post_load_sweep_ms = 5;
        let f = fixture_with(&[(POST, "<p></p>")], config, Arc::new(MemoryBackend::new()));
        f.session.warm(POST).await;
        f.clock.advance(Duration::from_secs(13 * 3600));
        assert_eq!(f.session.on_document_loaded().await, 1);
        assert!(f.session.store().cached_entries().is_empty());
    }

    #[tokio::test]
    async fn test_clear_wipes_store() {
        let f = fixture(&[(POST, "<p></p>")]);
        f.session.warm(POST).await;
        assert!(!f.backend.is_empty());
        f.session.clear().unwrap();
        assert!(f.backend.is_empty());
    }

    #[test]
    fn test_build_rejects_relative_origin() {
        let result = PreloadSession::builder("/relative", Config::default())
            .ephemeral()
            .build();
        assert!(matches!(result, Err(Error::InvalidUrl(_))));
    }
}
