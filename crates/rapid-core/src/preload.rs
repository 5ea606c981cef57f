//! Best-effort asset preloading with per-session deduplication.
//!
//! [`PreloadScheduler::preload_all`] warms every asset of a page at once and
//! returns when all loads have settled. An asset enters the preloaded
//! registry whether its load succeeded or not, so a broken asset is never
//! retried within a session.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::future::join_all;
use tracing::debug;

use crate::config::ReservationPolicy;
use crate::fetcher::{AssetKind, AssetLoader};
use crate::meta::MetaJournal;
use crate::normalize::UrlNormalizer;

/// Dispatches asset loads and remembers what has been dispatched.
pub struct PreloadScheduler {
    loader: Arc<dyn AssetLoader>,
    normalizer: UrlNormalizer,
    journal: Arc<MetaJournal>,
    policy: ReservationPolicy,
    registry: Mutex<Registry>,
}

/// Preloaded assets in first-dispatch order.
#[derive(Default)]
struct Registry {
    members: HashSet<String>,
    order: Vec<String>,
}

impl Registry {
    fn insert(&mut self, url: &str) -> bool {
        if self.members.insert(url.to_string()) {
            self.order.push(url.to_string());
            true
        } else {
            false
        }
    }
}

impl PreloadScheduler {
    /// Create a scheduler with an empty registry.
    pub fn new(
        loader: Arc<dyn AssetLoader>,
        normalizer: UrlNormalizer,
        journal: Arc<MetaJournal>,
        policy: ReservationPolicy,
    ) -> Self {
        Self {
            loader,
            normalizer,
            journal,
            policy,
            registry: Mutex::default(),
        }
    }

    /// Preload every asset not already in the registry, concurrently.
    ///
    /// Load failures are swallowed. Returns the number of loads dispatched by
    /// this call.
    pub async fn preload_all(&self, assets: &[String]) -> usize {
        let mut seen = HashSet::new();
        let pending: Vec<String> = {
            let mut registry = self.lock();
            assets
                .iter()
                .map(|asset| self.normalizer.normalize(asset))
                .filter(|asset| !asset.trim().is_empty() && seen.insert(asset.clone()))
                .filter(|asset| match self.policy {
                    ReservationPolicy::OnDispatch => registry.insert(asset),
                    ReservationPolicy::OnSettle => !registry.members.contains(asset),
                })
                .collect()
        };
        if pending.is_empty() {
            return 0;
        }
        if self.policy == ReservationPolicy::OnDispatch {
            self.record();
        }

        debug!(count = pending.len(), "dispatching preloads");
        join_all(pending.iter().map(|asset| self.load_one(asset))).await;

        if self.policy == ReservationPolicy::OnSettle {
            self.record();
        }
        pending.len()
    }

    async fn load_one(&self, asset: &str) {
        let kind = AssetKind::from_url(asset);
        if let Err(e) = self.loader.load(asset, kind).await {
            debug!(%asset, ?kind, error = %e, "preload failed");
        }
        if self.policy == ReservationPolicy::OnSettle {
            self.lock().insert(asset);
        }
    }

    /// Whether `url` has had a preload dispatched this session.
    #[must_use]
    pub fn is_preloaded(&self, url: &str) -> bool {
        let url = self.normalizer.normalize(url);
        self.lock().members.contains(&url)
    }

    /// Registry contents in first-dispatch order.
    #[must_use]
    pub fn preloaded(&self) -> Vec<String> {
        self.lock().order.clone()
    }

    /// Seed the registry from a previous snapshot.
    pub fn restore(&self, preloaded: impl IntoIterator<Item = String>) {
        {
            let mut registry = self.lock();
            for url in preloaded {
                registry.insert(&url);
            }
        }
        self.record();
    }

    fn record(&self) {
        self.journal.record_preloaded(self.preloaded());
    }

    fn lock(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
