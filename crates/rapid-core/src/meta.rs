//! Shared writer for the persisted [`CacheMetaSnapshot`].
//!
//! The page cache owns fetch states and the preload scheduler owns the
//! preloaded registry, but both halves land in one snapshot document. Each
//! component hands the journal its half after a mutation and the journal
//! rewrites the whole document.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, warn};

use crate::backend::CacheBackend;
use crate::clock::Clock;
use crate::page_cache::{CacheMetaSnapshot, META_KEY, PageFetchState};

/// Keeps the latest projection of both components and persists it.
pub struct MetaJournal {
    backend: Arc<dyn CacheBackend>,
    clock: Arc<dyn Clock>,
    snapshot: Mutex<CacheMetaSnapshot>,
}

impl MetaJournal {
    /// Journal writing to `backend` under [`META_KEY`].
    pub fn new(backend: Arc<dyn CacheBackend>, clock: Arc<dyn Clock>) -> Self {
        Self {
            backend,
            clock,
            snapshot: Mutex::default(),
        }
    }

    /// Read the persisted snapshot, if any.
    ///
    /// An unreadable snapshot is discarded and treated as absent.
    pub fn load(&self) -> Option<CacheMetaSnapshot> {
        let raw = match self.backend.get(META_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!(error = %e, "failed to read cache snapshot");
                return None;
            },
        };
        match serde_json::from_str::<CacheMetaSnapshot>(&raw) {
            Ok(snapshot) => {
                debug!(
                    preloaded = snapshot.preloaded.len(),
                    pages = snapshot.state.len(),
                    "loaded cache snapshot"
                );
                Some(snapshot)
            },
            Err(e) => {
                warn!(error = %e, "discarding unreadable cache snapshot");
                if let Err(e) = self.backend.remove(META_KEY) {
                    warn!(error = %e, "failed to remove unreadable cache snapshot");
                }
                None
            },
        }
    }

    /// Replace the fetch-state half and persist.
    pub fn record_states(&self, states: BTreeMap<String, PageFetchState>) {
        self.update(|snapshot| snapshot.state = states);
    }

    /// Replace the preloaded half and persist.
    pub fn record_preloaded(&self, preloaded: Vec<String>) {
        self.update(|snapshot| snapshot.preloaded = preloaded);
    }

    /// The last snapshot handed to the backend.
    pub fn current(&self) -> CacheMetaSnapshot {
        self.snapshot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn update(&self, apply: impl FnOnce(&mut CacheMetaSnapshot)) {
        let json = {
            let mut snapshot = self.snapshot.lock().unwrap_or_else(PoisonError::into_inner);
            apply(&mut snapshot);
            snapshot.time = self.clock.now_ms();
            serde_json::to_string(&*snapshot)
        };
        let result = json
            .map_err(crate::Error::from)
            .and_then(|json| self.backend.set(META_KEY, &json));
        // The snapshot is best effort; a full store is handled by page writes.
        if let Err(e) = result {
            warn!(category = e.category(), error = %e, "failed to persist cache snapshot");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use crate::clock::ManualClock;

    fn journal() -> (MetaJournal, Arc<MemoryBackend>) {
        let backend = Arc::new(MemoryBackend::new());
        let journal = MetaJournal::new(backend.clone(), Arc::new(ManualClock::new(99)));
        (journal, backend)
    }

    #[test]
    fn test_both_halves_land_in_one_document() {
        let (journal, backend) = journal();
        let mut states = BTreeMap::new();
        states.insert("https://example.com/".to_string(), PageFetchState::Loading);
        journal.record_states(states);
        journal.record_preloaded(vec!["https://example.com/a.js".to_string()]);

        let raw = backend.get(META_KEY).unwrap().unwrap();
        let snapshot: CacheMetaSnapshot = serde_json::from_str(&raw).unwrap();
        assert_eq!(snapshot.preloaded, vec!["https://example.com/a.js"]);
        assert_eq!(
            snapshot.state.get("https://example.com/"),
            Some(&PageFetchState::Loading)
        );
        assert_eq!(snapshot.time, 99);
        assert_eq!(journal.current(), snapshot);
    }

    #[test]
    fn test_load_absent_snapshot() {
        let (journal, _) = journal();
        assert!(journal.load().is_none());
    }

    #[test]
    fn test_load_discards_corrupt_snapshot() {
        let (journal, backend) = journal();
        backend.set(META_KEY, "{not json").unwrap();
        assert!(journal.load().is_none());
        assert!(backend.get(META_KEY).unwrap().is_none());
    }

    #[test]
    fn test_write_failure_is_swallowed() {
        let backend = Arc::new(MemoryBackend::with_quota(8));
        let journal = MetaJournal::new(backend.clone(), Arc::new(ManualClock::new(0)));
        journal.record_preloaded(vec!["https://example.com/large-asset.png".into()]);
        assert!(backend.is_empty());
    }
}
