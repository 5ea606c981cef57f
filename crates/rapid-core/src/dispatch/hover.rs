//! Hover-intent dispatch with a per-link cooldown.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::debug;
use url::Url;

use crate::clock::duration_ms;
use crate::session::{PreloadSession, WarmReport};

/// What happened to one hover signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HoverOutcome {
    /// The link was looked up and its assets preloaded.
    Warmed(WarmReport),
    /// The same link triggered within the cooldown.
    CoolingDown,
    /// Not a same-origin http(s) link.
    Ignored,
}

/// Turns hover-intent signals into page warm-ups, at most once per link per
/// cooldown window.
pub struct HoverDispatcher {
    session: Arc<PreloadSession>,
    cooldown_ms: i64,
    last_trigger: Mutex<HashMap<String, i64>>,
}

impl HoverDispatcher {
    /// Dispatcher using the session's `dispatch.hover_cooldown_ms`.
    #[must_use]
    pub fn new(session: Arc<PreloadSession>) -> Self {
        let cooldown_ms = duration_ms(session.config().dispatch.hover_cooldown());
        Self {
            session,
            cooldown_ms,
            last_trigger: Mutex::default(),
        }
    }

    /// Handle the pointer resting on a link to `href`.
    pub async fn on_hover(&self, href: &str) -> HoverOutcome {
        let normalizer = self.session.normalizer();
        let url = normalizer.normalize(href);
        let navigable = Url::parse(&url).is_ok_and(|u| matches!(u.scheme(), "http" | "https"));
        if href.trim().is_empty() || !navigable || !normalizer.is_same_origin(&url) {
            debug!(%href, "ignoring hover");
            return HoverOutcome::Ignored;
        }

        let now = self.session.clock().now_ms();
        {
            let mut last_trigger = self
                .last_trigger
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if let Some(last) = last_trigger.get(&url) {
                if now.saturating_sub(*last) < self.cooldown_ms {
                    debug!(%url, "hover within cooldown");
                    return HoverOutcome::CoolingDown;
                }
            }
            last_trigger.insert(url.clone(), now);
        }

        HoverOutcome::Warmed(self.session.warm(&url).await)
    }
}
