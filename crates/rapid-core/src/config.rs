//! Configuration for preload sessions.
//!
//! Configuration is stored in TOML. A missing file yields defaults; a file
//! that exists but fails to parse is an error.
//!
//! ## Example Configuration File
//!
//! ```toml
//! [cache]
//! ttl_hours = 12
//! in_flight = "share"
//! restore_preloaded = true
//! post_load_sweep_ms = 1000
//!
//! [preload]
//! reservation = "on_dispatch"
//!
//! [dispatch]
//! hover_cooldown_ms = 2000
//! pagination = "all"
//! crawl_limit = 50
//!
//! [fetch]
//! timeout_secs = 30
//!
//! [paths]
//! root = "/home/user/.local/share/rapid-preload"
//! ```

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable overriding the persistent store directory.
pub const DATA_DIR_ENV: &str = "RAPID_PRELOAD_DATA_DIR";

/// Environment variable overriding the config file location.
pub const CONFIG_PATH_ENV: &str = "RAPID_PRELOAD_CONFIG";

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Page cache behaviour.
    pub cache: CacheConfig,
    /// Preload scheduler behaviour.
    pub preload: PreloadConfig,
    /// Hover, pagination and crawl glue.
    pub dispatch: DispatchConfig,
    /// HTTP client settings.
    pub fetch: FetchConfig,
    /// File system locations.
    pub paths: PathsConfig,
}

/// What a caller gets when it asks for a page that is already being fetched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InFlightPolicy {
    /// Return an empty asset list immediately.
    Skip,
    /// Await the pending retrieval and return its result.
    #[default]
    Share,
}

/// When an asset enters the preloaded registry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReservationPolicy {
    /// Insert once the load settles. Overlapping calls may both dispatch.
    OnSettle,
    /// Reserve before the load starts. At most one dispatch per asset.
    #[default]
    OnDispatch,
}

/// Which pagination links are warmed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaginationMode {
    /// Every pagination link on the page.
    #[default]
    All,
    /// Only the first pagination link in document order.
    FirstOnly,
}

/// Page cache settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Lifetime of a cached asset list, in hours.
    pub ttl_hours: u64,
    /// Behaviour for concurrent requests of the same page.
    pub in_flight: InFlightPolicy,
    /// Seconds a failed page is left alone before it may be fetched again.
    ///
    /// Unset means a failed page can be retried by the very next request.
    pub error_retry_cooldown_secs: Option<u64>,
    /// Restore the preloaded registry from the last snapshot.
    pub restore_preloaded: bool,
    /// Delay before the post-load cleanup sweep, in milliseconds.
    pub post_load_sweep_ms: u64,
    /// Byte budget for the persistent store. Unset means unbounded.
    pub quota_bytes: Option<u64>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_hours: 12,
            in_flight: InFlightPolicy::default(),
            error_retry_cooldown_secs: None,
            restore_preloaded: true,
            post_load_sweep_ms: 1000,
            quota_bytes: None,
        }
    }
}

impl CacheConfig {
    /// Cache entry lifetime.
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_hours.saturating_mul(3600))
    }

    /// Cooldown after a failed retrieval, if any.
    #[must_use]
    pub fn error_retry_cooldown(&self) -> Option<Duration> {
        self.error_retry_cooldown_secs.map(Duration::from_secs)
    }

    /// Delay before the post-load sweep.
    #[must_use]
    pub const fn post_load_sweep_delay(&self) -> Duration {
        Duration::from_millis(self.post_load_sweep_ms)
    }
}

/// Preload scheduler settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreloadConfig {
    /// Registry reservation policy.
    pub reservation: ReservationPolicy,
}

/// Dispatch glue settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Minimum time between two triggers of the same link, in milliseconds.
    pub hover_cooldown_ms: u64,
    /// Pagination link selection.
    pub pagination: PaginationMode,
    /// Maximum number of pages warmed by one crawl.
    pub crawl_limit: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            hover_cooldown_ms: 2000,
            pagination: PaginationMode::default(),
            crawl_limit: 50,
        }
    }
}

impl DispatchConfig {
    /// Hover cooldown as a duration.
    #[must_use]
    pub const fn hover_cooldown(&self) -> Duration {
        Duration::from_millis(self.hover_cooldown_ms)
    }
}

/// HTTP client settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Transport timeout per request, in seconds.
    pub timeout_secs: u64,
    /// User agent sent with every request.
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            user_agent: concat!("rapid-preload/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl FetchConfig {
    /// Request timeout as a duration.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// File system paths.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Directory holding the persistent store.
    pub root: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            root: directories::ProjectDirs::from("dev", "rapid", "rapid-preload").map_or_else(
                || {
                    directories::BaseDirs::new().map_or_else(
                        || PathBuf::from(".rapid-preload"),
                        |base| base.home_dir().join(".rapid-preload"),
                    )
                },
                |dirs| dirs.data_dir().to_path_buf(),
            ),
        }
    }
}

impl Config {
    /// Load configuration from the default location, or defaults if absent.
    ///
    /// Honours [`CONFIG_PATH_ENV`] for the file location and
    /// [`DATA_DIR_ENV`] for the store directory.
    pub fn load() -> Result<Self> {
        let path = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) if !path.trim().is_empty() => PathBuf::from(path.trim()),
            _ => Self::config_path()?,
        };
        let mut config = Self::load_from(&path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load configuration from an explicit file, or defaults if it is absent.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read config: {e}")))?;
        toml::from_str(&content).map_err(|e| Error::Config(format!("Failed to parse config: {e}")))
    }

    /// Write the configuration as TOML, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| Error::Config(format!("Failed to create config directory: {e}")))?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {e}")))?;
        fs::write(path, content).map_err(|e| Error::Config(format!("Failed to write config: {e}")))
    }

    /// Platform config file location.
    pub fn config_path() -> Result<PathBuf> {
        let dirs = directories::ProjectDirs::from("dev", "rapid", "rapid-preload")
            .ok_or_else(|| Error::Config("Failed to determine project directories".into()))?;
        Ok(dirs.config_dir().join("config.toml"))
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
            let trimmed = dir.trim();
            if !trimmed.is_empty() {
                self.paths.root = PathBuf::from(trimmed);
            }
        }
    }
}
