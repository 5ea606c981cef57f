//! Error types and handling for rapid-core operations.
//!
//! Collaborators (fetchers, loaders, storage backends) report failures through
//! [`Error`]. The page cache and preload scheduler never surface these to their
//! callers; they degrade to "no acceleration" and log instead. The error type
//! exists so that the degradation decisions can be made on typed information.
//!
//! ## Error Categories
//!
//! - **I/O Errors**: File-backed store access
//! - **Network Errors**: Page retrieval and asset preloads
//! - **Storage Errors**: Backend failures, including quota exhaustion
//! - **Parse Errors**: Unreadable persisted entries or snapshots
//! - **Configuration Errors**: Invalid settings or config files
//!
//! ## Recovery Hints
//!
//! ```rust
//! use rapid_core::Error;
//!
//! let err = Error::QuotaExceeded("store holds 5 MiB".to_string());
//! assert!(err.is_quota_exceeded());
//! assert_eq!(err.category(), "quota");
//! assert!(!err.is_recoverable());
//! ```

use thiserror::Error;

/// The main error type for rapid-core operations.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation failed.
    ///
    /// Covers the file-backed store: creating the store directory, reading
    /// and writing entry files.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Network operation failed.
    ///
    /// Transport-level failures while retrieving page markup or preloading
    /// an asset. The underlying `reqwest::Error` is preserved.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Server answered with a non-success status.
    #[error("HTTP {status} for '{url}'")]
    HttpStatus {
        /// Status code returned by the server.
        status: u16,
        /// URL that was requested.
        url: String,
    },

    /// Parsing operation failed.
    ///
    /// Raised for persisted entries or snapshots that cannot be read back.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Storage backend operation failed.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Storage backend refused a write because it is full.
    ///
    /// The page cache reacts to this by clearing the entire store.
    #[error("Storage quota exceeded: {0}")]
    QuotaExceeded(String),

    /// Configuration is invalid or inaccessible.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested resource was not found (HTTP 404).
    #[error("Not found: {0}")]
    NotFound(String),

    /// URL is malformed or invalid.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic error for uncategorized failures.
    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<toml::ser::Error> for Error {
    fn from(err: toml::ser::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Self::InvalidUrl(err.to_string())
    }
}

impl Error {
    /// Check if the error might be recoverable through retry logic.
    ///
    /// Returns `true` for timeouts, connection failures, 5xx/429 responses
    /// and interrupted I/O. The page cache does not retry on its own; this is
    /// a hint for callers that drive their own retry policy.
    ///
    /// ```rust
    /// use rapid_core::Error;
    ///
    /// let busy = Error::HttpStatus { status: 503, url: "https://a.test/".into() };
    /// assert!(busy.is_recoverable());
    ///
    /// let gone = Error::NotFound("https://a.test/missing".into());
    /// assert!(!gone.is_recoverable());
    /// ```
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Network(e) => e.is_timeout() || e.is_connect(),
            Self::HttpStatus { status, .. } => *status >= 500 || *status == 429,
            Self::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::TimedOut | std::io::ErrorKind::Interrupted
            ),
            _ => false,
        }
    }

    /// Whether the storage backend rejected a write for lack of space.
    #[must_use]
    pub fn is_quota_exceeded(&self) -> bool {
        match self {
            Self::QuotaExceeded(_) => true,
            Self::Io(e) => e.kind() == std::io::ErrorKind::StorageFull,
            _ => false,
        }
    }

    /// Get the error category as a string identifier.
    ///
    /// Useful as a structured logging field:
    ///
    /// ```rust
    /// use rapid_core::Error;
    ///
    /// let err = Error::Parse("bad timestamp".into());
    /// tracing::warn!(category = err.category(), "{err}");
    /// ```
    #[must_use]
    pub const fn category(&self) -> &'static str {
        match self {
            Self::Io(_) => "io",
            Self::Network(_) | Self::HttpStatus { .. } => "network",
            Self::Parse(_) => "parse",
            Self::Storage(_) => "storage",
            Self::QuotaExceeded(_) => "quota",
            Self::Config(_) => "config",
            Self::NotFound(_) => "not_found",
            Self::InvalidUrl(_) => "invalid_url",
            Self::Serialization(_) => "serialization",
            Self::Other(_) => "other",
        }
    }
}

/// Convenience type alias for `std::result::Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
