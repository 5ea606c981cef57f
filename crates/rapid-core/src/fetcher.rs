//! HTTP collaborators: page markup retrieval and asset preloading.
//!
//! Both sit behind traits so the page cache and the preload scheduler can be
//! driven by in-process fakes in tests.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::{Client, StatusCode};
use tracing::{debug, info};

use crate::config::FetchConfig;
use crate::{Error, Result};

/// Retrieves page markup for asset extraction.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// GET `url` and return the body. Any non-2xx status is a failure.
    async fn fetch_markup(&self, url: &str) -> Result<String>;
}

/// Broad category of a preloadable sub-resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetKind {
    /// `.js`
    Script,
    /// `.css`
    Style,
    /// Everything else, including format variants that may not exist.
    Image,
}

impl AssetKind {
    /// Classify by path extension, ignoring query and fragment.
    #[must_use]
    pub fn from_url(url: &str) -> Self {
        let path = url.split(['?', '#']).next().unwrap_or_default();
        let ext = path
            .rsplit('/')
            .next()
            .and_then(|file| file.rsplit_once('.'))
            .map(|(_, ext)| ext.to_ascii_lowercase());
        match ext.as_deref() {
            Some("js") => Self::Script,
            Some("css") => Self::Style,
            _ => Self::Image,
        }
    }

    /// `Accept` header a browser would send for this kind of resource.
    #[must_use]
    pub const fn accept_header(self) -> &'static str {
        match self {
            Self::Script => "*/*",
            Self::Style => "text/css,*/*;q=0.1",
            Self::Image => "image/avif,image/webp,image/png,image/svg+xml,image/*;q=0.8,*/*;q=0.5",
        }
    }
}

/// Warms a single asset. Implementations resolve once the load settles.
#[async_trait]
pub trait AssetLoader: Send + Sync {
    /// Load `url` as `kind`. Errors are reported, the scheduler swallows them.
    async fn load(&self, url: &str, kind: AssetKind) -> Result<()>;
}

/// HTTP client shared by [`HttpPageFetcher`] and [`HttpAssetLoader`].
///
/// Requests carry no cookies or other credentials.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    /// Client with default timeout and user agent.
    pub fn new() -> Result<Self> {
        Self::from_config(&FetchConfig::default())
    }

    /// Client built from `[fetch]` settings.
    pub fn from_config(config: &FetchConfig) -> Result<Self> {
        Self::build(config.timeout(), &config.user_agent)
    }

    /// Client with a custom request timeout (primarily for tests).
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        Self::build(timeout, &FetchConfig::default().user_agent)
    }

    fn build(timeout: Duration, user_agent: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .gzip(true)
            .brotli(true)
            .build()
            .map_err(Error::Network)?;
        Ok(Self { client })
    }

    async fn get(&self, url: &str, accept: Option<&str>) -> Result<reqwest::Response> {
        let mut request = self.client.get(url);
        if let Some(accept) = accept {
            request = request.header(ACCEPT, accept);
        }
        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            // Map 404 to a clearer NotFound error
            if status == StatusCode::NOT_FOUND {
                return Err(Error::NotFound(format!("Nothing found at '{url}'")));
            }
            return Err(Error::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        Ok(response)
    }
}

/// Default [`PageFetcher`] over HTTP.
#[derive(Debug, Clone)]
pub struct HttpPageFetcher {
    http: HttpClient,
}

impl HttpPageFetcher {
    /// Fetcher using `http`.
    #[must_use]
    pub const fn new(http: HttpClient) -> Self {
        Self { http }
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch_markup(&self, url: &str) -> Result<String> {
        let response = self
            .http
            .get(url, Some("text/html,application/xhtml+xml;q=0.9,*/*;q=0.8"))
            .await?;
        let markup = response.text().await?;
        info!("Fetched {} bytes of markup from {}", markup.len(), url);
        Ok(markup)
    }
}

/// Default [`AssetLoader`] over HTTP: GET and drain the body.
#[derive(Debug, Clone)]
pub struct HttpAssetLoader {
    http: HttpClient,
}

impl HttpAssetLoader {
    /// Loader using `http`.
    #[must_use]
    pub const fn new(http: HttpClient) -> Self {
        Self { http }
    }
}

#[async_trait]
impl AssetLoader for HttpAssetLoader {
    async fn load(&self, url: &str, kind: AssetKind) -> Result<()> {
        let response = self.http.get(url, Some(kind.accept_header())).await?;
        let body = response.bytes().await?;
        debug!(%url, ?kind, bytes = body.len(), "preloaded asset");
        Ok(())
    }
}
