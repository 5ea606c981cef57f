//! Command implementations, one module per subcommand.

mod clear;
mod crawl;
mod pages;
mod status;
mod sweep;
mod warm;

pub use clear::clear;
pub use crawl::crawl;
pub use pages::pages;
pub use status::status;
pub use sweep::sweep;
pub use warm::warm;

use anyhow::{Context, Result};
use rapid_core::{Config, PreloadSession};
use url::Url;

use crate::cli::Cli;

/// Origin used by commands that only touch the store.
const STORE_ONLY_ORIGIN: &str = "http://localhost/";

/// Load configuration honouring `--config` and `--data-dir`.
pub fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::load().context("Failed to load config")?,
    };
    if let Some(dir) = &cli.data_dir {
        config.paths.root.clone_from(dir);
    }
    Ok(config)
}

/// Build a session for `origin` with the store selected by the global flags.
pub fn open_session(cli: &Cli, config: Config, origin: &str) -> Result<PreloadSession> {
    let builder = PreloadSession::builder(origin, config);
    let builder = if cli.ephemeral {
        builder.ephemeral()
    } else {
        builder
    };
    builder
        .build()
        .with_context(|| format!("Failed to start a session for {origin}"))
}

/// Session for maintenance commands that never fetch.
pub fn store_session(cli: &Cli) -> Result<PreloadSession> {
    open_session(cli, load_config(cli)?, STORE_ONLY_ORIGIN)
}

/// Root of the origin serving `url`.
pub fn origin_of(url: &str) -> Result<String> {
    let parsed = Url::parse(url).with_context(|| format!("'{url}' is not an absolute URL"))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        anyhow::bail!("'{url}' is not an http(s) URL");
    }
    Ok(parsed.join("/")?.to_string())
}
