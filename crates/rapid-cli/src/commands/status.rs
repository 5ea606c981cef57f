//! Store inspection.

use std::io::{self, Write};

use anyhow::Result;
use chrono::{DateTime, Utc};
use colored::Colorize;
use rapid_core::{CacheMetaSnapshot, PageFetchState};
use serde::Serialize;

use super::store_session;
use crate::cli::Cli;

/// Everything `status` reports, in the shape printed by `--json`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    /// Store directory, `None` for an ephemeral store.
    pub data_dir: Option<String>,
    /// Snapshot written by the last session, if any.
    pub snapshot: Option<CacheMetaSnapshot>,
    /// Persisted page entries.
    pub pages: Vec<PageStatus>,
}

/// One persisted page entry.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageStatus {
    /// Normalized page URL.
    pub url: String,
    /// Extraction instant, RFC 3339.
    pub cached_at: Option<String>,
    /// Number of assets recorded.
    pub assets: usize,
    /// Still within the TTL.
    pub fresh: bool,
}

/// Print the stored snapshot and cached pages.
pub fn status(cli: &Cli, json: bool) -> Result<()> {
    let session = store_session(cli)?;
    let store = session.store();
    let report = StatusReport {
        data_dir: (!cli.ephemeral).then(|| session.config().paths.root.display().to_string()),
        snapshot: session.stored_snapshot(),
        pages: store
            .cached_entries()
            .into_iter()
            .map(|entry| PageStatus {
                cached_at: format_millis(entry.timestamp),
                assets: entry.assets.len(),
                fresh: store.is_fresh(&entry),
                url: entry.url,
            })
            .collect(),
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();
    if json {
        serde_json::to_writer_pretty(&mut out, &report)?;
        writeln!(out)?;
    } else {
        render_text(&mut out, &report)?;
    }
    Ok(())
}

fn format_millis(ms: i64) -> Option<String> {
    DateTime::<Utc>::from_timestamp_millis(ms).map(|t| t.to_rfc3339())
}

fn render_text(out: &mut impl Write, report: &StatusReport) -> Result<()> {
    match &report.data_dir {
        Some(dir) => writeln!(out, "{} {dir}", "Store:".bold())?,
        None => writeln!(out, "{} in memory", "Store:".bold())?,
    }

    match &report.snapshot {
        Some(snapshot) => {
            let count = |wanted: PageFetchState| {
                snapshot.state.values().filter(|s| **s == wanted).count()
            };
            writeln!(
                out,
                "{} {} ({} cached, {} failed, {} preloaded assets)",
                "Snapshot:".bold(),
                format_millis(snapshot.time).unwrap_or_else(|| "unknown time".into()),
                count(PageFetchState::Cached),
                count(PageFetchState::Error),
                snapshot.preloaded.len()
            )?;
        },
        None => writeln!(out, "{} none", "Snapshot:".bold())?,
    }

    if report.pages.is_empty() {
        writeln!(out, "{} No cached pages", "ℹ".blue())?;
        return Ok(());
    }
    writeln!(out, "{} {}", "Cached pages:".bold(), report.pages.len())?;
    for page in &report.pages {
        let freshness = if page.fresh {
            "fresh".green()
        } else {
            "expired".yellow()
        };
        writeln!(out, "  {} {} assets, {freshness}", page.url, page.assets)?;
    }
    Ok(())
}
