//! Store wipe, confirmed unless `--force` is given.

use std::io::{self, Write};

use anyhow::Result;
use colored::Colorize;
use rapid_core::PreloadSession;

use super::store_session;
use crate::cli::Cli;

/// Store operations the clear command needs.
pub trait ClearStore {
    /// URLs of the pages currently cached.
    fn cached_pages(&self) -> Vec<String>;
    /// Whether a session snapshot is persisted.
    fn has_snapshot(&self) -> bool;
    /// Remove every entry and the snapshot.
    fn clear_store(&self) -> Result<()>;
}

impl ClearStore for PreloadSession {
    fn cached_pages(&self) -> Vec<String> {
        self.store()
            .cached_entries()
            .into_iter()
            .map(|entry| entry.url)
            .collect()
    }

    fn has_snapshot(&self) -> bool {
        self.stored_snapshot().is_some()
    }

    fn clear_store(&self) -> Result<()> {
        self.clear().map_err(anyhow::Error::from)
    }
}

/// What [`execute_clear`] did.
#[derive(Debug, PartialEq, Eq)]
pub enum ClearOutcome {
    /// Nothing was stored.
    AlreadyEmpty,
    /// The user declined the prompt.
    Cancelled,
    /// The store was wiped; `pages` cached pages were removed.
    Cleared { pages: usize },
}

/// Clear `store`, asking `confirm` first unless `force` is set.
///
/// # Errors
///
/// Returns an error if writing output, confirmation, or the wipe fails.
pub fn execute_clear<S, W, C>(
    store: &S,
    mut writer: W,
    force: bool,
    mut confirm: C,
) -> Result<ClearOutcome>
where
    S: ClearStore,
    W: Write,
    C: FnMut(&[String]) -> Result<bool>,
{
    let pages = store.cached_pages();
    if pages.is_empty() && !store.has_snapshot() {
        writeln!(writer, "{} Store is already empty", "ℹ".blue())?;
        return Ok(ClearOutcome::AlreadyEmpty);
    }

    writeln!(
        writer,
        "{} This will delete {} cached page(s) and the session snapshot:",
        "⚠".yellow(),
        pages.len()
    )?;
    for page in &pages {
        writeln!(writer, "  • {page}")?;
    }
    writeln!(writer)?;

    if !force && !confirm(&pages)? {
        writeln!(writer, "{} Cancelled", "✗".red())?;
        return Ok(ClearOutcome::Cancelled);
    }

    store.clear_store()?;
    writeln!(writer, "{} Cleared {} cached pages", "✓".green(), pages.len())?;
    Ok(ClearOutcome::Cleared { pages: pages.len() })
}

/// Wipe the store selected by the global flags, prompting on stdin.
pub fn clear(cli: &Cli, force: bool) -> Result<()> {
    let session = store_session(cli)?;
    let stdout = io::stdout();
    let mut stdout_lock = stdout.lock();
    let mut input = String::new();

    execute_clear(&session, &mut stdout_lock, force, |_pages| {
        let prompt_stdout = io::stdout();
        let mut prompt_lock = prompt_stdout.lock();
        write!(prompt_lock, "Continue? [y/N] ")?;
        prompt_lock.flush()?;

        input.clear();
        io::stdin().read_line(&mut input)?;
        Ok(matches!(
            input.trim().to_ascii_lowercase().as_str(),
            "y" | "yes"
        ))
    })?;
    Ok(())
}
