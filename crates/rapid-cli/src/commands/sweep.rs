//! Remove expired entries.

use anyhow::Result;
use colored::Colorize;

use super::store_session;
use crate::cli::Cli;

/// Run the cleanup sweep once and report how many entries went.
pub fn sweep(cli: &Cli) -> Result<()> {
    let session = store_session(cli)?;
    let removed = session.store().cleanup_expired_caches();
    println!("{} Removed {removed} expired entries", "✓".green());
    Ok(())
}
