//! # CLI Structure and Argument Parsing
//!
//! ```bash
//! # Warm pages the way a hover would
//! rapid-preload warm https://example.com/blog/post-1 https://example.com/about
//!
//! # Warm the "next page" links of a listing
//! rapid-preload pages https://example.com/blog/ --first-only
//!
//! # Warm every page linked from the home page
//! rapid-preload crawl https://example.com/ --limit 20
//!
//! # Store maintenance
//! rapid-preload status --json
//! rapid-preload sweep
//! rapid-preload clear --force
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use rapid_core::config::DATA_DIR_ENV;

/// Main CLI structure for the `rapid-preload` command
#[derive(Parser, Clone, Debug)]
#[command(name = "rapid-preload")]
#[command(version)]
#[command(about = "rapid-preload - predictive page-asset warming", long_about = None)]
#[allow(clippy::struct_excessive_bools)]
pub struct Cli {
    /// Command to run
    #[command(subcommand)]
    pub command: Commands,

    /// Show debug logs
    #[arg(short = 'v', long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Suppress informational messages (only show errors)
    #[arg(short = 'q', long, global = true)]
    pub quiet: bool,

    /// Disable all ANSI colors in output (also respects `NO_COLOR` env)
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Directory holding the persistent store
    #[arg(long, global = true, env = DATA_DIR_ENV, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// Config file to load instead of the platform default
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Keep the store in memory for this run only
    #[arg(long, global = true)]
    pub ephemeral: bool,
}

/// Available subcommands
#[derive(Subcommand, Clone, Debug)]
pub enum Commands {
    /// Look up and preload the assets of one or more pages
    Warm {
        /// Page URLs, absolute or relative to --origin
        #[arg(required = true, value_name = "URL")]
        urls: Vec<String>,

        /// Origin the pages belong to (defaults to the first URL's origin)
        #[arg(long, value_name = "URL")]
        origin: Option<String>,
    },

    /// Preload the pagination links found on a page
    Pages {
        /// Listing page to scan for pagination links
        #[arg(value_name = "PAGE_URL")]
        page_url: String,

        /// Only warm the first pagination link
        #[arg(long)]
        first_only: bool,
    },

    /// Preload every same-origin page linked from a page
    Crawl {
        /// Start page
        #[arg(value_name = "PAGE_URL")]
        page_url: String,

        /// Maximum number of pages to warm
        #[arg(long, value_name = "N")]
        limit: Option<usize>,
    },

    /// Remove expired entries from the persistent store
    Sweep,

    /// Show the stored session snapshot and cached pages
    Status {
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Wipe the persistent store
    Clear {
        /// Skip confirmation prompt
        #[arg(short = 'f', long = "force")]
        force: bool,
    },
}

impl Cli {
    /// Whether the selected command prints machine-readable output.
    pub const fn machine_output(&self) -> bool {
        matches!(self.command, Commands::Status { json: true })
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_warm_requires_a_url() {
        assert!(Cli::try_parse_from(["rapid-preload", "warm"]).is_err());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "rapid-preload",
            "crawl",
            "https://example.com/",
            "--limit",
            "3",
            "--ephemeral",
            "-q",
        ])
        .unwrap_or_else(|e| panic!("{e}"));
        assert!(cli.ephemeral);
        assert!(cli.quiet);
        assert!(matches!(cli.command, Commands::Crawl { limit: Some(3), .. }));
    }

    #[test]
    fn test_clear_force_flag() {
        let cli = Cli::try_parse_from(["rapid-preload", "clear", "-f"])
            .unwrap_or_else(|e| panic!("{e}"));
        assert!(matches!(cli.command, Commands::Clear { force: true }));

        let cli =
            Cli::try_parse_from(["rapid-preload", "clear"]).unwrap_or_else(|e| panic!("{e}"));
        assert!(matches!(cli.command, Commands::Clear { force: false }));
    }

    #[test]
    fn test_verbose_conflicts_with_quiet() {
        assert!(Cli::try_parse_from(["rapid-preload", "-v", "-q", "sweep"]).is_err());
    }
}
