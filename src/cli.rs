//! Command-line interface definitions for the daily tech digest.
//!
//! Every option can also be supplied through an environment variable, which
//! is how the digest is usually configured when run from cron.

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// How the digest is written to stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Markdown-flavoured plain text, ready to forward as a message.
    Text,
    /// `{ "date": ..., "items": [...] }`
    Json,
}

/// Command-line arguments for the daily tech digest.
///
/// # Examples
///
/// ```sh
/// # Built-in sources, 12 items
/// daily_tech_digest
///
/// # Custom sources and a shorter digest
/// daily_tech_digest -c sources.yaml -n 5
///
/// # Machine-readable output
/// daily_tech_digest --format json
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Optional path to a YAML config file
    #[arg(short, long, env = "DIGEST_CONFIG")]
    pub config: Option<PathBuf>,

    /// Maximum number of headlines in the digest
    #[arg(short = 'n', long, env = "DIGEST_MAX_ITEMS")]
    pub max_items: Option<usize>,

    /// Per-request timeout in seconds
    #[arg(long, env = "DIGEST_TIMEOUT_SECS")]
    pub timeout_secs: Option<u64>,

    /// Output format
    #[arg(long, value_enum, env = "DIGEST_FORMAT", default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}
