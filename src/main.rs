//! # Daily Tech Digest
//!
//! Builds a short daily digest of technology headlines by scraping the home
//! pages of a few Chinese tech news sites. No API keys are involved: every
//! headline is a link pulled from the raw home-page markup.
//!
//! ## Usage
//!
//! ```sh
//! daily_tech_digest > digest.md
//! daily_tech_digest -c sources.yaml --format json
//! ```
//!
//! ## Architecture
//!
//! The application follows a pipeline architecture:
//! 1. **Fetching**: Download each home page in priority order ([`fetcher`])
//! 2. **Scanning**: Stream the markup into anchor records ([`scanner`])
//! 3. **Classifying**: Apply the source's extraction rule ([`classifier`])
//! 4. **Aggregating**: Article-first ordering, title dedup, early stop once
//!    the digest is full ([`pipeline`])
//! 5. **Output**: Render the digest to stdout ([`outputs`])
//!
//! stdout carries only the digest; all logs go to stderr. The process exits
//! successfully even when scraping fails, after printing a fallback digest,
//! so a scheduled delivery always has something to send.

use chrono::{Local, NaiveDate};
use clap::Parser;
use futures::FutureExt;
use std::any::Any;
use std::error::Error;
use std::io::Write;
use std::panic::AssertUnwindSafe;
use tracing::{debug, error, info, instrument};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod classifier;
mod cli;
mod config;
mod error;
mod fetcher;
mod models;
mod outputs;
mod pipeline;
mod rules;
mod scanner;
mod utils;

use cli::{Cli, OutputFormat};
use config::load_config;
use fetcher::HttpFetcher;
use models::HeadlineItem;
use outputs::{json, text};
use pipeline::AggregationPipeline;
use utils::truncate_for_log;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // --- Tracing init (stderr only; stdout is reserved for the digest) ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("daily_tech_digest starting up");

    let today = Local::now().date_naive();
    let digest = match Cli::try_parse() {
        Ok(args) => {
            debug!(?args, "Parsed CLI arguments");
            produce_digest(&args, today).await
        }
        // --help and --version
        Err(e) if !e.use_stderr() => e.exit(),
        Err(e) => {
            error!(error = %e, "Invalid command line; emitting fallback digest");
            text::render_failure("命令行参数无效", today)
        }
    };

    let mut stdout = std::io::stdout().lock();
    if let Err(e) = writeln!(stdout, "{digest}").and_then(|_| stdout.flush()) {
        error!(error = %e, "Failed to write digest to stdout");
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );
}

/// Run the pipeline and render its result. Never fails: errors and panics
/// inside the run turn into the fallback digest.
async fn produce_digest(args: &Cli, today: NaiveDate) -> String {
    match AssertUnwindSafe(run(args)).catch_unwind().await {
        Ok(Ok(items)) => {
            info!(count = items.len(), format = ?args.format, "Rendering digest");
            match args.format {
                OutputFormat::Text => text::render(&items, today),
                OutputFormat::Json => json::render(&items, today),
            }
        }
        Ok(Err(e)) => {
            error!(error = %e, "Digest run failed; emitting fallback digest");
            text::render_failure(&truncate_for_log(&e.to_string(), 300), today)
        }
        Err(payload) => {
            let reason = panic_message(payload.as_ref());
            error!(%reason, "Digest run panicked; emitting fallback digest");
            text::render_failure(&truncate_for_log(&reason, 300), today)
        }
    }
}

#[instrument(level = "info", skip_all)]
async fn run(args: &Cli) -> Result<Vec<HeadlineItem>, Box<dyn Error>> {
    let config = load_config(args.config.as_deref(), args).await?;
    info!(
        max_items = config.max_items,
        timeout_secs = config.timeout_secs,
        sources = config.sources.len(),
        "Configuration ready"
    );

    let fetcher = HttpFetcher::new(config.timeout(), &config.user_agent, &config.encodings)?;
    let pipeline = AggregationPipeline::new(config.max_items);
    let items = pipeline.run(&fetcher, &config.sources).await;

    for (index, item) in items.iter().enumerate() {
        debug!(index, source = %item.source, title = %item.title, url = %item.url, "Selected headline");
    }
    Ok(items)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "未知错误".to_string()
    }
}
