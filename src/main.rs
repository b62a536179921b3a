//! # Sonar Digest
//!
//! A weekday automation job that queries a hosted AI search API for a daily
//! news digest, formats the answer against a character budget, downloads any
//! associated images, and posts the result to a Telegram channel.
//!
//! ## Features
//!
//! - Weekday-topical queries (tech on Monday, funding on Tuesday, ...)
//! - Tolerates schema drift: images are merged from every known response location
//! - Exponential backoff with jitter on rate limits; flat retry on 5xx/timeouts
//! - Whitespace-free character budgeting with sentence-boundary truncation
//! - Photo-with-caption delivery when exactly one image is available,
//!   length-aware message splitting otherwise
//! - Unconditional cleanup of downloaded scratch files
//!
//! ## Usage
//!
//! ```sh
//! PERPLEXITY_API_KEY=pplx-... TELEGRAM_BOT_TOKEN=123:... \
//! TELEGRAM_CHANNEL_ID=@channel sonar_digest
//! ```
//!
//! Intended to run unattended Monday through Friday from a scheduler; weekend
//! invocations exit 0 without side effects.

use clap::Parser;
use std::error::Error;
use tracing::{error, info, instrument};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod api;
mod cli;
mod config;
mod error;
mod format;
mod images;
mod query;
mod response;
mod run;
mod telegram;
mod utils;

use api::SearchClient;
use cli::Cli;
use config::Credentials;
use run::{RunOptions, RunStatus, run_daily};
use telegram::ChannelClient;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("sonar_digest starting up");

    let args = Cli::parse();

    // --- Credential validation, before any network activity ---
    let creds = Credentials::new(
        &args.perplexity_api_key,
        &args.telegram_bot_token,
        &args.telegram_channel_id,
    );
    let problems = creds.validate();
    if !problems.is_empty() {
        error!("Environment variable validation failed:");
        for problem in &problems {
            error!(error = %problem, "  - credential problem");
        }
        return Err("credential validation failed; check repository secrets".into());
    }
    info!("All environment variables validated successfully");

    // --- Build clients ---
    let mut search = SearchClient::new(&creds.api_key, args.max_retries)?;
    if let Some(ref base_url) = args.api_base_url {
        search = search.with_base_url(base_url);
    }
    let mut channel = ChannelClient::new(&creds.bot_token, &creds.channel_id)?;
    if let Some(ref api_root) = args.telegram_api_root {
        channel = channel.with_api_root(api_root);
    }

    let opts = RunOptions {
        model: args.model.clone(),
        max_tokens: args.max_tokens,
        budget: args.budget,
        image_limit: args.image_limit,
    };

    // --- Run the pipeline ---
    match run_daily(&search, &channel, &opts, chrono::Local::now()).await {
        Ok(RunStatus::WeekendSkip) => {
            info!("Today is a weekend; nothing to do");
        }
        Ok(RunStatus::Published(outcome)) => {
            info!(
                parts_sent = outcome.parts_sent,
                "Daily automation completed successfully"
            );
        }
        Err(e) => {
            error!(error = %e, "Daily automation failed");
            return Err(Box::new(e) as Box<dyn Error>);
        }
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );

    Ok(())
}
