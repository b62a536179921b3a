//! Command-line interface definitions for the digest bot.
//!
//! Secrets are read from the environment (the flags exist mostly so the help
//! text documents them); the remaining options tune the pipeline and default
//! to the production values.

use clap::Parser;

/// Command-line arguments for the daily digest run.
///
/// # Examples
///
/// ```sh
/// # Normal scheduled invocation; secrets come from the environment
/// PERPLEXITY_API_KEY=pplx-... TELEGRAM_BOT_TOKEN=123:... \
/// TELEGRAM_CHANNEL_ID=@channel sonar_digest
///
/// # Smaller content budget, no images
/// sonar_digest --budget 900 --image-limit 0
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Search API key
    #[arg(long, env = "PERPLEXITY_API_KEY", hide_env_values = true, default_value = "")]
    pub perplexity_api_key: String,

    /// Telegram bot token
    #[arg(long, env = "TELEGRAM_BOT_TOKEN", hide_env_values = true, default_value = "")]
    pub telegram_bot_token: String,

    /// Telegram channel identifier (@name or -100... numeric id)
    #[arg(long, env = "TELEGRAM_CHANNEL_ID", default_value = "")]
    pub telegram_channel_id: String,

    /// Search model to query
    #[arg(long, default_value = crate::query::DEFAULT_MODEL)]
    pub model: String,

    /// Max completion tokens requested from the search API
    #[arg(long, default_value_t = 1000)]
    pub max_tokens: u32,

    /// Content budget, counted in non-whitespace characters
    #[arg(long, default_value_t = 1500)]
    pub budget: usize,

    /// Maximum number of retries for transient API failures
    #[arg(long, default_value_t = 3)]
    pub max_retries: usize,

    /// Maximum number of image URLs to download
    #[arg(long, default_value_t = 5)]
    pub image_limit: usize,

    /// Override the search API endpoint (staging/testing)
    #[arg(long, hide = true)]
    pub api_base_url: Option<String>,

    /// Override the Telegram Bot API root (staging/testing)
    #[arg(long, hide = true)]
    pub telegram_api_root: Option<String>,
}
