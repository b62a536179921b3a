//! Credential validation performed before any network activity.
//!
//! All three secrets are checked in one pass and every problem is reported,
//! so a broken deployment surfaces its whole configuration state in a single
//! failed run instead of one variable at a time.

use crate::error::ConfigError;

/// The three secrets a run needs.
#[derive(Debug, Clone)]
pub struct Credentials {
    /// Search API key (expected to start with `pplx-`).
    pub api_key: String,
    /// Telegram bot token (expected to contain a `:` separator).
    pub bot_token: String,
    /// Telegram channel identifier (expected to start with `@` or `-100`).
    pub channel_id: String,
}

impl Credentials {
    pub fn new(api_key: &str, bot_token: &str, channel_id: &str) -> Self {
        Self {
            api_key: api_key.trim().to_string(),
            bot_token: bot_token.trim().to_string(),
            channel_id: channel_id.trim().to_string(),
        }
    }

    /// Check presence and shape of every secret.
    ///
    /// Returns every problem found; an empty vector means the credentials are
    /// usable. Shape checks are heuristics against pasting the wrong secret
    /// into the wrong variable, not proofs of validity.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut problems = Vec::new();

        if self.api_key.is_empty() {
            problems.push(ConfigError::Missing {
                var: "PERPLEXITY_API_KEY",
            });
        } else if !self.api_key.starts_with("pplx-") {
            problems.push(ConfigError::Malformed {
                var: "PERPLEXITY_API_KEY",
                hint: "should start with 'pplx-'",
            });
        }

        if self.bot_token.is_empty() {
            problems.push(ConfigError::Missing {
                var: "TELEGRAM_BOT_TOKEN",
            });
        } else if !self.bot_token.contains(':') {
            problems.push(ConfigError::Malformed {
                var: "TELEGRAM_BOT_TOKEN",
                hint: "should contain ':'",
            });
        }

        if self.channel_id.is_empty() {
            problems.push(ConfigError::Missing {
                var: "TELEGRAM_CHANNEL_ID",
            });
        } else if !(self.channel_id.starts_with('@') || self.channel_id.starts_with("-100")) {
            problems.push(ConfigError::Malformed {
                var: "TELEGRAM_CHANNEL_ID",
                hint: "should start with '@' or '-100'",
            });
        }

        problems
    }
}
