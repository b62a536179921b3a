//! Typed errors for configuration and API interaction.
//!
//! Two families: [`ConfigError`] covers precondition failures detected before
//! any network activity, and [`ApiError`] covers everything the search API can
//! do to us. Delivery failures are not an error type; the publisher reports
//! them through `DeliveryOutcome` so that every part of a split message is
//! still attempted.

use thiserror::Error;

/// A problem with one of the required environment secrets.
///
/// These are collected (not short-circuited) so a misconfigured deployment
/// reports every broken variable in a single run.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The variable is unset or empty after trimming.
    #[error("{var} is missing or empty")]
    Missing { var: &'static str },

    /// The variable is present but its shape looks wrong.
    #[error("{var} format appears incorrect ({hint})")]
    Malformed { var: &'static str, hint: &'static str },
}

/// Errors from the search API call or from decoding its response.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP 401: credentials rejected. Never retried.
    #[error("search API rejected credentials (HTTP 401)")]
    Auth,

    /// HTTP 429 or provider rate-limit error text. Retried with exponential backoff.
    #[error("search API rate limited (HTTP 429)")]
    RateLimited,

    /// Any other non-success HTTP status. 5xx is retryable, remaining 4xx is not.
    #[error("search API returned HTTP {status}")]
    Status { status: u16 },

    /// Transport-level failure: timeout, connect error, TLS, etc. Retryable.
    #[error("search API request failed: {0}")]
    Network(#[from] reqwest::Error),

    /// The response decoded but lacks the mandatory content field, or did not
    /// decode at all. Fatal for the run; nothing is posted to the channel.
    #[error("malformed search response: {reason}")]
    Malformed { reason: String },

    /// The retry budget ran out. Wraps the error from the final attempt.
    #[error("search API failed after {attempts} attempts: {last}")]
    RetriesExhausted {
        attempts: usize,
        #[source]
        last: Box<ApiError>,
    },
}

impl ApiError {
    /// Whether a retry could plausibly succeed.
    ///
    /// Auth failures and client-side 4xx (other than 429) are permanent;
    /// malformed responses are a content problem a retry will not fix.
    pub fn is_retryable(&self) -> bool {
        match self {
            ApiError::RateLimited => true,
            ApiError::Status { status } => *status >= 500,
            ApiError::Network(_) => true,
            ApiError::Auth | ApiError::Malformed { .. } | ApiError::RetriesExhausted { .. } => {
                false
            }
        }
    }

    /// Whether this failure is a rate-limit signal (gets the exponential
    /// backoff schedule rather than the flat retry delay).
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, ApiError::RateLimited)
    }
}
