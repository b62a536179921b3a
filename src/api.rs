//! Search API client with exponential backoff retry logic.
//!
//! [`SearchClient`] posts the daily query to an OpenAI-compatible search
//! endpoint and classifies every failure before deciding whether to retry:
//!
//! - HTTP 401 surfaces immediately as [`ApiError::Auth`], never retried.
//! - HTTP 429 (or rate-limit error text in the body) sleeps on an exponential
//!   schedule with jitter, then retries.
//! - Timeouts, connection failures, and 5xx retry after a flat short delay.
//! - Other 4xx and malformed bodies are fatal for the run.
//!
//! The backoff schedule is a pure function of the attempt number so it can be
//! tested without a network or real sleeps; the base delay is injectable for
//! the same reason.

use crate::error::ApiError;
use crate::query::QueryRequest;
use crate::response::{SearchResult, parse_search_response};
use rand::{Rng, rng};
use reqwest::StatusCode;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{error, info, instrument, warn};

/// Default endpoint for the hosted search API.
const DEFAULT_BASE_URL: &str = "https://api.perplexity.ai";

/// Per-request timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Client for the search API with retry-on-transient-failure semantics.
#[derive(Debug)]
pub struct SearchClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    max_retries: usize,
    base_delay: Duration,
}

impl SearchClient {
    /// Build a client with the default endpoint and a 1 second base delay.
    pub fn new(api_key: &str, max_retries: usize) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            http,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.to_string(),
            max_retries,
            base_delay: Duration::from_secs(1),
        })
    }

    /// Point the client at a different endpoint (staging, mock server).
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// Override the backoff base delay (tests use a few milliseconds).
    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    /// Fetch a digest, retrying transient failures up to the retry cap.
    ///
    /// The request payload is serialized fresh from the same `query` on every
    /// attempt and never mutated between retries.
    #[instrument(level = "info", skip_all)]
    pub async fn fetch(&self, query: &QueryRequest) -> Result<SearchResult, ApiError> {
        let total_t0 = Instant::now();
        let mut failures = 0usize;

        loop {
            let attempt_t0 = Instant::now();
            match self.attempt(query).await {
                Ok(result) => {
                    info!(
                        attempts = failures + 1,
                        elapsed_ms_total = total_t0.elapsed().as_millis() as u64,
                        "Search request succeeded"
                    );
                    return Ok(result);
                }
                Err(e) if !e.is_retryable() => {
                    error!(
                        elapsed_ms_attempt = attempt_t0.elapsed().as_millis() as u64,
                        error = %e,
                        "Search request failed with non-retryable error"
                    );
                    return Err(e);
                }
                Err(e) => {
                    failures += 1;
                    if failures > self.max_retries {
                        error!(
                            attempts = failures,
                            max = self.max_retries,
                            elapsed_ms_total = total_t0.elapsed().as_millis() as u64,
                            error = %e,
                            "Search request exhausted retries"
                        );
                        return Err(ApiError::RetriesExhausted {
                            attempts: failures,
                            last: Box::new(e),
                        });
                    }

                    let delay = if e.is_rate_limit() {
                        let jitter_ms = rng().random_range(0..=self.base_delay.as_millis() as u64);
                        backoff_delay(failures, self.base_delay) + Duration::from_millis(jitter_ms)
                    } else {
                        self.base_delay
                    };

                    warn!(
                        attempt = failures,
                        max = self.max_retries,
                        elapsed_ms_attempt = attempt_t0.elapsed().as_millis() as u64,
                        ?delay,
                        error = %e,
                        "Search request failed; backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }

    /// One request/response round trip, classified into [`ApiError`] variants.
    async fn attempt(&self, query: &QueryRequest) -> Result<SearchResult, ApiError> {
        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(query)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            let raw: serde_json::Value = response.json().await.map_err(|e| ApiError::Malformed {
                reason: format!("response body is not JSON: {e}"),
            })?;
            parse_search_response(&raw)
        } else if status == StatusCode::UNAUTHORIZED {
            Err(ApiError::Auth)
        } else if status == StatusCode::TOO_MANY_REQUESTS {
            Err(ApiError::RateLimited)
        } else {
            let body = response.text().await.unwrap_or_default();
            warn!(
                status = status.as_u16(),
                body = %crate::utils::truncate_for_log(&body, 300),
                "API error response"
            );
            if body.to_ascii_lowercase().contains("rate limit") {
                Err(ApiError::RateLimited)
            } else {
                Err(ApiError::Status {
                    status: status.as_u16(),
                })
            }
        }
    }
}

/// Backoff delay before retry number `failures` after a rate-limit signal.
///
/// `base * 2^(failures-1)`, shift-capped so the delay tops out at 32x base
/// (30-ish seconds at the default 1 second base).
pub fn backoff_delay(failures: usize, base: Duration) -> Duration {
    base.saturating_mul(1u32 << (failures.saturating_sub(1)).min(5))
}
