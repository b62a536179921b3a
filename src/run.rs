//! One end-to-end daily run: gate, fetch, format, download, publish, cleanup.
//!
//! The runner owns the order of operations and the two hard guarantees around
//! them: nothing touches the network on a weekend, and scratch files are
//! removed on every exit path. A response that parses but lacks the answer
//! text aborts the run without posting anything to the channel — publishing a
//! guessed or apologetic message would be worse than silence.

use crate::api::SearchClient;
use crate::error::ApiError;
use crate::format::{build_footer, build_header, normalize};
use crate::images::{cleanup_scratch, fetch_images};
use crate::query::{DEFAULT_MODEL, QueryRequest};
use crate::telegram::{ChannelClient, DeliveryOutcome};
use chrono::{DateTime, Datelike, Local, Weekday};
use std::time::Duration;
use thiserror::Error;
use tracing::{info, instrument};

/// Fatal outcomes of a run, mapped to a non-zero process exit by `main`.
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("failed to deliver digest to channel ({parts_sent} parts sent)")]
    Delivery { parts_sent: usize },

    #[error("failed to build HTTP client: {0}")]
    Http(#[from] reqwest::Error),
}

/// How a run ended when it did not fail.
#[derive(Debug, PartialEq, Eq)]
pub enum RunStatus {
    /// Saturday/Sunday: no side effects at all.
    WeekendSkip,
    /// The digest was delivered.
    Published(DeliveryOutcome),
}

/// Tunables for one run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub model: String,
    pub max_tokens: u32,
    /// Content budget counted in non-whitespace characters.
    pub budget: usize,
    /// How many image URLs are attempted at most.
    pub image_limit: usize,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            max_tokens: 1000,
            budget: 1500,
            image_limit: 5,
        }
    }
}

/// Execute the daily digest pipeline.
///
/// `now` is passed in rather than read from the clock so the weekday gate and
/// the dated header are testable.
#[instrument(level = "info", skip_all, fields(weekday = %now.weekday()))]
pub async fn run_daily(
    search: &SearchClient,
    channel: &ChannelClient,
    opts: &RunOptions,
    now: DateTime<Local>,
) -> Result<RunStatus, RunError> {
    let weekday = now.weekday();
    if matches!(weekday, Weekday::Sat | Weekday::Sun) {
        info!("Weekend; skipping run");
        return Ok(RunStatus::WeekendSkip);
    }

    let query = QueryRequest::for_weekday(weekday, &opts.model, opts.max_tokens);
    info!(topic = %query.messages[0].content, "Fetching daily digest");
    let result = search.fetch(&query).await?;
    info!(
        citations = result.citations.len(),
        images = result.images.len(),
        model = result.model.as_deref().unwrap_or("unknown"),
        "Received search result"
    );

    let header = build_header(now);
    let footer = build_footer(&result.citations);
    let message = normalize(&result.text, opts.budget, &header, &footer);
    info!(
        chars_no_whitespace = message.chars_no_whitespace,
        budget = opts.budget,
        "Formatted digest"
    );

    let image_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .build()?;
    let images = fetch_images(&image_client, &result.images, opts.image_limit).await;

    let outcome = channel.publish(&message, &images).await;

    // Publishing reports failure through the outcome rather than an early
    // return, so this cleanup covers every path on which scratch files exist.
    cleanup_scratch(&images).await;

    if outcome.success {
        info!(parts_sent = outcome.parts_sent, "Daily digest published");
        Ok(RunStatus::Published(outcome))
    } else {
        Err(RunError::Delivery {
            parts_sent: outcome.parts_sent,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;
    use wiremock::matchers::{method, path, path_regex};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn search_client(server: &MockServer) -> SearchClient {
        SearchClient::new("pplx-test", 1)
            .unwrap()
            .with_base_url(&server.uri())
            .with_base_delay(Duration::from_millis(1))
    }

    fn channel_client(server: &MockServer) -> ChannelClient {
        ChannelClient::new("123:TEST", "@channel")
            .unwrap()
            .with_api_root(&server.uri())
            .with_part_delay(Duration::from_millis(1))
    }

    #[tokio::test]
    async fn weekend_run_makes_zero_network_calls() {
        let server = MockServer::start().await;
        Mock::given(path_regex(".*"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let saturday = Local.with_ymd_and_hms(2026, 8, 29, 19, 0, 0).unwrap();
        let status = run_daily(
            &search_client(&server),
            &channel_client(&server),
            &RunOptions::default(),
            saturday,
        )
        .await
        .unwrap();

        assert_eq!(status, RunStatus::WeekendSkip);
    }

    #[tokio::test]
    async fn full_pipeline_sends_one_photo_with_caption() {
        let server = MockServer::start().await;

        let image_url = format!("{}/1.jpg", server.uri());
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"content": "Bitcoin rose today. Ethereum also rose."}}],
                "citations": ["https://example.com/a"],
                "images": [image_url],
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/1.jpg"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(&b"jpeg bytes"[..], "image/jpeg"))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/bot123:TEST/sendPhoto"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/bot123:TEST/sendMessage"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let monday = Local.with_ymd_and_hms(2026, 8, 31, 19, 0, 0).unwrap();
        let status = run_daily(
            &search_client(&server),
            &channel_client(&server),
            &RunOptions::default(),
            monday,
        )
        .await
        .unwrap();

        assert_eq!(
            status,
            RunStatus::Published(DeliveryOutcome {
                success: true,
                parts_sent: 1
            })
        );

        // Both sentences survive untouched (well under budget) and ride along
        // as the photo caption.
        let requests = server.received_requests().await.unwrap();
        let photo = requests
            .iter()
            .find(|r| r.url.path().ends_with("/sendPhoto"))
            .expect("sendPhoto request");
        let body = String::from_utf8_lossy(&photo.body);
        assert!(body.contains("Bitcoin rose today. Ethereum also rose."));
        assert!(body.contains("https://example.com/a"));
    }

    #[tokio::test]
    async fn parse_failure_aborts_without_posting() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(path_regex("/bot.*"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let tuesday = Local.with_ymd_and_hms(2026, 9, 1, 19, 0, 0).unwrap();
        let err = run_daily(
            &search_client(&server),
            &channel_client(&server),
            &RunOptions::default(),
            tuesday,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, RunError::Api(ApiError::Malformed { .. })));
    }

    #[tokio::test]
    async fn delivery_failure_is_a_run_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"content": "Busy news day."}}],
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/bot123:TEST/sendMessage"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let friday = Local.with_ymd_and_hms(2026, 9, 4, 19, 0, 0).unwrap();
        let err = run_daily(
            &search_client(&server),
            &channel_client(&server),
            &RunOptions::default(),
            friday,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, RunError::Delivery { parts_sent: 0 }));
    }
}
