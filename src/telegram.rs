//! Telegram channel delivery: photo-vs-text decision, message splitting, pacing.
//!
//! A digest with exactly one image goes out as a photo with the full message as
//! caption (capped at Telegram's 1024-char caption limit). Zero images means a
//! plain text message. Multiple images also fall back to text only — media
//! group batching is a known limitation, logged rather than silently dropped.
//!
//! Messages longer than the single-message limit are split greedily on
//! paragraph boundaries and sent in order with a pacing delay between parts.
//! A failed part does not stop the remaining parts from being attempted; the
//! overall outcome reports failure if any part failed.

use crate::format::FormattedMessage;
use crate::images::DownloadedImage;
use serde_json::json;
use std::error::Error;
use std::path::Path;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, info, instrument, warn};

/// Telegram allows ~4096 chars per message; 4000 leaves a safety margin.
pub const MAX_MESSAGE_LEN: usize = 4000;

/// Telegram's photo caption limit.
pub const MAX_CAPTION_LEN: usize = 1024;

/// Terminal result of a publish: whether every part landed, and how many did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryOutcome {
    pub success: bool,
    pub parts_sent: usize,
}

/// Client for posting to one Telegram channel through the Bot API.
#[derive(Debug)]
pub struct ChannelClient {
    http: reqwest::Client,
    api_root: String,
    bot_token: String,
    chat_id: String,
    part_delay: Duration,
}

impl ChannelClient {
    pub fn new(bot_token: &str, chat_id: &str) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            http,
            api_root: "https://api.telegram.org".to_string(),
            bot_token: bot_token.to_string(),
            chat_id: chat_id.to_string(),
            part_delay: Duration::from_secs(2),
        })
    }

    /// Point the client at a different Bot API root (tests, local proxies).
    pub fn with_api_root(mut self, api_root: &str) -> Self {
        self.api_root = api_root.trim_end_matches('/').to_string();
        self
    }

    /// Override the inter-part pacing delay (tests use a few milliseconds).
    pub fn with_part_delay(mut self, part_delay: Duration) -> Self {
        self.part_delay = part_delay;
        self
    }

    fn endpoint(&self, api_method: &str) -> String {
        format!("{}/bot{}/{}", self.api_root, self.bot_token, api_method)
    }

    /// Deliver a formatted digest, deciding between photo and text.
    #[instrument(level = "info", skip_all, fields(images = images.len()))]
    pub async fn publish(
        &self,
        message: &FormattedMessage,
        images: &[DownloadedImage],
    ) -> DeliveryOutcome {
        if images.len() == 1 {
            let image = &images[0];
            match self.send_photo(&image.local_path, &message.body).await {
                Ok(()) => {
                    info!(source_url = %image.source_url, "Photo sent to channel");
                    return DeliveryOutcome {
                        success: true,
                        parts_sent: 1,
                    };
                }
                Err(e) => {
                    error!(error = %e, "Failed to send photo");
                    return DeliveryOutcome {
                        success: false,
                        parts_sent: 0,
                    };
                }
            }
        }

        if images.len() > 1 {
            // Media group batching is unsupported; the digest still goes out as text.
            warn!(
                count = images.len(),
                "Multiple images available; sending text only"
            );
        }
        self.send_text(&message.body).await
    }

    /// Send text, splitting into ordered parts when over the message limit.
    ///
    /// Every part is attempted even after a failure; the outcome is a failure
    /// if any part did not land.
    pub async fn send_text(&self, text: &str) -> DeliveryOutcome {
        let parts = split_message(text, MAX_MESSAGE_LEN);
        let total = parts.len();
        let mut sent = 0usize;

        for (i, part) in parts.iter().enumerate() {
            match self.send_message_part(part).await {
                Ok(()) => {
                    info!(part = i + 1, total, "Message part sent");
                    sent += 1;
                }
                Err(e) => {
                    error!(part = i + 1, total, error = %e, "Failed to send message part");
                }
            }
            if i + 1 < total {
                sleep(self.part_delay).await;
            }
        }

        DeliveryOutcome {
            success: sent == total,
            parts_sent: sent,
        }
    }

    async fn send_message_part(&self, text: &str) -> Result<(), Box<dyn Error + Send + Sync>> {
        let payload = json!({
            "chat_id": self.chat_id,
            "text": text,
            "parse_mode": "Markdown",
            "disable_web_page_preview": true,
        });
        self.http
            .post(self.endpoint("sendMessage"))
            .json(&payload)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    /// Send one photo with the message as caption, capped at the caption limit.
    async fn send_photo(
        &self,
        photo_path: &Path,
        caption: &str,
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        let bytes = tokio::fs::read(photo_path).await?;
        let file_name = photo_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("photo.jpg")
            .to_string();
        let caption: String = caption.chars().take(MAX_CAPTION_LEN).collect();

        let form = reqwest::multipart::Form::new()
            .text("chat_id", self.chat_id.clone())
            .text("caption", caption)
            .text("parse_mode", "Markdown")
            .part(
                "photo",
                reqwest::multipart::Part::bytes(bytes).file_name(file_name),
            );

        self.http
            .post(self.endpoint("sendPhoto"))
            .multipart(form)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

/// Split text into parts no longer than `max_len` characters.
///
/// Paragraphs (double line breaks) are packed greedily in original order. A
/// single paragraph longer than the limit is chunked at character boundaries
/// so no content is lost.
pub fn split_message(text: &str, max_len: usize) -> Vec<String> {
    if text.chars().count() <= max_len {
        return vec![text.to_string()];
    }

    let mut parts: Vec<String> = Vec::new();
    let mut current = String::new();

    for paragraph in text.split("\n\n") {
        let para_len = paragraph.chars().count();

        if para_len > max_len {
            if !current.trim().is_empty() {
                parts.push(current.trim_end().to_string());
            }
            current.clear();
            let mut chunks = chunk_chars(paragraph, max_len);
            if let Some(last) = chunks.pop() {
                parts.extend(chunks);
                current = format!("{last}\n\n");
            }
            continue;
        }

        if current.chars().count() + para_len <= max_len {
            current.push_str(paragraph);
            current.push_str("\n\n");
        } else {
            parts.push(current.trim_end().to_string());
            current = format!("{paragraph}\n\n");
        }
    }

    if !current.trim().is_empty() {
        parts.push(current.trim_end().to_string());
    }
    parts
}

/// Cut text into consecutive chunks of at most `max_len` characters.
fn chunk_chars(text: &str, max_len: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut count = 0usize;
    for c in text.chars() {
        current.push(c);
        count += 1;
        if count == max_len {
            chunks.push(std::mem::take(&mut current));
            count = 0;
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::FormattedMessage;
    use std::io::Write;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn msg(body: &str) -> FormattedMessage {
        FormattedMessage {
            body: body.to_string(),
            chars_no_whitespace: body.chars().filter(|c| !c.is_whitespace()).count(),
        }
    }

    fn client_for(server: &MockServer) -> ChannelClient {
        ChannelClient::new("123:TEST", "@channel")
            .unwrap()
            .with_api_root(&server.uri())
            .with_part_delay(Duration::from_millis(1))
    }

    #[test]
    fn short_message_is_a_single_part() {
        assert_eq!(split_message("hello", 4000), vec!["hello"]);
    }

    #[test]
    fn boundary_free_message_is_chunked_without_losing_content() {
        let text = "x".repeat(9000);
        let parts = split_message(&text, MAX_MESSAGE_LEN);
        assert!(parts.iter().all(|p| p.chars().count() <= MAX_MESSAGE_LEN));
        assert_eq!(parts.concat(), text);
        assert_eq!(parts.len(), 3);
    }

    #[test]
    fn paragraphs_pack_greedily_in_order() {
        let a = "a".repeat(1500);
        let b = "b".repeat(1500);
        let c = "c".repeat(1500);
        let text = format!("{a}\n\n{b}\n\n{c}");
        let parts = split_message(&text, 4000);
        assert_eq!(parts.len(), 2);
        // First two paragraphs fit together, the third spills over.
        assert!(parts[0].starts_with(&a));
        assert!(parts[0].ends_with(&b));
        assert_eq!(parts[1], c);
        assert!(parts.iter().all(|p| p.chars().count() <= 4000));
    }

    #[tokio::test]
    async fn one_image_publishes_as_photo() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/bot123:TEST/sendPhoto"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/bot123:TEST/sendMessage"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let mut photo = tempfile::NamedTempFile::new().unwrap();
        photo.write_all(b"fake jpeg bytes").unwrap();
        let images = vec![DownloadedImage {
            local_path: photo.path().to_path_buf(),
            source_url: "https://img.example/1.jpg".to_string(),
        }];

        let outcome = client_for(&server).publish(&msg("Daily digest."), &images).await;
        assert_eq!(
            outcome,
            DeliveryOutcome {
                success: true,
                parts_sent: 1
            }
        );
    }

    #[tokio::test]
    async fn multiple_images_fall_back_to_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/bot123:TEST/sendMessage"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/bot123:TEST/sendPhoto"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let images: Vec<DownloadedImage> = (0..2)
            .map(|i| DownloadedImage {
                local_path: std::env::temp_dir().join(format!("unused-{i}.jpg")),
                source_url: format!("https://img.example/{i}.jpg"),
            })
            .collect();

        let outcome = client_for(&server).publish(&msg("Daily digest."), &images).await;
        assert!(outcome.success);
        assert_eq!(outcome.parts_sent, 1);
    }

    #[tokio::test]
    async fn zero_images_publishes_as_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/bot123:TEST/sendMessage"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
            .expect(1)
            .mount(&server)
            .await;

        let outcome = client_for(&server).publish(&msg("Daily digest."), &[]).await;
        assert!(outcome.success);
    }

    #[tokio::test]
    async fn all_parts_attempted_even_after_a_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/bot123:TEST/sendMessage"))
            .respond_with(ResponseTemplate::new(500))
            .expect(3)
            .mount(&server)
            .await;

        let text = "y".repeat(9000);
        let outcome = client_for(&server).send_text(&text).await;
        assert!(!outcome.success);
        assert_eq!(outcome.parts_sent, 0);
    }
}
