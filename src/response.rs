//! Search response parsing.
//!
//! Different versions of the search API surface images in different places, so
//! parsing does not branch on a schema version. Instead an ordered list of
//! extraction rules each scan a known location, and the results are merged with
//! first-seen-order dedup. The answer text is mandatory; everything else is
//! optional and defaults to empty.
//!
//! # Image locations scanned
//!
//! 1. top-level `images` — items are bare URL strings or `{ "url": ... }`
//! 2. `choices[0].images` — same item shapes
//! 3. `provider_metadata.images` — items carry `imageUrl` or `url`

use crate::error::ApiError;
use itertools::Itertools;
use serde_json::{Map, Value};
use tracing::debug;

/// A normalized search result, immutable once built.
#[derive(Debug, Clone)]
pub struct SearchResult {
    /// The answer text from the first choice. Never empty by construction.
    pub text: String,
    /// Source citations in response order; empty when absent.
    pub citations: Vec<String>,
    /// Image URLs merged from all known locations, deduped, first-seen order.
    pub images: Vec<String>,
    /// Model name echoed by the API, when present.
    pub model: Option<String>,
    /// Token usage accounting, when present.
    pub usage: Map<String, Value>,
}

/// Parse a raw API payload into a [`SearchResult`].
///
/// Fails with [`ApiError::Malformed`] when `choices[0].message.content` is
/// structurally absent; a response without answer text must abort the run
/// rather than publish something empty.
pub fn parse_search_response(raw: &Value) -> Result<SearchResult, ApiError> {
    let text = raw
        .pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .ok_or_else(|| ApiError::Malformed {
            reason: "missing choices[0].message.content".to_string(),
        })?
        .to_string();

    let citations: Vec<String> = raw
        .get("citations")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    let images = extract_image_urls(raw);
    debug!(
        citations = citations.len(),
        images = images.len(),
        "Parsed search response"
    );

    Ok(SearchResult {
        text,
        citations,
        images,
        model: raw.get("model").and_then(Value::as_str).map(str::to_string),
        usage: raw
            .get("usage")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default(),
    })
}

/// Scan every known image location and merge the hits.
fn extract_image_urls(raw: &Value) -> Vec<String> {
    let locations = [
        raw.get("images"),
        raw.pointer("/choices/0/images"),
        raw.pointer("/provider_metadata/images"),
    ];

    locations
        .into_iter()
        .flatten()
        .filter_map(Value::as_array)
        .flatten()
        .filter_map(image_item_url)
        .unique()
        .collect()
}

/// Pull the URL out of one image-list item, whatever its shape.
fn image_item_url(item: &Value) -> Option<String> {
    match item {
        Value::String(url) => Some(url.clone()),
        Value::Object(obj) => obj
            .get("url")
            .or_else(|| obj.get("imageUrl"))
            .and_then(Value::as_str)
            .map(str::to_string),
        _ => None,
    }
}
