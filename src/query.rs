//! Outbound query construction.
//!
//! One [`QueryRequest`] is built per run from the current weekday. Each
//! weekday carries its own editorial angle (tech on Monday, funding on
//! Tuesday, ...) with a generic fallback for anything else.

use chrono::Weekday;
use serde::Serialize;

/// Default model for the search API.
pub const DEFAULT_MODEL: &str = "llama-3.1-sonar-small-128k-online";

/// A single chat message in the request payload.
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: &'static str,
    pub content: String,
}

/// The full request payload for the search API's chat completions endpoint.
///
/// Built once per run and never mutated afterwards; the retry loop reuses the
/// same payload on every attempt.
#[derive(Debug, Clone, Serialize)]
pub struct QueryRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    pub temperature: f32,
    pub return_citations: bool,
    pub return_images: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_recency_filter: Option<String>,
}

impl QueryRequest {
    /// Build the digest query for a given weekday.
    pub fn for_weekday(weekday: Weekday, model: &str, max_tokens: u32) -> Self {
        Self {
            model: model.to_string(),
            messages: vec![ChatMessage {
                role: "user",
                content: daily_query(weekday).to_string(),
            }],
            max_tokens,
            temperature: 0.2,
            return_citations: true,
            return_images: true,
            search_recency_filter: Some("day".to_string()),
        }
    }
}

/// Topic prompt for each weekday, with a generic fallback.
pub fn daily_query(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => {
            "What are the most significant tech and AI developments this week? \
             Include recent breakthroughs, product launches, and industry news."
        }
        Weekday::Tue => {
            "What are the latest startup funding rounds, IPOs, and major business news today?"
        }
        Weekday::Wed => {
            "What are the current market trends, economic indicators, and financial news \
             affecting global markets?"
        }
        Weekday::Thu => {
            "What are the recent scientific discoveries, research breakthroughs, and \
             medical advances?"
        }
        Weekday::Fri => {
            "What are today's most important global news events, political developments, \
             and social trends?"
        }
        _ => {
            "What are the most important developments and news today across technology, \
             business, and current events?"
        }
    }
}
