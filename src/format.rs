//! Text normalization against a whitespace-free character budget.
//!
//! The channel budget counts only non-whitespace characters, so all length
//! arithmetic here goes through [`whitespace_free_len`]. Normalization
//! collapses the answer into one flowing paragraph, strips markup markers,
//! and truncates at a sentence boundary when the budget is exceeded.
//!
//! The final header + body + footer is an approximation of the budget, not an
//! exact guarantee: the sentence-boundary trim can only make the truncated
//! chunk shorter than the target, never longer.

use chrono::{DateTime, Local};

/// Markup markers stripped from the answer text before budgeting.
/// Longer markers first so `**` is removed before a lone `*` would be.
const MARKUP_MARKERS: &[&str] = &["###", "##", "**", "__", "#", "`"];

/// How many citations make it into the footer.
const MAX_FOOTER_CITATIONS: usize = 5;

/// A message body ready for delivery, with its budget-relevant length.
#[derive(Debug, Clone)]
pub struct FormattedMessage {
    /// header + normalized text + footer.
    pub body: String,
    /// Whitespace-free character count of `body`.
    pub chars_no_whitespace: usize,
}

/// Count characters ignoring all whitespace.
pub fn whitespace_free_len(s: &str) -> usize {
    s.chars().filter(|c| !c.is_whitespace()).count()
}

/// Normalize `raw` into a single budgeted message wrapped in `header`/`footer`.
///
/// Steps: collapse multi-line structure into one paragraph, strip markup
/// markers, then if the whitespace-free length exceeds the budget net of
/// header and footer, truncate with a character walk and drop any trailing
/// partial sentence. Empty input yields header + footer unchanged.
pub fn normalize(raw: &str, budget: usize, header: &str, footer: &str) -> FormattedMessage {
    let mut text = clean_text(raw);

    let available =
        budget.saturating_sub(whitespace_free_len(header) + whitespace_free_len(footer));

    if whitespace_free_len(&text) > available {
        text = truncate_to_budget(&text, available);
        text = drop_partial_sentence(&text);
    }

    let body = format!("{header}{text}{footer}");
    let chars_no_whitespace = whitespace_free_len(&body);
    FormattedMessage {
        body,
        chars_no_whitespace,
    }
}

/// Strip markup markers per line, then join non-blank lines with single spaces.
fn clean_text(raw: &str) -> String {
    raw.lines()
        .map(|line| {
            let mut line = line.to_string();
            for marker in MARKUP_MARKERS {
                line = line.replace(marker, "");
            }
            line.trim().to_string()
        })
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Walk the text, keeping characters until the whitespace-free count of the
/// accumulated output reaches `available`. May stop mid-sentence.
fn truncate_to_budget(text: &str, available: usize) -> String {
    let mut out = String::new();
    let mut kept = 0usize;
    for c in text.chars() {
        if kept >= available {
            break;
        }
        out.push(c);
        if !c.is_whitespace() {
            kept += 1;
        }
    }
    out
}

/// Drop a trailing partial sentence when a period exists to cut at.
fn drop_partial_sentence(text: &str) -> String {
    if !text.contains('.') {
        return text.to_string();
    }
    let mut sentences: Vec<&str> = text.split('.').collect();
    sentences.pop();
    let mut trimmed = sentences.join(".");
    trimmed.push('.');
    trimmed
}

/// Build the digest header with the current timestamp.
pub fn build_header(now: DateTime<Local>) -> String {
    format!(
        "📊 **Daily Research Update**\n🕒 *{}*\n\n",
        now.format("%B %d, %Y at %H:%M UTC")
    )
}

/// Build the footer: up to five numbered citations plus the automation tagline.
pub fn build_footer(citations: &[String]) -> String {
    let mut footer = String::new();
    if !citations.is_empty() {
        footer.push_str("\n\n📚 **Sources:**\n");
        for (i, citation) in citations.iter().take(MAX_FOOTER_CITATIONS).enumerate() {
            footer.push_str(&format!("{}. {}\n", i + 1, citation));
        }
    }
    footer.push_str("\n\n🤖 *Automated via Perplexity AI*");
    footer
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whitespace_free_len_ignores_all_whitespace() {
        assert_eq!(whitespace_free_len("a b\tc\nd"), 4);
        assert_eq!(whitespace_free_len("   "), 0);
        assert_eq!(whitespace_free_len(""), 0);
    }

    #[test]
    fn short_text_passes_through_unmodified() {
        let msg = normalize("Bitcoin rose today. Ethereum also rose.", 1500, "", "");
        assert_eq!(msg.body, "Bitcoin rose today. Ethereum also rose.");
        assert_eq!(msg.chars_no_whitespace, whitespace_free_len(&msg.body));
    }

    #[test]
    fn multi_line_input_collapses_to_one_paragraph() {
        let msg = normalize("First line.\n\n\nSecond line.\nThird.", 1500, "", "");
        assert_eq!(msg.body, "First line. Second line. Third.");
    }

    #[test]
    fn markup_markers_are_stripped() {
        let msg = normalize("## Heading\n**bold** and __emphasis__ and `code`.", 1500, "", "");
        assert_eq!(msg.body, "Heading bold and emphasis and code.");
    }

    #[test]
    fn over_budget_text_is_cut_within_budget() {
        // 40 sentences of ~20 non-whitespace chars each, budget 100.
        let raw = "This sentence pads. ".repeat(40);
        let budget = 100;
        let msg = normalize(&raw, budget, "", "");
        assert!(whitespace_free_len(&msg.body) <= budget);
        assert!(msg.body.ends_with('.'), "must not end mid-sentence: {:?}", msg.body);
    }

    #[test]
    fn truncation_cuts_at_sentence_boundary() {
        let raw = "Alpha beta gamma. Delta epsilon zeta eta theta iota kappa.";
        // Budget large enough for the first sentence plus part of the second.
        let msg = normalize(raw, 20, "", "");
        assert_eq!(msg.body, "Alpha beta gamma.");
    }

    #[test]
    fn truncation_without_period_keeps_raw_cut() {
        let raw = "abcdefghij klmnopqrst uvwxyz";
        let msg = normalize(raw, 10, "", "");
        assert_eq!(whitespace_free_len(&msg.body), 10);
        assert_eq!(msg.body, "abcdefghij");
    }

    #[test]
    fn header_footer_count_against_budget() {
        let header = "HEAD ";
        let footer = " FOOT";
        // header+footer consume 8 of 20; only 12 remain for the body.
        let raw = "one two three. four five six seven eight nine.";
        let msg = normalize(raw, 20, header, footer);
        assert!(msg.body.starts_with(header));
        assert!(msg.body.ends_with(footer));
        let inner = &msg.body[header.len()..msg.body.len() - footer.len()];
        assert_eq!(inner, "one two three.");
    }

    #[test]
    fn empty_text_yields_header_and_footer_only() {
        let msg = normalize("", 1500, "H", "F");
        assert_eq!(msg.body, "HF");

        let msg = normalize(" \n \n ", 1500, "H", "F");
        assert_eq!(msg.body, "HF");
    }

    #[test]
    fn footer_caps_citations_at_five() {
        let citations: Vec<String> = (1..=8).map(|i| format!("https://s{i}.example")).collect();
        let footer = build_footer(&citations);
        assert!(footer.contains("5. https://s5.example"));
        assert!(!footer.contains("s6.example"));
    }

    #[test]
    fn footer_without_citations_is_just_the_tagline() {
        let footer = build_footer(&[]);
        assert!(!footer.contains("Sources"));
        assert!(footer.contains("Automated"));
    }

    #[test]
    fn header_contains_formatted_date() {
        use chrono::TimeZone;
        let now = Local.with_ymd_and_hms(2026, 3, 2, 19, 0, 0).unwrap();
        let header = build_header(now);
        assert!(header.contains("March 02, 2026"));
        assert!(header.contains("Daily Research Update"));
    }
}
