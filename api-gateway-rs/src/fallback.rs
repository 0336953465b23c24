//! # Fallback Policy
//!
//! Deterministic degraded responses used when the backend produced no text.
//! Every function here is pure: no I/O, no clock, no randomness, and no way
//! to fail.

use serde_json::json;

use crate::models::{OperationRequest, SummarizeRequest, TranslateRequest};

/// Reason carried by the moderation placeholder
pub const MODERATION_FALLBACK_REASON: &str = "mock: LLM unavailable";

/// Marker prefixed to truncated summaries
pub const SUMMARY_FALLBACK_MARKER: &str = "[fallback summary]";

const SUMMARY_MIN_CHARS: i64 = 10;
const SUMMARY_MAX_CHARS: i64 = 200;
const CHARS_PER_WORD: i64 = 6;

/// Where the text handed to the rest of the pipeline came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionSource {
    Backend,
    Fallback,
}

impl CompletionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompletionSource::Backend => "backend",
            CompletionSource::Fallback => "fallback",
        }
    }
}

/// Degraded text for `request`
///
/// Moderation gets the same JSON shape the model is asked to produce, so the
/// output interpreter runs on both paths.
pub fn fallback(request: &OperationRequest) -> String {
    match request {
        OperationRequest::Moderate(_) => moderation_placeholder(),
        OperationRequest::Summarize(req) => summary_fallback(req),
        OperationRequest::Translate(req) => translation_fallback(req),
    }
}

pub fn moderation_placeholder() -> String {
    json!({
        "allowed": true,
        "reason": MODERATION_FALLBACK_REASON,
    })
    .to_string()
}

/// Number of characters kept by the summary fallback: `clamp(max_words * 6, 10, 200)`
///
/// Negative and oversized word counts land on the bounds.
pub fn summary_char_budget(max_words: i64) -> usize {
    max_words
        .saturating_mul(CHARS_PER_WORD)
        .clamp(SUMMARY_MIN_CHARS, SUMMARY_MAX_CHARS) as usize
}

pub fn summary_fallback(req: &SummarizeRequest) -> String {
    let budget = summary_char_budget(req.max_words);
    let truncated: String = req.text.chars().take(budget).collect();
    format!("{} {}", SUMMARY_FALLBACK_MARKER, truncated)
}

pub fn translation_fallback(req: &TranslateRequest) -> String {
    format!(
        "[fallback translation to {}] {}",
        req.target_language, req.text
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ModerateRequest, SummarizeMode};

    fn summarize(text: &str, max_words: i64) -> SummarizeRequest {
        SummarizeRequest {
            text: text.to_string(),
            mode: SummarizeMode::Auto,
            max_words,
            cpu_burn_ms: 0,
        }
    }

    #[test]
    fn test_char_budget_is_clamped() {
        assert_eq!(summary_char_budget(0), 10);
        assert_eq!(summary_char_budget(1), 10);
        assert_eq!(summary_char_budget(2), 12);
        assert_eq!(summary_char_budget(10), 60);
        assert_eq!(summary_char_budget(50), 200);
        assert_eq!(summary_char_budget(5_000_000_000), 200);
        assert_eq!(summary_char_budget(i64::MAX), 200);
        assert_eq!(summary_char_budget(-5), 10);
        assert_eq!(summary_char_budget(i64::MIN), 10);
    }

    #[test]
    fn test_summary_fallback_is_a_marked_prefix() {
        let text = "abcdefghijklmnopqrstuvwxyz".repeat(10);
        for max_words in [-5, 0, 3, 10, 34, 1_000] {
            let out = summary_fallback(&summarize(&text, max_words));
            let body = out
                .strip_prefix(SUMMARY_FALLBACK_MARKER)
                .and_then(|rest| rest.strip_prefix(' '))
                .expect("marker prefix");
            assert_eq!(body.chars().count(), summary_char_budget(max_words));
            assert!(text.starts_with(body));
            // deterministic
            assert_eq!(out, summary_fallback(&summarize(&text, max_words)));
        }
    }

    #[test]
    fn test_summary_fallback_short_and_multibyte_input() {
        assert_eq!(
            summary_fallback(&summarize("short", 10)),
            "[fallback summary] short"
        );

        let text = "é".repeat(30);
        let out = summary_fallback(&summarize(&text, 1));
        assert_eq!(out, format!("[fallback summary] {}", "é".repeat(10)));
    }

    #[test]
    fn test_translation_fallback_is_verbatim() {
        let req = TranslateRequest {
            text: "  Hello, world!\n".to_string(),
            target_language: "German".to_string(),
        };
        let out = fallback(&OperationRequest::Translate(req.clone()));
        assert!(out.contains(&req.text));
        assert!(out.contains("German"));
    }

    #[test]
    fn test_moderation_placeholder_shape() {
        let out = fallback(&OperationRequest::Moderate(ModerateRequest {
            text: "anything".to_string(),
        }));
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["allowed"], true);
        assert_eq!(value["reason"], MODERATION_FALLBACK_REASON);
    }
}
