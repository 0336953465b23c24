//! Request and response bodies for the gateway operations

use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_WORDS: u32 = 50;

fn default_max_words() -> i64 {
    i64::from(DEFAULT_MAX_WORDS)
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModerateRequest {
    pub text: String,
}

/// Which model tier a summarization should use
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SummarizeMode {
    #[default]
    Auto,
    Smart,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SummarizeRequest {
    pub text: String,
    #[serde(default)]
    pub mode: SummarizeMode,
    /// Any integer; the fallback clamps it into its character budget
    #[serde(default = "default_max_words")]
    pub max_words: i64,
    /// Synthetic load knob: busy-wait this long before calling the backend
    #[serde(default)]
    pub cpu_burn_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TranslateRequest {
    pub text: String,
    pub target_language: String,
}

/// The three operations the pipeline serves
#[derive(Debug, Clone)]
pub enum OperationRequest {
    Moderate(ModerateRequest),
    Summarize(SummarizeRequest),
    Translate(TranslateRequest),
}

impl OperationRequest {
    /// User text sent to the backend
    pub fn text(&self) -> &str {
        match self {
            OperationRequest::Moderate(req) => &req.text,
            OperationRequest::Summarize(req) => &req.text,
            OperationRequest::Translate(req) => &req.text,
        }
    }

    pub fn kind(&self) -> OperationKind {
        match self {
            OperationRequest::Moderate(_) => OperationKind::Moderate,
            OperationRequest::Summarize(_) => OperationKind::Summarize,
            OperationRequest::Translate(_) => OperationKind::Translate,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Moderate,
    Summarize,
    Translate,
}

impl OperationKind {
    /// Route path, also used as the `endpoint` metric label
    pub fn endpoint(&self) -> &'static str {
        match self {
            OperationKind::Moderate => "/ai/moderate",
            OperationKind::Summarize => "/ai/summarize",
            OperationKind::Translate => "/ai/translate",
        }
    }
}

/// Per-request values supplied by the transport layer rather than the body
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequestContext {
    /// Redactions already applied by an upstream policy layer
    pub pii_redactions: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModerationDecision {
    pub allowed: bool,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummarizeResponse {
    pub provider: String,
    pub model_used: String,
    pub summary: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslateResponse {
    pub provider: String,
    pub translated_text: String,
    pub target_language: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub provider: String,
    pub cheap_model: String,
    pub smart_model: String,
    pub uptime_seconds: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summarize_defaults() {
        let req: SummarizeRequest = serde_json::from_str(r#"{"text": ""}"#).unwrap();
        assert_eq!(req.text, "");
        assert_eq!(req.mode, SummarizeMode::Auto);
        assert_eq!(req.max_words, 50);
        assert_eq!(req.cpu_burn_ms, 0);
    }

    #[test]
    fn test_summarize_smart_mode() {
        let req: SummarizeRequest =
            serde_json::from_str(r#"{"text": "x", "mode": "smart", "max_words": 10}"#).unwrap();
        assert_eq!(req.mode, SummarizeMode::Smart);
        assert_eq!(req.max_words, 10);
    }

    #[test]
    fn test_text_is_required() {
        assert!(serde_json::from_str::<ModerateRequest>("{}").is_err());
        assert!(serde_json::from_str::<TranslateRequest>(r#"{"target_language": "fr"}"#).is_err());
        assert!(serde_json::from_str::<SummarizeRequest>(r#"{"text": "x", "cpu_burn_ms": -5}"#).is_err());
    }

    #[test]
    fn test_endpoint_labels() {
        let req = OperationRequest::Moderate(ModerateRequest { text: "hi".into() });
        assert_eq!(req.kind().endpoint(), "/ai/moderate");
        assert_eq!(OperationKind::Summarize.endpoint(), "/ai/summarize");
        assert_eq!(OperationKind::Translate.endpoint(), "/ai/translate");
    }
}
