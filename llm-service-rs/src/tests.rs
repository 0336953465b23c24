// llm-service-rs/src/tests.rs
// Tests for request shaping, response parsing and failure folding

use std::time::Duration;

use reqwest::StatusCode;

use crate::llm_client::{classify_status, parse_chat_response, ChatCompletionRequest};
use crate::{CompletionBackend, CompletionOutcome, LlmClient, LlmError};

#[test]
fn test_request_body_shape() {
    let body = ChatCompletionRequest::new("llama3", "Be brief.", "hello");
    let json = serde_json::to_value(&body).unwrap();

    assert_eq!(json["model"], "llama3");
    assert_eq!(json["stream"], false);
    assert_eq!(json["messages"][0]["role"], "system");
    assert_eq!(json["messages"][0]["content"], "Be brief.");
    assert_eq!(json["messages"][1]["role"], "user");
    assert_eq!(json["messages"][1]["content"], "hello");
}

#[test]
fn test_parse_ollama_response() {
    let body = r#"{"model":"llama3","message":{"role":"assistant","content":"hi there"},"done":true}"#;
    let text = tokio_test::assert_ok!(parse_chat_response(body));
    assert_eq!(text, "hi there");
}

#[test]
fn test_parse_openai_response() {
    let body = r#"{"choices":[{"message":{"role":"assistant","content":"bonjour"}}]}"#;
    let text = tokio_test::assert_ok!(parse_chat_response(body));
    assert_eq!(text, "bonjour");
}

#[test]
fn test_parse_rejects_structurally_invalid_bodies() {
    for body in [
        "",
        "not json",
        r#"{"done":true}"#,
        r#"{"message":{"role":"assistant"}}"#,
        r#"{"choices":[]}"#,
    ] {
        match parse_chat_response(body) {
            Err(LlmError::ParseError(_)) => {}
            other => panic!("expected parse error for {:?}, got {:?}", body, other),
        }
    }
}

#[test]
fn test_status_classification() {
    assert!(matches!(
        classify_status(StatusCode::BAD_REQUEST, "bad"),
        LlmError::InvalidRequest(_)
    ));
    assert!(matches!(
        classify_status(StatusCode::TOO_MANY_REQUESTS, ""),
        LlmError::RateLimitExceeded(_)
    ));
    assert!(matches!(
        classify_status(StatusCode::SERVICE_UNAVAILABLE, "loading model"),
        LlmError::ServerError(_)
    ));
    assert!(matches!(
        classify_status(StatusCode::IM_A_TEAPOT, ""),
        LlmError::UnknownError(_)
    ));

    let long_body = "x".repeat(1_000);
    let err = classify_status(StatusCode::INTERNAL_SERVER_ERROR, &long_body);
    assert!(err.to_string().len() < 300);
}

#[test]
fn test_retryable_classes() {
    assert!(LlmError::ServerError("boom".into()).is_retryable());
    assert!(LlmError::NetworkError("reset".into()).is_retryable());
    assert!(LlmError::Timeout(Duration::from_secs(1)).is_retryable());
    assert!(LlmError::RateLimitExceeded("slow down".into()).is_retryable());
    assert!(!LlmError::InvalidRequest("nope".into()).is_retryable());
    assert!(!LlmError::ParseError("garbage".into()).is_retryable());
}

#[test]
fn test_outcome_from_result() {
    let ok: CompletionOutcome = Ok::<_, LlmError>("text".to_string()).into();
    assert_eq!(ok, CompletionOutcome::Success("text".to_string()));

    let failed: CompletionOutcome =
        Err::<String, _>(LlmError::Timeout(Duration::from_millis(5))).into();
    assert!(!failed.is_success());
    assert!(failed.into_result().unwrap_err().contains("timed out"));
}

#[tokio::test]
async fn test_unreachable_backend_is_a_failure_value() {
    // Nothing listens on port 1; the connect error must come back as data
    let client = LlmClient::new("http://127.0.0.1:1/api/chat");
    let outcome = client
        .complete("llama3", "system", "user", Duration::from_secs(5))
        .await;

    match outcome {
        CompletionOutcome::Failure(reason) => assert!(!reason.is_empty()),
        CompletionOutcome::Success(text) => panic!("unexpected success: {}", text),
    }
}
