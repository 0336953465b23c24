// llm-service-rs/src/lib.rs
// Completion client for the local inference backend
//
// The gateway never talks to the backend directly: it depends on the
// `CompletionBackend` trait, and every backend error is folded into a
// `CompletionOutcome::Failure` before it leaves this crate.

use std::time::Duration;

use async_trait::async_trait;

pub mod llm_client;

pub use llm_client::{LlmClient, LlmError};

#[cfg(test)]
mod tests;

/// Result of one completion exchange with the backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionOutcome {
    /// Assistant message content, verbatim
    Success(String),
    /// Human-readable description of why no text was produced
    Failure(String),
}

impl CompletionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, CompletionOutcome::Success(_))
    }

    pub fn into_result(self) -> Result<String, String> {
        match self {
            CompletionOutcome::Success(text) => Ok(text),
            CompletionOutcome::Failure(reason) => Err(reason),
        }
    }
}

impl From<Result<String, LlmError>> for CompletionOutcome {
    fn from(result: Result<String, LlmError>) -> Self {
        match result {
            Ok(text) => CompletionOutcome::Success(text),
            Err(err) => CompletionOutcome::Failure(err.to_string()),
        }
    }
}

/// A backend able to produce one chat completion
///
/// Implementations must not panic or return early on backend trouble:
/// transport errors, non-2xx statuses, timeouts and malformed bodies all
/// become `CompletionOutcome::Failure`.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn complete(
        &self,
        model: &str,
        system_instruction: &str,
        user_text: &str,
        timeout: Duration,
    ) -> CompletionOutcome;
}
