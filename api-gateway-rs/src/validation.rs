//! API Gateway Input Validation
//!
//! Inbound payload problems are caller errors and are rejected here, before
//! a request reaches the pipeline. Also reads the side-channel headers the
//! upstream policy layer attaches.

use axum::extract::rejection::JsonRejection;
use axum::http::{header::CONTENT_TYPE, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use tower_http::limit::RequestBodyLimitLayer;

use crate::models::RequestContext;

/// Maximum request payload size (1 MiB)
pub const MAX_PAYLOAD_SIZE: usize = 1024 * 1024;

/// Header carrying the upstream PII redaction count
pub const PII_REDACTIONS_HEADER: &str = "x-pii-redactions";

/// Error response for validation failures
#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct ValidationErrorResponse {
    pub error: String,
    pub code: u16,
    pub details: Option<Vec<String>>,
}

/// Validation error for API requests
#[derive(Debug, thiserror::Error)]
pub enum ApiValidationError {
    #[error("Invalid request format: {0}")]
    InvalidFormat(String),

    #[error("Content type must be {0}")]
    ContentType(String),

    #[error("Request payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("Schema validation error: {0}")]
    Schema(String),
}

impl ApiValidationError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiValidationError::InvalidFormat(_) => StatusCode::BAD_REQUEST,
            ApiValidationError::ContentType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ApiValidationError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiValidationError::Schema(_) => StatusCode::UNPROCESSABLE_ENTITY,
        }
    }

    pub fn to_response(&self) -> (StatusCode, Json<ValidationErrorResponse>) {
        let status = self.status_code();
        let details = match self {
            ApiValidationError::Schema(detail) | ApiValidationError::InvalidFormat(detail) => {
                Some(vec![detail.clone()])
            }
            _ => None,
        };

        (
            status,
            Json(ValidationErrorResponse {
                error: self.to_string(),
                code: status.as_u16(),
                details,
            }),
        )
    }
}

impl From<JsonRejection> for ApiValidationError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            JsonRejection::JsonDataError(err) => ApiValidationError::Schema(err.body_text()),
            JsonRejection::JsonSyntaxError(err) => {
                ApiValidationError::InvalidFormat(err.body_text())
            }
            JsonRejection::MissingJsonContentType(_) => {
                ApiValidationError::ContentType("application/json".to_string())
            }
            other if other.status() == StatusCode::PAYLOAD_TOO_LARGE => payload_too_large(),
            other => ApiValidationError::InvalidFormat(other.body_text()),
        }
    }
}

impl IntoResponse for ApiValidationError {
    fn into_response(self) -> Response {
        tracing::debug!(error = %self, "rejected request");
        self.to_response().into_response()
    }
}

pub fn payload_limit_config() -> RequestBodyLimitLayer {
    RequestBodyLimitLayer::new(MAX_PAYLOAD_SIZE)
}

fn payload_too_large() -> ApiValidationError {
    ApiValidationError::PayloadTooLarge(format!("limit is {} bytes", MAX_PAYLOAD_SIZE))
}

/// Give the body-limit layer's 413 the same JSON shape as extractor rejections
///
/// `RequestBodyLimitLayer` answers a too-large `Content-Length` with a
/// plain-text body before any handler runs.
pub async fn payload_too_large_as_json(response: Response) -> Response {
    let is_json = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("application/json"));

    if response.status() == StatusCode::PAYLOAD_TOO_LARGE && !is_json {
        payload_too_large().into_response()
    } else {
        response
    }
}

/// Redaction count from `X-PII-Redactions`; absent or unparsable means 0
pub fn pii_redactions_from_headers(headers: &HeaderMap) -> u64 {
    headers
        .get(PII_REDACTIONS_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok())
        .unwrap_or(0)
}

pub fn request_context(headers: &HeaderMap) -> RequestContext {
    RequestContext {
        pii_redactions: pii_redactions_from_headers(headers),
    }
}
