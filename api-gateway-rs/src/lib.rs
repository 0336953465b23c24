use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header::CONTENT_TYPE, HeaderMap, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use config_rs::GatewayConfig;
use llm_service::{CompletionBackend, LlmClient};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub mod error;
pub mod fallback;
pub mod interpreter;
pub mod metrics;
pub mod models;
pub mod pipeline;
pub mod validation;

pub use error::GatewayError;
pub use metrics::GatewayMetrics;
pub use pipeline::RequestPipeline;

use models::{
    HealthResponse, ModerateRequest, ModerationDecision, SummarizeRequest, SummarizeResponse,
    TranslateRequest, TranslateResponse,
};
use validation::{
    payload_limit_config, payload_too_large_as_json, request_context, ApiValidationError,
};

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
}

/// Shared state behind every route
pub struct ApiGateway {
    pipeline: RequestPipeline,
    started_at: Instant,
}

impl ApiGateway {
    pub fn new(pipeline: RequestPipeline) -> Self {
        Self {
            pipeline,
            started_at: Instant::now(),
        }
    }

    /// Gateway backed by the real HTTP client and a fresh metrics registry
    pub fn from_config(config: &GatewayConfig) -> Result<Self, GatewayError> {
        let backend: Arc<dyn CompletionBackend> = Arc::new(LlmClient::from_config(config));
        let metrics = Arc::new(GatewayMetrics::new()?);
        Ok(Self::new(RequestPipeline::from_config(config, backend, metrics)))
    }

    pub fn pipeline(&self) -> &RequestPipeline {
        &self.pipeline
    }

    /// Create the Axum router with all routes and middleware
    pub fn create_router(self: Arc<Self>) -> Router {
        Router::new()
            .route("/", get(Self::root_handler))
            .route("/health", get(Self::health_handler))
            .route("/metrics", get(Self::metrics_handler))
            .route("/ai/moderate", post(Self::moderate_handler))
            .route("/ai/summarize", post(Self::summarize_handler))
            .route("/ai/translate", post(Self::translate_handler))
            .layer(payload_limit_config())
            .layer(middleware::map_response(payload_too_large_as_json))
            .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
            .layer(TraceLayer::new_for_http())
            .with_state(self)
    }

    async fn root_handler() -> impl IntoResponse {
        Json(serde_json::json!({
            "service": "AI Gateway",
            "version": env!("CARGO_PKG_VERSION"),
            "endpoints": [
                "GET /health",
                "GET /metrics",
                "POST /ai/moderate",
                "POST /ai/summarize",
                "POST /ai/translate"
            ]
        }))
    }

    async fn health_handler(State(state): State<Arc<Self>>) -> Json<HealthResponse> {
        let models = state.pipeline.models();
        Json(HealthResponse {
            status: "ok".to_string(),
            provider: state.pipeline.provider().to_string(),
            cheap_model: models.cheap.clone(),
            smart_model: models.smart.clone(),
            uptime_seconds: state.started_at.elapsed().as_secs(),
        })
    }

    async fn metrics_handler(State(state): State<Arc<Self>>) -> Response {
        match state.pipeline.metrics().render() {
            Ok(body) => ([(CONTENT_TYPE, prometheus::TEXT_FORMAT)], body).into_response(),
            Err(err) => {
                tracing::error!(error = %err, "failed to encode metrics");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorResponse {
                        error: format!("Failed to encode metrics: {}", err),
                        code: 500,
                    }),
                )
                    .into_response()
            }
        }
    }

    async fn moderate_handler(
        State(state): State<Arc<Self>>,
        payload: Result<Json<ModerateRequest>, JsonRejection>,
    ) -> Result<Json<ModerationDecision>, ApiValidationError> {
        let Json(request) = payload?;
        Ok(Json(state.pipeline.moderate(request).await))
    }

    async fn summarize_handler(
        State(state): State<Arc<Self>>,
        headers: HeaderMap,
        payload: Result<Json<SummarizeRequest>, JsonRejection>,
    ) -> Result<Json<SummarizeResponse>, ApiValidationError> {
        let Json(request) = payload?;
        let ctx = request_context(&headers);
        Ok(Json(state.pipeline.summarize(request, ctx).await))
    }

    async fn translate_handler(
        State(state): State<Arc<Self>>,
        headers: HeaderMap,
        payload: Result<Json<TranslateRequest>, JsonRejection>,
    ) -> Result<Json<TranslateResponse>, ApiValidationError> {
        let Json(request) = payload?;
        let ctx = request_context(&headers);
        Ok(Json(state.pipeline.translate(request, ctx).await))
    }
}

/// Bind `config.bind_addr` and serve until ctrl-c
pub async fn serve(config: GatewayConfig) -> Result<(), GatewayError> {
    let gateway = Arc::new(ApiGateway::from_config(&config)?);
    let app = gateway.create_router();

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .map_err(|source| GatewayError::Bind {
            addr: config.bind_addr,
            source,
        })?;

    tracing::info!(
        addr = %config.bind_addr,
        backend = %config.chat_url(),
        provider = %config.provider,
        cheap_model = %config.models.cheap,
        smart_model = %config.models.smart,
        "AI gateway listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(GatewayError::Serve)
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
