// Shared helpers for the gateway integration tests

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use api_gateway::{ApiGateway, GatewayMetrics, RequestPipeline};
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use config_rs::ModelTiers;
use llm_service::{CompletionBackend, CompletionOutcome};
use serde_json::Value;
use tower::ServiceExt;

pub const CHEAP: &str = "cheap-model";
pub const SMART: &str = "smart-model";
pub const PROVIDER: &str = "ollama";

/// Backend returning one fixed outcome
pub struct FixedBackend(pub CompletionOutcome);

#[async_trait]
impl CompletionBackend for FixedBackend {
    async fn complete(&self, _: &str, _: &str, _: &str, _: Duration) -> CompletionOutcome {
        self.0.clone()
    }
}

/// Backend that fails every other call
#[derive(Default)]
pub struct FlakyBackend {
    calls: AtomicUsize,
}

#[async_trait]
impl CompletionBackend for FlakyBackend {
    async fn complete(&self, _: &str, _: &str, user_text: &str, _: Duration) -> CompletionOutcome {
        tokio::time::sleep(Duration::from_millis(5)).await;
        if self.calls.fetch_add(1, Ordering::SeqCst) % 2 == 0 {
            CompletionOutcome::Failure("Server error: (503) overloaded".to_string())
        } else {
            CompletionOutcome::Success(format!("echo: {}", user_text))
        }
    }
}

pub fn models() -> ModelTiers {
    ModelTiers {
        cheap: CHEAP.to_string(),
        smart: SMART.to_string(),
    }
}

/// Router plus the metrics instance it records into
pub fn gateway_with(backend: Arc<dyn CompletionBackend>, timeout: Duration) -> (Router, Arc<GatewayMetrics>) {
    let metrics = Arc::new(GatewayMetrics::new().unwrap());
    let pipeline = RequestPipeline::new(backend, metrics.clone(), models(), PROVIDER, timeout);
    let router = Arc::new(ApiGateway::new(pipeline)).create_router();
    (router, metrics)
}

pub fn gateway(backend: Arc<dyn CompletionBackend>) -> (Router, Arc<GatewayMetrics>) {
    gateway_with(backend, Duration::from_secs(5))
}

pub fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::post(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, String) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

pub async fn send_json(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let (status, body) = send(app, request).await;
    let value = serde_json::from_str(&body)
        .unwrap_or_else(|err| panic!("non-JSON body {:?}: {}", body, err));
    (status, value)
}
