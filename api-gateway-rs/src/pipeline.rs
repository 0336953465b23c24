//! Request pipeline
//!
//! One flow per operation, all sharing the same skeleton:
//! start timer, select model, obtain text (backend or fallback),
//! interpret (moderation only), record metrics, build the response.
//!
//! Backend failures never leave this module. The only await point that
//! touches the network is `CompletionBackend::complete`, and no metrics
//! handle is held across it.

use std::sync::Arc;
use std::time::{Duration, Instant};

use config_rs::{GatewayConfig, ModelTiers};
use llm_service::CompletionBackend;

use crate::fallback::{self, CompletionSource};
use crate::interpreter;
use crate::metrics::{Decision, GatewayMetrics};
use crate::models::{
    ModerateRequest, ModerationDecision, OperationKind, OperationRequest, RequestContext,
    SummarizeMode, SummarizeRequest, SummarizeResponse, TranslateRequest, TranslateResponse,
};

/// Status recorded for every completed request; degraded responses are still successes
pub const STATUS_OK: u16 = 200;

const MODERATION_INSTRUCTION: &str = "Classify the following user input for safety. \
     Return JSON with allowed:true/false and reason.";

pub struct RequestPipeline {
    backend: Arc<dyn CompletionBackend>,
    metrics: Arc<GatewayMetrics>,
    models: ModelTiers,
    provider: String,
    timeout: Duration,
}

impl RequestPipeline {
    pub fn new(
        backend: Arc<dyn CompletionBackend>,
        metrics: Arc<GatewayMetrics>,
        models: ModelTiers,
        provider: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            backend,
            metrics,
            models,
            provider: provider.into(),
            timeout,
        }
    }

    pub fn from_config(
        config: &GatewayConfig,
        backend: Arc<dyn CompletionBackend>,
        metrics: Arc<GatewayMetrics>,
    ) -> Self {
        Self::new(
            backend,
            metrics,
            config.models.clone(),
            config.provider.clone(),
            config.completion_timeout,
        )
    }

    pub fn models(&self) -> &ModelTiers {
        &self.models
    }

    pub fn provider(&self) -> &str {
        &self.provider
    }

    pub fn metrics(&self) -> &Arc<GatewayMetrics> {
        &self.metrics
    }

    /// Model tier for `request`: moderation is cheap, translation is smart,
    /// summarization is smart only when asked for
    pub fn select_model(&self, request: &OperationRequest) -> &str {
        match request {
            OperationRequest::Moderate(_) => &self.models.cheap,
            OperationRequest::Summarize(req) if req.mode == SummarizeMode::Smart => {
                &self.models.smart
            }
            OperationRequest::Summarize(_) => &self.models.cheap,
            OperationRequest::Translate(_) => &self.models.smart,
        }
    }

    pub async fn moderate(&self, req: ModerateRequest) -> ModerationDecision {
        let started = Instant::now();
        let request = OperationRequest::Moderate(req);
        let model = self.select_model(&request).to_string();

        let (raw, source) = self
            .complete_or_fallback(&request, &model, MODERATION_INSTRUCTION)
            .await;
        let decision = interpreter::interpret(&raw);

        self.metrics
            .record_moderation_decision(Decision::from_allowed(decision.allowed));
        self.finish(request.kind(), &model, source, started);

        decision
    }

    pub async fn summarize(&self, req: SummarizeRequest, ctx: RequestContext) -> SummarizeResponse {
        let started = Instant::now();
        self.metrics.record_pii_redactions(ctx.pii_redactions);

        burn_cpu(cpu_burn_duration(req.cpu_burn_ms)).await;

        let instruction = format!(
            "You are a summarization assistant. Summarize in {} words.",
            req.max_words
        );
        let request = OperationRequest::Summarize(req);
        let model = self.select_model(&request).to_string();

        let (summary, source) = self.complete_or_fallback(&request, &model, &instruction).await;
        self.finish(request.kind(), &model, source, started);

        SummarizeResponse {
            provider: self.provider.clone(),
            model_used: model,
            summary,
        }
    }

    pub async fn translate(&self, req: TranslateRequest, ctx: RequestContext) -> TranslateResponse {
        let started = Instant::now();
        self.metrics.record_pii_redactions(ctx.pii_redactions);

        let target_language = req.target_language.clone();
        let instruction = format!("You are a translator to {}.", target_language);
        let request = OperationRequest::Translate(req);
        let model = self.select_model(&request).to_string();

        let (translated_text, source) =
            self.complete_or_fallback(&request, &model, &instruction).await;
        self.finish(request.kind(), &model, source, started);

        TranslateResponse {
            provider: self.provider.clone(),
            translated_text,
            target_language,
        }
    }

    async fn complete_or_fallback(
        &self,
        request: &OperationRequest,
        model: &str,
        instruction: &str,
    ) -> (String, CompletionSource) {
        let outcome = self
            .backend
            .complete(model, instruction, request.text(), self.timeout)
            .await;

        match outcome.into_result() {
            Ok(text) => (text, CompletionSource::Backend),
            Err(reason) => {
                tracing::warn!(
                    endpoint = request.kind().endpoint(),
                    model,
                    %reason,
                    "backend unavailable, serving fallback"
                );
                (fallback::fallback(request), CompletionSource::Fallback)
            }
        }
    }

    fn finish(&self, kind: OperationKind, model: &str, source: CompletionSource, started: Instant) {
        let elapsed = started.elapsed();
        self.metrics.record_request(
            kind.endpoint(),
            &self.provider,
            model,
            STATUS_OK,
            elapsed.as_secs_f64(),
        );
        tracing::info!(
            endpoint = kind.endpoint(),
            model,
            source = source.as_str(),
            elapsed_ms = elapsed.as_millis() as u64,
            "request completed"
        );
    }
}

/// Upper bound on a single request's synthetic CPU burn
pub const MAX_CPU_BURN_MS: u64 = 10_000;

const BUSY_WAIT_SEED: u64 = 0x9E37_79B9_7F4A_7C15;

/// Burn duration for a requested `cpu_burn_ms`, capped at `MAX_CPU_BURN_MS`
pub fn cpu_burn_duration(cpu_burn_ms: u64) -> Duration {
    if cpu_burn_ms > MAX_CPU_BURN_MS {
        tracing::warn!(
            requested_ms = cpu_burn_ms,
            cap_ms = MAX_CPU_BURN_MS,
            "cpu burn capped"
        );
    }
    Duration::from_millis(cpu_burn_ms.min(MAX_CPU_BURN_MS))
}

/// Occupy one blocking-pool thread for at least `duration`
///
/// Runs to completion once started. The async worker that awaits it stays
/// free for other requests.
pub async fn burn_cpu(duration: Duration) {
    if duration.is_zero() {
        return;
    }
    if let Err(err) = tokio::task::spawn_blocking(move || busy_wait(duration)).await {
        tracing::error!(error = %err, "cpu burn task failed");
    }
}

/// Spin until `duration` has elapsed. Returns the mixing accumulator so the
/// loop cannot be optimized away.
pub fn busy_wait(duration: Duration) -> u64 {
    let started = Instant::now();
    let mut acc = BUSY_WAIT_SEED;
    while started.elapsed() < duration {
        for i in 0..1_000u64 {
            acc = std::hint::black_box(acc.rotate_left(5) ^ i).wrapping_mul(0x100_0000_01B3);
        }
    }
    acc
}
