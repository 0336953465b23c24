//! Metrics recorder
//!
//! Each `GatewayMetrics` owns its own Prometheus `Registry`, so the server
//! and every test get an isolated instance. Counter and histogram cells are
//! atomics inside the `prometheus` crate; recording never takes a lock that
//! outlives the call, and nothing here is awaited.
//!
//! Exposed series:
//! - `ai_requests_total{endpoint, provider, model, status}`
//! - `ai_request_latency_seconds{endpoint, provider, model}`
//! - `ai_moderation_decisions_total{decision}`
//! - `ai_pii_redactions_total`

use std::collections::BTreeMap;

use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};

pub const REQUESTS_TOTAL: &str = "ai_requests_total";
pub const REQUEST_LATENCY_SECONDS: &str = "ai_request_latency_seconds";
pub const MODERATION_DECISIONS_TOTAL: &str = "ai_moderation_decisions_total";
pub const PII_REDACTIONS_TOTAL: &str = "ai_pii_redactions_total";

const LATENCY_BUCKETS: &[f64] = &[
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0,
];

/// Label value of `ai_moderation_decisions_total`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed,
    Blocked,
}

impl Decision {
    pub fn from_allowed(allowed: bool) -> Self {
        if allowed {
            Decision::Allowed
        } else {
            Decision::Blocked
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Allowed => "allowed",
            Decision::Blocked => "blocked",
        }
    }
}

/// Key of one `ai_requests_total` series
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct RequestKey {
    pub endpoint: String,
    pub provider: String,
    pub model: String,
    pub status: u16,
}

/// Key of one `ai_request_latency_seconds` series
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct LatencyKey {
    pub endpoint: String,
    pub provider: String,
    pub model: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LatencySummary {
    pub count: u64,
    pub sum_seconds: f64,
}

/// Point-in-time, read-only copy of everything recorded so far
#[derive(Debug, Clone, Default)]
pub struct MetricsSnapshot {
    pub requests: BTreeMap<RequestKey, u64>,
    pub latency: BTreeMap<LatencyKey, LatencySummary>,
    pub moderation_decisions: BTreeMap<String, u64>,
    pub pii_redactions_total: u64,
}

impl MetricsSnapshot {
    /// Requests for `endpoint` summed over provider, model and status
    pub fn requests_for_endpoint(&self, endpoint: &str) -> u64 {
        self.requests
            .iter()
            .filter(|(key, _)| key.endpoint == endpoint)
            .map(|(_, count)| count)
            .sum()
    }

    pub fn request_count(&self, endpoint: &str, provider: &str, model: &str, status: u16) -> u64 {
        let key = RequestKey {
            endpoint: endpoint.to_string(),
            provider: provider.to_string(),
            model: model.to_string(),
            status,
        };
        self.requests.get(&key).copied().unwrap_or(0)
    }

    pub fn latency_for(&self, endpoint: &str, provider: &str, model: &str) -> LatencySummary {
        let key = LatencyKey {
            endpoint: endpoint.to_string(),
            provider: provider.to_string(),
            model: model.to_string(),
        };
        self.latency.get(&key).copied().unwrap_or_default()
    }

    pub fn decisions(&self, decision: Decision) -> u64 {
        self.moderation_decisions
            .get(decision.as_str())
            .copied()
            .unwrap_or(0)
    }
}

pub struct GatewayMetrics {
    registry: Registry,
    requests: IntCounterVec,
    latency: HistogramVec,
    moderation_decisions: IntCounterVec,
    pii_redactions: IntCounter,
}

impl GatewayMetrics {
    /// Create the collectors and register them in a fresh registry
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let requests = IntCounterVec::new(
            Opts::new(REQUESTS_TOTAL, "Total AI requests by endpoint, provider, model and status"),
            &["endpoint", "provider", "model", "status"],
        )?;

        let latency = HistogramVec::new(
            HistogramOpts::new(REQUEST_LATENCY_SECONDS, "AI request latency in seconds")
                .buckets(LATENCY_BUCKETS.to_vec()),
            &["endpoint", "provider", "model"],
        )?;

        let moderation_decisions = IntCounterVec::new(
            Opts::new(MODERATION_DECISIONS_TOTAL, "Moderation decisions by outcome"),
            &["decision"],
        )?;

        let pii_redactions = IntCounter::new(
            PII_REDACTIONS_TOTAL,
            "PII redactions reported by the upstream policy layer",
        )?;

        registry.register(Box::new(requests.clone()))?;
        registry.register(Box::new(latency.clone()))?;
        registry.register(Box::new(moderation_decisions.clone()))?;
        registry.register(Box::new(pii_redactions.clone()))?;

        Ok(Self {
            registry,
            requests,
            latency,
            moderation_decisions,
            pii_redactions,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn record_request(
        &self,
        endpoint: &str,
        provider: &str,
        model: &str,
        status_code: u16,
        elapsed_seconds: f64,
    ) {
        let status = status_code.to_string();
        self.requests
            .with_label_values(&[endpoint, provider, model, status.as_str()])
            .inc();
        self.latency
            .with_label_values(&[endpoint, provider, model])
            .observe(elapsed_seconds);
    }

    pub fn record_moderation_decision(&self, decision: Decision) {
        self.moderation_decisions
            .with_label_values(&[decision.as_str()])
            .inc();
    }

    /// Add `n` upstream redactions; zero is a no-op
    pub fn record_pii_redactions(&self, n: u64) {
        if n > 0 {
            self.pii_redactions.inc_by(n);
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let mut snapshot = MetricsSnapshot {
            pii_redactions_total: self.pii_redactions.get(),
            ..MetricsSnapshot::default()
        };

        for family in self.registry.gather() {
            match family.get_name() {
                REQUESTS_TOTAL => {
                    for metric in family.get_metric() {
                        let labels = labels_of(metric);
                        let key = RequestKey {
                            endpoint: label(&labels, "endpoint"),
                            provider: label(&labels, "provider"),
                            model: label(&labels, "model"),
                            status: label(&labels, "status").parse().unwrap_or(0),
                        };
                        snapshot
                            .requests
                            .insert(key, metric.get_counter().get_value() as u64);
                    }
                }
                REQUEST_LATENCY_SECONDS => {
                    for metric in family.get_metric() {
                        let labels = labels_of(metric);
                        let key = LatencyKey {
                            endpoint: label(&labels, "endpoint"),
                            provider: label(&labels, "provider"),
                            model: label(&labels, "model"),
                        };
                        let histogram = metric.get_histogram();
                        snapshot.latency.insert(
                            key,
                            LatencySummary {
                                count: histogram.get_sample_count(),
                                sum_seconds: histogram.get_sample_sum(),
                            },
                        );
                    }
                }
                MODERATION_DECISIONS_TOTAL => {
                    for metric in family.get_metric() {
                        let labels = labels_of(metric);
                        snapshot.moderation_decisions.insert(
                            label(&labels, "decision"),
                            metric.get_counter().get_value() as u64,
                        );
                    }
                }
                _ => {}
            }
        }

        snapshot
    }

    /// Prometheus text exposition of the whole registry
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|err| prometheus::Error::Msg(err.to_string()))
    }
}

fn labels_of(metric: &prometheus::proto::Metric) -> BTreeMap<String, String> {
    metric
        .get_label()
        .iter()
        .map(|pair| (pair.get_name().to_string(), pair.get_value().to_string()))
        .collect()
}

fn label(labels: &BTreeMap<String, String>, name: &str) -> String {
    labels.get(name).cloned().unwrap_or_default()
}
