//! Prometheus metrics for the policy control plane.

use std::time::{Duration, Instant};

use axum::{
    extract::{MatchedPath, Request},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use once_cell::sync::Lazy;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};
use tracing::error;

pub struct ControlPlaneMetrics {
    pub registry: Registry,

    /// Authorization decisions by outcome (allow/deny/error)
    pub decisions_total: IntCounterVec,
    /// Decision latency by outcome
    pub decision_duration: HistogramVec,
    /// Decision cache lookups by result (hit/miss)
    pub cache_lookups_total: IntCounterVec,

    /// Lifecycle operations by operation and outcome
    pub lifecycle_operations_total: IntCounterVec,

    /// Enforcement points currently flagged stale
    pub stale_sync_targets: IntGauge,

    /// HTTP requests by method, route, and status
    pub http_requests_total: IntCounterVec,
    /// HTTP latency by route
    pub http_request_duration: HistogramVec,
}

impl ControlPlaneMetrics {
    fn new() -> Self {
        let registry = Registry::new();

        let decisions_total = IntCounterVec::new(
            Opts::new("policy_decisions_total", "Total authorization decisions"),
            &["outcome"],
        )
        .expect("Failed to create decisions_total metric");

        let decision_duration = HistogramVec::new(
            HistogramOpts::new(
                "policy_decision_duration_seconds",
                "Duration of authorization decisions in seconds",
            )
            .buckets(vec![
                0.0005, 0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0,
            ]),
            &["outcome"],
        )
        .expect("Failed to create decision_duration metric");

        let cache_lookups_total = IntCounterVec::new(
            Opts::new(
                "policy_decision_cache_lookups_total",
                "Decision cache lookups",
            ),
            &["result"],
        )
        .expect("Failed to create cache_lookups_total metric");

        let lifecycle_operations_total = IntCounterVec::new(
            Opts::new(
                "policy_lifecycle_operations_total",
                "Policy lifecycle operations",
            ),
            &["operation", "outcome"],
        )
        .expect("Failed to create lifecycle_operations_total metric");

        let stale_sync_targets = IntGauge::new(
            "policy_sync_stale_targets",
            "Enforcement points currently flagged stale",
        )
        .expect("Failed to create stale_sync_targets metric");

        let http_requests_total = IntCounterVec::new(
            Opts::new("http_requests_total", "HTTP requests"),
            &["method", "route", "status"],
        )
        .expect("Failed to create http_requests_total metric");

        let http_request_duration = HistogramVec::new(
            HistogramOpts::new(
                "http_request_duration_seconds",
                "HTTP request duration in seconds",
            )
            .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]),
            &["route"],
        )
        .expect("Failed to create http_request_duration metric");

        registry
            .register(Box::new(decisions_total.clone()))
            .expect("Failed to register decisions_total");
        registry
            .register(Box::new(decision_duration.clone()))
            .expect("Failed to register decision_duration");
        registry
            .register(Box::new(cache_lookups_total.clone()))
            .expect("Failed to register cache_lookups_total");
        registry
            .register(Box::new(lifecycle_operations_total.clone()))
            .expect("Failed to register lifecycle_operations_total");
        registry
            .register(Box::new(stale_sync_targets.clone()))
            .expect("Failed to register stale_sync_targets");
        registry
            .register(Box::new(http_requests_total.clone()))
            .expect("Failed to register http_requests_total");
        registry
            .register(Box::new(http_request_duration.clone()))
            .expect("Failed to register http_request_duration");

        Self {
            registry,
            decisions_total,
            decision_duration,
            cache_lookups_total,
            lifecycle_operations_total,
            stale_sync_targets,
            http_requests_total,
            http_request_duration,
        }
    }
}

static METRICS: Lazy<ControlPlaneMetrics> = Lazy::new(ControlPlaneMetrics::new);

/// Facade for recording metrics from handlers and services
pub struct MetricsHelper;

impl MetricsHelper {
    pub fn record_decision(outcome: &str) {
        METRICS.decisions_total.with_label_values(&[outcome]).inc();
    }

    pub fn record_decision_duration(outcome: &str, duration: Duration) {
        METRICS
            .decision_duration
            .with_label_values(&[outcome])
            .observe(duration.as_secs_f64());
    }

    pub fn record_cache(result: &str) {
        METRICS.cache_lookups_total.with_label_values(&[result]).inc();
    }

    pub fn record_lifecycle(operation: &str, outcome: &str) {
        METRICS
            .lifecycle_operations_total
            .with_label_values(&[operation, outcome])
            .inc();
    }

    pub fn set_stale_targets(count: usize) {
        METRICS
            .stale_sync_targets
            .set(i64::try_from(count).unwrap_or(i64::MAX));
    }
}

/// Axum middleware recording per-route HTTP metrics
pub async fn http_metrics_middleware(request: Request, next: Next) -> Response {
    let method = request.method().to_string();
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    let start = Instant::now();
    let response = next.run(request).await;
    let latency = start.elapsed();

    METRICS
        .http_requests_total
        .with_label_values(&[&method, &route, response.status().as_str()])
        .inc();
    METRICS
        .http_request_duration
        .with_label_values(&[&route])
        .observe(latency.as_secs_f64());

    response
}

/// Text exposition handler for `/metrics`
pub async fn metrics_handler() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = METRICS.registry.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        error!(error = %e, "failed to encode metrics");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            "failed to gather metrics".to_string(),
        )
            .into_response();
    }
    match String::from_utf8(buffer) {
        Ok(body) => (StatusCode::OK, body).into_response(),
        Err(e) => {
            error!(error = %e, "metrics buffer was not valid UTF-8");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "failed to gather metrics".to_string(),
            )
                .into_response()
        }
    }
}
