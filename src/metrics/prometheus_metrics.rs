use crate::health::HealthReport;
use axum::{
    body::Body,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGaugeVec, Opts, Registry, TextEncoder,
};
use std::sync::Arc;

/// Request latency buckets, in seconds
const REQUEST_BUCKETS: &[f64] = &[0.1, 0.3, 1.2, 5.0, 10.0];

const PROBE_BUCKETS: &[f64] = &[0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0];

/// Metrics owned by one server instance. Passed around explicitly, never global.
pub struct HealthMetrics {
    registry: Registry,

    // HTTP metrics
    pub http_requests_total: IntCounterVec,
    pub http_request_duration_seconds: HistogramVec,

    // Dependency health
    pub health_component_up: IntGaugeVec,
    pub health_probe_duration_seconds: HistogramVec,
    pub health_checks_total: IntCounterVec,
}

impl HealthMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let http_requests_total = IntCounterVec::new(
            Opts::new("http_requests_total", "Total number of HTTP requests"),
            &["method", "path", "status"],
        )?;

        let http_request_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "http_request_duration_seconds",
                "HTTP request duration in seconds",
            )
            .buckets(REQUEST_BUCKETS.to_vec()),
            &["method", "path"],
        )?;

        let health_component_up = IntGaugeVec::new(
            Opts::new(
                "health_component_up",
                "Whether a dependency was up at the last check (1) or down (0)",
            ),
            &["component"],
        )?;

        let health_probe_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "health_probe_duration_seconds",
                "Dependency probe duration in seconds",
            )
            .buckets(PROBE_BUCKETS.to_vec()),
            &["component"],
        )?;

        let health_checks_total = IntCounterVec::new(
            Opts::new("health_checks_total", "Total number of aggregated health checks"),
            &["overall"],
        )?;

        registry.register(Box::new(http_requests_total.clone()))?;
        registry.register(Box::new(http_request_duration_seconds.clone()))?;
        registry.register(Box::new(health_component_up.clone()))?;
        registry.register(Box::new(health_probe_duration_seconds.clone()))?;
        registry.register(Box::new(health_checks_total.clone()))?;

        Ok(Self {
            registry,
            http_requests_total,
            http_request_duration_seconds,
            health_component_up,
            health_probe_duration_seconds,
            health_checks_total,
        })
    }

    /// Record the outcome of one aggregation pass
    pub fn observe_report(&self, report: &HealthReport) {
        self.health_checks_total
            .with_label_values(&[report.overall.to_string().as_str()])
            .inc();

        for probe in &report.probes {
            self.health_component_up
                .with_label_values(&[probe.name.as_str()])
                .set(i64::from(probe.state.is_up()));
            self.health_probe_duration_seconds
                .with_label_values(&[probe.name.as_str()])
                .observe(probe.duration_ms as f64 / 1000.0);
        }
    }

    pub fn observe_request(&self, method: &str, path: &str, status: u16, duration_secs: f64) {
        self.http_requests_total
            .with_label_values(&[method, path, status.to_string().as_str()])
            .inc();
        self.http_request_duration_seconds
            .with_label_values(&[method, path])
            .observe(duration_secs);
    }

    /// Render metrics in Prometheus text format
    pub fn render(&self) -> Result<String, Box<dyn std::error::Error>> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = vec![];
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

/// Metrics handler for Prometheus
pub async fn metrics_handler(State(metrics): State<Arc<HealthMetrics>>) -> Response {
    match metrics.render() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            Body::from(body),
        )
            .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to render metrics: {}", e),
        )
            .into_response(),
    }
}
