// Request logging and HTTP metrics

use crate::metrics::HealthMetrics;
use axum::{
    extract::{MatchedPath, Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// Log every request and record its latency
pub async fn request_logging(
    State(metrics): State<Arc<HealthMetrics>>,
    request: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    // Matched route keeps label cardinality bounded
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());
    let uri = request.uri().path().to_string();

    let response = next.run(request).await;

    let elapsed = start.elapsed();
    let status = response.status().as_u16();

    info!(
        method = %method,
        path = %uri,
        status,
        latency_ms = elapsed.as_millis() as u64,
        "request completed"
    );

    metrics.observe_request(&method, &path, status, elapsed.as_secs_f64());

    response
}
