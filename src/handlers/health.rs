use crate::health::{ComponentState, HealthReport};
use crate::server::AppState;
use axum::{Json, extract::State, http::StatusCode};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{info, warn};
use utoipa::ToSchema;

pub const RUNNING_MESSAGE: &str = "Employee API is running";
pub const NOT_RUNNING_MESSAGE: &str = "Employee API is not running. Check application logs";

/// Key under which the service reports its own state
pub const SERVICE_COMPONENT: &str = "employee_api";

/// Status returned whenever any dependency is down
pub const FAILURE_STATUS: StatusCode = StatusCode::BAD_REQUEST;

/// Liveness response body
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthMessage {
    #[schema(example = "Employee API is not running. Check application logs")]
    pub message: String,
}

/// Detailed response body as served for the configured dependencies
#[derive(Debug, Serialize, ToSchema)]
pub struct DetailedHealth {
    #[schema(example = "Employee API is not running. Check application logs")]
    pub message: String,
    pub scylla_db: ComponentState,
    pub redis: ComponentState,
    pub employee_api: ComponentState,
}

fn status_and_message(report: &HealthReport) -> (StatusCode, &'static str) {
    if report.is_up() {
        (StatusCode::OK, RUNNING_MESSAGE)
    } else {
        (FAILURE_STATUS, NOT_RUNNING_MESSAGE)
    }
}

/// Detailed body: message, one key per component, plus the service key
pub fn render(report: &HealthReport) -> (StatusCode, Value) {
    let (status, message) = status_and_message(report);

    let mut body = Map::new();
    body.insert("message".to_string(), Value::from(message));
    for (name, state) in &report.components {
        body.insert(name.clone(), Value::from(state.as_str()));
    }
    body.insert(
        SERVICE_COMPONENT.to_string(),
        Value::from(report.service_state().as_str()),
    );

    (status, Value::Object(body))
}

/// Liveness body: message only
pub fn render_liveness(report: &HealthReport) -> (StatusCode, Value) {
    let (status, message) = status_and_message(report);

    let mut body = Map::new();
    body.insert("message".to_string(), Value::from(message));

    (status, Value::Object(body))
}

async fn run_checks(state: &AppState) -> HealthReport {
    let report = state.aggregator.check().await;
    state.metrics.observe_report(&report);

    if report.is_up() {
        info!(overall = %report.overall, "health check passed");
    } else {
        let down: Vec<&str> = report
            .probes
            .iter()
            .filter(|p| p.state == ComponentState::Down)
            .map(|p| p.name.as_str())
            .collect();
        warn!(overall = %report.overall, down = ?down, "health check failed");
    }

    report
}

/// Liveness check: message only
#[utoipa::path(
    get,
    path = "/api/v1/employee/health",
    responses(
        (status = 200, description = "Every dependency is up", body = HealthMessage),
        (status = 400, description = "At least one dependency is down", body = HealthMessage)
    ),
    tag = "health"
)]
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let report = run_checks(&state).await;
    let (status, body) = render_liveness(&report);
    (status, Json(body))
}

/// Per-dependency health
#[utoipa::path(
    get,
    path = "/api/v1/employee/health/detail",
    responses(
        (status = 200, description = "Every dependency is up", body = DetailedHealth),
        (status = 400, description = "At least one dependency is down", body = DetailedHealth)
    ),
    tag = "health"
)]
pub async fn detailed_health_check(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let report = run_checks(&state).await;
    let (status, body) = render(&report);
    (status, Json(body))
}
