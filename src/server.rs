use crate::handlers;
use crate::handlers::health::NOT_RUNNING_MESSAGE;
use crate::health::{DependencyCheck, HealthAggregator, HealthCheck, RedisClient, ScyllaClient};
use crate::metrics::{HealthMetrics, metrics_handler};
use crate::middleware::request_logging;
use crate::models::{AppConfig, ServerConfig};
use crate::openapi::ApiDoc;
use axum::{
    Json, Router,
    extract::FromRef,
    http::{HeaderValue, Method, StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use serde_json::json;
use std::any::Any;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub const HEALTH_PATH: &str = "/api/v1/employee/health";
pub const DETAILED_HEALTH_PATH: &str = "/api/v1/employee/health/detail";
pub const METRICS_PATH: &str = "/metrics";
pub const SWAGGER_UI_PATH: &str = "/swagger";
pub const OPENAPI_PATH: &str = "/api-docs/openapi.json";

/// Shared, read-only state for request handlers
#[derive(Clone)]
pub struct AppState {
    pub aggregator: Arc<HealthAggregator>,
    pub metrics: Arc<HealthMetrics>,
}

impl FromRef<AppState> for Arc<HealthMetrics> {
    fn from_ref(state: &AppState) -> Self {
        state.metrics.clone()
    }
}

/// Build the fixed probe set: the database and the cache
pub fn build_aggregator(config: &AppConfig) -> Result<HealthAggregator, String> {
    let timeout = config.health.probe_timeout();

    let scylla = ScyllaClient::new(&config.scylla_db, timeout);
    let redis = RedisClient::new(&config.redis)?;

    let checks: Vec<Arc<dyn HealthCheck>> = vec![
        Arc::new(DependencyCheck::new("scylla_db", Arc::new(scylla), timeout)),
        Arc::new(DependencyCheck::new("redis", Arc::new(redis), timeout)),
    ];

    Ok(HealthAggregator::new(checks))
}

fn cors_layer(config: &ServerConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect();

    if origins.is_empty() {
        return CorsLayer::permissive();
    }

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::ORIGIN,
            header::CONTENT_TYPE,
            header::ACCEPT,
            header::AUTHORIZATION,
        ])
        .expose_headers([header::CONTENT_LENGTH])
        .allow_credentials(true)
        .max_age(Duration::from_secs(12 * 60 * 60))
}

/// OpenAPI JSON at `/api-docs/openapi.json`, Swagger UI under `/swagger`
pub fn docs_routes() -> Router<AppState> {
    SwaggerUi::new(SWAGGER_UI_PATH)
        .url(OPENAPI_PATH, ApiDoc::openapi())
        .into()
}

/// A panicking handler still answers, with the fixed failure message
fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.as_str()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s
    } else {
        "unknown panic payload"
    };
    error!(panic = %detail, "request handler panicked");

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "message": NOT_RUNNING_MESSAGE })),
    )
        .into_response()
}

/// Recovery, request logging, CORS and tracing, innermost first
pub fn apply_middleware(
    router: Router<AppState>,
    metrics: Arc<HealthMetrics>,
    config: &ServerConfig,
) -> Router<AppState> {
    router
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(axum::middleware::from_fn_with_state(
            metrics,
            request_logging,
        ))
        .layer(cors_layer(config))
        .layer(TraceLayer::new_for_http())
}

pub fn build_router(state: AppState, config: &ServerConfig) -> Router {
    let routes = Router::new()
        .route(HEALTH_PATH, get(handlers::health::health_check))
        .route(
            DETAILED_HEALTH_PATH,
            get(handlers::health::detailed_health_check),
        )
        .route(METRICS_PATH, get(metrics_handler))
        .merge(docs_routes());

    apply_middleware(routes, state.metrics.clone(), config).with_state(state)
}

/// Bind and serve until Ctrl-C
pub async fn run(config: Arc<AppConfig>) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let aggregator = build_aggregator(&config)?;
    let metrics = HealthMetrics::new()
        .map_err(|e| format!("Failed to create metrics registry: {}", e))?;

    info!(components = ?aggregator.component_names(), "Health checks configured");

    let state = AppState {
        aggregator: Arc::new(aggregator),
        metrics: Arc::new(metrics),
    };
    let app = build_router(state, &config.server);

    let addr: SocketAddr = config.server.listen_address.parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Starting Employee API health server on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_aggregator_has_fixed_components() {
        let aggregator = build_aggregator(&AppConfig::default()).unwrap();
        assert_eq!(aggregator.component_names(), vec!["scylla_db", "redis"]);
    }

    #[test]
    fn test_router_builds_with_credentialed_cors() {
        let config = AppConfig {
            server: ServerConfig {
                listen_address: "127.0.0.1:0".to_string(),
                allowed_origins: vec!["http://localhost:3000".to_string()],
            },
            ..AppConfig::default()
        };
        let state = AppState {
            aggregator: Arc::new(build_aggregator(&config).unwrap()),
            metrics: Arc::new(HealthMetrics::new().unwrap()),
        };

        let _router = build_router(state, &config.server);
    }
}
