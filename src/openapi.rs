//! OpenAPI document for the health endpoints, served through Swagger UI.

use crate::handlers;
use crate::handlers::health::{DetailedHealth, HealthMessage};
use crate::health::ComponentState;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Employee API",
        version = "1.0",
        description = "Liveness and dependency health of the employee webserver",
        license(name = "Apache 2.0", url = "http://www.apache.org/licenses/LICENSE-2.0.html")
    ),
    paths(
        handlers::health::health_check,
        handlers::health::detailed_health_check,
    ),
    components(schemas(ComponentState, HealthMessage, DetailedHealth)),
    tags((name = "health", description = "Liveness and dependency health checks"))
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_lists_health_paths() {
        let doc = ApiDoc::openapi();

        assert_eq!(doc.info.title, "Employee API");
        assert!(doc.paths.paths.contains_key("/api/v1/employee/health"));
        assert!(doc.paths.paths.contains_key("/api/v1/employee/health/detail"));
    }
}
