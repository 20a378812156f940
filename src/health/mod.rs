pub mod aggregator;
pub mod checks;
pub mod clients;

pub use aggregator::{HealthAggregator, HealthReport, OverallStatus};
pub use checks::{
    ComponentState, DependencyCheck, DependencyClient, HealthCheck, ProbeError, ProbeResult,
};
pub use clients::{RedisClient, ScyllaClient};
