pub mod prometheus_metrics;

pub use prometheus_metrics::{HealthMetrics, metrics_handler};
