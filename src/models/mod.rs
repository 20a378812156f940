pub mod settings;

pub use settings::{AppConfig, HealthConfig, RedisConfig, ScyllaConfig, ServerConfig};
