use axum::http::HeaderValue;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;

/// Root configuration for the service
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub scylla_db: ScyllaConfig,
    #[serde(default)]
    pub redis: RedisConfig,
    #[serde(default)]
    pub health: HealthConfig,
}

/// HTTP listener and CORS settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_listen_address")]
    pub listen_address: String,
    /// Origins allowed by CORS; empty means permissive
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_address: default_listen_address(),
            allowed_origins: Vec::new(),
        }
    }
}

fn default_listen_address() -> String {
    "0.0.0.0:8081".to_string()
}

/// ScyllaDB contact points and credentials
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScyllaConfig {
    #[serde(default = "default_scylla_hosts")]
    pub hosts: Vec<String>,
    #[serde(default = "default_keyspace")]
    pub keyspace: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Default for ScyllaConfig {
    fn default() -> Self {
        Self {
            hosts: default_scylla_hosts(),
            keyspace: default_keyspace(),
            username: None,
            password: None,
        }
    }
}

fn default_scylla_hosts() -> Vec<String> {
    vec!["localhost:9042".to_string()]
}

fn default_keyspace() -> String {
    "employee_db".to_string()
}

/// Redis endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    #[serde(default = "default_redis_host")]
    pub host: String,
    pub password: Option<String>,
    #[serde(default)]
    pub database: u8,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            host: default_redis_host(),
            password: None,
            database: 0,
        }
    }
}

fn default_redis_host() -> String {
    "localhost:6379".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthConfig {
    /// Per-dependency probe timeout in milliseconds
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            probe_timeout_ms: default_probe_timeout_ms(),
        }
    }
}

fn default_probe_timeout_ms() -> u64 {
    2000
}

impl HealthConfig {
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }
}

impl AppConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        self.server
            .listen_address
            .parse::<SocketAddr>()
            .map_err(|e| {
                format!(
                    "Invalid listen_address '{}': {}",
                    self.server.listen_address, e
                )
            })?;

        for origin in &self.server.allowed_origins {
            if origin == "*" || HeaderValue::from_str(origin).is_err() {
                return Err(format!("Invalid CORS origin '{}'", origin));
            }
        }

        if self.scylla_db.hosts.is_empty() {
            return Err("scylla_db must have at least one host".to_string());
        }

        if self.scylla_db.hosts.iter().any(|h| h.trim().is_empty()) {
            return Err("scylla_db hosts must not be empty".to_string());
        }

        if self.redis.host.trim().is_empty() {
            return Err("redis must have a host".to_string());
        }

        if self.health.probe_timeout_ms == 0 {
            return Err("health.probe_timeout_ms must be greater than zero".to_string());
        }

        Ok(())
    }
}
