use crate::models::AppConfig;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Load configuration from a YAML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Arc<AppConfig>, String> {
    let path = path.as_ref();
    info!("Loading configuration from: {}", path.display());

    let contents = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config file '{}': {}", path.display(), e))?;

    let config = parse_config(&contents)?;

    info!(
        scylla_hosts = ?config.scylla_db.hosts,
        redis_host = %config.redis.host,
        probe_timeout_ms = config.health.probe_timeout_ms,
        "Configuration loaded successfully"
    );

    Ok(Arc::new(config))
}

/// Parse and validate configuration from YAML text
pub fn parse_config(contents: &str) -> Result<AppConfig, String> {
    let config: AppConfig = serde_yaml::from_str(contents)
        .map_err(|e| format!("Failed to parse YAML config: {}", e))?;

    config.validate()?;

    Ok(config)
}

/// Load configuration with fallback options
///
/// Order: `CONFIG_PATH`, then `config.yaml` / `config.yml` in the working
/// directory, then built-in defaults.
pub fn load_config_with_fallback() -> Result<Arc<AppConfig>, String> {
    if let Ok(config_path) = std::env::var("CONFIG_PATH") {
        // An explicit path that fails is an error, not a reason to fall back
        return load_config(&config_path);
    }

    for path in ["config.yaml", "config.yml"] {
        if Path::new(path).exists() {
            match load_config(path) {
                Ok(config) => return Ok(config),
                Err(e) => warn!("Failed to load config from '{}': {}", path, e),
            }
        }
    }

    warn!("No configuration file found, using defaults");
    let config = AppConfig::default();
    config.validate()?;
    Ok(Arc::new(config))
}
