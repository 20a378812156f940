use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::time::timeout;
use tracing::{debug, error, warn};
use utoipa::ToSchema;

/// State of a single dependency as seen by one probe invocation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ComponentState {
    Up,
    Down,
}

impl ComponentState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentState::Up => "up",
            ComponentState::Down => "down",
        }
    }

    pub fn is_up(&self) -> bool {
        matches!(self, ComponentState::Up)
    }
}

impl std::fmt::Display for ComponentState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a dependency was classified as down
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProbeError {
    #[error("connection failed: {0}")]
    Connection(String),
    #[error("timed out after {}ms", .0.as_millis())]
    Timeout(Duration),
    #[error("unexpected reply: {0}")]
    Protocol(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProbeResult {
    pub name: String,
    pub state: ComponentState,
    /// Failure text, for logs only
    pub detail: Option<String>,
    pub duration_ms: u64,
}

impl ProbeResult {
    pub fn up(name: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            name: name.into(),
            state: ComponentState::Up,
            detail: None,
            duration_ms,
        }
    }

    pub fn down(name: impl Into<String>, detail: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            name: name.into(),
            state: ComponentState::Down,
            detail: Some(detail.into()),
            duration_ms,
        }
    }
}

/// Minimal capability a dependency client must offer to be probed
#[async_trait]
pub trait DependencyClient: Send + Sync {
    /// Perform one lightweight round-trip against the dependency
    async fn ping(&self) -> Result<(), ProbeError>;
}

/// Health check trait
#[async_trait]
pub trait HealthCheck: Send + Sync {
    /// Name of the component, used as the key in reports
    fn name(&self) -> &str;

    /// Perform the health check. Dependency failures are reported as `Down`, never raised.
    async fn check(&self) -> ProbeResult;

    /// Upper bound for a single check
    fn timeout(&self) -> Duration {
        Duration::from_secs(5)
    }
}

/// Probes one dependency through its client, bounded by a timeout
pub struct DependencyCheck {
    name: String,
    client: Arc<dyn DependencyClient>,
    timeout: Duration,
}

impl DependencyCheck {
    pub fn new(name: impl Into<String>, client: Arc<dyn DependencyClient>, timeout: Duration) -> Self {
        Self {
            name: name.into(),
            client,
            timeout,
        }
    }
}

#[async_trait]
impl HealthCheck for DependencyCheck {
    fn name(&self) -> &str {
        &self.name
    }

    async fn check(&self) -> ProbeResult {
        let start = Instant::now();

        let outcome = match timeout(self.timeout, self.client.ping()).await {
            Ok(result) => result,
            Err(_) => Err(ProbeError::Timeout(self.timeout)),
        };

        let duration_ms = start.elapsed().as_millis() as u64;

        match outcome {
            Ok(()) => {
                debug!(component = %self.name, duration_ms, "dependency is up");
                ProbeResult::up(self.name.clone(), duration_ms)
            }
            Err(e @ ProbeError::Timeout(_)) => {
                warn!(component = %self.name, duration_ms, "health probe {}", e);
                ProbeResult::down(self.name.clone(), e.to_string(), duration_ms)
            }
            Err(e) => {
                error!(component = %self.name, duration_ms, "health probe failed: {}", e);
                ProbeResult::down(self.name.clone(), e.to_string(), duration_ms)
            }
        }
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[cfg(test)]
pub(crate) mod fakes {
    use super::*;

    /// Client that answers every ping with a fixed outcome, optionally after a delay
    pub struct FakeClient {
        pub outcome: Result<(), ProbeError>,
        pub delay: Duration,
    }

    impl FakeClient {
        pub fn healthy() -> Arc<Self> {
            Arc::new(Self {
                outcome: Ok(()),
                delay: Duration::ZERO,
            })
        }

        pub fn failing(error: ProbeError) -> Arc<Self> {
            Arc::new(Self {
                outcome: Err(error),
                delay: Duration::ZERO,
            })
        }

        pub fn hanging() -> Arc<Self> {
            Arc::new(Self {
                outcome: Ok(()),
                delay: Duration::from_secs(3600),
            })
        }
    }

    #[async_trait]
    impl DependencyClient for FakeClient {
        async fn ping(&self) -> Result<(), ProbeError> {
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.outcome.clone()
        }
    }
}
