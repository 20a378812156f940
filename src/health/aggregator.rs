use super::checks::{ComponentState, HealthCheck, ProbeError, ProbeResult};
use futures::FutureExt;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tokio::time::timeout;
use tracing::{debug, error, warn};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OverallStatus {
    Up,
    Down,
    Degraded,
}

impl std::fmt::Display for OverallStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OverallStatus::Up => write!(f, "up"),
            OverallStatus::Down => write!(f, "down"),
            OverallStatus::Degraded => write!(f, "degraded"),
        }
    }
}

/// Outcome of one aggregation pass. Recomputed on every request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HealthReport {
    pub overall: OverallStatus,
    pub components: BTreeMap<String, ComponentState>,
    #[serde(skip)]
    pub probes: Vec<ProbeResult>,
}

impl HealthReport {
    pub fn from_results(probes: Vec<ProbeResult>) -> Self {
        let components: BTreeMap<String, ComponentState> = probes
            .iter()
            .map(|probe| (probe.name.clone(), probe.state))
            .collect();

        let up = components.values().filter(|state| state.is_up()).count();

        let overall = if up == components.len() {
            OverallStatus::Up
        } else if up == 0 {
            OverallStatus::Down
        } else {
            OverallStatus::Degraded
        };

        Self {
            overall,
            components,
            probes,
        }
    }

    /// State of the service itself: up only when every dependency is up
    pub fn service_state(&self) -> ComponentState {
        match self.overall {
            OverallStatus::Up => ComponentState::Up,
            OverallStatus::Down | OverallStatus::Degraded => ComponentState::Down,
        }
    }

    pub fn is_up(&self) -> bool {
        self.overall == OverallStatus::Up
    }
}

/// Runs a fixed set of health checks and combines their results
pub struct HealthAggregator {
    checks: Vec<Arc<dyn HealthCheck>>,
}

impl HealthAggregator {
    pub fn new(checks: Vec<Arc<dyn HealthCheck>>) -> Self {
        Self { checks }
    }

    pub fn component_names(&self) -> Vec<&str> {
        self.checks.iter().map(|check| check.name()).collect()
    }

    /// Probe every dependency concurrently and build a report.
    ///
    /// Total latency is bounded by the slowest check's timeout. A check that
    /// hangs past its timeout or panics is reported as `Down`.
    pub async fn check(&self) -> HealthReport {
        let results = join_all(self.checks.iter().map(|check| run_check(check.as_ref()))).await;
        let report = HealthReport::from_results(results);

        debug!(overall = %report.overall, "health aggregation complete");
        report
    }
}

async fn run_check(check: &dyn HealthCheck) -> ProbeResult {
    let name = check.name().to_string();
    let limit = check.timeout();
    let start = Instant::now();

    let guarded = AssertUnwindSafe(check.check()).catch_unwind();

    match timeout(limit, guarded).await {
        Ok(Ok(result)) => result,
        Ok(Err(_)) => {
            error!(component = %name, "health check panicked");
            ProbeResult::down(name, "health check panicked", start.elapsed().as_millis() as u64)
        }
        Err(_) => {
            let detail = ProbeError::Timeout(limit).to_string();
            warn!(component = %name, "health check {}", detail);
            ProbeResult::down(name, detail, start.elapsed().as_millis() as u64)
        }
    }
}
