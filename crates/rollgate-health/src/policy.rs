//! Health check retry policy and per-attempt classification.

use std::fmt;
use std::time::Duration;

use http::StatusCode;

use crate::probe::ProbeError;

/// Fixed retry policy for post-rollout health checks.
///
/// Retries use a constant delay; there is no exponential growth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthPolicy {
    /// Probe attempts before giving up.
    pub max_attempts: u32,
    /// Timeout for a single probe.
    pub probe_timeout: Duration,
    /// Delay between a failed attempt and the next one.
    pub retry_delay: Duration,
}

impl Default for HealthPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            probe_timeout: Duration::from_secs(10),
            retry_delay: Duration::from_secs(10),
        }
    }
}

impl HealthPolicy {
    /// Worst-case time spent in the health check stage.
    pub fn worst_case(&self) -> Duration {
        let attempts = self.max_attempts;
        self.probe_timeout * attempts + self.retry_delay * attempts.saturating_sub(1)
    }
}

/// Classification of a single probe attempt.
#[derive(Debug)]
pub enum ProbeOutcome {
    /// Endpoint answered 200.
    Healthy,
    /// Endpoint answered with any other status.
    BadStatus(StatusCode),
    /// The probe itself failed (connect, timeout, protocol).
    Error(ProbeError),
}

impl ProbeOutcome {
    /// Only an exact 200 counts as healthy.
    pub fn classify(result: Result<StatusCode, ProbeError>) -> Self {
        match result {
            Ok(StatusCode::OK) => ProbeOutcome::Healthy,
            Ok(status) => ProbeOutcome::BadStatus(status),
            Err(e) => ProbeOutcome::Error(e),
        }
    }

    pub fn is_healthy(&self) -> bool {
        matches!(self, ProbeOutcome::Healthy)
    }
}

impl fmt::Display for ProbeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeOutcome::Healthy => f.write_str("healthy"),
            ProbeOutcome::BadStatus(status) => write!(f, "unexpected status {status}"),
            ProbeOutcome::Error(e) => write!(f, "{e}"),
        }
    }
}
