//! Deploy transition events and the sink they are reported to.
//!
//! Events are observational only. They never change the outcome of a
//! deploy.

use std::fmt;

use rollgate_core::{DeployConfig, DeployStage};
use tracing::{error, info, warn};

/// Severity of a deploy event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Info,
    Warn,
    Error,
}

/// One state machine transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeployEvent {
    Started { image: String },
    UpdateApplied,
    UpdateFailed { error: String },
    RolloutWaiting { timeout_seconds: u64 },
    RolloutComplete,
    RolloutFailed { error: String, rollback: bool },
    HealthCheckStarted { url: String },
    ProbeAttemptFailed {
        attempt: u32,
        max_attempts: u32,
        reason: String,
    },
    HealthPassed { attempt: u32 },
    HealthCheckFailed { attempts: u32 },
    RollbackStarted,
    RollbackComplete,
    RollbackFailed { error: String },
    Cancelled { stage: DeployStage },
    Succeeded,
}

impl DeployEvent {
    pub fn severity(&self) -> Severity {
        match self {
            DeployEvent::Started { .. }
            | DeployEvent::UpdateApplied
            | DeployEvent::RolloutWaiting { .. }
            | DeployEvent::RolloutComplete
            | DeployEvent::HealthCheckStarted { .. }
            | DeployEvent::HealthPassed { .. }
            | DeployEvent::RollbackComplete
            | DeployEvent::Succeeded => Severity::Info,
            DeployEvent::ProbeAttemptFailed { .. }
            | DeployEvent::RollbackStarted
            | DeployEvent::Cancelled { .. } => Severity::Warn,
            DeployEvent::UpdateFailed { .. }
            | DeployEvent::RolloutFailed { .. }
            | DeployEvent::HealthCheckFailed { .. }
            | DeployEvent::RollbackFailed { .. } => Severity::Error,
        }
    }

    /// Stage the controller is in when this event fires.
    pub fn stage(&self) -> DeployStage {
        match self {
            DeployEvent::Started { .. }
            | DeployEvent::UpdateApplied
            | DeployEvent::UpdateFailed { .. } => DeployStage::Updating,
            DeployEvent::RolloutWaiting { .. }
            | DeployEvent::RolloutComplete
            | DeployEvent::RolloutFailed { .. } => DeployStage::RolloutWait,
            DeployEvent::HealthCheckStarted { .. }
            | DeployEvent::ProbeAttemptFailed { .. }
            | DeployEvent::HealthPassed { .. }
            | DeployEvent::HealthCheckFailed { .. } => DeployStage::HealthCheck,
            DeployEvent::RollbackStarted
            | DeployEvent::RollbackComplete
            | DeployEvent::RollbackFailed { .. } => DeployStage::RollingBack,
            DeployEvent::Cancelled { stage } => *stage,
            DeployEvent::Succeeded => DeployStage::Done,
        }
    }
}

impl fmt::Display for DeployEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeployEvent::Started { image } => write!(f, "starting deploy of {image}"),
            DeployEvent::UpdateApplied => f.write_str("deployment updated"),
            DeployEvent::UpdateFailed { error } => write!(f, "failed to update deployment: {error}"),
            DeployEvent::RolloutWaiting { timeout_seconds } => {
                write!(f, "waiting up to {timeout_seconds}s for rollout")
            }
            DeployEvent::RolloutComplete => f.write_str("rollout complete"),
            DeployEvent::RolloutFailed { error, .. } => write!(f, "rollout failed: {error}"),
            DeployEvent::HealthCheckStarted { url } => write!(f, "verifying health at {url}"),
            DeployEvent::ProbeAttemptFailed {
                attempt,
                max_attempts,
                reason,
            } => write!(f, "health check attempt {attempt}/{max_attempts} failed: {reason}"),
            DeployEvent::HealthPassed { attempt } => {
                write!(f, "health check passed on attempt {attempt}")
            }
            DeployEvent::HealthCheckFailed { attempts } => {
                write!(f, "health check failed after {attempts} attempts")
            }
            DeployEvent::RollbackStarted => f.write_str("rolling back deployment"),
            DeployEvent::RollbackComplete => f.write_str("rollback complete"),
            DeployEvent::RollbackFailed { error } => write!(f, "rollback failed: {error}"),
            DeployEvent::Cancelled { stage } => write!(f, "deploy cancelled during {stage}"),
            DeployEvent::Succeeded => f.write_str("deploy completed successfully"),
        }
    }
}

/// Receives every transition of a deploy.
pub trait EventSink: Send + Sync {
    fn emit(&self, config: &DeployConfig, event: &DeployEvent);
}

/// Sink that forwards events to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, config: &DeployConfig, event: &DeployEvent) {
        let service = config.service_name.as_str();
        let namespace = config.namespace.as_str();
        let stage = event.stage();

        match event {
            DeployEvent::ProbeAttemptFailed {
                attempt,
                max_attempts,
                reason,
            } => {
                warn!(%service, %namespace, %stage, attempt, max_attempts, %reason, "health check attempt failed");
            }
            DeployEvent::HealthPassed { attempt } => {
                info!(%service, %namespace, %stage, attempt, "health check passed");
            }
            DeployEvent::RolloutFailed { error, rollback } => {
                error!(%service, %namespace, %stage, %error, rollback, "rollout failed");
            }
            _ => match event.severity() {
                Severity::Info => info!(%service, %namespace, %stage, "{event}"),
                Severity::Warn => warn!(%service, %namespace, %stage, "{event}"),
                Severity::Error => error!(%service, %namespace, %stage, "{event}"),
            },
        }
    }
}
