//! Deploy outcomes.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Stage of the deploy state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeployStage {
    /// Applying the new image to the deployment.
    Updating,
    /// Waiting for the platform to finish the rollout.
    RolloutWait,
    /// Probing the service health endpoint.
    HealthCheck,
    /// Reverting to the previous version.
    RollingBack,
    /// Terminal.
    Done,
}

impl fmt::Display for DeployStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DeployStage::Updating => "updating",
            DeployStage::RolloutWait => "rollout_wait",
            DeployStage::HealthCheck => "health_check",
            DeployStage::RollingBack => "rolling_back",
            DeployStage::Done => "done",
        };
        f.write_str(name)
    }
}

/// Terminal outcome of a deploy. Every variant carries a human-readable cause.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DeployResult {
    /// Rollout completed and the health endpoint answered 200.
    Success { message: String, probe_attempts: u32 },
    /// The update command was rejected. Nothing else ran.
    UpdateFailed { cause: String },
    /// The rollout did not complete and rollback was disabled.
    RolloutFailed { cause: String },
    /// Every health probe failed. No rollback is attempted.
    HealthCheckFailed { cause: String, attempts: u32 },
    /// The rollout failed and an undo was issued.
    ///
    /// `undo_error` is set when the undo command itself failed; the
    /// outcome stays `RolledBack` either way.
    RolledBack {
        cause: String,
        undo_error: Option<String>,
    },
    /// The deploy was cancelled before reaching a terminal stage.
    Cancelled { stage: DeployStage },
}

impl DeployResult {
    /// Whether the deploy succeeded.
    pub fn is_success(&self) -> bool {
        matches!(self, DeployResult::Success { .. })
    }

    /// Human-readable cause of this outcome.
    pub fn cause(&self) -> String {
        match self {
            DeployResult::Success { message, .. } => message.clone(),
            DeployResult::UpdateFailed { cause }
            | DeployResult::RolloutFailed { cause }
            | DeployResult::HealthCheckFailed { cause, .. } => cause.clone(),
            DeployResult::RolledBack { cause, undo_error } => match undo_error {
                Some(err) => format!("{cause}; undo also failed: {err}"),
                None => cause.clone(),
            },
            DeployResult::Cancelled { stage } => format!("cancelled during {stage}"),
        }
    }

    /// Short outcome name, matching the serialized tag.
    pub fn name(&self) -> &'static str {
        match self {
            DeployResult::Success { .. } => "success",
            DeployResult::UpdateFailed { .. } => "update_failed",
            DeployResult::RolloutFailed { .. } => "rollout_failed",
            DeployResult::HealthCheckFailed { .. } => "health_check_failed",
            DeployResult::RolledBack { .. } => "rolled_back",
            DeployResult::Cancelled { .. } => "cancelled",
        }
    }

    /// Process exit code for this outcome: 0 on success, 1 otherwise.
    pub fn exit_code(&self) -> u8 {
        if self.is_success() { 0 } else { 1 }
    }
}

impl fmt::Display for DeployResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name(), self.cause())
    }
}
