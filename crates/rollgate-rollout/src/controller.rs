//! Deploy controller — drives one deploy through the state machine.
//!
//! The controller is stateless across calls. Each `deploy` runs the
//! stages in order and always returns a classified `DeployResult`;
//! backend and probe failures never escape as errors.

use std::sync::Arc;

use rollgate_core::{DeployConfig, DeployResult, DeployStage};
use rollgate_health::{HealthPolicy, HttpProber, ProbeError, ProbeOutcome};
use tokio_util::sync::CancellationToken;

use crate::backend::{BackendError, DeploymentBackend};
use crate::clock::{Sleeper, TokioSleeper};
use crate::events::{DeployEvent, EventSink, TracingSink};

/// Orchestrates update → rollout wait → health check → (rollback).
///
/// Concurrent deploys of the same service are not coordinated here;
/// callers must serialize them.
pub struct DeployController {
    backend: Arc<dyn DeploymentBackend>,
    prober: Arc<dyn HttpProber>,
    sleeper: Arc<dyn Sleeper>,
    sink: Arc<dyn EventSink>,
    policy: HealthPolicy,
}

impl DeployController {
    /// Create a controller with the real-time sleeper and tracing sink.
    pub fn new(backend: Arc<dyn DeploymentBackend>, prober: Arc<dyn HttpProber>) -> Self {
        Self {
            backend,
            prober,
            sleeper: Arc::new(TokioSleeper),
            sink: Arc::new(TracingSink),
            policy: HealthPolicy::default(),
        }
    }

    /// Replace the sleeper used between health probes.
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Replace the event sink.
    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Replace the health check policy.
    pub fn with_policy(mut self, policy: HealthPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> &HealthPolicy {
        &self.policy
    }

    /// Run one deploy of `config`.
    ///
    /// `cancel` aborts between stages and interrupts the rollout wait and
    /// health probing. It is ignored once rollback has started.
    pub async fn deploy(&self, config: &DeployConfig, cancel: &CancellationToken) -> DeployResult {
        let service = config.service_name.as_str();
        let namespace = config.namespace.as_str();

        self.emit(
            config,
            DeployEvent::Started {
                image: config.image.clone(),
            },
        );

        // UPDATING
        if cancel.is_cancelled() {
            return self.cancelled(config, DeployStage::Updating);
        }
        if let Err(e) = self
            .backend
            .apply_update(service, namespace, &config.image)
            .await
        {
            self.emit(config, DeployEvent::UpdateFailed { error: e.to_string() });
            return DeployResult::UpdateFailed {
                cause: format!("failed to update deployment: {e}"),
            };
        }
        self.emit(config, DeployEvent::UpdateApplied);

        // ROLLOUT_WAIT
        if cancel.is_cancelled() {
            return self.cancelled(config, DeployStage::RolloutWait);
        }
        self.emit(
            config,
            DeployEvent::RolloutWaiting {
                timeout_seconds: config.timeout_seconds,
            },
        );
        let rollout = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return self.cancelled(config, DeployStage::RolloutWait);
            }
            result = self.backend.wait_for_rollout(service, namespace, config.rollout_timeout()) => result,
        };
        if let Err(e) = rollout {
            self.emit(
                config,
                DeployEvent::RolloutFailed {
                    error: e.to_string(),
                    rollback: config.rollback_on_failure,
                },
            );
            if config.rollback_on_failure {
                return self.roll_back(config, e).await;
            }
            return DeployResult::RolloutFailed {
                cause: format!("rollout did not complete: {e}"),
            };
        }
        self.emit(config, DeployEvent::RolloutComplete);

        // HEALTH_CHECK. A failure here is reported but never rolled back.
        if cancel.is_cancelled() {
            return self.cancelled(config, DeployStage::HealthCheck);
        }
        self.verify_health(config, cancel).await
    }

    /// Probe the service until it answers 200 or attempts run out.
    async fn verify_health(&self, config: &DeployConfig, cancel: &CancellationToken) -> DeployResult {
        let url = config.health_url();
        let max_attempts = self.policy.max_attempts;
        let probe_timeout = self.policy.probe_timeout;
        let mut last_reason = String::from("no probe attempts were made");

        self.emit(config, DeployEvent::HealthCheckStarted { url: url.clone() });

        for attempt in 1..=max_attempts {
            let probe = async {
                tokio::time::timeout(probe_timeout, self.prober.get(&url, probe_timeout))
                    .await
                    .unwrap_or_else(|_| Err(ProbeError::Timeout(probe_timeout)))
            };
            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    return self.cancelled(config, DeployStage::HealthCheck);
                }
                result = probe => ProbeOutcome::classify(result),
            };

            if outcome.is_healthy() {
                self.emit(config, DeployEvent::HealthPassed { attempt });
                self.emit(config, DeployEvent::Succeeded);
                return DeployResult::Success {
                    message: format!(
                        "{} is running {} and healthy",
                        config.service_name, config.image
                    ),
                    probe_attempts: attempt,
                };
            }

            last_reason = outcome.to_string();
            self.emit(
                config,
                DeployEvent::ProbeAttemptFailed {
                    attempt,
                    max_attempts,
                    reason: last_reason.clone(),
                },
            );

            if attempt < max_attempts {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        return self.cancelled(config, DeployStage::HealthCheck);
                    }
                    _ = self.sleeper.sleep(self.policy.retry_delay) => {}
                }
            }
        }

        self.emit(
            config,
            DeployEvent::HealthCheckFailed {
                attempts: max_attempts,
            },
        );
        DeployResult::HealthCheckFailed {
            cause: format!(
                "health check failed after {max_attempts} attempts; last: {last_reason}"
            ),
            attempts: max_attempts,
        }
    }

    /// Issue an undo. Runs to completion regardless of cancellation, and
    /// the outcome is `RolledBack` whether or not the undo succeeded.
    async fn roll_back(&self, config: &DeployConfig, rollout_error: BackendError) -> DeployResult {
        self.emit(config, DeployEvent::RollbackStarted);
        let cause = format!("rollout did not complete: {rollout_error}");

        match self
            .backend
            .undo(&config.service_name, &config.namespace)
            .await
        {
            Ok(()) => {
                self.emit(config, DeployEvent::RollbackComplete);
                DeployResult::RolledBack {
                    cause,
                    undo_error: None,
                }
            }
            Err(e) => {
                self.emit(config, DeployEvent::RollbackFailed { error: e.to_string() });
                DeployResult::RolledBack {
                    cause,
                    undo_error: Some(e.to_string()),
                }
            }
        }
    }

    fn cancelled(&self, config: &DeployConfig, stage: DeployStage) -> DeployResult {
        self.emit(config, DeployEvent::Cancelled { stage });
        DeployResult::Cancelled { stage }
    }

    fn emit(&self, config: &DeployConfig, event: DeployEvent) {
        self.sink.emit(config, &event);
    }
}
