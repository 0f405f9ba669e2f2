//! rollgate-rollout — the deploy state machine.
//!
//! Drives a single deploy through update, rollout wait, health check,
//! and (on rollout failure) rollback. The platform, the prober, the
//! clock, and the log sink are all injected.
//!
//! # Components
//!
//! - **`backend`** — `DeploymentBackend` trait and `BackendError`
//! - **`kubectl`** — backend that shells out to `kubectl`
//! - **`clock`** — `Sleeper` used between health probes
//! - **`events`** — `DeployEvent` transitions and the `EventSink` they go to
//! - **`controller`** — `DeployController::deploy`
//!
//! # State machine
//!
//! ```text
//! START → UPDATING → ROLLOUT_WAIT → HEALTH_CHECK → Success
//!           │            │               └── 5 failed probes → HealthCheckFailed
//!           │            ├── rollback on  → ROLLING_BACK → RolledBack
//!           │            └── rollback off → RolloutFailed
//!           └── error → UpdateFailed
//! ```

pub mod backend;
pub mod clock;
pub mod controller;
pub mod events;
pub mod kubectl;

pub use backend::{BackendError, BackendFuture, BackendResult, DeploymentBackend};
pub use clock::{SleepFuture, Sleeper, TokioSleeper};
pub use controller::DeployController;
pub use events::{DeployEvent, EventSink, Severity, TracingSink};
pub use kubectl::{DEFAULT_COMMAND_TIMEOUT, KubectlBackend};
