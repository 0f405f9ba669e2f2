//! rollgate-health — post-rollout health verification.
//!
//! Provides a one-shot HTTP prober and the fixed retry policy the
//! deploy controller applies once a rollout has completed.
//!
//! # Architecture
//!
//! ```text
//! DeployController (rollgate-rollout)
//!   └── HEALTH_CHECK stage
//!       ├── HttpProber::get() → StatusCode | ProbeError
//!       ├── ProbeOutcome::classify() (healthy iff 200)
//!       └── HealthPolicy (5 attempts, 10s timeout, 10s between attempts)
//! ```

pub mod policy;
pub mod probe;

pub use http::StatusCode;
pub use policy::{HealthPolicy, ProbeOutcome};
pub use probe::{HttpProber, HyperProber, ProbeError, ProbeFuture};
