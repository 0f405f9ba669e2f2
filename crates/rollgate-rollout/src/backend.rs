//! Deployment backend abstraction.
//!
//! The backend is whatever control plane actually applies the image,
//! reports rollout completion, and reverts. The controller only sees
//! success or a `BackendError`.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use thiserror::Error;

/// Result type alias for backend operations.
pub type BackendResult<T> = Result<T, BackendError>;

/// Boxed future returned by backend operations.
pub type BackendFuture<'a> = Pin<Box<dyn Future<Output = BackendResult<()>> + Send + 'a>>;

/// Errors reported by a deployment backend.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("failed to run `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` failed ({status}): {stderr}")]
    CommandFailed {
        command: String,
        status: String,
        stderr: String,
    },

    #[error("`{command}` did not finish within {timeout:?}")]
    Timeout { command: String, timeout: Duration },
}

/// Control-plane operations needed for a rolling deploy.
pub trait DeploymentBackend: Send + Sync {
    /// Point the deployment for `service` at `image`.
    fn apply_update<'a>(
        &'a self,
        service: &'a str,
        namespace: &'a str,
        image: &'a str,
    ) -> BackendFuture<'a>;

    /// Block until the rollout completes or `timeout` elapses.
    fn wait_for_rollout<'a>(
        &'a self,
        service: &'a str,
        namespace: &'a str,
        timeout: Duration,
    ) -> BackendFuture<'a>;

    /// Revert `service` to its previous revision.
    fn undo<'a>(&'a self, service: &'a str, namespace: &'a str) -> BackendFuture<'a>;
}
