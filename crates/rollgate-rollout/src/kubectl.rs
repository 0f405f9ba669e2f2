//! `kubectl`-backed deployment backend.
//!
//! Each operation is one `kubectl` invocation against
//! `deployment/<service>` in the configured namespace. The container
//! being updated is assumed to share the service's name.

use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::debug;

use crate::backend::{BackendError, BackendFuture, BackendResult, DeploymentBackend};

/// Extra time granted past `--timeout` before the rollout watch is killed.
const ROLLOUT_GRACE: Duration = Duration::from_secs(30);

/// Default bound for `set image` and `rollout undo`.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(60);

/// Runs `kubectl` as a subprocess.
#[derive(Debug, Clone)]
pub struct KubectlBackend {
    program: String,
    command_timeout: Duration,
}

impl Default for KubectlBackend {
    fn default() -> Self {
        Self::new("kubectl")
    }
}

impl KubectlBackend {
    /// Create a backend invoking `program` (usually `kubectl`).
    pub fn new(program: &str) -> Self {
        Self {
            program: program.to_string(),
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
        }
    }

    /// Bound `set image` and `rollout undo`. A command still running
    /// after `timeout` is killed and reported as `BackendError::Timeout`.
    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    /// Run `program args...`, failing on non-zero exit or after `limit`.
    async fn run(&self, args: &[String], limit: Duration) -> BackendResult<()> {
        let command = format!("{} {}", self.program, args.join(" "));
        debug!(%command, "running backend command");

        let output = Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output();

        let output = match tokio::time::timeout(limit, output).await {
            Ok(result) => result,
            Err(_) => {
                return Err(BackendError::Timeout {
                    command,
                    timeout: limit,
                });
            }
        }
        .map_err(|source| BackendError::Spawn {
            command: command.clone(),
            source,
        })?;

        if output.status.success() {
            Ok(())
        } else {
            Err(BackendError::CommandFailed {
                command,
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }
}

fn set_image_args(service: &str, namespace: &str, image: &str) -> Vec<String> {
    vec![
        "-n".to_string(),
        namespace.to_string(),
        "set".to_string(),
        "image".to_string(),
        format!("deployment/{service}"),
        format!("{service}={image}"),
    ]
}

fn rollout_status_args(service: &str, namespace: &str, timeout: Duration) -> Vec<String> {
    vec![
        "-n".to_string(),
        namespace.to_string(),
        "rollout".to_string(),
        "status".to_string(),
        format!("deployment/{service}"),
        format!("--timeout={}s", timeout.as_secs()),
    ]
}

fn rollout_undo_args(service: &str, namespace: &str) -> Vec<String> {
    vec![
        "-n".to_string(),
        namespace.to_string(),
        "rollout".to_string(),
        "undo".to_string(),
        format!("deployment/{service}"),
    ]
}

impl DeploymentBackend for KubectlBackend {
    fn apply_update<'a>(
        &'a self,
        service: &'a str,
        namespace: &'a str,
        image: &'a str,
    ) -> BackendFuture<'a> {
        Box::pin(async move {
            let args = set_image_args(service, namespace, image);
            self.run(&args, self.command_timeout).await
        })
    }

    fn wait_for_rollout<'a>(
        &'a self,
        service: &'a str,
        namespace: &'a str,
        timeout: Duration,
    ) -> BackendFuture<'a> {
        Box::pin(async move {
            let args = rollout_status_args(service, namespace, timeout);
            self.run(&args, timeout + ROLLOUT_GRACE).await
        })
    }

    fn undo<'a>(&'a self, service: &'a str, namespace: &'a str) -> BackendFuture<'a> {
        Box::pin(async move {
            let args = rollout_undo_args(service, namespace);
            self.run(&args, self.command_timeout).await
        })
    }
}
