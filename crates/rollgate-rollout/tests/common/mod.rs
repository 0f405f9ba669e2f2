//! Scripted collaborators for controller tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use rollgate_core::DeployConfig;
use rollgate_health::{HttpProber, ProbeError, ProbeFuture, StatusCode};
use rollgate_rollout::{
    BackendError, BackendFuture, DeployEvent, DeploymentBackend, EventSink, SleepFuture, Sleeper,
};
use tokio_util::sync::CancellationToken;

/// How a scripted backend operation behaves.
#[derive(Debug, Clone)]
pub enum Step {
    Succeed,
    Fail(&'static str),
    /// Fails the way a command killed by its timeout does.
    TimedOut,
    /// Never completes.
    Hang,
}

/// A backend call, in invocation order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    ApplyUpdate {
        service: String,
        namespace: String,
        image: String,
    },
    WaitForRollout {
        service: String,
        namespace: String,
        timeout: Duration,
    },
    Undo {
        service: String,
        namespace: String,
    },
}

pub struct ScriptedBackend {
    update: Step,
    rollout: Step,
    undo: Step,
    /// Cancelled from inside `undo`, before it completes.
    cancel_during_undo: Option<CancellationToken>,
    calls: Mutex<Vec<Call>>,
}

impl ScriptedBackend {
    pub fn new(update: Step, rollout: Step, undo: Step) -> Self {
        Self {
            update,
            rollout,
            undo,
            cancel_during_undo: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn healthy() -> Self {
        Self::new(Step::Succeed, Step::Succeed, Step::Succeed)
    }

    pub fn cancelling_during_undo(mut self, token: CancellationToken) -> Self {
        self.cancel_during_undo = Some(token);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn undo_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::Undo { .. }))
            .count()
    }

    pub fn rollout_wait_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::WaitForRollout { .. }))
            .count()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

async fn play(step: &Step, command: &str) -> Result<(), BackendError> {
    match step {
        Step::Succeed => Ok(()),
        Step::Fail(stderr) => Err(BackendError::CommandFailed {
            command: command.to_string(),
            status: "exit status: 1".to_string(),
            stderr: stderr.to_string(),
        }),
        Step::TimedOut => Err(BackendError::Timeout {
            command: command.to_string(),
            timeout: Duration::from_secs(60),
        }),
        Step::Hang => std::future::pending().await,
    }
}

impl DeploymentBackend for ScriptedBackend {
    fn apply_update<'a>(
        &'a self,
        service: &'a str,
        namespace: &'a str,
        image: &'a str,
    ) -> BackendFuture<'a> {
        self.record(Call::ApplyUpdate {
            service: service.to_string(),
            namespace: namespace.to_string(),
            image: image.to_string(),
        });
        Box::pin(play(&self.update, "set image"))
    }

    fn wait_for_rollout<'a>(
        &'a self,
        service: &'a str,
        namespace: &'a str,
        timeout: Duration,
    ) -> BackendFuture<'a> {
        self.record(Call::WaitForRollout {
            service: service.to_string(),
            namespace: namespace.to_string(),
            timeout,
        });
        Box::pin(play(&self.rollout, "rollout status"))
    }

    fn undo<'a>(&'a self, service: &'a str, namespace: &'a str) -> BackendFuture<'a> {
        self.record(Call::Undo {
            service: service.to_string(),
            namespace: namespace.to_string(),
        });
        Box::pin(async move {
            if let Some(token) = &self.cancel_during_undo {
                token.cancel();
                tokio::task::yield_now().await;
            }
            play(&self.undo, "rollout undo").await
        })
    }
}

/// Prober answering from a fixed script; once exhausted it keeps
/// returning the last entry.
pub struct ScriptedProber {
    responses: Mutex<VecDeque<Result<u16, ()>>>,
    urls: Mutex<Vec<(String, Duration)>>,
}

impl ScriptedProber {
    /// `Ok(code)` is an HTTP answer, `Err(())` a probe timeout.
    pub fn new(responses: Vec<Result<u16, ()>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            urls: Mutex::new(Vec::new()),
        }
    }

    pub fn statuses(codes: &[u16]) -> Self {
        Self::new(codes.iter().map(|c| Ok(*c)).collect())
    }

    pub fn attempts(&self) -> usize {
        self.urls.lock().unwrap().len()
    }

    pub fn probed(&self) -> Vec<(String, Duration)> {
        self.urls.lock().unwrap().clone()
    }
}

impl HttpProber for ScriptedProber {
    fn get<'a>(&'a self, url: &'a str, timeout: Duration) -> ProbeFuture<'a> {
        self.urls.lock().unwrap().push((url.to_string(), timeout));
        let next = {
            let mut responses = self.responses.lock().unwrap();
            if responses.len() > 1 {
                responses.pop_front()
            } else {
                responses.front().cloned()
            }
        };
        Box::pin(async move {
            match next {
                Some(Ok(code)) => Ok(StatusCode::from_u16(code).unwrap()),
                Some(Err(())) | None => Err(ProbeError::Timeout(timeout)),
            }
        })
    }
}

/// Records requested delays and returns immediately.
#[derive(Default)]
pub struct RecordingSleeper {
    sleeps: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap().clone()
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) -> SleepFuture<'_> {
        self.sleeps.lock().unwrap().push(duration);
        Box::pin(async {})
    }
}

/// Collects emitted events.
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<DeployEvent>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<DeployEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, _config: &DeployConfig, event: &DeployEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

pub fn config(service: &str, namespace: &str, timeout_seconds: u64, rollback: bool) -> DeployConfig {
    let mut config = DeployConfig::new(service, &format!("registry/{service}:v2"));
    config.namespace = namespace.to_string();
    config.timeout_seconds = timeout_seconds;
    config.rollback_on_failure = rollback;
    config
}

/// Prober whose requests never answer.
#[derive(Default)]
pub struct StalledProber {
    attempts: Mutex<u32>,
}

impl StalledProber {
    pub fn attempts(&self) -> u32 {
        *self.attempts.lock().unwrap()
    }
}

impl HttpProber for StalledProber {
    fn get<'a>(&'a self, _url: &'a str, _timeout: Duration) -> ProbeFuture<'a> {
        *self.attempts.lock().unwrap() += 1;
        Box::pin(std::future::pending())
    }
}

/// Cancel `token` after `delay`.
pub fn cancel_after(token: &CancellationToken, delay: Duration) {
    let trigger = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        trigger.cancel();
    });
}
