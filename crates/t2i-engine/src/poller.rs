use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use t2i_contracts::{TaskSnapshot, TaskStatus};

use crate::clock::Clock;
use crate::error::{GenerationError, Result};
use crate::transport::{ensure_success, parse_json, send, HttpRequest, HttpTransport};

pub const TASK_TYPE_HEADER: &str = "X-ModelScope-Task-Type";
pub const TASK_TYPE_IMAGE_GENERATION: &str = "image_generation";

const ERROR_SNIPPET_CHARS: usize = 800;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    pub interval: Duration,
    pub max_wait: Duration,
    pub request_timeout: Duration,
}

/// Polls `{task_base}/{task_id}` until the task reaches a terminal status.
///
/// Outcomes: `Ok(snapshot)` on success, `ProviderFailure` on an explicit
/// failure, `Timeout` once `max_wait` has elapsed, `Cancelled` when the cancel
/// flag is raised. Any non-terminal status (unknown ones included) sleeps for
/// `interval` and polls again. Deadline and cancel flag are checked at the top
/// of every iteration, so a slow status call still counts against `max_wait`.
pub struct TaskPoller {
    transport: Arc<dyn HttpTransport>,
    clock: Arc<dyn Clock>,
    task_base: String,
    authorization: String,
    settings: PollSettings,
    cancel: Option<Arc<AtomicBool>>,
}

impl TaskPoller {
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        clock: Arc<dyn Clock>,
        task_base: impl Into<String>,
        api_key: &str,
        settings: PollSettings,
    ) -> Self {
        Self {
            transport,
            clock,
            task_base: task_base.into(),
            authorization: format!("Bearer {api_key}"),
            settings,
            cancel: None,
        }
    }

    pub fn with_cancel_flag(mut self, cancel: Option<Arc<AtomicBool>>) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn task_url(&self, task_id: &str) -> String {
        format!("{}/{}", self.task_base, task_id)
    }

    pub fn wait(&self, task_id: &str) -> Result<TaskSnapshot> {
        let started = self.clock.now();
        let deadline = started.checked_add(self.settings.max_wait);
        let mut last_status: Option<String> = None;
        let mut attempt: u32 = 0;

        loop {
            if self.is_cancelled() {
                return Err(GenerationError::Cancelled {
                    task_id: task_id.to_string(),
                });
            }
            let now = self.clock.now();
            if deadline.is_some_and(|deadline| now > deadline) {
                return Err(GenerationError::Timeout {
                    task_id: task_id.to_string(),
                    elapsed: now.saturating_duration_since(started),
                    last_status,
                });
            }

            attempt += 1;
            let snapshot = self.poll_once(task_id)?;
            if !snapshot.raw_status.is_empty() {
                last_status = Some(snapshot.raw_status.clone());
            }
            tracing::debug!(
                task_id,
                attempt,
                status = %snapshot.status,
                "task status polled"
            );

            match snapshot.status {
                TaskStatus::Succeeded => return Ok(snapshot),
                TaskStatus::Failed => {
                    return Err(GenerationError::ProviderFailure(snapshot.failure_message()))
                }
                TaskStatus::Pending | TaskStatus::Running | TaskStatus::Unknown(_) => {
                    self.clock.sleep(self.settings.interval);
                }
            }
        }
    }

    fn poll_once(&self, task_id: &str) -> Result<TaskSnapshot> {
        let url = self.task_url(task_id);
        let request = HttpRequest::get(url.as_str(), self.settings.request_timeout)
            .header("Authorization", self.authorization.as_str())
            .header("Content-Type", "application/json")
            .header(TASK_TYPE_HEADER, TASK_TYPE_IMAGE_GENERATION);
        let response = send(self.transport.as_ref(), &request)?;
        let response = ensure_success(response, &url, ERROR_SNIPPET_CHARS)?;
        let payload = parse_json(&response, &url)?;
        Ok(TaskSnapshot::from_payload(task_id, payload))
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .map(|flag| flag.load(Ordering::SeqCst))
            .unwrap_or(false)
    }
}
