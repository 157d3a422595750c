//! Deduplicating background task manager.
//!
//! Render jobs are long-running and identical requests arrive in bursts, so
//! tasks are keyed by id: submitting an id that is already pending or
//! running joins the existing task instead of starting a second one. Jobs
//! run on a fixed pool of worker threads fed by a channel; a panicking job
//! poisons nothing and is recorded as failed.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};
use variorum_core::{CancelToken, Result, VariorumError};

/// Lifecycle of a background task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Pending,
    Running,
    Finished,
    Failed,
    Canceled,
}

impl TaskState {
    /// Terminal tasks never transition again and may be resubmitted
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskState::Finished | TaskState::Failed | TaskState::Canceled)
    }
}

/// Snapshot of one task's status
#[derive(Debug, Clone)]
pub struct TaskInfo {
    pub state: TaskState,
    /// Failure message, set when the state is Failed
    pub note: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
}

/// What happened to a submission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
    /// A new task was started
    Submitted,
    /// An equivalent task was already in flight; the caller shares it
    Joined,
}

/// A unit of background work. Receives the task's cancel token and is
/// expected to poll it at natural boundaries.
pub type Job = Box<dyn FnOnce(&CancelToken) -> Result<()> + Send + 'static>;

struct TaskEntry {
    info: TaskInfo,
    cancel: CancelToken,
}

/// Fixed-size worker pool with a keyed task registry
pub struct TaskManager {
    registry: Arc<Mutex<HashMap<String, TaskEntry>>>,
    sender: Mutex<Option<Sender<(String, Job)>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl TaskManager {
    /// Spawn `worker_count` worker threads (at least one)
    pub fn new(worker_count: usize) -> Self {
        let registry: Arc<Mutex<HashMap<String, TaskEntry>>> =
            Arc::new(Mutex::new(HashMap::new()));
        let (sender, receiver) = mpsc::channel::<(String, Job)>();
        let receiver = Arc::new(Mutex::new(receiver));

        let mut workers = Vec::new();
        for worker in 0..worker_count.max(1) {
            let registry = Arc::clone(&registry);
            let receiver = Arc::clone(&receiver);
            workers.push(std::thread::spawn(move || {
                worker_loop(worker, &registry, &receiver);
            }));
        }

        Self {
            registry,
            sender: Mutex::new(Some(sender)),
            workers: Mutex::new(workers),
        }
    }

    /// Submit a job under a task id.
    ///
    /// When a task with the same id is already pending or running, the job
    /// is dropped and the caller joins the in-flight task. A terminal entry
    /// under the same id is replaced.
    pub fn submit(&self, task_id: &str, job: Job) -> Result<Submission> {
        let mut registry = lock_registry(&self.registry)?;
        if let Some(entry) = registry.get(task_id) {
            if !entry.info.state.is_terminal() {
                debug!(task = task_id, "joining in-flight task");
                return Ok(Submission::Joined);
            }
        }

        registry.insert(
            task_id.to_string(),
            TaskEntry {
                info: TaskInfo {
                    state: TaskState::Pending,
                    note: None,
                    started_at: None,
                    ended_at: None,
                },
                cancel: CancelToken::new(),
            },
        );
        drop(registry);

        let sender = self.sender.lock().map_err(|_| poisoned())?;
        match sender.as_ref() {
            Some(sender) => {
                sender
                    .send((task_id.to_string(), job))
                    .map_err(|_| VariorumError::Internal {
                        message: "task workers are shut down".to_string(),
                    })?;
                info!(task = task_id, "task submitted");
                Ok(Submission::Submitted)
            }
            None => Err(VariorumError::Internal {
                message: "task manager is shut down".to_string(),
            }),
        }
    }

    /// Request cancellation of a task. Idempotent; unknown ids are ignored.
    pub fn cancel(&self, task_id: &str) -> Result<()> {
        let registry = lock_registry(&self.registry)?;
        if let Some(entry) = registry.get(task_id) {
            warn!(task = task_id, "cancel requested");
            entry.cancel.cancel();
        }
        Ok(())
    }

    /// True while a task with this id is pending or running. Terminal
    /// tasks are queryable through [`Self::status`] but no longer exist
    /// for dedup purposes.
    pub fn exists(&self, task_id: &str) -> Result<bool> {
        Ok(lock_registry(&self.registry)?
            .get(task_id)
            .map(|entry| !entry.info.state.is_terminal())
            .unwrap_or(false))
    }

    pub fn status(&self, task_id: &str) -> Result<Option<TaskInfo>> {
        Ok(lock_registry(&self.registry)?
            .get(task_id)
            .map(|entry| entry.info.clone()))
    }

    /// Stop accepting work and join every worker. Queued jobs still drain.
    pub fn shutdown(&self) {
        if let Ok(mut sender) = self.sender.lock() {
            sender.take();
        }
        if let Ok(mut workers) = self.workers.lock() {
            for handle in workers.drain(..) {
                let _ = handle.join();
            }
        }
    }
}

impl Drop for TaskManager {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn poisoned() -> VariorumError {
    VariorumError::Internal {
        message: "task registry lock poisoned".to_string(),
    }
}

fn lock_registry(
    registry: &Mutex<HashMap<String, TaskEntry>>,
) -> Result<std::sync::MutexGuard<'_, HashMap<String, TaskEntry>>> {
    registry.lock().map_err(|_| poisoned())
}

fn worker_loop(
    worker: usize,
    registry: &Mutex<HashMap<String, TaskEntry>>,
    receiver: &Mutex<Receiver<(String, Job)>>,
) {
    loop {
        let (task_id, job) = {
            let guard = match receiver.lock() {
                Ok(guard) => guard,
                Err(_) => break,
            };
            match guard.recv() {
                Ok(message) => message,
                // channel closed: shutdown
                Err(_) => break,
            }
        };

        let cancel = match mark_running(registry, &task_id) {
            Some(cancel) => cancel,
            // entry vanished; nothing to report against
            None => continue,
        };

        debug!(worker, task = %task_id, "task starting");
        let outcome = catch_unwind(AssertUnwindSafe(|| job(&cancel)));

        let (state, note) = match outcome {
            Ok(Ok(())) => (TaskState::Finished, None),
            Ok(Err(VariorumError::Canceled)) => (TaskState::Canceled, None),
            Ok(Err(err)) => {
                error!(task = %task_id, error = %err, "task failed");
                (TaskState::Failed, Some(err.to_string()))
            }
            Err(_) => {
                error!(task = %task_id, "task panicked");
                (TaskState::Failed, Some("render task panicked".to_string()))
            }
        };
        // a job that returned Ok completed its work (including any cache
        // write), so a cancel arriving after its final poll does not
        // change the outcome
        mark_ended(registry, &task_id, state, note);
        info!(worker, task = %task_id, state = ?state, "task ended");
    }
}

fn mark_running(
    registry: &Mutex<HashMap<String, TaskEntry>>,
    task_id: &str,
) -> Option<CancelToken> {
    let mut registry = registry.lock().ok()?;
    let entry = registry.get_mut(task_id)?;
    entry.info.state = TaskState::Running;
    entry.info.started_at = Some(Utc::now());
    Some(entry.cancel.clone())
}

fn mark_ended(
    registry: &Mutex<HashMap<String, TaskEntry>>,
    task_id: &str,
    state: TaskState,
    note: Option<String>,
) {
    if let Ok(mut registry) = registry.lock() {
        if let Some(entry) = registry.get_mut(task_id) {
            entry.info.state = state;
            entry.info.note = note;
            entry.info.ended_at = Some(Utc::now());
        }
    }
}
