use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::error::{TaskError, TaskResult};
use crate::queue::TaskReceiver;
use crate::task::Task;

/// Consumer of push tasks with a given name.
#[async_trait]
pub trait TaskHandler: Send + Sync {
    async fn handle(&self, task: &Task) -> TaskResult<()>;
}

/// How often a failed push task is tried again.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total dispatches per task, the first one included.
    pub max_attempts: u32,
    /// Pause before each retry.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(1),
        }
    }
}

/// Drains the push channel and dispatches each task by name.
pub struct TaskWorker {
    receiver: TaskReceiver,
    handlers: HashMap<String, Arc<dyn TaskHandler>>,
    retry: RetryPolicy,
    retries: VecDeque<(Instant, Task)>,
    open: bool,
}

impl TaskWorker {
    pub fn new(receiver: TaskReceiver) -> Self {
        Self {
            receiver,
            handlers: HashMap::new(),
            retry: RetryPolicy::default(),
            retries: VecDeque::new(),
            open: true,
        }
    }

    /// Register `handler` for tasks named `name`, replacing any previous one.
    pub fn register(mut self, name: impl Into<String>, handler: Arc<dyn TaskHandler>) -> Self {
        self.handlers.insert(name.into(), handler);
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Dispatch one task to its handler.
    pub async fn dispatch(&self, task: &Task) -> TaskResult<()> {
        let handler = self
            .handlers
            .get(&task.name)
            .ok_or_else(|| TaskError::UnknownTask(task.name.clone()))?;
        handler.handle(task).await
    }

    /// Next task to run: a retry that has come due, or a fresh task from the
    /// channel. `None` once the channel is closed and no retries remain.
    async fn next_task(&mut self) -> Option<Task> {
        loop {
            let due = self.retries.front().map(|(at, _)| *at);
            match (due, self.open) {
                (None, false) => return None,
                (Some(at), false) => {
                    tokio::time::sleep_until(at).await;
                    return self.retries.pop_front().map(|(_, task)| task);
                }
                (None, true) => match self.receiver.recv().await {
                    Some(task) => return Some(task),
                    None => self.open = false,
                },
                (Some(at), true) => {
                    tokio::select! {
                        received = self.receiver.recv() => match received {
                            Some(task) => return Some(task),
                            None => self.open = false,
                        },
                        _ = tokio::time::sleep_until(at) => {
                            return self.retries.pop_front().map(|(_, task)| task);
                        }
                    }
                }
            }
        }
    }

    /// Process tasks until every sender has been dropped and pending retries
    /// are done.
    ///
    /// A task whose handler fails with a retryable error is dispatched again
    /// after the retry delay, up to the policy's attempt limit; after that it
    /// is dropped with an error log. Returns the number of tasks that
    /// completed successfully.
    pub async fn run(mut self) -> usize {
        info!(
            handlers = self.handlers.len(),
            max_attempts = self.retry.max_attempts,
            "task worker started"
        );
        let mut completed = 0;
        while let Some(mut task) = self.next_task().await {
            task.attempts += 1;
            match self.dispatch(&task).await {
                Ok(()) => {
                    completed += 1;
                    debug!(
                        task = %task.id,
                        name = %task.name,
                        attempts = task.attempts,
                        "task completed"
                    );
                }
                Err(e) if e.is_retryable() && task.attempts < self.retry.max_attempts => {
                    warn!(
                        task = %task.id,
                        name = %task.name,
                        attempts = task.attempts,
                        error = %e,
                        "task failed, will retry"
                    );
                    self.retries
                        .push_back((Instant::now() + self.retry.delay, task));
                }
                Err(e) => {
                    error!(
                        task = %task.id,
                        name = %task.name,
                        attempts = task.attempts,
                        error = %e,
                        "task dropped"
                    );
                }
            }
        }
        info!(completed, "task worker stopped");
        completed
    }
}

impl std::fmt::Debug for TaskWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&String> = self.handlers.keys().collect();
        names.sort();
        f.debug_struct("TaskWorker")
            .field("handlers", &names)
            .field("retry", &self.retry)
            .finish()
    }
}
