/// Errors produced by the task subsystem.
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    /// The push channel is at capacity.
    #[error("task queue is full")]
    QueueFull,

    /// The worker side of the push channel is gone.
    #[error("task queue is closed")]
    Closed,

    /// A task's payload could not be encoded or decoded.
    #[error("task payload error: {0}")]
    Payload(String),

    /// No handler is registered for the task name.
    #[error("no handler registered for task '{0}'")]
    UnknownTask(String),

    /// A handler ran and failed.
    #[error("task '{name}' failed: {reason}")]
    HandlerFailed { name: String, reason: String },

    /// Internal state could not be accessed.
    #[error("task queue unavailable: {0}")]
    Unavailable(String),
}

impl TaskError {
    /// Whether running the same task again could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::HandlerFailed { .. } | Self::Unavailable(_) | Self::QueueFull
        )
    }
}

impl From<serde_json::Error> for TaskError {
    fn from(e: serde_json::Error) -> Self {
        Self::Payload(e.to_string())
    }
}

/// Convenience alias used throughout the tasks crate.
pub type TaskResult<T> = Result<T, TaskError>;
