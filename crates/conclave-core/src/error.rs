use conclave_store::StoreError;
use conclave_tasks::TaskError;
use conclave_types::{ConferenceId, TicketId, TypeError};

/// Errors returned by Conclave domain operations.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// Malformed input: bad dates, negative capacity, bad identity.
    #[error("validation failed: {0}")]
    Validation(String),

    /// A ticket, conference or other entity does not exist.
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// The ticket is no longer available.
    #[error("ticket {0} has already been sold")]
    AlreadySold(TicketId),

    /// The conference has no remaining capacity.
    #[error("conference {0} has no tickets left")]
    CapacityExhausted(ConferenceId),

    /// The atomic unit could not commit.
    #[error("transaction failed: {0}")]
    TransactionFailed(String),

    /// Storage failure outside an atomic unit.
    #[error("storage error: {0}")]
    Store(StoreError),

    /// Outbound mail could not be sent.
    #[error("mail error: {0}")]
    Mail(String),

    /// Background task could not be enqueued.
    #[error("task error: {0}")]
    Task(#[from] TaskError),
}

impl CoreError {
    pub fn not_found(kind: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    /// Stable machine-readable name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::NotFound { .. } => "not_found",
            Self::AlreadySold(_) => "already_sold",
            Self::CapacityExhausted(_) => "capacity_exhausted",
            Self::TransactionFailed(_) => "transaction_failed",
            Self::Store(_) => "storage",
            Self::Mail(_) => "mail",
            Self::Task(_) => "task",
        }
    }
}

impl From<StoreError> for CoreError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Conflict { .. } | StoreError::AttemptsExhausted { .. } => {
                Self::TransactionFailed(e.to_string())
            }
            StoreError::NotFound(key) => Self::NotFound {
                kind: "entity",
                id: key.to_string(),
            },
            other => Self::Store(other),
        }
    }
}

impl From<TypeError> for CoreError {
    fn from(e: TypeError) -> Self {
        Self::Validation(e.to_string())
    }
}

/// Convenience alias used throughout the core crate.
pub type CoreResult<T> = Result<T, CoreError>;
