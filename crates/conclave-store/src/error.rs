use crate::entity::EntityKey;

/// Errors from entity store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The requested entity was not found.
    #[error("entity not found: {0}")]
    NotFound(EntityKey),

    /// An entity read by an atomic unit changed before the unit committed.
    #[error("commit conflict on {key}: read version {expected:?}, found {found:?}")]
    Conflict {
        key: EntityKey,
        expected: Option<u64>,
        found: Option<u64>,
    },

    /// An atomic unit kept conflicting until its retry budget ran out.
    #[error("atomic unit gave up after {attempts} conflicting attempts")]
    AttemptsExhausted { attempts: u32 },

    /// A stored document was decoded as the wrong kind.
    #[error("kind mismatch for {key}: expected {expected}")]
    KindMismatch { key: EntityKey, expected: String },

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The backend could not serve the request.
    #[error("storage backend unavailable: {0}")]
    Unavailable(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

impl StoreError {
    /// Returns `true` for errors that a fresh attempt may resolve.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
