use thiserror::Error;

/// Failures reported by a store backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("store unreachable: {0}")]
    Connection(String),

    #[error("transient store failure: {0}")]
    Transient(String),

    #[error("store rejected request: {0}")]
    Rejected(String),

    #[error("collection not found: {0}")]
    NotFound(String),

    #[error("collection conflict: {0}")]
    Conflict(String),
}

impl StoreError {
    /// Whether the store client may retry the failed call.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
