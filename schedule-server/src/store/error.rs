//! Store error types.

use crate::domain::{DomainError, InvalidTransition, ValidationResult};

/// Errors from store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No record with the given ID
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    /// A unique field collides with an existing record
    #[error("{entity} with {field} {value} already exists")]
    Duplicate {
        entity: &'static str,
        field: &'static str,
        value: String,
    },

    /// Input rejected before reaching the domain rules
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Write would break a referential rule
    #[error("conflict: {0}")]
    Conflict(String),

    /// Optimistic concurrency check failed
    #[error("version conflict: expected {expected}, found {actual}")]
    VersionConflict { expected: u64, actual: u64 },

    /// Schedule candidate failed validation
    #[error("schedule failed validation with {} violation(s)", .0.violations.len())]
    Invalid(ValidationResult),

    /// Status change not reachable from the current status
    #[error(transparent)]
    Transition(#[from] InvalidTransition),

    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Snapshot file could not be read or written
    #[error("snapshot I/O error: {message}")]
    SnapshotIo { message: String },

    /// Snapshot file contents are unusable
    #[error("snapshot is corrupt: {message}")]
    SnapshotCorrupt { message: String },
}

impl StoreError {
    /// Whether retrying the operation might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::SnapshotIo { .. })
    }
}
