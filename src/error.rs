//! Error taxonomy for scoring operations

use crate::event_store::StoreError;

/// Result type for scoring operations
pub type ScoringResult<T> = Result<T, ScoringError>;

/// Errors surfaced to callers of the scoring service
///
/// Consistency degradation and notification failures never appear here:
/// the first is absorbed by the best-effort commit path, the second is
/// logged by the dispatcher.
#[derive(Debug, thiserror::Error)]
pub enum ScoringError {
    /// Malformed or out-of-range input, rejected before any state change
    #[error("invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },

    /// Operation not allowed in the current match phase
    #[error("{0}")]
    StateGuard(String),

    /// Actor is neither the assigned scorer nor an administrator
    #[error("not permitted to modify this match")]
    Forbidden,

    #[error("match {0} not found")]
    NotFound(String),

    /// Irrecoverable storage failure
    #[error("storage failure: {0}")]
    Storage(#[from] StoreError),
}

impl ScoringError {
    pub fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        ScoringError::Validation {
            field,
            reason: reason.into(),
        }
    }

    pub fn guard(precondition: impl Into<String>) -> Self {
        ScoringError::StateGuard(precondition.into())
    }

    /// Machine-readable reason code
    pub fn code(&self) -> &'static str {
        match self {
            ScoringError::Validation { .. } => "VALIDATION",
            ScoringError::StateGuard(_) => "STATE_GUARD",
            ScoringError::Forbidden => "FORBIDDEN",
            ScoringError::NotFound(_) => "NOT_FOUND",
            ScoringError::Storage(_) => "STORAGE_ERROR",
        }
    }
}
