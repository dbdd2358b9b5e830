//! Error types for the DriftQ core model.

use crate::status::SyncStatus;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in the core model.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A malformed enqueue request; rejected before anything is stored.
    #[error("validation failed: {message}")]
    Validation {
        /// Description of what was malformed.
        message: String,
    },

    /// A status transition the state machine forbids.
    #[error("invalid status transition from {from} to {to}")]
    InvalidTransition {
        /// Current status.
        from: SyncStatus,
        /// Attempted target status.
        to: SyncStatus,
    },
}

impl CoreError {
    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Creates an invalid transition error.
    pub fn invalid_transition(from: SyncStatus, to: SyncStatus) -> Self {
        Self::InvalidTransition { from, to }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = CoreError::validation("entity_id must not be empty");
        assert_eq!(err.to_string(), "validation failed: entity_id must not be empty");

        let err = CoreError::invalid_transition(SyncStatus::Pending, SyncStatus::Completed);
        assert!(err.to_string().contains("pending"));
        assert!(err.to_string().contains("completed"));
    }
}
