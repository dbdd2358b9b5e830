//! Error types for the sync engine.

use driftq_core::{CoreError, TenantId};
use driftq_store::StoreError;
use thiserror::Error;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors that can occur while processing the queue.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Queue or snapshot storage error.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Model-level error (validation, forbidden transition).
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A processing pass was requested while one was already running for
    /// the tenant. Queue state is unchanged.
    #[error("a processing pass is already running for {tenant_id}")]
    PassInProgress {
        /// The tenant whose pass is in flight.
        tenant_id: TenantId,
    },

    /// Network or transport error from the remote adapter.
    #[error("transport error: {message}")]
    Transport {
        /// Error message.
        message: String,
        /// Whether the operation can be retried.
        retryable: bool,
    },
}

impl EngineError {
    /// Creates a retryable transport error.
    pub fn transport_retryable(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: true,
        }
    }

    /// Creates a non-retryable transport error.
    pub fn transport_fatal(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: false,
        }
    }

    /// Returns true if this error can be retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            EngineError::Transport { retryable, .. } => *retryable,
            EngineError::PassInProgress { .. } => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_errors() {
        assert!(EngineError::transport_retryable("connection lost").is_retryable());
        assert!(!EngineError::transport_fatal("invalid certificate").is_retryable());
        assert!(EngineError::PassInProgress {
            tenant_id: TenantId::new("acme")
        }
        .is_retryable());
    }

    #[test]
    fn error_display() {
        let err = EngineError::PassInProgress {
            tenant_id: TenantId::new("acme"),
        };
        assert_eq!(
            err.to_string(),
            "a processing pass is already running for tenant:acme"
        );
    }
}
