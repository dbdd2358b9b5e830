//! Error types for queue storage.

use driftq_core::{CoreError, ItemId, TenantId};
use std::io;
use thiserror::Error;

/// Result type for storage operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur in queue storage.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Model-level error (validation, forbidden transition).
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The referenced item does not exist within the tenant.
    #[error("item {item_id} not found in {tenant_id}")]
    NotFound {
        /// The tenant that was searched.
        tenant_id: TenantId,
        /// The item ID that was not found.
        item_id: ItemId,
    },

    /// An item with this ID already exists.
    #[error("item {item_id} already exists")]
    Duplicate {
        /// The colliding item ID.
        item_id: ItemId,
    },

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A journal record failed to encode.
    #[error("encode error: {0}")]
    Encode(#[from] ciborium::ser::Error<io::Error>),

    /// A journal record failed to decode.
    #[error("decode error: {0}")]
    Decode(#[from] ciborium::de::Error<io::Error>),

    /// The journal is corrupted.
    #[error("journal corrupted: {message}")]
    Corrupted {
        /// Description of the corruption.
        message: String,
    },
}

impl StoreError {
    /// Creates a not-found error.
    pub fn not_found(tenant_id: TenantId, item_id: ItemId) -> Self {
        Self::NotFound {
            tenant_id,
            item_id,
        }
    }

    /// Creates a corruption error.
    pub fn corrupted(message: impl Into<String>) -> Self {
        Self::Corrupted {
            message: message.into(),
        }
    }
}
