//! Sync item status state machine.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The lifecycle status of a sync item.
///
/// Transitions are forward-only with two controlled exceptions: an explicit
/// retry moves `Failed`/`Conflict` back to `Pending`, and cancellation moves
/// any not-yet-in-flight state to `Cancelled`. `Completed` and `Cancelled`
/// are terminal. No transition skips `InProgress`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    /// Waiting to be picked up by a processing pass.
    Pending,
    /// Currently being delivered to the remote system.
    InProgress,
    /// Delivered and acknowledged; terminal.
    Completed,
    /// Delivery failed; eligible for explicit retry.
    Failed,
    /// The remote system reported a data conflict; requires resolution.
    Conflict,
    /// Withdrawn before delivery; terminal.
    Cancelled,
}

impl SyncStatus {
    /// Returns true if no further transitions are possible.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, SyncStatus::Completed | SyncStatus::Cancelled)
    }

    /// Returns true if an explicit retry may reset this item to pending.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, SyncStatus::Failed | SyncStatus::Conflict)
    }

    /// Returns true if the state machine permits moving to `next`.
    #[must_use]
    pub fn can_transition_to(&self, next: SyncStatus) -> bool {
        use SyncStatus::{Cancelled, Completed, Conflict, Failed, InProgress, Pending};
        matches!(
            (self, next),
            (Pending, InProgress)
                | (Pending, Cancelled)
                | (InProgress, Completed)
                | (InProgress, Failed)
                | (InProgress, Conflict)
                | (Failed, Pending)
                | (Failed, Cancelled)
                | (Conflict, Pending)
                | (Conflict, Cancelled)
        )
    }

    /// Returns the snake_case name used on the wire and in filters.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::Pending => "pending",
            SyncStatus::InProgress => "in_progress",
            SyncStatus::Completed => "completed",
            SyncStatus::Failed => "failed",
            SyncStatus::Conflict => "conflict",
            SyncStatus::Cancelled => "cancelled",
        }
    }

    /// All statuses, in lifecycle order.
    pub const ALL: [SyncStatus; 6] = [
        SyncStatus::Pending,
        SyncStatus::InProgress,
        SyncStatus::Completed,
        SyncStatus::Failed,
        SyncStatus::Conflict,
        SyncStatus::Cancelled,
    ];
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}
