//! Retry and observability metadata carried by each sync item.

use crate::conflict::ConflictDetails;
use crate::priority::Priority;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default number of delivery attempts before an item is considered
/// exhausted.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Retry and observability envelope of a sync item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemMetadata {
    /// Number of delivery attempts made so far; starts at 0.
    pub attempt_count: u32,
    /// Ceiling on delivery attempts before the item stays failed.
    pub max_attempts: u32,
    /// When the most recent attempt started.
    pub last_attempt_at: Option<DateTime<Utc>>,
    /// Message from the most recent failure.
    pub error_message: Option<String>,
    /// Processing priority.
    pub priority: Priority,
    /// Earliest time a retry may be attempted (backoff).
    pub retry_after: Option<DateTime<Utc>>,
    /// Groups related items produced by one originating action.
    pub correlation_id: Option<String>,
    /// Conflict descriptor; present iff the item status is `Conflict`.
    pub conflict: Option<ConflictDetails>,
}

impl ItemMetadata {
    /// Creates metadata for a freshly enqueued item.
    #[must_use]
    pub fn new(priority: Priority) -> Self {
        Self {
            attempt_count: 0,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            last_attempt_at: None,
            error_message: None,
            priority,
            retry_after: None,
            correlation_id: None,
            conflict: None,
        }
    }

    /// Returns true if the attempt budget is used up.
    #[must_use]
    pub fn exhausted(&self) -> bool {
        self.attempt_count >= self.max_attempts
    }

    /// Returns true if backoff permits an attempt at `now`.
    #[must_use]
    pub fn retry_allowed(&self, now: DateTime<Utc>) -> bool {
        self.retry_after.map_or(true, |at| at <= now)
    }
}

impl Default for ItemMetadata {
    fn default() -> Self {
        Self::new(Priority::Normal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn fresh_metadata() {
        let meta = ItemMetadata::default();
        assert_eq!(meta.attempt_count, 0);
        assert_eq!(meta.max_attempts, DEFAULT_MAX_ATTEMPTS);
        assert!(!meta.exhausted());
        assert!(meta.conflict.is_none());
    }

    #[test]
    fn exhaustion() {
        let mut meta = ItemMetadata::default();
        meta.attempt_count = DEFAULT_MAX_ATTEMPTS;
        assert!(meta.exhausted());
    }

    #[test]
    fn retry_allowed_without_backoff() {
        let meta = ItemMetadata::default();
        assert!(meta.retry_allowed(Utc::now()));
    }

    #[test]
    fn retry_blocked_by_future_backoff() {
        let now = Utc::now();
        let mut meta = ItemMetadata::default();
        meta.retry_after = Some(now + Duration::seconds(60));
        assert!(!meta.retry_allowed(now));
        assert!(meta.retry_allowed(now + Duration::seconds(61)));
    }
}
