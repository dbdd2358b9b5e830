//! Derived queue statistics.
//!
//! [`QueueStats`] is a read-time aggregation over a snapshot of a tenant's
//! queue items. Nothing here is stored: the caller scans, computes, renders,
//! and discards.

use crate::item::SyncItem;
use crate::priority::Priority;
use crate::status::SyncStatus;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Item counts broken down by status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StatusCounts {
    /// Items waiting to be processed.
    pub pending: u64,
    /// Items currently being delivered.
    pub in_progress: u64,
    /// Items delivered successfully.
    pub completed: u64,
    /// Items whose delivery failed.
    pub failed: u64,
    /// Items flagged with a data conflict.
    pub conflict: u64,
    /// Items withdrawn before delivery.
    pub cancelled: u64,
}

impl StatusCounts {
    fn record(&mut self, status: SyncStatus) {
        match status {
            SyncStatus::Pending => self.pending += 1,
            SyncStatus::InProgress => self.in_progress += 1,
            SyncStatus::Completed => self.completed += 1,
            SyncStatus::Failed => self.failed += 1,
            SyncStatus::Conflict => self.conflict += 1,
            SyncStatus::Cancelled => self.cancelled += 1,
        }
    }

    /// Returns the count for one status.
    #[must_use]
    pub fn get(&self, status: SyncStatus) -> u64 {
        match status {
            SyncStatus::Pending => self.pending,
            SyncStatus::InProgress => self.in_progress,
            SyncStatus::Completed => self.completed,
            SyncStatus::Failed => self.failed,
            SyncStatus::Conflict => self.conflict,
            SyncStatus::Cancelled => self.cancelled,
        }
    }
}

/// Item counts broken down by priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PriorityCounts {
    /// Low-priority items.
    pub low: u64,
    /// Normal-priority items.
    pub normal: u64,
    /// High-priority items.
    pub high: u64,
    /// Critical-priority items.
    pub critical: u64,
}

impl PriorityCounts {
    fn record(&mut self, priority: Priority) {
        match priority {
            Priority::Low => self.low += 1,
            Priority::Normal => self.normal += 1,
            Priority::High => self.high += 1,
            Priority::Critical => self.critical += 1,
        }
    }

    /// Returns the count for one priority.
    #[must_use]
    pub fn get(&self, priority: Priority) -> u64 {
        match priority {
            Priority::Low => self.low,
            Priority::Normal => self.normal,
            Priority::High => self.high,
            Priority::Critical => self.critical,
        }
    }
}

/// A point-in-time health summary of one tenant's queue.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct QueueStats {
    /// Total number of items in the snapshot.
    pub total: u64,
    /// Counts by status.
    pub by_status: StatusCounts,
    /// Counts by priority.
    pub by_priority: PriorityCounts,
    /// Counts by target store name.
    pub by_store: BTreeMap<String, u64>,
    /// Enqueue time of the oldest still-pending item.
    pub oldest_pending: Option<DateTime<Utc>>,
    /// Mean attempt count across all items in the snapshot.
    pub mean_attempts: f64,
    /// `completed / (completed + failed + conflict)`; `None` while no item
    /// has reached any of those outcomes.
    pub success_rate: Option<f64>,
}

impl QueueStats {
    /// Computes statistics over a snapshot of queue items.
    #[must_use]
    pub fn compute(items: &[SyncItem]) -> Self {
        let mut stats = QueueStats::default();
        let mut attempts_total = 0u64;

        for item in items {
            stats.total += 1;
            stats.by_status.record(item.status);
            stats.by_priority.record(item.priority());
            *stats.by_store.entry(item.store_name.clone()).or_insert(0) += 1;
            attempts_total += u64::from(item.metadata.attempt_count);

            if item.status == SyncStatus::Pending {
                let older = stats
                    .oldest_pending
                    .map_or(true, |oldest| item.enqueued_at < oldest);
                if older {
                    stats.oldest_pending = Some(item.enqueued_at);
                }
            }
        }

        if stats.total > 0 {
            stats.mean_attempts = attempts_total as f64 / stats.total as f64;
        }

        let outcomes =
            stats.by_status.completed + stats.by_status.failed + stats.by_status.conflict;
        if outcomes > 0 {
            stats.success_rate = Some(stats.by_status.completed as f64 / outcomes as f64);
        }

        stats
    }

    /// Age of the oldest pending item relative to `now`.
    #[must_use]
    pub fn oldest_pending_age(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.oldest_pending.map(|at| now - at)
    }

    /// Returns true if the snapshot held no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.total == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::{SyncAction, SyncItemDraft};
    use crate::types::{ItemId, TenantId};
    use serde_json::json;

    fn make_item(store: &str, priority: Priority, enqueued_at: DateTime<Utc>) -> SyncItem {
        let draft = SyncItemDraft::new(store, "e-1", SyncAction::Update)
            .with_payload(json!({}))
            .with_priority(priority);
        SyncItem::from_draft(ItemId::generate(), TenantId::new("t"), 0, enqueued_at, draft)
    }

    #[test]
    fn empty_snapshot() {
        let stats = QueueStats::compute(&[]);
        assert!(stats.is_empty());
        assert_eq!(stats.mean_attempts, 0.0);
        assert!(stats.success_rate.is_none());
        assert!(stats.oldest_pending.is_none());
    }

    #[test]
    fn counts_by_dimension() {
        let now = Utc::now();
        let items = vec![
            make_item("assets", Priority::High, now),
            make_item("assets", Priority::Normal, now),
            make_item("policies", Priority::Low, now),
        ];
        let stats = QueueStats::compute(&items);

        assert_eq!(stats.total, 3);
        assert_eq!(stats.by_status.pending, 3);
        assert_eq!(stats.by_priority.high, 1);
        assert_eq!(stats.by_priority.low, 1);
        assert_eq!(stats.by_store.get("assets"), Some(&2));
        assert_eq!(stats.by_store.get("policies"), Some(&1));
    }

    #[test]
    fn oldest_pending_tracks_earliest() {
        let now = Utc::now();
        let older = now - Duration::seconds(120);
        let items = vec![make_item("a", Priority::Normal, now), make_item("a", Priority::Normal, older)];

        let stats = QueueStats::compute(&items);
        assert_eq!(stats.oldest_pending, Some(older));
        let age = stats.oldest_pending_age(now).unwrap();
        assert_eq!(age.num_seconds(), 120);
    }

    #[test]
    fn completed_items_do_not_count_as_oldest_pending() {
        let now = Utc::now();
        let mut done = make_item("a", Priority::Normal, now - Duration::seconds(600));
        done.begin_attempt(now).unwrap();
        done.complete().unwrap();
        let pending = make_item("a", Priority::Normal, now);

        let stats = QueueStats::compute(&[done, pending]);
        assert_eq!(stats.oldest_pending, Some(now));
    }

    #[test]
    fn success_rate() {
        let now = Utc::now();
        let mut completed = make_item("a", Priority::Normal, now);
        completed.begin_attempt(now).unwrap();
        completed.complete().unwrap();

        let mut failed = make_item("a", Priority::Normal, now);
        failed.begin_attempt(now).unwrap();
        failed.fail("boom", None).unwrap();

        let stats = QueueStats::compute(&[completed, failed]);
        assert_eq!(stats.success_rate, Some(0.5));
        assert_eq!(stats.mean_attempts, 1.0);
    }
}
