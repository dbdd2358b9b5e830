//! The sync queue: policy over a queue backend.

use crate::backend::{QueueBackend, ScanFilter};
use crate::error::{StoreError, StoreResult};
use chrono::{DateTime, Utc};
use driftq_core::{
    ConflictDetails, CoreError, ItemId, Priority, QueueStats, SyncItem, SyncItemDraft, SyncStatus,
    TenantId,
};
use std::cmp::Reverse;
use std::sync::atomic::{AtomicU64, Ordering};

/// Default number of items selected per batch.
pub const DEFAULT_BATCH_LIMIT: usize = 10;

/// Criteria for selecting the next batch of items to process.
#[derive(Debug, Clone)]
pub struct BatchCriteria {
    /// Maximum number of items to return.
    pub limit: usize,
    /// Restrict selection to one priority.
    pub priority: Option<Priority>,
    /// Statuses eligible for selection.
    pub statuses: Vec<SyncStatus>,
}

impl BatchCriteria {
    /// Creates criteria with the given limit, selecting pending items.
    #[must_use]
    pub fn with_limit(limit: usize) -> Self {
        Self {
            limit,
            ..Self::default()
        }
    }

    /// Restricts selection to one priority.
    #[must_use]
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Overrides the eligible statuses.
    #[must_use]
    pub fn with_statuses(mut self, statuses: Vec<SyncStatus>) -> Self {
        self.statuses = statuses;
        self
    }
}

impl Default for BatchCriteria {
    fn default() -> Self {
        Self {
            limit: DEFAULT_BATCH_LIMIT,
            priority: None,
            statuses: vec![SyncStatus::Pending],
        }
    }
}

/// Criteria for bulk-deleting items.
///
/// An unset field matches everything; the default clears the whole tenant.
#[derive(Debug, Clone, Default)]
pub struct ClearCriteria {
    /// Delete only items whose status is in this set.
    pub statuses: Option<Vec<SyncStatus>>,
    /// Delete only items enqueued strictly before this time.
    pub older_than: Option<DateTime<Utc>>,
    /// Delete only items targeting this store.
    pub store_name: Option<String>,
}

impl ClearCriteria {
    /// Creates criteria that match every item of the tenant.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Deletes only items whose status is in `statuses`.
    #[must_use]
    pub fn with_statuses(mut self, statuses: Vec<SyncStatus>) -> Self {
        self.statuses = Some(statuses);
        self
    }

    /// Deletes only items enqueued strictly before `at`.
    #[must_use]
    pub fn with_older_than(mut self, at: DateTime<Utc>) -> Self {
        self.older_than = Some(at);
        self
    }

    /// Deletes only items targeting `store_name`.
    #[must_use]
    pub fn with_store_name(mut self, store_name: impl Into<String>) -> Self {
        self.store_name = Some(store_name.into());
        self
    }
}

/// Criteria for resetting failed and conflicted items to pending.
#[derive(Debug, Clone, Default)]
pub struct RetryCriteria {
    /// Only reset items whose attempt count is below this ceiling; defaults
    /// to each item's own `max_attempts`.
    pub max_retries: Option<u32>,
    /// Only reset items targeting this store.
    pub store_name: Option<String>,
    /// Only reset items targeting this entity.
    pub entity_id: Option<String>,
}

impl RetryCriteria {
    /// Creates criteria that match every retryable item of the tenant.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Sets the attempt-count ceiling.
    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    /// Only resets items targeting `store_name`.
    #[must_use]
    pub fn with_store_name(mut self, store_name: impl Into<String>) -> Self {
        self.store_name = Some(store_name.into());
        self
    }

    /// Only resets items targeting `entity_id`.
    #[must_use]
    pub fn with_entity_id(mut self, entity_id: impl Into<String>) -> Self {
        self.entity_id = Some(entity_id.into());
        self
    }
}

/// Durable, tenant-partitioned queue of sync items.
///
/// `SyncQueue` owns queue policy — enqueue validation, batch ordering, the
/// status state machine, retry and clear semantics — over any
/// [`QueueBackend`]. Status transitions are load-validate-store; the
/// processing pass that drives them is exclusive per tenant (enforced by
/// the engine), while enqueues may happen at any time.
pub struct SyncQueue<B> {
    backend: B,
    next_sequence: AtomicU64,
}

impl<B: QueueBackend> SyncQueue<B> {
    /// Creates a queue over `backend`, restoring the sequence counter from
    /// the highest stored sequence.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot report its sequence
    /// high-water mark.
    pub fn new(backend: B) -> StoreResult<Self> {
        let max = backend.max_sequence()?;
        Ok(Self {
            backend,
            next_sequence: AtomicU64::new(max),
        })
    }

    /// Returns the underlying backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Appends a new pending item built from `draft`.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the tenant ID is empty or the draft is
    /// malformed; nothing is stored in that case.
    pub fn enqueue(&self, tenant_id: &TenantId, draft: SyncItemDraft) -> StoreResult<SyncItem> {
        if tenant_id.is_empty() {
            return Err(CoreError::validation("tenant_id must not be empty").into());
        }
        draft.validate()?;

        let sequence = self.next_sequence.fetch_add(1, Ordering::SeqCst) + 1;
        let item = SyncItem::from_draft(
            ItemId::generate(),
            tenant_id.clone(),
            sequence,
            Utc::now(),
            draft,
        );
        self.backend.append(&item)?;
        tracing::debug!(
            item = %item.id,
            tenant = %tenant_id,
            store = %item.store_name,
            action = %item.action,
            "item enqueued"
        );
        Ok(item)
    }

    /// Looks up one item.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the item does not exist in this
    /// tenant.
    pub fn get(&self, tenant_id: &TenantId, item_id: ItemId) -> StoreResult<SyncItem> {
        self.backend
            .get(tenant_id, item_id)?
            .ok_or_else(|| StoreError::not_found(tenant_id.clone(), item_id))
    }

    /// Selects the next eligible items in deterministic order.
    ///
    /// Items are ordered by priority rank descending, then by
    /// `(enqueued_at, sequence)` ascending — FIFO within a priority. Items
    /// whose `retry_after` lies in the future are excluded.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend scan fails.
    pub fn next_batch(
        &self,
        tenant_id: &TenantId,
        criteria: &BatchCriteria,
    ) -> StoreResult<Vec<SyncItem>> {
        let mut filter = ScanFilter::all().with_statuses(criteria.statuses.clone());
        if let Some(priority) = criteria.priority {
            filter = filter.with_priority(priority);
        }

        let now = Utc::now();
        let mut eligible: Vec<SyncItem> = self
            .backend
            .scan(tenant_id, &filter)?
            .into_iter()
            .filter(|item| item.metadata.retry_allowed(now))
            .collect();

        eligible.sort_by_key(|item| {
            (
                Reverse(item.priority().rank()),
                item.enqueued_at,
                item.sequence,
            )
        });
        eligible.truncate(criteria.limit);
        Ok(eligible)
    }

    fn store_transition<F>(
        &self,
        tenant_id: &TenantId,
        item_id: ItemId,
        apply: F,
    ) -> StoreResult<SyncItem>
    where
        F: FnOnce(&mut SyncItem) -> Result<(), CoreError>,
    {
        let mut item = self.get(tenant_id, item_id)?;
        apply(&mut item)?;
        self.backend.update(&item)?;
        tracing::debug!(item = %item.id, status = %item.status, "status transition");
        Ok(item)
    }

    /// Marks an item in progress, incrementing its attempt counter.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] for an unknown item or an invalid
    /// transition error unless the item is pending.
    pub fn mark_in_progress(&self, tenant_id: &TenantId, item_id: ItemId) -> StoreResult<SyncItem> {
        self.store_transition(tenant_id, item_id, |item| item.begin_attempt(Utc::now()))
    }

    /// Marks an in-progress item completed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] for an unknown item or an invalid
    /// transition error unless the item is in progress.
    pub fn mark_completed(&self, tenant_id: &TenantId, item_id: ItemId) -> StoreResult<SyncItem> {
        self.store_transition(tenant_id, item_id, SyncItem::complete)
    }

    /// Marks an in-progress item failed.
    ///
    /// `retry_after` is the earliest time a subsequent retry may run
    /// (backoff); `None` leaves the item immediately eligible after an
    /// explicit retry.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] for an unknown item or an invalid
    /// transition error unless the item is in progress.
    pub fn mark_failed(
        &self,
        tenant_id: &TenantId,
        item_id: ItemId,
        message: &str,
        retry_after: Option<DateTime<Utc>>,
    ) -> StoreResult<SyncItem> {
        self.store_transition(tenant_id, item_id, |item| item.fail(message, retry_after))
    }

    /// Marks an in-progress item conflicted.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] for an unknown item or an invalid
    /// transition error unless the item is in progress.
    pub fn mark_conflict(
        &self,
        tenant_id: &TenantId,
        item_id: ItemId,
        details: ConflictDetails,
    ) -> StoreResult<SyncItem> {
        self.store_transition(tenant_id, item_id, |item| item.flag_conflict(details))
    }

    /// Withdraws a not-yet-in-flight item.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] for an unknown item or an invalid
    /// transition error if the item is in progress or terminal.
    pub fn cancel(&self, tenant_id: &TenantId, item_id: ItemId) -> StoreResult<SyncItem> {
        self.store_transition(tenant_id, item_id, SyncItem::cancel)
    }

    /// Resets one conflicted item to pending after out-of-band resolution.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] for an unknown item or an invalid
    /// transition error unless the item is in conflict.
    pub fn resolve_conflict(&self, tenant_id: &TenantId, item_id: ItemId) -> StoreResult<SyncItem> {
        self.store_transition(tenant_id, item_id, |item| {
            if item.status != SyncStatus::Conflict {
                return Err(CoreError::invalid_transition(item.status, SyncStatus::Pending));
            }
            item.reset_for_retry()
        })
    }

    /// Resets matching failed and conflicted items to pending.
    ///
    /// Items at or above the retry ceiling (by default their own
    /// `max_attempts`) are left untouched; the cumulative attempt count of
    /// reset items is preserved. Returns the number of items reset. A
    /// tenant with nothing retryable yields 0 and changes nothing.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend scan or an update fails.
    pub fn retry_failed(
        &self,
        tenant_id: &TenantId,
        criteria: &RetryCriteria,
    ) -> StoreResult<usize> {
        let mut filter = ScanFilter::all()
            .with_statuses(vec![SyncStatus::Failed, SyncStatus::Conflict]);
        if let Some(store_name) = &criteria.store_name {
            filter = filter.with_store_name(store_name.clone());
        }
        if let Some(entity_id) = &criteria.entity_id {
            filter = filter.with_entity_id(entity_id.clone());
        }

        let mut reset = 0usize;
        for mut item in self.backend.scan(tenant_id, &filter)? {
            let ceiling = criteria.max_retries.unwrap_or(item.metadata.max_attempts);
            if item.metadata.attempt_count >= ceiling {
                continue;
            }
            item.reset_for_retry()?;
            self.backend.update(&item)?;
            reset += 1;
        }
        if reset > 0 {
            tracing::debug!(tenant = %tenant_id, reset, "items reset for retry");
        }
        Ok(reset)
    }

    /// Bulk-deletes matching items; returns the number removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend scan or a delete fails.
    pub fn clear(&self, tenant_id: &TenantId, criteria: &ClearCriteria) -> StoreResult<usize> {
        let mut filter = ScanFilter::all();
        if let Some(statuses) = &criteria.statuses {
            filter = filter.with_statuses(statuses.clone());
        }
        if let Some(older_than) = criteria.older_than {
            filter = filter.with_enqueued_before(older_than);
        }
        if let Some(store_name) = &criteria.store_name {
            filter = filter.with_store_name(store_name.clone());
        }

        let mut removed = 0usize;
        for item in self.backend.scan(tenant_id, &filter)? {
            if self.backend.delete(tenant_id, item.id)? {
                removed += 1;
            }
        }
        if removed > 0 {
            tracing::debug!(tenant = %tenant_id, removed, "queue cleared");
        }
        Ok(removed)
    }

    /// Computes queue-health statistics over the tenant's current items.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend scan fails.
    pub fn stats(&self, tenant_id: &TenantId) -> StoreResult<QueueStats> {
        let items = self.backend.scan(tenant_id, &ScanFilter::all())?;
        Ok(QueueStats::compute(&items))
    }
}
