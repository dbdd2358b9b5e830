//! Queue backend trait and scan filters.

use crate::error::StoreResult;
use chrono::{DateTime, Utc};
use driftq_core::{ItemId, Priority, SyncItem, SyncStatus, TenantId};

/// Criteria for a filtered scan over one tenant's items.
///
/// An unset field matches everything. Filters compose with AND.
#[derive(Debug, Clone, Default)]
pub struct ScanFilter {
    /// Keep items whose status is in this set.
    pub statuses: Option<Vec<SyncStatus>>,
    /// Keep items with exactly this priority.
    pub priority: Option<Priority>,
    /// Keep items targeting this store.
    pub store_name: Option<String>,
    /// Keep items targeting this entity.
    pub entity_id: Option<String>,
    /// Keep items enqueued strictly before this time.
    pub enqueued_before: Option<DateTime<Utc>>,
}

impl ScanFilter {
    /// Creates a filter that matches every item.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Restricts to items whose status is in `statuses`.
    #[must_use]
    pub fn with_statuses(mut self, statuses: Vec<SyncStatus>) -> Self {
        self.statuses = Some(statuses);
        self
    }

    /// Restricts to one priority.
    #[must_use]
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Restricts to one target store.
    #[must_use]
    pub fn with_store_name(mut self, store_name: impl Into<String>) -> Self {
        self.store_name = Some(store_name.into());
        self
    }

    /// Restricts to one target entity.
    #[must_use]
    pub fn with_entity_id(mut self, entity_id: impl Into<String>) -> Self {
        self.entity_id = Some(entity_id.into());
        self
    }

    /// Restricts to items enqueued strictly before `at`.
    #[must_use]
    pub fn with_enqueued_before(mut self, at: DateTime<Utc>) -> Self {
        self.enqueued_before = Some(at);
        self
    }

    /// Returns true if `item` satisfies every set criterion.
    #[must_use]
    pub fn matches(&self, item: &SyncItem) -> bool {
        if let Some(statuses) = &self.statuses {
            if !statuses.contains(&item.status) {
                return false;
            }
        }
        if let Some(priority) = self.priority {
            if item.priority() != priority {
                return false;
            }
        }
        if let Some(store_name) = &self.store_name {
            if &item.store_name != store_name {
                return false;
            }
        }
        if let Some(entity_id) = &self.entity_id {
            if &item.entity_id != entity_id {
                return false;
            }
        }
        if let Some(before) = self.enqueued_before {
            if item.enqueued_at >= before {
                return false;
            }
        }
        true
    }
}

/// The narrow durable-storage interface the queue needs.
///
/// Backends are record stores: they persist and retrieve [`SyncItem`]s
/// keyed by `(tenant, id)` and do not interpret queue policy. Ordering,
/// validation, and the status state machine live in
/// [`SyncQueue`](crate::SyncQueue).
pub trait QueueBackend: Send + Sync {
    /// Appends a new item.
    ///
    /// # Errors
    ///
    /// Returns [`Duplicate`](crate::StoreError::Duplicate) if an item with
    /// the same ID already exists.
    fn append(&self, item: &SyncItem) -> StoreResult<()>;

    /// Looks up one item by ID within a tenant.
    fn get(&self, tenant_id: &TenantId, item_id: ItemId) -> StoreResult<Option<SyncItem>>;

    /// Returns all of a tenant's items matching `filter`, ordered by
    /// `(enqueued_at, sequence)` ascending.
    fn scan(&self, tenant_id: &TenantId, filter: &ScanFilter) -> StoreResult<Vec<SyncItem>>;

    /// Replaces a stored item with `item` (matched by tenant and ID).
    ///
    /// # Errors
    ///
    /// Returns [`NotFound`](crate::StoreError::NotFound) if the item does
    /// not exist.
    fn update(&self, item: &SyncItem) -> StoreResult<()>;

    /// Deletes one item; returns whether it existed.
    fn delete(&self, tenant_id: &TenantId, item_id: ItemId) -> StoreResult<bool>;

    /// Returns the highest sequence number ever stored, across all tenants.
    ///
    /// Used to restore the queue's sequence counter on reopen.
    fn max_sequence(&self) -> StoreResult<u64>;
}
