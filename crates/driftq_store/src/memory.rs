//! In-memory queue backend for tests and ephemeral queues.

use crate::backend::{QueueBackend, ScanFilter};
use crate::error::{StoreError, StoreResult};
use driftq_core::{ItemId, SyncItem, TenantId};
use parking_lot::RwLock;
use std::collections::HashMap;

/// An in-memory queue backend.
///
/// Suitable for unit tests, integration tests, and queues that don't need
/// to survive a restart.
///
/// # Thread Safety
///
/// Thread-safe; all methods take short read/write locks, so enqueues are
/// never blocked by a running processing pass.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    items: RwLock<HashMap<TenantId, HashMap<ItemId, SyncItem>>>,
}

impl MemoryBackend {
    /// Creates a new empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of items across all tenants.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.read().values().map(HashMap::len).sum()
    }

    /// Returns true if no items are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn sorted_by_enqueue_order(mut items: Vec<SyncItem>) -> Vec<SyncItem> {
    items.sort_by_key(|item| (item.enqueued_at, item.sequence));
    items
}

impl QueueBackend for MemoryBackend {
    fn append(&self, item: &SyncItem) -> StoreResult<()> {
        let mut items = self.items.write();
        let tenant = items.entry(item.tenant_id.clone()).or_default();
        if tenant.contains_key(&item.id) {
            return Err(StoreError::Duplicate { item_id: item.id });
        }
        tenant.insert(item.id, item.clone());
        Ok(())
    }

    fn get(&self, tenant_id: &TenantId, item_id: ItemId) -> StoreResult<Option<SyncItem>> {
        Ok(self
            .items
            .read()
            .get(tenant_id)
            .and_then(|tenant| tenant.get(&item_id))
            .cloned())
    }

    fn scan(&self, tenant_id: &TenantId, filter: &ScanFilter) -> StoreResult<Vec<SyncItem>> {
        let items = self.items.read();
        let matching = items
            .get(tenant_id)
            .map(|tenant| {
                tenant
                    .values()
                    .filter(|item| filter.matches(item))
                    .cloned()
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();
        Ok(sorted_by_enqueue_order(matching))
    }

    fn update(&self, item: &SyncItem) -> StoreResult<()> {
        let mut items = self.items.write();
        let stored = items
            .get_mut(&item.tenant_id)
            .and_then(|tenant| tenant.get_mut(&item.id))
            .ok_or_else(|| StoreError::not_found(item.tenant_id.clone(), item.id))?;
        *stored = item.clone();
        Ok(())
    }

    fn delete(&self, tenant_id: &TenantId, item_id: ItemId) -> StoreResult<bool> {
        let mut items = self.items.write();
        Ok(items
            .get_mut(tenant_id)
            .and_then(|tenant| tenant.remove(&item_id))
            .is_some())
    }

    fn max_sequence(&self) -> StoreResult<u64> {
        Ok(self
            .items
            .read()
            .values()
            .flat_map(HashMap::values)
            .map(|item| item.sequence)
            .max()
            .unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use driftq_core::{Priority, SyncAction, SyncItemDraft, SyncStatus};
    use serde_json::json;

    fn make_item(tenant: &str, entity: &str, sequence: u64) -> SyncItem {
        let draft = SyncItemDraft::new("assets", entity, SyncAction::Update).with_payload(json!({}));
        SyncItem::from_draft(
            ItemId::generate(),
            TenantId::new(tenant),
            sequence,
            Utc::now(),
            draft,
        )
    }

    #[test]
    fn append_and_get() {
        let backend = MemoryBackend::new();
        let item = make_item("acme", "a-1", 1);

        backend.append(&item).unwrap();
        let fetched = backend.get(&item.tenant_id, item.id).unwrap().unwrap();
        assert_eq!(fetched, item);
    }

    #[test]
    fn append_duplicate_fails() {
        let backend = MemoryBackend::new();
        let item = make_item("acme", "a-1", 1);

        backend.append(&item).unwrap();
        assert!(matches!(
            backend.append(&item),
            Err(StoreError::Duplicate { .. })
        ));
    }

    #[test]
    fn tenants_are_isolated() {
        let backend = MemoryBackend::new();
        let item = make_item("acme", "a-1", 1);
        backend.append(&item).unwrap();

        let other = TenantId::new("globex");
        assert!(backend.get(&other, item.id).unwrap().is_none());
        assert!(backend.scan(&other, &ScanFilter::all()).unwrap().is_empty());
    }

    #[test]
    fn scan_orders_by_enqueue() {
        let backend = MemoryBackend::new();
        for seq in [3u64, 1, 2] {
            backend.append(&make_item("acme", &format!("e-{seq}"), seq)).unwrap();
        }

        let items = backend
            .scan(&TenantId::new("acme"), &ScanFilter::all())
            .unwrap();
        // Same-millisecond enqueues fall back to sequence order
        let seqs: Vec<u64> = items.iter().map(|i| i.sequence).collect();
        let mut sorted = seqs.clone();
        sorted.sort_unstable();
        assert_eq!(seqs, sorted);
    }

    #[test]
    fn scan_applies_filter() {
        let backend = MemoryBackend::new();
        let mut failed = make_item("acme", "a-1", 1);
        failed.begin_attempt(Utc::now()).unwrap();
        failed.fail("boom", None).unwrap();
        backend.append(&failed).unwrap();
        backend.append(&make_item("acme", "a-2", 2)).unwrap();

        let filter = ScanFilter::all().with_statuses(vec![SyncStatus::Failed]);
        let items = backend.scan(&TenantId::new("acme"), &filter).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].entity_id, "a-1");
    }

    #[test]
    fn update_missing_fails() {
        let backend = MemoryBackend::new();
        let item = make_item("acme", "a-1", 1);
        assert!(matches!(
            backend.update(&item),
            Err(StoreError::NotFound { .. })
        ));
    }

    #[test]
    fn update_replaces() {
        let backend = MemoryBackend::new();
        let mut item = make_item("acme", "a-1", 1);
        backend.append(&item).unwrap();

        item.metadata.priority = Priority::Critical;
        backend.update(&item).unwrap();
        let fetched = backend.get(&item.tenant_id, item.id).unwrap().unwrap();
        assert_eq!(fetched.priority(), Priority::Critical);
    }

    #[test]
    fn delete_reports_existence() {
        let backend = MemoryBackend::new();
        let item = make_item("acme", "a-1", 1);
        backend.append(&item).unwrap();

        assert!(backend.delete(&item.tenant_id, item.id).unwrap());
        assert!(!backend.delete(&item.tenant_id, item.id).unwrap());
        assert!(backend.is_empty());
    }

    #[test]
    fn max_sequence_spans_tenants() {
        let backend = MemoryBackend::new();
        assert_eq!(backend.max_sequence().unwrap(), 0);

        backend.append(&make_item("acme", "a-1", 4)).unwrap();
        backend.append(&make_item("globex", "g-1", 9)).unwrap();
        assert_eq!(backend.max_sequence().unwrap(), 9);
    }
}
