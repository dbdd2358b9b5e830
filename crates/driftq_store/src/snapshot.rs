//! Entity snapshot store interface.
//!
//! CRUD callers read and write local entity snapshots independently of the
//! queue; the sync engine reconciles a snapshot with the server's canonical
//! entity after successful delivery and marks it synced.

use crate::error::StoreResult;
use chrono::{DateTime, Utc};
use driftq_core::TenantId;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// One locally cached entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotRecord {
    /// The entity object.
    pub entity: Value,
    /// Whether the remote system has confirmed this version.
    pub synced: bool,
    /// When the snapshot was last written.
    pub updated_at: DateTime<Utc>,
}

/// Local entity snapshots, keyed by `(tenant, store, entity)`.
pub trait SnapshotStore: Send + Sync {
    /// Looks up one snapshot.
    fn get(
        &self,
        tenant_id: &TenantId,
        store_name: &str,
        entity_id: &str,
    ) -> StoreResult<Option<SnapshotRecord>>;

    /// Writes a snapshot, replacing any existing one. The record starts
    /// unsynced.
    fn put(
        &self,
        tenant_id: &TenantId,
        store_name: &str,
        entity_id: &str,
        entity: Value,
    ) -> StoreResult<()>;

    /// Deletes one snapshot; returns whether it existed.
    fn delete(&self, tenant_id: &TenantId, store_name: &str, entity_id: &str)
        -> StoreResult<bool>;

    /// Flags a snapshot as confirmed by the remote system.
    ///
    /// Has no effect if no snapshot exists for the key.
    fn mark_synced(
        &self,
        tenant_id: &TenantId,
        store_name: &str,
        entity_id: &str,
    ) -> StoreResult<()>;
}

type SnapshotKey = (TenantId, String, String);

/// An in-memory snapshot store for tests and development.
#[derive(Debug, Default)]
pub struct MemorySnapshotStore {
    entries: RwLock<HashMap<SnapshotKey, SnapshotRecord>>,
}

impl MemorySnapshotStore {
    /// Creates a new empty snapshot store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored snapshots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns true if no snapshots are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

fn key(tenant_id: &TenantId, store_name: &str, entity_id: &str) -> SnapshotKey {
    (tenant_id.clone(), store_name.to_owned(), entity_id.to_owned())
}

impl SnapshotStore for MemorySnapshotStore {
    fn get(
        &self,
        tenant_id: &TenantId,
        store_name: &str,
        entity_id: &str,
    ) -> StoreResult<Option<SnapshotRecord>> {
        Ok(self
            .entries
            .read()
            .get(&key(tenant_id, store_name, entity_id))
            .cloned())
    }

    fn put(
        &self,
        tenant_id: &TenantId,
        store_name: &str,
        entity_id: &str,
        entity: Value,
    ) -> StoreResult<()> {
        self.entries.write().insert(
            key(tenant_id, store_name, entity_id),
            SnapshotRecord {
                entity,
                synced: false,
                updated_at: Utc::now(),
            },
        );
        Ok(())
    }

    fn delete(
        &self,
        tenant_id: &TenantId,
        store_name: &str,
        entity_id: &str,
    ) -> StoreResult<bool> {
        Ok(self
            .entries
            .write()
            .remove(&key(tenant_id, store_name, entity_id))
            .is_some())
    }

    fn mark_synced(
        &self,
        tenant_id: &TenantId,
        store_name: &str,
        entity_id: &str,
    ) -> StoreResult<()> {
        if let Some(record) = self
            .entries
            .write()
            .get_mut(&key(tenant_id, store_name, entity_id))
        {
            record.synced = true;
        }
        Ok(())
    }
}
