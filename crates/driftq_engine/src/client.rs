//! The tenant-bound client facade.

use crate::adapter::RemoteAdapter;
use crate::config::EngineConfig;
use crate::engine::{BatchResult, ProcessOptions, SyncEngine};
use crate::error::EngineResult;
use crate::scheduler::{AutoSync, AutoSyncHandle};
use chrono::{DateTime, Utc};
use driftq_core::{ItemId, QueueStats, SyncItem, SyncItemDraft, TenantId};
use driftq_store::{ClearCriteria, QueueBackend, RetryCriteria, SnapshotStore, SyncQueue};
use parking_lot::Mutex;
use std::sync::Arc;

/// The public face of the sync queue for one tenant.
///
/// `SyncClient` is pure orchestration over the queue and the engine:
/// every operation is scoped to the tenant the client was built for, and
/// nothing here adds logic of its own. CRUD callers hold one client per
/// active tenant.
pub struct SyncClient<B, S, A> {
    tenant_id: TenantId,
    queue: Arc<SyncQueue<B>>,
    engine: Arc<SyncEngine<B, S, A>>,
    auto_sync: Mutex<Option<AutoSyncHandle>>,
}

impl<B, S, A> SyncClient<B, S, A>
where
    B: QueueBackend + 'static,
    S: SnapshotStore + 'static,
    A: RemoteAdapter + 'static,
{
    /// Creates a client for one tenant over the given collaborators.
    pub fn new(
        tenant_id: TenantId,
        queue: Arc<SyncQueue<B>>,
        snapshots: Arc<S>,
        adapter: Arc<A>,
        config: EngineConfig,
    ) -> Self {
        let engine = Arc::new(SyncEngine::new(
            Arc::clone(&queue),
            snapshots,
            adapter,
            config,
        ));
        Self {
            tenant_id,
            queue,
            engine,
            auto_sync: Mutex::new(None),
        }
    }

    /// Returns the tenant this client is bound to.
    pub fn tenant_id(&self) -> &TenantId {
        &self.tenant_id
    }

    /// Returns the underlying engine.
    pub fn engine(&self) -> &Arc<SyncEngine<B, S, A>> {
        &self.engine
    }

    /// Enqueues one mutation for eventual delivery.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a malformed draft; nothing is stored
    /// in that case.
    pub fn enqueue(&self, draft: SyncItemDraft) -> EngineResult<SyncItem> {
        Ok(self.queue.enqueue(&self.tenant_id, draft)?)
    }

    /// Runs one processing pass.
    ///
    /// # Errors
    ///
    /// Returns [`PassInProgress`](crate::EngineError::PassInProgress) if a
    /// pass is already running for this tenant.
    pub fn process(&self, options: &ProcessOptions) -> EngineResult<BatchResult> {
        self.engine.process(&self.tenant_id, options)
    }

    /// Runs an immediate pass with the larger forced batch size.
    ///
    /// Bypasses the wait for the next auto-sync tick but shares its
    /// single-pass-per-tenant guard.
    ///
    /// # Errors
    ///
    /// Returns [`PassInProgress`](crate::EngineError::PassInProgress) if a
    /// pass is already running for this tenant.
    pub fn force_sync(&self) -> EngineResult<BatchResult> {
        let options =
            ProcessOptions::default().with_batch_size(self.engine.config().force_batch_size);
        self.engine.process(&self.tenant_id, &options)
    }

    /// Resets matching failed and conflicted items to pending.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the reset scan or an update fails.
    pub fn retry_failed(&self, criteria: &RetryCriteria) -> EngineResult<usize> {
        Ok(self.queue.retry_failed(&self.tenant_id, criteria)?)
    }

    /// Bulk-deletes matching items; returns the number removed.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the scan or a delete fails.
    pub fn clear(&self, criteria: &ClearCriteria) -> EngineResult<usize> {
        Ok(self.queue.clear(&self.tenant_id, criteria)?)
    }

    /// Withdraws one not-yet-in-flight item.
    ///
    /// # Errors
    ///
    /// Returns a not-found or invalid-transition error.
    pub fn cancel(&self, item_id: ItemId) -> EngineResult<SyncItem> {
        Ok(self.queue.cancel(&self.tenant_id, item_id)?)
    }

    /// Resets one conflicted item to pending after out-of-band resolution.
    ///
    /// # Errors
    ///
    /// Returns a not-found or invalid-transition error.
    pub fn resolve_conflict(&self, item_id: ItemId) -> EngineResult<SyncItem> {
        Ok(self.queue.resolve_conflict(&self.tenant_id, item_id)?)
    }

    /// Recomputes queue-health statistics for this tenant.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the scan fails.
    pub fn stats(&self) -> EngineResult<QueueStats> {
        Ok(self.queue.stats(&self.tenant_id)?)
    }

    /// Returns when this tenant's most recent pass finished.
    pub fn last_sync(&self) -> Option<DateTime<Utc>> {
        self.engine.last_sync(&self.tenant_id)
    }

    /// Starts the auto-sync loop; a no-op if it is already running.
    ///
    /// Returns true if a loop was started by this call.
    pub fn start_auto_sync(&self) -> bool {
        let mut auto_sync = self.auto_sync.lock();
        if auto_sync.is_some() {
            return false;
        }
        let config = self.engine.config();
        *auto_sync = Some(AutoSync::start(
            Arc::clone(&self.engine),
            self.tenant_id.clone(),
            config.auto_sync_interval,
            config.batch_size,
        ));
        true
    }

    /// Stops the auto-sync loop; a no-op if it is not running.
    ///
    /// Returns true if a loop was stopped by this call.
    pub fn stop_auto_sync(&self) -> bool {
        match self.auto_sync.lock().take() {
            Some(handle) => {
                handle.stop();
                true
            }
            None => false,
        }
    }

    /// Returns true if the auto-sync loop is running.
    pub fn auto_sync_running(&self) -> bool {
        self.auto_sync.lock().is_some()
    }
}

impl<B, S, A> Drop for SyncClient<B, S, A> {
    fn drop(&mut self) {
        // Dropping the handle signals the loop to stop.
        self.auto_sync.lock().take();
    }
}
