//! The batch sync processor.

use crate::adapter::{RemoteAdapter, SyncOutcome, SyncRequest};
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use chrono::{DateTime, Utc};
use driftq_core::{
    ConflictDetails, CoreError, ItemId, Priority, SyncAction, SyncItem, SyncStatus, TenantId,
};
use driftq_store::{BatchCriteria, QueueBackend, SnapshotStore, StoreError, SyncQueue};
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Options for one processing pass.
#[derive(Debug, Clone, Default)]
pub struct ProcessOptions {
    /// Overrides the configured batch size.
    pub batch_size: Option<usize>,
    /// Restricts the pass to one priority.
    pub priority: Option<Priority>,
}

impl ProcessOptions {
    /// Overrides the batch size for this pass.
    #[must_use]
    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = Some(size);
        self
    }

    /// Restricts this pass to one priority.
    #[must_use]
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }
}

/// Outcome of processing one item.
#[derive(Debug, Clone)]
pub struct ItemResult {
    /// The processed item.
    pub item_id: ItemId,
    /// Target entity collection.
    pub store_name: String,
    /// Target entity.
    pub entity_id: String,
    /// The mutation that was delivered.
    pub action: SyncAction,
    /// The item's status after processing.
    pub status: SyncStatus,
    /// True if the item completed.
    pub success: bool,
    /// Failure message, if any.
    pub error: Option<String>,
    /// Conflict descriptor, if the item conflicted.
    pub conflict: Option<ConflictDetails>,
    /// How long this item took to process.
    pub duration: Duration,
}

impl ItemResult {
    fn new(item: &SyncItem, status: SyncStatus, error: Option<String>, started: Instant) -> Self {
        Self {
            item_id: item.id,
            store_name: item.store_name.clone(),
            entity_id: item.entity_id.clone(),
            action: item.action,
            status,
            success: status == SyncStatus::Completed,
            error,
            conflict: item.metadata.conflict.clone(),
            duration: started.elapsed(),
        }
    }
}

/// Outcome of one processing pass.
#[derive(Debug, Clone, Default)]
pub struct BatchResult {
    /// Number of items selected for this pass.
    pub processed: usize,
    /// Items that completed.
    pub completed: usize,
    /// Items that failed.
    pub failed: usize,
    /// Items that conflicted.
    pub conflicts: usize,
    /// Items found cancelled between selection and processing.
    pub cancelled: usize,
    /// Total pass duration.
    pub duration: Duration,
    /// Per-item results, in processing order.
    pub results: Vec<ItemResult>,
}

impl BatchResult {
    fn from_results(results: Vec<ItemResult>, duration: Duration) -> Self {
        let mut batch = BatchResult {
            processed: results.len(),
            duration,
            ..BatchResult::default()
        };
        for result in &results {
            match result.status {
                SyncStatus::Completed => batch.completed += 1,
                SyncStatus::Conflict => batch.conflicts += 1,
                SyncStatus::Cancelled => batch.cancelled += 1,
                _ => batch.failed += 1,
            }
        }
        batch.results = results;
        batch
    }

    /// Returns true if the pass selected no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.processed == 0
    }
}

/// Releases a tenant's pass slot when the pass ends, however it ends.
struct PassGuard<'a> {
    in_flight: &'a Mutex<HashSet<TenantId>>,
    tenant_id: TenantId,
}

impl Drop for PassGuard<'_> {
    fn drop(&mut self) {
        self.in_flight.lock().remove(&self.tenant_id);
    }
}

/// The batch sync processor.
///
/// Executes bounded processing passes over a tenant's pending items. At
/// most one pass per tenant is in flight at a time; within a pass, items
/// are processed strictly sequentially so that multiple queued mutations
/// against the same entity apply in enqueue order.
pub struct SyncEngine<B, S, A> {
    queue: Arc<SyncQueue<B>>,
    snapshots: Arc<S>,
    adapter: Arc<A>,
    config: EngineConfig,
    in_flight: Mutex<HashSet<TenantId>>,
    last_sync: RwLock<HashMap<TenantId, DateTime<Utc>>>,
}

impl<B: QueueBackend, S: SnapshotStore, A: RemoteAdapter> SyncEngine<B, S, A> {
    /// Creates a new engine over the given collaborators.
    pub fn new(
        queue: Arc<SyncQueue<B>>,
        snapshots: Arc<S>,
        adapter: Arc<A>,
        config: EngineConfig,
    ) -> Self {
        Self {
            queue,
            snapshots,
            adapter,
            config,
            in_flight: Mutex::new(HashSet::new()),
            last_sync: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Returns the queue.
    pub fn queue(&self) -> &Arc<SyncQueue<B>> {
        &self.queue
    }

    /// Returns the snapshot store.
    pub fn snapshots(&self) -> &Arc<S> {
        &self.snapshots
    }

    /// Returns true if a pass is currently running for the tenant.
    pub fn is_processing(&self, tenant_id: &TenantId) -> bool {
        self.in_flight.lock().contains(tenant_id)
    }

    /// Returns when the tenant's most recent pass finished.
    pub fn last_sync(&self, tenant_id: &TenantId) -> Option<DateTime<Utc>> {
        self.last_sync.read().get(tenant_id).copied()
    }

    fn acquire_pass(&self, tenant_id: &TenantId) -> EngineResult<PassGuard<'_>> {
        let mut in_flight = self.in_flight.lock();
        if !in_flight.insert(tenant_id.clone()) {
            return Err(EngineError::PassInProgress {
                tenant_id: tenant_id.clone(),
            });
        }
        Ok(PassGuard {
            in_flight: &self.in_flight,
            tenant_id: tenant_id.clone(),
        })
    }

    /// Executes exactly one bounded processing pass for the tenant.
    ///
    /// Selects up to the batch size of pending items and processes them
    /// sequentially. A single item's failure never aborts the pass; the
    /// pass always returns a [`BatchResult`]. An empty selection is a no-op
    /// result, not an error.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::PassInProgress`] if a pass is already running
    /// for this tenant (queue state untouched), or a storage error if batch
    /// selection itself fails.
    pub fn process(
        &self,
        tenant_id: &TenantId,
        options: &ProcessOptions,
    ) -> EngineResult<BatchResult> {
        let _guard = self.acquire_pass(tenant_id)?;
        let started = Instant::now();

        let limit = options.batch_size.unwrap_or(self.config.batch_size);
        let mut criteria = BatchCriteria::with_limit(limit);
        if let Some(priority) = options.priority {
            criteria = criteria.with_priority(priority);
        }

        let batch = self.queue.next_batch(tenant_id, &criteria)?;
        if batch.is_empty() {
            self.record_pass_end(tenant_id);
            return Ok(BatchResult::default());
        }

        let mut results = Vec::with_capacity(batch.len());
        for item in batch {
            results.push(self.process_item(tenant_id, item));
        }

        let result = BatchResult::from_results(results, started.elapsed());
        self.record_pass_end(tenant_id);
        tracing::info!(
            tenant = %tenant_id,
            processed = result.processed,
            completed = result.completed,
            failed = result.failed,
            conflicts = result.conflicts,
            duration_ms = result.duration.as_millis() as u64,
            "processing pass finished"
        );
        Ok(result)
    }

    fn record_pass_end(&self, tenant_id: &TenantId) {
        self.last_sync
            .write()
            .insert(tenant_id.clone(), Utc::now());
    }

    /// Processes one selected item, capturing every failure into the
    /// result rather than propagating it.
    fn process_item(&self, tenant_id: &TenantId, item: SyncItem) -> ItemResult {
        let started = Instant::now();

        let in_progress = match self.queue.mark_in_progress(tenant_id, item.id) {
            Ok(marked) => marked,
            Err(StoreError::Core(CoreError::InvalidTransition {
                from: SyncStatus::Cancelled,
                ..
            })) => {
                // Withdrawn between selection and processing; skip it.
                return ItemResult::new(&item, SyncStatus::Cancelled, None, started);
            }
            Err(err) => {
                return ItemResult::new(&item, item.status, Some(err.to_string()), started);
            }
        };

        let request = SyncRequest::for_item(&in_progress);
        let result = match self.adapter.apply(&request) {
            Ok(SyncOutcome::Applied { entity }) => {
                self.finish_success(tenant_id, &in_progress, entity, started)
            }
            Ok(SyncOutcome::Conflict(details)) => {
                self.finish_conflict(tenant_id, &in_progress, details, started)
            }
            Ok(SyncOutcome::Failed { message }) => {
                self.finish_failure(tenant_id, &in_progress, message, started)
            }
            Err(err) => self.finish_failure(tenant_id, &in_progress, err.to_string(), started),
        };

        if !result.success {
            tracing::warn!(
                item = %result.item_id,
                entity = %result.entity_id,
                status = %result.status,
                error = result.error.as_deref().unwrap_or(""),
                "item did not complete"
            );
        }
        result
    }

    /// Reconciles the snapshot with the server entity, then completes the
    /// item.
    fn finish_success(
        &self,
        tenant_id: &TenantId,
        item: &SyncItem,
        entity: Value,
        started: Instant,
    ) -> ItemResult {
        if let Err(err) = self.reconcile_snapshot(tenant_id, item, &entity) {
            return self.finish_failure(
                tenant_id,
                item,
                format!("snapshot reconcile failed: {err}"),
                started,
            );
        }
        match self.queue.mark_completed(tenant_id, item.id) {
            Ok(completed) => ItemResult::new(&completed, SyncStatus::Completed, None, started),
            Err(err) => ItemResult::new(item, item.status, Some(err.to_string()), started),
        }
    }

    fn finish_conflict(
        &self,
        tenant_id: &TenantId,
        item: &SyncItem,
        details: ConflictDetails,
        started: Instant,
    ) -> ItemResult {
        match self.queue.mark_conflict(tenant_id, item.id, details) {
            Ok(conflicted) => ItemResult::new(&conflicted, SyncStatus::Conflict, None, started),
            Err(err) => ItemResult::new(item, item.status, Some(err.to_string()), started),
        }
    }

    fn finish_failure(
        &self,
        tenant_id: &TenantId,
        item: &SyncItem,
        message: String,
        started: Instant,
    ) -> ItemResult {
        let backoff = self
            .config
            .retry
            .delay_for_attempt(item.metadata.attempt_count);
        let retry_after = chrono::Duration::from_std(backoff)
            .ok()
            .map(|delay| Utc::now() + delay);

        match self
            .queue
            .mark_failed(tenant_id, item.id, &message, retry_after)
        {
            Ok(failed) => ItemResult::new(&failed, SyncStatus::Failed, Some(message), started),
            Err(err) => ItemResult::new(
                item,
                item.status,
                Some(format!("{message}; marking failed also failed: {err}")),
                started,
            ),
        }
    }

    /// Applies the server's canonical entity to the local snapshot store.
    ///
    /// Deletes drop the snapshot; other actions store the entity under the
    /// server-assigned id (dropping the client placeholder if the server
    /// renamed it) and mark it synced.
    fn reconcile_snapshot(
        &self,
        tenant_id: &TenantId,
        item: &SyncItem,
        entity: &Value,
    ) -> EngineResult<()> {
        if item.action.is_delete() {
            self.snapshots
                .delete(tenant_id, &item.store_name, &item.entity_id)?;
            return Ok(());
        }

        let server_id = entity
            .get("id")
            .and_then(Value::as_str)
            .unwrap_or(&item.entity_id)
            .to_owned();
        if server_id != item.entity_id {
            self.snapshots
                .delete(tenant_id, &item.store_name, &item.entity_id)?;
        }
        self.snapshots
            .put(tenant_id, &item.store_name, &server_id, entity.clone())?;
        self.snapshots
            .mark_synced(tenant_id, &item.store_name, &server_id)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::MockAdapter;
    use driftq_core::{ConflictKind, SyncItemDraft};
    use driftq_store::{MemoryBackend, MemorySnapshotStore};
    use serde_json::json;

    type TestEngine = SyncEngine<MemoryBackend, MemorySnapshotStore, MockAdapter>;

    fn engine() -> (TestEngine, Arc<MockAdapter>) {
        let queue = Arc::new(SyncQueue::new(MemoryBackend::new()).unwrap());
        let snapshots = Arc::new(MemorySnapshotStore::new());
        let adapter = Arc::new(MockAdapter::new());
        let engine = SyncEngine::new(
            queue,
            snapshots,
            Arc::clone(&adapter),
            EngineConfig::default(),
        );
        (engine, adapter)
    }

    fn tenant() -> TenantId {
        TenantId::new("acme")
    }

    fn draft(entity: &str) -> SyncItemDraft {
        SyncItemDraft::new("assets", entity, SyncAction::Update).with_payload(json!({"id": entity}))
    }

    #[test]
    fn empty_pass_is_a_noop() {
        let (engine, _) = engine();
        let result = engine.process(&tenant(), &ProcessOptions::default()).unwrap();
        assert!(result.is_empty());
        assert!(engine.last_sync(&tenant()).is_some());
    }

    #[test]
    fn successful_pass_completes_items() {
        let (engine, adapter) = engine();
        let t = tenant();
        engine.queue().enqueue(&t, draft("a-1")).unwrap();
        engine.queue().enqueue(&t, draft("a-2")).unwrap();

        let result = engine.process(&t, &ProcessOptions::default()).unwrap();
        assert_eq!(result.processed, 2);
        assert_eq!(result.completed, 2);
        assert_eq!(result.failed, 0);
        assert_eq!(adapter.request_count(), 2);

        let stats = engine.queue().stats(&t).unwrap();
        assert_eq!(stats.by_status.completed, 2);
    }

    #[test]
    fn failure_marks_item_failed_with_backoff() {
        let (engine, adapter) = engine();
        let t = tenant();
        let item = engine.queue().enqueue(&t, draft("a-1")).unwrap();
        adapter.push_outcome(
            "a-1",
            SyncOutcome::Failed {
                message: "server exploded".into(),
            },
        );

        let result = engine.process(&t, &ProcessOptions::default()).unwrap();
        assert_eq!(result.failed, 1);
        assert_eq!(result.results[0].error.as_deref(), Some("server exploded"));

        let failed = engine.queue().get(&t, item.id).unwrap();
        assert_eq!(failed.status, SyncStatus::Failed);
        assert_eq!(failed.metadata.attempt_count, 1);
        assert!(failed.metadata.retry_after.is_some());
    }

    #[test]
    fn transport_error_is_captured_per_item() {
        let (engine, adapter) = engine();
        let t = tenant();
        engine.queue().enqueue(&t, draft("a-1")).unwrap();
        adapter.set_connected(false);

        let result = engine.process(&t, &ProcessOptions::default()).unwrap();
        assert_eq!(result.failed, 1);
        assert!(result.results[0]
            .error
            .as_deref()
            .unwrap()
            .contains("adapter disconnected"));
    }

    #[test]
    fn conflict_marks_item_and_keeps_details() {
        let (engine, adapter) = engine();
        let t = tenant();
        let item = engine.queue().enqueue(&t, draft("a-1")).unwrap();
        adapter.push_outcome(
            "a-1",
            SyncOutcome::Conflict(ConflictDetails::new(
                ConflictKind::Version,
                Some(json!({"id": "a-1", "v": 9})),
                Some(json!({"id": "a-1", "v": 1})),
            )),
        );

        let result = engine.process(&t, &ProcessOptions::default()).unwrap();
        assert_eq!(result.conflicts, 1);
        assert!(result.results[0].conflict.is_some());

        let conflicted = engine.queue().get(&t, item.id).unwrap();
        assert_eq!(conflicted.status, SyncStatus::Conflict);
    }

    #[test]
    fn one_bad_item_does_not_abort_the_pass() {
        let (engine, adapter) = engine();
        let t = tenant();
        engine.queue().enqueue(&t, draft("a-1")).unwrap();
        engine.queue().enqueue(&t, draft("a-2")).unwrap();
        engine.queue().enqueue(&t, draft("a-3")).unwrap();
        adapter.push_outcome(
            "a-2",
            SyncOutcome::Failed {
                message: "boom".into(),
            },
        );

        let result = engine.process(&t, &ProcessOptions::default()).unwrap();
        assert_eq!(result.processed, 3);
        assert_eq!(result.completed, 2);
        assert_eq!(result.failed, 1);
    }

    #[test]
    fn cancelled_item_is_skipped_and_counted() {
        let (engine, adapter) = engine();
        let t = tenant();
        let item = engine.queue().enqueue(&t, draft("a-1")).unwrap();

        // Simulate a cancellation racing the selection: the engine sees a
        // batch containing an item that is no longer pending.
        let batch_item = engine.queue().get(&t, item.id).unwrap();
        engine.queue().cancel(&t, item.id).unwrap();
        let result = engine.process_item(&t, batch_item);

        assert_eq!(result.status, SyncStatus::Cancelled);
        assert!(!result.success);
        assert_eq!(adapter.request_count(), 0);
    }

    #[test]
    fn snapshot_reflects_server_entity() {
        let (engine, adapter) = engine();
        let t = tenant();
        engine.queue().enqueue(&t, draft("a-1")).unwrap();
        adapter.push_outcome(
            "a-1",
            SyncOutcome::Applied {
                entity: json!({"id": "a-1", "version": 4}),
            },
        );

        engine.process(&t, &ProcessOptions::default()).unwrap();

        let record = engine
            .snapshots()
            .get(&t, "assets", "a-1")
            .unwrap()
            .unwrap();
        assert_eq!(record.entity, json!({"id": "a-1", "version": 4}));
        assert!(record.synced);
    }

    #[test]
    fn delete_action_drops_snapshot() {
        let (engine, _) = engine();
        let t = tenant();
        engine
            .snapshots()
            .put(&t, "assets", "a-1", json!({"id": "a-1"}))
            .unwrap();
        engine
            .queue()
            .enqueue(&t, SyncItemDraft::new("assets", "a-1", SyncAction::Delete))
            .unwrap();

        engine.process(&t, &ProcessOptions::default()).unwrap();
        assert!(engine.snapshots().get(&t, "assets", "a-1").unwrap().is_none());
    }

    #[test]
    fn batch_size_option_bounds_the_pass() {
        let (engine, _) = engine();
        let t = tenant();
        for i in 0..5 {
            engine.queue().enqueue(&t, draft(&format!("e-{i}"))).unwrap();
        }

        let result = engine
            .process(&t, &ProcessOptions::default().with_batch_size(2))
            .unwrap();
        assert_eq!(result.processed, 2);
        assert_eq!(engine.queue().stats(&t).unwrap().by_status.pending, 3);
    }

    #[test]
    fn reentrant_pass_is_rejected() {
        let (engine, _) = engine();
        let t = tenant();
        let _guard = engine.acquire_pass(&t).unwrap();

        let result = engine.process(&t, &ProcessOptions::default());
        assert!(matches!(result, Err(EngineError::PassInProgress { .. })));
    }

    #[test]
    fn pass_guard_releases_on_drop() {
        let (engine, _) = engine();
        let t = tenant();
        {
            let _guard = engine.acquire_pass(&t).unwrap();
            assert!(engine.is_processing(&t));
        }
        assert!(!engine.is_processing(&t));
        assert!(engine.process(&t, &ProcessOptions::default()).is_ok());
    }

    #[test]
    fn passes_for_different_tenants_are_independent() {
        let (engine, _) = engine();
        let _guard = engine.acquire_pass(&tenant()).unwrap();

        let other = TenantId::new("globex");
        assert!(engine.process(&other, &ProcessOptions::default()).is_ok());
    }
}
