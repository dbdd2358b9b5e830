//! Remote sync adapter boundary.
//!
//! The adapter performs the actual network exchange for one sync item and
//! classifies the outcome. This module defines the trait and wire types,
//! plus a scriptable mock for tests; the randomized development stand-in
//! lives in [`simulated`](crate::SimulatedAdapter).

use crate::error::{EngineError, EngineResult};
use chrono::{DateTime, Utc};
use driftq_core::{ConflictDetails, ItemId, SyncAction, SyncItem, TenantId};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};

/// One delivery request: everything the remote system needs to apply a
/// single item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncRequest {
    /// The originating tenant.
    pub tenant_id: TenantId,
    /// The item being delivered.
    pub item_id: ItemId,
    /// The mutation to apply.
    pub action: SyncAction,
    /// Target entity collection.
    pub store_name: String,
    /// Target entity.
    pub entity_id: String,
    /// Full entity object for non-delete actions.
    pub payload: Option<Value>,
    /// When the originating user action occurred.
    pub timestamp: DateTime<Utc>,
    /// Groups related items produced by one originating action.
    pub correlation_id: Option<String>,
    /// Which delivery attempt this is (1-indexed).
    pub attempt: u32,
}

impl SyncRequest {
    /// Builds the request for one queue item.
    #[must_use]
    pub fn for_item(item: &SyncItem) -> Self {
        Self {
            tenant_id: item.tenant_id.clone(),
            item_id: item.id,
            action: item.action,
            store_name: item.store_name.clone(),
            entity_id: item.entity_id.clone(),
            payload: item.payload.clone(),
            timestamp: item.timestamp,
            correlation_id: item.metadata.correlation_id.clone(),
            attempt: item.metadata.attempt_count,
        }
    }
}

/// Classified outcome of one delivery attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncOutcome {
    /// The mutation was applied; `entity` is the server's canonical
    /// representation (e.g. with a server-assigned id and version).
    Applied {
        /// Server-canonical entity object.
        entity: Value,
    },
    /// The remote system's version of the entity disagrees with the
    /// client's assumed base.
    Conflict(ConflictDetails),
    /// The remote system rejected or failed the request.
    Failed {
        /// Human-readable error message.
        message: String,
    },
}

/// Performs the network exchange for one sync item.
///
/// Implementations must be idempotent with respect to `(entity_id, action)`
/// when retried: the engine may call `apply` more than once for the same
/// item after a failure and does not deduplicate at the network level.
///
/// Return `Ok` with a classified [`SyncOutcome`] for anything the remote
/// system said; reserve `Err` for transport-level failures (connection
/// refused, timeout). The engine records both paths as item failures.
pub trait RemoteAdapter: Send + Sync {
    /// Attempts to apply one item to the remote system.
    fn apply(&self, request: &SyncRequest) -> EngineResult<SyncOutcome>;

    /// Checks if the adapter currently has connectivity.
    fn is_connected(&self) -> bool;
}

/// A scriptable adapter for tests.
///
/// Outcomes can be queued per entity; entities without a script echo the
/// request payload back as a success. Every request is recorded.
#[derive(Debug, Default)]
pub struct MockAdapter {
    connected: AtomicBool,
    default_outcome: Mutex<Option<SyncOutcome>>,
    scripted: Mutex<HashMap<String, VecDeque<SyncOutcome>>>,
    requests: Mutex<Vec<SyncRequest>>,
}

impl MockAdapter {
    /// Creates a connected mock with no scripted outcomes.
    #[must_use]
    pub fn new() -> Self {
        Self {
            connected: AtomicBool::new(true),
            default_outcome: Mutex::new(None),
            scripted: Mutex::new(HashMap::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queues the next outcome for one entity.
    pub fn push_outcome(&self, entity_id: impl Into<String>, outcome: SyncOutcome) {
        self.scripted
            .lock()
            .entry(entity_id.into())
            .or_default()
            .push_back(outcome);
    }

    /// Sets the outcome returned for entities without a script.
    pub fn set_default_outcome(&self, outcome: SyncOutcome) {
        *self.default_outcome.lock() = Some(outcome);
    }

    /// Sets the connected state.
    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    /// Returns all requests seen so far, in order.
    #[must_use]
    pub fn requests(&self) -> Vec<SyncRequest> {
        self.requests.lock().clone()
    }

    /// Returns the number of requests seen so far.
    #[must_use]
    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }
}

impl RemoteAdapter for MockAdapter {
    fn apply(&self, request: &SyncRequest) -> EngineResult<SyncOutcome> {
        if !self.is_connected() {
            return Err(EngineError::transport_retryable("adapter disconnected"));
        }
        self.requests.lock().push(request.clone());

        if let Some(queue) = self.scripted.lock().get_mut(&request.entity_id) {
            if let Some(outcome) = queue.pop_front() {
                return Ok(outcome);
            }
        }
        if let Some(outcome) = self.default_outcome.lock().clone() {
            return Ok(outcome);
        }

        // Echo success: the server accepted the payload as-is.
        let entity = request
            .payload
            .clone()
            .unwrap_or_else(|| serde_json::json!({ "id": request.entity_id }));
        Ok(SyncOutcome::Applied { entity })
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}
