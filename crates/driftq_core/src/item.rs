//! The sync item: one durable unit of pending work.

use crate::conflict::ConflictDetails;
use crate::error::{CoreError, CoreResult};
use crate::metadata::ItemMetadata;
use crate::priority::Priority;
use crate::status::SyncStatus;
use crate::types::{ItemId, TenantId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// The mutation an item carries to the remote system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncAction {
    /// Create a new entity.
    Create,
    /// Update an existing entity.
    Update,
    /// Delete an entity.
    Delete,
    /// Create a batch of entities in one request.
    BulkCreate,
    /// Update a batch of entities in one request.
    BulkUpdate,
    /// Delete a batch of entities in one request.
    BulkDelete,
    /// Create-or-update an entity.
    Upsert,
}

impl SyncAction {
    /// Returns true for delete-shaped actions, which carry no payload.
    #[must_use]
    pub fn is_delete(&self) -> bool {
        matches!(self, SyncAction::Delete | SyncAction::BulkDelete)
    }

    /// Returns the snake_case name used on the wire.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncAction::Create => "create",
            SyncAction::Update => "update",
            SyncAction::Delete => "delete",
            SyncAction::BulkCreate => "bulk_create",
            SyncAction::BulkUpdate => "bulk_update",
            SyncAction::BulkDelete => "bulk_delete",
            SyncAction::Upsert => "upsert",
        }
    }
}

impl fmt::Display for SyncAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Input to `enqueue`: everything the caller decides about a new item.
///
/// Identity, sequence, and timing are stamped by the queue. Optional fields
/// use the builder style:
///
/// ```
/// use driftq_core::{Priority, SyncAction, SyncItemDraft};
/// use serde_json::json;
///
/// let draft = SyncItemDraft::new("assets", "a-17", SyncAction::Update)
///     .with_payload(json!({"id": "a-17", "name": "rack 4"}))
///     .with_priority(Priority::High)
///     .with_correlation_id("ui-batch-9");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncItemDraft {
    /// Logical name of the target entity collection.
    pub store_name: String,
    /// Identifier of the entity being mutated; may be a client placeholder
    /// for creates until the server assigns a final identity.
    pub entity_id: String,
    /// The mutation to deliver.
    pub action: SyncAction,
    /// Full entity object for non-delete actions; `None` for deletes.
    pub payload: Option<Value>,
    /// When the originating user action occurred; defaults to enqueue time.
    pub timestamp: Option<DateTime<Utc>>,
    /// Processing priority; defaults to normal.
    pub priority: Priority,
    /// Groups related items produced by one originating action.
    pub correlation_id: Option<String>,
    /// Override for the delivery attempt ceiling.
    pub max_attempts: Option<u32>,
}

impl SyncItemDraft {
    /// Creates a draft with default priority and no payload.
    pub fn new(
        store_name: impl Into<String>,
        entity_id: impl Into<String>,
        action: SyncAction,
    ) -> Self {
        Self {
            store_name: store_name.into(),
            entity_id: entity_id.into(),
            action,
            payload: None,
            timestamp: None,
            priority: Priority::Normal,
            correlation_id: None,
            max_attempts: None,
        }
    }

    /// Sets the entity payload.
    #[must_use]
    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Sets the originating-action timestamp.
    #[must_use]
    pub fn with_timestamp(mut self, at: DateTime<Utc>) -> Self {
        self.timestamp = Some(at);
        self
    }

    /// Sets the processing priority.
    #[must_use]
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Sets the correlation ID.
    #[must_use]
    pub fn with_correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }

    /// Overrides the delivery attempt ceiling.
    #[must_use]
    pub fn with_max_attempts(mut self, max: u32) -> Self {
        self.max_attempts = Some(max);
        self
    }

    /// Validates the draft against enqueue rules.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Validation`] when the store name or entity ID is
    /// empty, when a non-delete action is missing its payload, or when a
    /// delete action carries one.
    pub fn validate(&self) -> CoreResult<()> {
        if self.store_name.is_empty() {
            return Err(CoreError::validation("store_name must not be empty"));
        }
        if self.entity_id.is_empty() {
            return Err(CoreError::validation("entity_id must not be empty"));
        }
        if self.action.is_delete() {
            if self.payload.is_some() {
                return Err(CoreError::validation(format!(
                    "{} action must not carry a payload",
                    self.action
                )));
            }
        } else if self.payload.is_none() {
            return Err(CoreError::validation(format!(
                "{} action requires a payload",
                self.action
            )));
        }
        if self.max_attempts == Some(0) {
            return Err(CoreError::validation("max_attempts must be at least 1"));
        }
        Ok(())
    }
}

/// One durable record of an intended mutation awaiting delivery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncItem {
    /// Globally unique identifier; immutable.
    pub id: ItemId,
    /// Partition key; every operation on this item is scoped to this tenant.
    pub tenant_id: TenantId,
    /// Logical name of the target entity collection.
    pub store_name: String,
    /// Identifier of the entity being mutated.
    pub entity_id: String,
    /// The mutation to deliver.
    pub action: SyncAction,
    /// Full entity object for non-delete actions.
    pub payload: Option<Value>,
    /// Current lifecycle status.
    pub status: SyncStatus,
    /// Monotonic per-queue sequence; FIFO tie-break within a priority.
    pub sequence: u64,
    /// When the item entered the queue.
    pub enqueued_at: DateTime<Utc>,
    /// When the originating user action occurred.
    pub timestamp: DateTime<Utc>,
    /// Retry and observability envelope.
    pub metadata: ItemMetadata,
}

impl SyncItem {
    /// Builds a pending item from a validated draft.
    ///
    /// The caller (the queue) supplies identity, sequence, and the enqueue
    /// time; the draft's originating timestamp defaults to the enqueue time.
    #[must_use]
    pub fn from_draft(
        id: ItemId,
        tenant_id: TenantId,
        sequence: u64,
        enqueued_at: DateTime<Utc>,
        draft: SyncItemDraft,
    ) -> Self {
        let mut metadata = ItemMetadata::new(draft.priority);
        metadata.correlation_id = draft.correlation_id;
        if let Some(max) = draft.max_attempts {
            metadata.max_attempts = max;
        }

        Self {
            id,
            tenant_id,
            store_name: draft.store_name,
            entity_id: draft.entity_id,
            action: draft.action,
            payload: draft.payload,
            status: SyncStatus::Pending,
            sequence,
            enqueued_at,
            timestamp: draft.timestamp.unwrap_or(enqueued_at),
            metadata,
        }
    }

    /// Returns the item's processing priority.
    #[must_use]
    pub fn priority(&self) -> Priority {
        self.metadata.priority
    }

    fn transition(&mut self, next: SyncStatus) -> CoreResult<()> {
        if !self.status.can_transition_to(next) {
            return Err(CoreError::invalid_transition(self.status, next));
        }
        self.status = next;
        Ok(())
    }

    /// Starts a delivery attempt: `Pending` → `InProgress`.
    ///
    /// Increments the attempt counter and records the attempt time.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidTransition`] unless the item is pending.
    pub fn begin_attempt(&mut self, now: DateTime<Utc>) -> CoreResult<()> {
        self.transition(SyncStatus::InProgress)?;
        self.metadata.attempt_count += 1;
        self.metadata.last_attempt_at = Some(now);
        Ok(())
    }

    /// Records successful delivery: `InProgress` → `Completed`.
    ///
    /// Clears failure and conflict state.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidTransition`] unless the item is in
    /// progress.
    pub fn complete(&mut self) -> CoreResult<()> {
        self.transition(SyncStatus::Completed)?;
        self.metadata.error_message = None;
        self.metadata.retry_after = None;
        self.metadata.conflict = None;
        Ok(())
    }

    /// Records a delivery failure: `InProgress` → `Failed`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidTransition`] unless the item is in
    /// progress.
    pub fn fail(
        &mut self,
        message: impl Into<String>,
        retry_after: Option<DateTime<Utc>>,
    ) -> CoreResult<()> {
        self.transition(SyncStatus::Failed)?;
        self.metadata.error_message = Some(message.into());
        self.metadata.retry_after = retry_after;
        Ok(())
    }

    /// Records a reported conflict: `InProgress` → `Conflict`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidTransition`] unless the item is in
    /// progress.
    pub fn flag_conflict(&mut self, details: ConflictDetails) -> CoreResult<()> {
        self.transition(SyncStatus::Conflict)?;
        self.metadata.conflict = Some(details);
        Ok(())
    }

    /// Withdraws the item: `Pending`/`Failed`/`Conflict` → `Cancelled`.
    ///
    /// An in-flight item cannot be cancelled; its network call is allowed to
    /// finish.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidTransition`] from `InProgress` or a
    /// terminal state.
    pub fn cancel(&mut self) -> CoreResult<()> {
        self.transition(SyncStatus::Cancelled)?;
        self.metadata.conflict = None;
        Ok(())
    }

    /// Explicit retry: `Failed`/`Conflict` → `Pending`.
    ///
    /// Clears conflict details and backoff so the item is immediately
    /// eligible; the cumulative attempt count is kept.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidTransition`] unless the item is failed or
    /// in conflict.
    pub fn reset_for_retry(&mut self) -> CoreResult<()> {
        self.transition(SyncStatus::Pending)?;
        self.metadata.conflict = None;
        self.metadata.retry_after = None;
        Ok(())
    }
}
