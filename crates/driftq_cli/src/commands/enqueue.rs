//! Enqueue command implementation.

use super::{parse_action, parse_priority, CommandResult};
use driftq_core::{SyncItemDraft, TenantId};
use driftq_store::{FileBackend, SyncQueue};
use std::path::Path;
use tracing::info;

/// Runs the enqueue command.
#[allow(clippy::too_many_arguments)]
pub fn run(
    path: &Path,
    tenant: &str,
    store: &str,
    entity: &str,
    action: &str,
    payload: Option<&str>,
    priority: &str,
    correlation_id: Option<&str>,
    max_attempts: Option<u32>,
) -> CommandResult {
    let backend = FileBackend::open_with_create_dirs(path)?;
    let queue = SyncQueue::new(backend)?;
    let tenant_id = TenantId::new(tenant);

    let mut draft = SyncItemDraft::new(store, entity, parse_action(action)?)
        .with_priority(parse_priority(priority)?);
    if let Some(payload) = payload {
        draft = draft.with_payload(serde_json::from_str(payload)?);
    }
    if let Some(correlation_id) = correlation_id {
        draft = draft.with_correlation_id(correlation_id);
    }
    if let Some(max_attempts) = max_attempts {
        draft = draft.with_max_attempts(max_attempts);
    }

    let item = queue.enqueue(&tenant_id, draft)?;
    info!("Enqueued {} for {}/{}", item.id, store, entity);
    println!("{}", item.id);

    Ok(())
}
