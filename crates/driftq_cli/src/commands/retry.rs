//! Retry command implementation.

use super::CommandResult;
use driftq_core::TenantId;
use driftq_store::{FileBackend, RetryCriteria, SyncQueue};
use std::path::Path;

/// Runs the retry command.
pub fn run(
    path: &Path,
    tenant: &str,
    max_retries: Option<u32>,
    store: Option<&str>,
    entity: Option<&str>,
) -> CommandResult {
    let backend = FileBackend::open(path)?;
    let queue = SyncQueue::new(backend)?;
    let tenant_id = TenantId::new(tenant);

    let mut criteria = RetryCriteria::all();
    if let Some(max_retries) = max_retries {
        criteria = criteria.with_max_retries(max_retries);
    }
    if let Some(store) = store {
        criteria = criteria.with_store_name(store);
    }
    if let Some(entity) = entity {
        criteria = criteria.with_entity_id(entity);
    }

    let reset = queue.retry_failed(&tenant_id, &criteria)?;
    println!("{reset} item(s) reset to pending");

    Ok(())
}
