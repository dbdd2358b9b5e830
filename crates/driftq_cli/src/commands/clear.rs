//! Clear command implementation.

use super::{parse_status, CommandResult};
use chrono::{Duration, Utc};
use driftq_core::TenantId;
use driftq_store::{ClearCriteria, FileBackend, SyncQueue};
use std::path::Path;

/// Runs the clear command.
pub fn run(
    path: &Path,
    tenant: &str,
    statuses: &[String],
    store: Option<&str>,
    older_than_secs: Option<i64>,
) -> CommandResult {
    let backend = FileBackend::open(path)?;
    let queue = SyncQueue::new(backend)?;
    let tenant_id = TenantId::new(tenant);

    let mut criteria = ClearCriteria::all();
    if !statuses.is_empty() {
        let parsed = statuses
            .iter()
            .map(|name| parse_status(name))
            .collect::<Result<Vec<_>, _>>()?;
        criteria = criteria.with_statuses(parsed);
    }
    if let Some(store) = store {
        criteria = criteria.with_store_name(store);
    }
    if let Some(secs) = older_than_secs {
        criteria = criteria.with_older_than(Utc::now() - Duration::seconds(secs));
    }

    let removed = queue.clear(&tenant_id, &criteria)?;
    println!("{removed} item(s) removed");

    Ok(())
}
