//! List command implementation.

use super::{parse_status, CommandResult};
use driftq_core::TenantId;
use driftq_store::{FileBackend, QueueBackend, ScanFilter, SyncQueue};
use std::path::Path;

/// Runs the list command.
pub fn run(
    path: &Path,
    tenant: &str,
    status: Option<&str>,
    limit: usize,
    format: &str,
) -> CommandResult {
    let backend = FileBackend::open(path)?;
    let queue = SyncQueue::new(backend)?;
    let tenant_id = TenantId::new(tenant);

    let mut filter = ScanFilter::all();
    if let Some(status) = status {
        filter = filter.with_statuses(vec![parse_status(status)?]);
    }

    let mut items = queue.backend().scan(&tenant_id, &filter)?;
    items.truncate(limit);

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&items)?);
        return Ok(());
    }

    if items.is_empty() {
        println!("No items.");
        return Ok(());
    }
    for item in &items {
        println!(
            "{}  {:<11} {:<8} {:<11} {}/{}  attempts {}/{}",
            item.id,
            item.status,
            item.priority(),
            item.action,
            item.store_name,
            item.entity_id,
            item.metadata.attempt_count,
            item.metadata.max_attempts,
        );
        if let Some(error) = &item.metadata.error_message {
            println!("    last error: {error}");
        }
        if let Some(conflict) = &item.metadata.conflict {
            println!("    conflict: {}", conflict.kind.as_str());
        }
    }
    println!();
    println!("{} item(s)", items.len());

    Ok(())
}
