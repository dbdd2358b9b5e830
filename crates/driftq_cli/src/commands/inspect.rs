//! Inspect command implementation.

use super::CommandResult;
use chrono::Utc;
use driftq_core::{QueueStats, TenantId};
use driftq_store::{FileBackend, SyncQueue};
use serde::Serialize;
use std::path::Path;

/// Queue inspection result.
#[derive(Debug, Serialize)]
struct InspectResult {
    /// Journal path.
    path: String,
    /// Tenant inspected.
    tenant: String,
    /// Journal file size in bytes.
    journal_size: u64,
    /// Age of the oldest pending item, in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    oldest_pending_age_secs: Option<i64>,
    /// Queue statistics.
    stats: QueueStats,
}

/// Runs the inspect command.
pub fn run(path: &Path, tenant: &str, format: &str) -> CommandResult {
    let backend = FileBackend::open(path)?;
    let queue = SyncQueue::new(backend)?;
    let tenant_id = TenantId::new(tenant);

    let stats = queue.stats(&tenant_id)?;
    let result = InspectResult {
        path: path.display().to_string(),
        tenant: tenant.to_string(),
        journal_size: std::fs::metadata(path)?.len(),
        oldest_pending_age_secs: stats
            .oldest_pending_age(Utc::now())
            .map(|age| age.num_seconds()),
        stats,
    };

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&result)?),
        _ => print_text_output(&result),
    }

    Ok(())
}

fn print_text_output(result: &InspectResult) {
    let stats = &result.stats;

    println!("DriftQ Queue Inspection");
    println!("=======================");
    println!();
    println!("Path:   {}", result.path);
    println!("Tenant: {}", result.tenant);
    println!("Size:   {} bytes", result.journal_size);
    println!();
    println!("Items: {}", stats.total);
    println!("  pending:     {}", stats.by_status.pending);
    println!("  in_progress: {}", stats.by_status.in_progress);
    println!("  completed:   {}", stats.by_status.completed);
    println!("  failed:      {}", stats.by_status.failed);
    println!("  conflict:    {}", stats.by_status.conflict);
    println!("  cancelled:   {}", stats.by_status.cancelled);
    println!();
    println!("Priorities:");
    println!("  critical: {}", stats.by_priority.critical);
    println!("  high:     {}", stats.by_priority.high);
    println!("  normal:   {}", stats.by_priority.normal);
    println!("  low:      {}", stats.by_priority.low);

    if !stats.by_store.is_empty() {
        println!();
        println!("Stores:");
        for (store, count) in &stats.by_store {
            println!("  {store}: {count}");
        }
    }

    println!();
    println!("Mean attempts: {:.2}", stats.mean_attempts);
    match stats.success_rate {
        Some(rate) => println!("Success rate:  {:.1}%", rate * 100.0),
        None => println!("Success rate:  n/a"),
    }
    if let Some(age) = result.oldest_pending_age_secs {
        println!("Oldest pending: {age}s");
    }
}
