//! Process command implementation.
//!
//! Runs one processing pass against the randomized simulated adapter. This
//! is a development tool for exercising a queue without a backend; real
//! deliveries go through a real `RemoteAdapter`.

use super::CommandResult;
use driftq_core::TenantId;
use driftq_engine::{EngineConfig, ProcessOptions, SimulatedAdapter, SyncEngine};
use driftq_store::{FileBackend, MemorySnapshotStore, SyncQueue};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;

/// Pass summary for JSON output.
#[derive(Debug, Serialize)]
struct PassSummary {
    processed: usize,
    completed: usize,
    failed: usize,
    conflicts: usize,
    cancelled: usize,
    duration_ms: u64,
}

/// Runs the process command.
pub fn run(
    path: &Path,
    tenant: &str,
    batch_size: usize,
    failure_rate: f64,
    conflict_rate: f64,
    format: &str,
) -> CommandResult {
    let backend = FileBackend::open(path)?;
    let queue = Arc::new(SyncQueue::new(backend)?);
    let adapter = SimulatedAdapter::new()
        .with_failure_rate(failure_rate)
        .with_conflict_rate(conflict_rate);
    let engine = SyncEngine::new(
        Arc::clone(&queue),
        Arc::new(MemorySnapshotStore::new()),
        Arc::new(adapter),
        EngineConfig::default(),
    );
    let tenant_id = TenantId::new(tenant);

    let result = engine.process(
        &tenant_id,
        &ProcessOptions::default().with_batch_size(batch_size),
    )?;

    let summary = PassSummary {
        processed: result.processed,
        completed: result.completed,
        failed: result.failed,
        conflicts: result.conflicts,
        cancelled: result.cancelled,
        duration_ms: result.duration.as_millis() as u64,
    };

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    if result.is_empty() {
        println!("Nothing to process.");
        return Ok(());
    }
    for item in &result.results {
        let note = item.error.as_deref().unwrap_or("");
        println!(
            "{}  {:<10} {}/{}  {}ms  {note}",
            item.item_id,
            item.status,
            item.store_name,
            item.entity_id,
            item.duration.as_millis(),
        );
    }
    println!();
    println!(
        "{} processed: {} completed, {} failed, {} conflicts ({} ms)",
        summary.processed,
        summary.completed,
        summary.failed,
        summary.conflicts,
        summary.duration_ms
    );

    Ok(())
}
