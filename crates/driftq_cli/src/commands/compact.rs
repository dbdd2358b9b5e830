//! Compact command implementation.

use super::CommandResult;
use driftq_store::FileBackend;
use std::path::Path;
use tracing::info;

/// Runs the compact command.
pub fn run(path: &Path) -> CommandResult {
    let size_before = std::fs::metadata(path)?.len();
    let backend = FileBackend::open(path)?;

    info!("Compacting journal at {:?}", path);
    let kept = backend.compact()?;
    let size_after = std::fs::metadata(path)?.len();

    println!(
        "Kept {kept} record(s); {size_before} -> {size_after} bytes",
    );

    Ok(())
}
