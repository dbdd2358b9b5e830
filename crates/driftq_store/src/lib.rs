//! # DriftQ Store
//!
//! Durable, tenant-partitioned queue storage for DriftQ.
//!
//! This crate provides:
//! - The narrow storage interface the queue needs ([`QueueBackend`]):
//!   append, point lookup, filtered scan, update, delete
//! - An in-memory backend for tests and ephemeral queues
//! - A journaled file backend (append-only framed records, replay on open,
//!   compaction)
//! - The queue itself ([`SyncQueue`]): enqueue validation, batch selection,
//!   status transitions, retry, clear, and statistics
//! - The entity snapshot interface ([`SnapshotStore`]) reconciled on
//!   successful delivery
//!
//! ## Design Principles
//!
//! - Backends store records, the queue owns policy (ordering, state
//!   machine, validation)
//! - Every operation is scoped to one tenant
//! - Enqueue is never blocked by a running processing pass; backends take
//!   short read/write locks only

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod error;
mod file;
mod journal;
mod memory;
mod queue;
mod snapshot;

pub use backend::{QueueBackend, ScanFilter};
pub use error::{StoreError, StoreResult};
pub use file::FileBackend;
pub use memory::MemoryBackend;
pub use queue::{BatchCriteria, ClearCriteria, RetryCriteria, SyncQueue, DEFAULT_BATCH_LIMIT};
pub use snapshot::{MemorySnapshotStore, SnapshotRecord, SnapshotStore};
