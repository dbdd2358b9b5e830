//! # DriftQ Engine
//!
//! Batch sync processor, auto-sync scheduler, and client facade for DriftQ.
//!
//! This crate provides:
//! - The remote adapter boundary ([`RemoteAdapter`], [`SyncRequest`],
//!   [`SyncOutcome`])
//! - The batch processor ([`SyncEngine`]): one bounded, strictly sequential
//!   processing pass per call, at most one pass in flight per tenant
//! - Retry backoff policy ([`RetryConfig`])
//! - The auto-sync scheduler ([`AutoSync`] / [`AutoSyncHandle`])
//! - The tenant-bound facade ([`SyncClient`]) consumed by CRUD callers
//!
//! ## Architecture
//!
//! A pass pulls the next batch of pending items (priority rank descending,
//! FIFO within a priority), and for each item: marks it in progress, hands
//! it to the remote adapter, then records the outcome — completed (with the
//! entity snapshot reconciled against the server's canonical entity),
//! conflict, or failed. One item failing never aborts the pass.
//!
//! ## Key Invariants
//!
//! - At most one processing pass per tenant; re-entry is an error, never a
//!   queue
//! - Items are processed sequentially to preserve per-entity enqueue order
//! - Conflicted items are excluded from selection until explicitly resolved
//! - A pass always completes and returns a [`BatchResult`], even if every
//!   item failed

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod adapter;
mod client;
mod config;
mod engine;
mod error;
mod scheduler;
mod simulated;

pub use adapter::{MockAdapter, RemoteAdapter, SyncOutcome, SyncRequest};
pub use client::SyncClient;
pub use config::{
    EngineConfig, RetryConfig, DEFAULT_BATCH_SIZE, DEFAULT_FORCE_BATCH_SIZE, DEFAULT_SYNC_INTERVAL,
};
pub use engine::{BatchResult, ItemResult, ProcessOptions, SyncEngine};
pub use error::{EngineError, EngineResult};
pub use scheduler::{AutoSync, AutoSyncHandle};
pub use simulated::SimulatedAdapter;
