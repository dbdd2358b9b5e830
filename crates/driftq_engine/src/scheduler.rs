//! The auto-sync scheduler.
//!
//! A background thread that runs a small processing pass at a fixed
//! interval. The timer is an explicit owned handle — there is no module
//! state — so starting and stopping compose cleanly with the facade's
//! idempotence rules.

use crate::adapter::RemoteAdapter;
use crate::engine::{ProcessOptions, SyncEngine};
use crate::error::EngineError;
use driftq_core::TenantId;
use driftq_store::{QueueBackend, SnapshotStore};
use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

/// Owned handle to a running auto-sync loop.
///
/// Dropping the handle signals the loop to stop; [`stop`](Self::stop) also
/// joins the thread so no further pass starts after it returns.
pub struct AutoSyncHandle {
    stop: Arc<AtomicBool>,
    signal: Arc<(Mutex<()>, Condvar)>,
    thread: Option<JoinHandle<()>>,
}

impl AutoSyncHandle {
    fn request_stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
        let (lock, cvar) = &*self.signal;
        let _held = lock.lock();
        cvar.notify_all();
    }

    /// Stops the loop and waits for the thread to finish.
    ///
    /// A pass already in flight is allowed to finish; no further pass
    /// starts after this returns.
    pub fn stop(mut self) {
        self.request_stop();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for AutoSyncHandle {
    fn drop(&mut self) {
        self.request_stop();
    }
}

/// Starts auto-sync loops.
pub struct AutoSync;

impl AutoSync {
    /// Spawns a loop that processes `tenant_id`'s queue every `interval`
    /// with `batch_size` items per pass.
    ///
    /// Ticks that find a pass already running are skipped silently; other
    /// pass errors are logged and the loop keeps going.
    pub fn start<B, S, A>(
        engine: Arc<SyncEngine<B, S, A>>,
        tenant_id: TenantId,
        interval: Duration,
        batch_size: usize,
    ) -> AutoSyncHandle
    where
        B: QueueBackend + 'static,
        S: SnapshotStore + 'static,
        A: RemoteAdapter + 'static,
    {
        let stop = Arc::new(AtomicBool::new(false));
        let signal = Arc::new((Mutex::new(()), Condvar::new()));

        let thread_stop = Arc::clone(&stop);
        let thread_signal = Arc::clone(&signal);
        let thread = std::thread::spawn(move || {
            let options = ProcessOptions::default().with_batch_size(batch_size);
            let (lock, cvar) = &*thread_signal;
            tracing::debug!(tenant = %tenant_id, interval_ms = interval.as_millis() as u64, "auto-sync started");

            loop {
                {
                    let mut guard = lock.lock();
                    let _ = cvar.wait_for(&mut guard, interval);
                }
                if thread_stop.load(Ordering::SeqCst) {
                    break;
                }

                match engine.process(&tenant_id, &options) {
                    Ok(result) if !result.is_empty() => {
                        tracing::debug!(
                            tenant = %tenant_id,
                            processed = result.processed,
                            completed = result.completed,
                            "auto-sync tick"
                        );
                    }
                    Ok(_) => {}
                    Err(EngineError::PassInProgress { .. }) => {
                        tracing::debug!(tenant = %tenant_id, "auto-sync tick skipped; pass in flight");
                    }
                    Err(err) => {
                        tracing::warn!(tenant = %tenant_id, error = %err, "auto-sync pass failed");
                    }
                }
            }
            tracing::debug!(tenant = %tenant_id, "auto-sync stopped");
        });

        AutoSyncHandle {
            stop,
            signal,
            thread: Some(thread),
        }
    }
}
