//! Randomized development stand-in for the remote adapter.

use crate::adapter::{RemoteAdapter, SyncOutcome, SyncRequest};
use crate::error::EngineResult;
use driftq_core::{ConflictDetails, ConflictKind};
use rand::Rng;
use serde_json::{json, Value};
use std::ops::Range;
use std::time::Duration;

/// A simulated remote adapter with randomized latency and outcomes.
///
/// Strictly a development and demo stand-in: it lets the queue, engine, and
/// CLI be exercised without a backend. Replace it with a real network
/// client in production; none of its randomness belongs in queue logic.
#[derive(Debug, Clone)]
pub struct SimulatedAdapter {
    latency_ms: Range<u64>,
    failure_rate: f64,
    conflict_rate: f64,
}

impl SimulatedAdapter {
    /// Creates a simulator with mild latency and a small failure/conflict
    /// mix.
    #[must_use]
    pub fn new() -> Self {
        Self {
            latency_ms: 20..120,
            failure_rate: 0.1,
            conflict_rate: 0.05,
        }
    }

    /// Creates a simulator that always succeeds, instantly.
    #[must_use]
    pub fn reliable() -> Self {
        Self {
            latency_ms: 0..1,
            failure_rate: 0.0,
            conflict_rate: 0.0,
        }
    }

    /// Sets the simulated latency range in milliseconds.
    #[must_use]
    pub fn with_latency_ms(mut self, latency_ms: Range<u64>) -> Self {
        self.latency_ms = latency_ms;
        self
    }

    /// Sets the probability of a simulated failure.
    #[must_use]
    pub fn with_failure_rate(mut self, rate: f64) -> Self {
        self.failure_rate = rate;
        self
    }

    /// Sets the probability of a simulated conflict.
    #[must_use]
    pub fn with_conflict_rate(mut self, rate: f64) -> Self {
        self.conflict_rate = rate;
        self
    }

    fn canonical_entity(request: &SyncRequest) -> Value {
        let mut entity = request.payload.clone().unwrap_or_else(|| json!({}));
        if let Value::Object(map) = &mut entity {
            map.entry("id").or_insert_with(|| json!(request.entity_id));
        }
        entity
    }
}

impl Default for SimulatedAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl RemoteAdapter for SimulatedAdapter {
    fn apply(&self, request: &SyncRequest) -> EngineResult<SyncOutcome> {
        let mut rng = rand::thread_rng();

        if !self.latency_ms.is_empty() {
            let wait = rng.gen_range(self.latency_ms.clone());
            std::thread::sleep(Duration::from_millis(wait));
        }

        let roll: f64 = rng.gen();
        if roll < self.failure_rate {
            return Ok(SyncOutcome::Failed {
                message: "simulated transport failure".into(),
            });
        }
        if roll < self.failure_rate + self.conflict_rate {
            let details = ConflictDetails::new(
                ConflictKind::Version,
                Some(Self::canonical_entity(request)),
                request.payload.clone(),
            );
            return Ok(SyncOutcome::Conflict(details));
        }

        Ok(SyncOutcome::Applied {
            entity: Self::canonical_entity(request),
        })
    }

    fn is_connected(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use driftq_core::{ItemId, SyncAction, SyncItem, SyncItemDraft, TenantId};

    fn request() -> SyncRequest {
        let draft = SyncItemDraft::new("assets", "a-1", SyncAction::Create)
            .with_payload(json!({"name": "rack 4"}));
        let item = SyncItem::from_draft(
            ItemId::generate(),
            TenantId::new("acme"),
            1,
            Utc::now(),
            draft,
        );
        SyncRequest::for_item(&item)
    }

    #[test]
    fn reliable_simulator_always_applies() {
        let adapter = SimulatedAdapter::reliable();
        for _ in 0..20 {
            let outcome = adapter.apply(&request()).unwrap();
            match outcome {
                SyncOutcome::Applied { entity } => {
                    assert_eq!(entity.get("id"), Some(&json!("a-1")));
                    assert_eq!(entity.get("name"), Some(&json!("rack 4")));
                }
                other => panic!("unexpected outcome: {other:?}"),
            }
        }
    }

    #[test]
    fn always_failing_simulator() {
        let adapter = SimulatedAdapter::reliable().with_failure_rate(1.0);
        assert!(matches!(
            adapter.apply(&request()).unwrap(),
            SyncOutcome::Failed { .. }
        ));
    }

    #[test]
    fn always_conflicting_simulator() {
        let adapter = SimulatedAdapter::reliable().with_conflict_rate(1.0);
        match adapter.apply(&request()).unwrap() {
            SyncOutcome::Conflict(details) => {
                assert_eq!(details.kind, ConflictKind::Version);
                assert!(details.server_version.is_some());
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }
}
