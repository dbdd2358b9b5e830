//! Property tests for batch selection ordering.

use chrono::{Duration, Utc};
use driftq_core::{Priority, SyncAction, SyncItemDraft, TenantId};
use driftq_store::{BatchCriteria, MemoryBackend, QueueBackend, SyncQueue};
use proptest::prelude::*;

fn priority_from(index: u8) -> Priority {
    match index % 4 {
        0 => Priority::Low,
        1 => Priority::Normal,
        2 => Priority::High,
        _ => Priority::Critical,
    }
}

proptest! {
    #[test]
    fn batch_never_violates_priority_or_fifo(
        specs in prop::collection::vec((0u8..4, prop::bool::ANY), 0..40),
        limit in 1usize..20,
    ) {
        let queue = SyncQueue::new(MemoryBackend::new()).unwrap();
        let tenant = TenantId::new("prop");

        for (i, (priority, backoff)) in specs.iter().enumerate() {
            let draft = SyncItemDraft::new("assets", format!("e-{i}"), SyncAction::Upsert)
                .with_payload(serde_json::json!({"i": i}))
                .with_priority(priority_from(*priority));
            let item = queue.enqueue(&tenant, draft).unwrap();

            if *backoff {
                let mut blocked = item.clone();
                blocked.metadata.retry_after = Some(Utc::now() + Duration::hours(1));
                queue.backend().update(&blocked).unwrap();
            }
        }

        let batch = queue
            .next_batch(&tenant, &BatchCriteria::with_limit(limit))
            .unwrap();

        prop_assert!(batch.len() <= limit);

        // Items inside a backoff window are never selected
        for item in &batch {
            prop_assert!(item.metadata.retry_after.is_none());
        }

        for pair in batch.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            // Priority rank never increases down the batch
            prop_assert!(a.priority().rank() >= b.priority().rank());
            // FIFO within a priority
            if a.priority() == b.priority() {
                prop_assert!(a.sequence < b.sequence);
            }
        }
    }
}
