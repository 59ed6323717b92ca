// truth-queue/src/singleton.rs
// ============================================================================
// Module: Singleton Queue Wrapper
// Description: Enforces concurrency=1 reservation for a designated queue
//              (§4.1: "the release worker runs at concurrency 1").
// Purpose: Rather than special-case the releaser in every adapter, wrap any
//          `Queue` so at most one reservation is outstanding at a time for
//          the wrapped queue name.
// Dependencies: std::sync, crate::queue
// ============================================================================

//! ## Overview
//! [`SingletonQueue`] wraps a [`Queue`] and tracks whether the singleton
//! queue currently has a reservation outstanding. `reserve` returns `None`
//! while a reservation is held, even if the inner queue has eligible jobs;
//! `ack`, `nack`, and `dead_letter` release the held slot.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Mutex;

use truth_core::JobId;

use crate::job::JobEnvelope;
use crate::queue::EnqueueOptions;
use crate::queue::FailureClass;
use crate::queue::Heartbeat;
use crate::queue::NackOptions;
use crate::queue::Queue;
use crate::queue::QueueResult;

// ============================================================================
// SECTION: SingletonQueue
// ============================================================================

/// Wraps `inner`, restricting `singleton_queue_name` to one outstanding
/// reservation at a time regardless of how many workers call `reserve`.
pub struct SingletonQueue<Q: Queue> {
    inner: Q,
    singleton_queue_name: String,
    held: Mutex<Option<JobId>>,
}

impl<Q: Queue> SingletonQueue<Q> {
    /// Wraps `inner`, restricting `singleton_queue_name` to concurrency 1.
    /// Queues other than `singleton_queue_name` pass through unrestricted.
    #[must_use]
    pub fn new(inner: Q, singleton_queue_name: impl Into<String>) -> Self {
        Self {
            inner,
            singleton_queue_name: singleton_queue_name.into(),
            held: Mutex::new(None),
        }
    }

    fn is_singleton(&self, queue_name: &str) -> bool {
        queue_name == self.singleton_queue_name
    }
}

impl<Q: Queue> Queue for SingletonQueue<Q> {
    fn enqueue(
        &self,
        queue_name: &str,
        body: serde_json::Value,
        options: EnqueueOptions,
    ) -> QueueResult<JobEnvelope> {
        self.inner.enqueue(queue_name, body, options)
    }

    fn reserve(&self, queue_name: &str, worker_id: &str, lease_ms: u64) -> QueueResult<Option<JobEnvelope>> {
        if !self.is_singleton(queue_name) {
            return self.inner.reserve(queue_name, worker_id, lease_ms);
        }

        let mut held = self
            .held
            .lock()
            .map_err(|_| crate::queue::QueueError::Backend("singleton queue mutex poisoned".to_owned()))?;
        if held.is_some() {
            return Ok(None);
        }

        let reserved = self.inner.reserve(queue_name, worker_id, lease_ms)?;
        if let Some(ref envelope) = reserved {
            *held = Some(envelope.job_id.clone());
        }
        Ok(reserved)
    }

    fn ack(&self, job_id: &JobId) -> QueueResult<()> {
        self.release_if_held(job_id);
        self.inner.ack(job_id)
    }

    fn nack(
        &self,
        job_id: &JobId,
        reason: &str,
        class: FailureClass,
        max_attempts: u32,
        options: NackOptions,
    ) -> QueueResult<()> {
        self.release_if_held(job_id);
        self.inner.nack(job_id, reason, class, max_attempts, options)
    }

    fn dead_letter(&self, job_id: &JobId, reason: &str) -> QueueResult<()> {
        self.release_if_held(job_id);
        self.inner.dead_letter(job_id, reason)
    }

    fn depth(&self, queue_name: &str) -> QueueResult<usize> {
        self.inner.depth(queue_name)
    }

    fn heartbeat(&self, worker_id: &str, cycle: u64, items_processed: u64) -> QueueResult<()> {
        self.inner.heartbeat(worker_id, cycle, items_processed)
    }

    fn last_heartbeat(&self, worker_id: &str) -> QueueResult<Option<Heartbeat>> {
        self.inner.last_heartbeat(worker_id)
    }
}

impl<Q: Queue> SingletonQueue<Q> {
    /// Clears the held slot when `job_id` is the one currently holding it.
    fn release_if_held(&self, job_id: &JobId) {
        if let Ok(mut held) = self.held.lock() {
            if held.as_ref() == Some(job_id) {
                *held = None;
            }
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::SingletonQueue;
    use crate::memory::InMemoryQueue;
    use crate::queue::EnqueueOptions;
    use crate::queue::Queue;

    #[test]
    fn only_one_reservation_outstanding() {
        let queue = SingletonQueue::new(InMemoryQueue::new(), "release");
        queue
            .enqueue("release", serde_json::json!({"rules": ["r1"]}), EnqueueOptions::default())
            .expect("enqueue succeeds");
        queue
            .enqueue("release", serde_json::json!({"rules": ["r2"]}), EnqueueOptions::default())
            .expect("enqueue succeeds");

        let first = queue
            .reserve("release", "releaser-1", 60_000)
            .expect("reserve succeeds")
            .expect("a job is eligible");
        let second = queue.reserve("release", "releaser-2", 60_000).expect("reserve succeeds");
        assert!(second.is_none());

        queue.ack(&first.job_id).expect("ack succeeds");
        let third = queue
            .reserve("release", "releaser-2", 60_000)
            .expect("reserve succeeds")
            .expect("slot freed after ack");
        assert_ne!(third.job_id, first.job_id);
    }

    #[test]
    fn non_singleton_queue_passes_through() {
        let queue = SingletonQueue::new(InMemoryQueue::new(), "release");
        queue
            .enqueue("extract", serde_json::json!({}), EnqueueOptions::default())
            .expect("enqueue succeeds");
        queue
            .enqueue("extract", serde_json::json!({}), EnqueueOptions::default())
            .expect("enqueue succeeds");
        let first = queue.reserve("extract", "worker-1", 1_000).expect("reserve succeeds");
        let second = queue.reserve("extract", "worker-2", 1_000).expect("reserve succeeds");
        assert!(first.is_some());
        assert!(second.is_some());
    }
}
