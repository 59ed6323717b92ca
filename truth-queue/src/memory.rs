// truth-queue/src/memory.rs
// ============================================================================
// Module: In-Memory Queue Adapter
// Description: A single-process `Queue` implementation backed by a mutex-
//              guarded map, for tests and single-node deployments.
// Purpose: Ground C2's contract in something we can exercise without a
//          toolchain run; production deployments swap in a durable adapter
//          behind the same trait.
// Dependencies: std::sync, truth-core, crate::{job, queue}
// ============================================================================

//! ## Overview
//! [`InMemoryQueue`] stores every queue's jobs in a single
//! `Mutex<HashMap<JobId, Entry>>`. Reservation eligibility is computed on
//! every `reserve` call rather than via a background sweep, which is fine at
//! in-memory scale and keeps the adapter free of threads to join.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::sync::Mutex;

use time::Duration;
use time::OffsetDateTime;
use truth_core::JobId;

use crate::job::JobEnvelope;
use crate::job::generate_job_id;
use crate::queue::DEAD_LETTER_QUEUE;
use crate::queue::EnqueueOptions;
use crate::queue::FailureClass;
use crate::queue::Heartbeat;
use crate::queue::NackOptions;
use crate::queue::Queue;
use crate::queue::QueueError;
use crate::queue::QueueResult;
use crate::queue::backoff_delay_ms;

// ============================================================================
// SECTION: Entry
// ============================================================================

/// Lifecycle state of a stored job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntryState {
    /// Eligible (once `available_at` elapses) for reservation.
    Pending,
    /// Leased to a worker until `lease_expires_at`.
    Reserved,
}

/// A job plus the adapter's bookkeeping fields.
#[derive(Debug, Clone)]
struct Entry {
    envelope: JobEnvelope,
    state: EntryState,
    worker_id: Option<String>,
    lease_expires_at: Option<OffsetDateTime>,
}

// ============================================================================
// SECTION: InMemoryQueue
// ============================================================================

/// A mutex-guarded, in-process [`Queue`] implementation.
#[derive(Debug, Default)]
pub struct InMemoryQueue {
    jobs: Mutex<HashMap<JobId, Entry>>,
    heartbeats: Mutex<HashMap<String, Heartbeat>>,
}

impl InMemoryQueue {
    /// Builds an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self {
            jobs: Mutex::new(HashMap::new()),
            heartbeats: Mutex::new(HashMap::new()),
        }
    }

    /// Locks the job map, mapping poisoning to a backend error.
    fn lock_jobs(&self) -> QueueResult<std::sync::MutexGuard<'_, HashMap<JobId, Entry>>> {
        self.jobs
            .lock()
            .map_err(|_| QueueError::Backend("in-memory queue mutex poisoned".to_owned()))
    }

    /// Locks the heartbeat map, mapping poisoning to a backend error.
    fn lock_heartbeats(&self) -> QueueResult<std::sync::MutexGuard<'_, HashMap<String, Heartbeat>>> {
        self.heartbeats
            .lock()
            .map_err(|_| QueueError::Backend("in-memory heartbeat mutex poisoned".to_owned()))
    }
}

impl Queue for InMemoryQueue {
    fn enqueue(
        &self,
        queue_name: &str,
        body: serde_json::Value,
        options: EnqueueOptions,
    ) -> QueueResult<JobEnvelope> {
        let mut jobs = self.lock_jobs()?;

        if let Some(ref job_id) = options.job_id {
            if let Some(existing) = jobs.get(job_id) {
                return Ok(existing.envelope.clone());
            }
        }

        let job_id = options.job_id.unwrap_or_else(generate_job_id);
        let now = OffsetDateTime::now_utc();
        let available_at = options
            .delay_ms
            .map_or(now, |delay| now + Duration::milliseconds(i64::try_from(delay).unwrap_or(i64::MAX)));

        let mut envelope = JobEnvelope::new(
            job_id.clone(),
            queue_name,
            body,
            options.correlation,
            now,
            options.priority.unwrap_or(0),
        );
        envelope.available_at = available_at;

        jobs.insert(
            job_id,
            Entry {
                envelope: envelope.clone(),
                state: EntryState::Pending,
                worker_id: None,
                lease_expires_at: None,
            },
        );
        Ok(envelope)
    }

    fn reserve(&self, queue_name: &str, worker_id: &str, lease_ms: u64) -> QueueResult<Option<JobEnvelope>> {
        let mut jobs = self.lock_jobs()?;
        let now = OffsetDateTime::now_utc();

        let mut eligible: Vec<&mut Entry> = jobs
            .values_mut()
            .filter(|entry| entry.envelope.queue_name == queue_name)
            .filter(|entry| match entry.state {
                EntryState::Pending => entry.envelope.available_at <= now,
                EntryState::Reserved => entry.lease_expires_at.is_some_and(|expiry| expiry <= now),
            })
            .collect();

        eligible.sort_by(|a, b| {
            b.envelope
                .priority
                .cmp(&a.envelope.priority)
                .then(a.envelope.enqueued_at.cmp(&b.envelope.enqueued_at))
        });

        let Some(entry) = eligible.into_iter().next() else {
            return Ok(None);
        };

        entry.envelope.attempt = entry.envelope.attempt.saturating_add(1);
        entry.state = EntryState::Reserved;
        entry.worker_id = Some(worker_id.to_owned());
        entry.lease_expires_at = Some(now + Duration::milliseconds(i64::try_from(lease_ms).unwrap_or(i64::MAX)));
        Ok(Some(entry.envelope.clone()))
    }

    fn ack(&self, job_id: &JobId) -> QueueResult<()> {
        let mut jobs = self.lock_jobs()?;
        jobs.remove(job_id)
            .map(|_| ())
            .ok_or_else(|| QueueError::JobNotFound(job_id.to_string()))
    }

    fn nack(
        &self,
        job_id: &JobId,
        reason: &str,
        class: FailureClass,
        max_attempts: u32,
        options: NackOptions,
    ) -> QueueResult<()> {
        let mut jobs = self.lock_jobs()?;
        let entry = jobs
            .get_mut(job_id)
            .ok_or_else(|| QueueError::JobNotFound(job_id.to_string()))?;

        let should_retry = options.retry.unwrap_or(true) && entry.envelope.attempt < max_attempts;

        if !should_retry {
            let mut dead = jobs
                .remove(job_id)
                .ok_or_else(|| QueueError::JobNotFound(job_id.to_string()))?;
            dead.envelope.queue_name = DEAD_LETTER_QUEUE.to_owned();
            dead.envelope.body = serde_json::json!({
                "original_job_id": dead.envelope.job_id,
                "reason": reason,
                "body": dead.envelope.body,
            });
            dead.state = EntryState::Pending;
            dead.worker_id = None;
            dead.lease_expires_at = None;
            dead.envelope.available_at = OffsetDateTime::now_utc();
            jobs.insert(dead.envelope.job_id.clone(), dead);
            return Ok(());
        }

        let delay_ms = options
            .retry_delay_ms
            .unwrap_or_else(|| backoff_delay_ms(class, entry.envelope.attempt));
        entry.state = EntryState::Pending;
        entry.worker_id = None;
        entry.lease_expires_at = None;
        entry.envelope.available_at =
            OffsetDateTime::now_utc() + Duration::milliseconds(i64::try_from(delay_ms).unwrap_or(i64::MAX));
        Ok(())
    }

    fn dead_letter(&self, job_id: &JobId, reason: &str) -> QueueResult<()> {
        self.nack(
            job_id,
            reason,
            FailureClass::General,
            0,
            NackOptions {
                retry: Some(false),
                retry_delay_ms: None,
            },
        )
    }

    fn depth(&self, queue_name: &str) -> QueueResult<usize> {
        let jobs = self.lock_jobs()?;
        Ok(jobs.values().filter(|entry| entry.envelope.queue_name == queue_name).count())
    }

    fn heartbeat(&self, worker_id: &str, cycle: u64, items_processed: u64) -> QueueResult<()> {
        let mut heartbeats = self.lock_heartbeats()?;
        heartbeats.insert(
            worker_id.to_owned(),
            Heartbeat {
                cycle,
                items_processed,
                published_at_unix: OffsetDateTime::now_utc().unix_timestamp(),
            },
        );
        Ok(())
    }

    fn last_heartbeat(&self, worker_id: &str) -> QueueResult<Option<Heartbeat>> {
        let heartbeats = self.lock_heartbeats()?;
        Ok(heartbeats.get(worker_id).copied())
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::InMemoryQueue;
    use crate::queue::EnqueueOptions;
    use crate::queue::FailureClass;
    use crate::queue::NackOptions;
    use crate::queue::Queue;

    #[test]
    fn enqueue_reserve_ack_round_trip() {
        let queue = InMemoryQueue::new();
        let envelope = queue
            .enqueue("extract", serde_json::json!({"evidence_id": "e1"}), EnqueueOptions::default())
            .expect("enqueue succeeds");

        let reserved = queue
            .reserve("extract", "worker-1", 30_000)
            .expect("reserve succeeds")
            .expect("a job is eligible");
        assert_eq!(reserved.job_id, envelope.job_id);
        assert_eq!(reserved.attempt, 1);

        queue.ack(&reserved.job_id).expect("ack succeeds");
        assert_eq!(queue.depth("extract").expect("depth succeeds"), 0);
    }

    #[test]
    fn enqueue_dedups_by_job_id() {
        let queue = InMemoryQueue::new();
        let job_id = super::generate_job_id();
        let options = EnqueueOptions {
            job_id: Some(job_id.clone()),
            ..EnqueueOptions::default()
        };
        let first = queue
            .enqueue("extract", serde_json::json!({"n": 1}), options.clone())
            .expect("first enqueue succeeds");
        let second = queue
            .enqueue("extract", serde_json::json!({"n": 2}), options)
            .expect("second enqueue succeeds");
        assert_eq!(first.body, second.body);
        assert_eq!(queue.depth("extract").expect("depth succeeds"), 1);
    }

    #[test]
    fn nack_retries_until_max_attempts_then_dead_letters() {
        let queue = InMemoryQueue::new();
        let envelope = queue
            .enqueue("extract", serde_json::json!({}), EnqueueOptions::default())
            .expect("enqueue succeeds");

        for _ in 0..2 {
            let reserved = queue
                .reserve("extract", "worker-1", 30_000)
                .expect("reserve succeeds")
                .expect("a job is eligible");
            queue
                .nack(&reserved.job_id, "boom", FailureClass::General, 2, NackOptions::default())
                .expect("nack succeeds");
        }

        assert_eq!(queue.depth("extract").expect("depth succeeds"), 0);
        assert_eq!(queue.depth(super::DEAD_LETTER_QUEUE).expect("depth succeeds"), 1);
        let _ = envelope;
    }

    #[test]
    fn heartbeat_round_trip() {
        let queue = InMemoryQueue::new();
        assert!(queue.last_heartbeat("releaser").expect("lookup succeeds").is_none());
        queue.heartbeat("releaser", 3, 7).expect("heartbeat succeeds");
        let hb = queue.last_heartbeat("releaser").expect("lookup succeeds").expect("heartbeat present");
        assert_eq!(hb.cycle, 3);
        assert_eq!(hb.items_processed, 7);
    }
}
