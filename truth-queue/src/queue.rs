// truth-queue/src/queue.rs
// ============================================================================
// Module: Queue Substrate Trait
// Description: The named-queue interface every pipeline stage schedules
//              through (C2, §4.1).
// Purpose: Model C2 as a trait with one adapter per backend, per §9
//          "Queue-library coupling" — pin the interface rather than a single
//          job library, and ship an in-memory adapter
//          (`memory::InMemoryQueue`) for tests and single-process
//          deployments.
// Dependencies: serde_json, thiserror, truth-core
// ============================================================================

//! ## Overview
//! [`Queue`] exposes `enqueue`/`reserve`/`ack`/`nack`/`dead_letter` exactly
//! as §4.1 specifies. Guarantees every implementation must uphold:
//! at-least-once delivery, `job_id` deduplication for non-terminal jobs, and
//! routing exhausted-retry jobs to the shared dead-letter queue named
//! [`DEAD_LETTER_QUEUE`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;
use truth_core::JobId;

use crate::job::Correlation;
use crate::job::JobEnvelope;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Name of the single shared dead-letter queue every stage's exhausted
/// retries are routed to (§4.1).
pub const DEAD_LETTER_QUEUE: &str = "dead-letter";

/// Default `maxAttempts` for a queue that does not override it (§4.1).
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

// ============================================================================
// SECTION: Enqueue Options
// ============================================================================

/// Options accepted by [`Queue::enqueue`] (§4.1).
#[derive(Debug, Clone, Default)]
pub struct EnqueueOptions {
    /// Deterministic job id for deduplication; when omitted, a random id is
    /// generated by the adapter.
    pub job_id: Option<JobId>,
    /// Delivery delay, in milliseconds, before the job becomes reservable.
    pub delay_ms: Option<u64>,
    /// Scheduling priority; higher values are reserved first.
    pub priority: Option<i32>,
    /// Correlation context to attach to the job.
    pub correlation: Correlation,
}

// ============================================================================
// SECTION: Nack Options
// ============================================================================

/// Failure classification a worker reports to [`Queue::nack`], driving the
/// backoff base (§4.1: "rate-limit classification... uses a 30,000 ms
/// base; other failures use 1,000 ms").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// HTTP 429 or an equivalent rate-limit signal.
    RateLimited,
    /// Any other failure.
    General,
}

impl FailureClass {
    /// Returns the backoff base, in milliseconds, for this failure class.
    #[must_use]
    pub const fn backoff_base_ms(self) -> u64 {
        match self {
            Self::RateLimited => 30_000,
            Self::General => 1_000,
        }
    }
}

/// Options accepted by [`Queue::nack`].
#[derive(Debug, Clone, Copy, Default)]
pub struct NackOptions {
    /// Whether this failure should be retried at all; when `false`, the job
    /// moves directly to dead-letter regardless of `maxAttempts`.
    pub retry: Option<bool>,
    /// Explicit retry delay overriding the computed exponential backoff.
    pub retry_delay_ms: Option<u64>,
}

/// Computes the exponential backoff delay for a nack (§4.1: "delay = base
/// × 2^attempt").
#[must_use]
pub fn backoff_delay_ms(class: FailureClass, attempt: u32) -> u64 {
    let base = class.backoff_base_ms();
    base.saturating_mul(1u64 << attempt.min(20))
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Error surfaced by a [`Queue`] implementation.
#[derive(Debug, Error)]
pub enum QueueError {
    /// The named job does not exist or is not in a state the operation
    /// permits (e.g. acking an already-terminal job).
    #[error("job not found or not reservable: {0}")]
    JobNotFound(String),
    /// The underlying backend failed.
    #[error("queue backend error: {0}")]
    Backend(String),
}

/// Convenience alias for queue results.
pub type QueueResult<T> = Result<T, QueueError>;

// ============================================================================
// SECTION: Queue Trait
// ============================================================================

/// A named durable FIFO queue (§4.1).
///
/// # Invariants
/// - At-least-once delivery.
/// - `enqueue` with an existing, non-terminal `job_id` returns the existing
///   job rather than creating a duplicate.
/// - A job that exhausts its retry budget is moved to
///   [`DEAD_LETTER_QUEUE`] with full error context, never silently dropped.
pub trait Queue: Send + Sync {
    /// Enqueues a job body on `queue_name`, returning the stored envelope
    /// (a fresh one, or the existing non-terminal job sharing `job_id`).
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Backend`] on storage failure.
    fn enqueue(
        &self,
        queue_name: &str,
        body: serde_json::Value,
        options: EnqueueOptions,
    ) -> QueueResult<JobEnvelope>;

    /// Reserves the next eligible job from `queue_name` for `worker_id`,
    /// leasing it for `lease_ms` milliseconds. Returns `None` when no job
    /// is currently eligible.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Backend`] on storage failure.
    fn reserve(&self, queue_name: &str, worker_id: &str, lease_ms: u64) -> QueueResult<Option<JobEnvelope>>;

    /// Acknowledges successful completion of `job_id`, removing it from the
    /// active set.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::JobNotFound`] when the job is not currently
    /// reserved, or [`QueueError::Backend`] on storage failure.
    fn ack(&self, job_id: &JobId) -> QueueResult<()>;

    /// Reports a failed attempt at `job_id`. Retries when the job's
    /// `attempt` count is below `max_attempts` and `options.retry` is not
    /// `Some(false)`; otherwise routes the job to [`DEAD_LETTER_QUEUE`]
    /// with `reason` as error context.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::JobNotFound`] when the job is not currently
    /// reserved, or [`QueueError::Backend`] on storage failure.
    fn nack(
        &self,
        job_id: &JobId,
        reason: &str,
        class: FailureClass,
        max_attempts: u32,
        options: NackOptions,
    ) -> QueueResult<()>;

    /// Routes `job_id` directly to [`DEAD_LETTER_QUEUE`], bypassing the
    /// retry budget.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::JobNotFound`] when the job is not currently
    /// reserved, or [`QueueError::Backend`] on storage failure.
    fn dead_letter(&self, job_id: &JobId, reason: &str) -> QueueResult<()>;

    /// Returns the number of jobs currently eligible or pending in
    /// `queue_name` (watchdog queue-backlog check, §4.10).
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Backend`] on storage failure.
    fn depth(&self, queue_name: &str) -> QueueResult<usize>;

    /// Publishes a heartbeat for `worker_id` (§4.1): cycle counter, items
    /// processed this cycle, and the current timestamp.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Backend`] on storage failure.
    fn heartbeat(&self, worker_id: &str, cycle: u64, items_processed: u64) -> QueueResult<()>;

    /// Returns the last recorded heartbeat for `worker_id`, if any.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Backend`] on storage failure.
    fn last_heartbeat(&self, worker_id: &str) -> QueueResult<Option<Heartbeat>>;
}

// ============================================================================
// SECTION: Heartbeat
// ============================================================================

/// A worker loop's most recent progress snapshot (§4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Heartbeat {
    /// Monotonically increasing cycle counter.
    pub cycle: u64,
    /// Items processed during the most recent cycle.
    pub items_processed: u64,
    /// Timestamp the heartbeat was published, as Unix seconds (kept
    /// primitive so adapters do not need a clock dependency beyond
    /// `truth-providers::TimeSource`).
    pub published_at_unix: i64,
}
