// truth-queue/src/job.rs
// ============================================================================
// Module: Job Envelope
// Description: The opaque job body wrapper every queue adapter stores (§4.1).
// Purpose: Carry correlation fields on every job body, per §9 "Cross-stage
//          run ID threading" — a first-class context object rather than an
//          implicit global.
// Dependencies: serde, time, truth-core
// ============================================================================

//! ## Overview
//! A [`JobEnvelope`] wraps an opaque `serde_json::Value` body with the
//! correlation ids every stage needs to thread through `AgentRun` rows
//! (`run_id`, `job_id`, `parent_job_id`, `source_slug`) and the scheduling
//! metadata `reserve`/`nack` act on (`attempt`, `available_at`, `priority`).

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use serde::Deserialize;
use serde::Serialize;
use time::OffsetDateTime;
use truth_core::JobId;
use truth_core::RunId;

/// Process-local counter mixed into generated job ids so two ids minted in
/// the same nanosecond still differ.
static JOB_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Mints a fresh, process-unique [`JobId`] from the current time and a
/// monotonic counter. `truth-core`'s identifiers are opaque strings with no
/// generator of their own (§3), so queue adapters mint their own ids here.
#[must_use]
pub fn generate_job_id() -> JobId {
    let now = OffsetDateTime::now_utc();
    let sequence = JOB_ID_COUNTER.fetch_add(1, Ordering::Relaxed);
    JobId::new(format!("job_{}_{:09}_{sequence:x}", now.unix_timestamp(), now.nanosecond()))
}

// ============================================================================
// SECTION: Correlation
// ============================================================================

/// Correlation context threaded through a job and every `AgentRun` it
/// spawns (§9).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Correlation {
    /// Correlates this job across every pipeline stage it passes through.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_id: Option<RunId>,
    /// The job that spawned this one, when this stage's job was enqueued as
    /// a side effect of another stage's job.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_job_id: Option<JobId>,
    /// Registered source slug this job concerns, when applicable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_slug: Option<String>,
}

// ============================================================================
// SECTION: Job Envelope
// ============================================================================

/// A durable job body plus its scheduling metadata and correlation context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobEnvelope {
    /// Deterministic or caller-supplied job id, used for dedup (§4.1).
    pub job_id: JobId,
    /// Name of the queue this job belongs to.
    pub queue_name: String,
    /// Opaque serialized job body.
    pub body: serde_json::Value,
    /// Correlation context.
    pub correlation: Correlation,
    /// Number of reservation attempts made so far (0 before the first
    /// reserve).
    pub attempt: u32,
    /// Timestamp this job was originally enqueued.
    pub enqueued_at: OffsetDateTime,
    /// Timestamp this job becomes eligible for reservation (delayed
    /// delivery, §4.1).
    pub available_at: OffsetDateTime,
    /// Scheduling priority; higher values are reserved first among
    /// otherwise-eligible jobs.
    pub priority: i32,
}

impl JobEnvelope {
    /// Builds a new envelope ready for immediate reservation (no delay).
    #[must_use]
    pub fn new(
        job_id: JobId,
        queue_name: impl Into<String>,
        body: serde_json::Value,
        correlation: Correlation,
        enqueued_at: OffsetDateTime,
        priority: i32,
    ) -> Self {
        Self {
            job_id,
            queue_name: queue_name.into(),
            body,
            correlation,
            attempt: 0,
            enqueued_at,
            available_at: enqueued_at,
            priority,
        }
    }
}
