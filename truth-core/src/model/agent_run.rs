// truth-core/src/model/agent_run.rs
// ============================================================================
// Module: AgentRun Entity
// Description: One append-only row per LLM invocation (§3).
// Purpose: Enforce that `running` rows are the only mutable ones and that
//          `completed`/`failed` rows are terminal and immutable.
// Dependencies: crate::identifiers, serde
// ============================================================================

//! ## Overview
//! Every LLM call anywhere in the pipeline (Extractor, Composer, Reviewer,
//! Arbiter) writes one `AgentRun` row. Rows are append-only: `complete`/
//! `fail` consume a `running` row and produce a new, terminal one rather
//! than mutating in place, matching the "completed/failed rows immutable"
//! invariant at the type level.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::identifiers::AgentRunId;
use crate::identifiers::JobId;
use crate::identifiers::RunId;
use crate::model::value::Confidence;

// ============================================================================
// SECTION: Status
// ============================================================================

/// `AgentRun` lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentRunStatus {
    /// The invocation is in flight.
    Running,
    /// The invocation finished and produced `output`.
    Completed,
    /// The invocation finished with `error` set.
    Failed,
}

impl AgentRunStatus {
    /// Returns true for the two terminal statuses, after which a row is
    /// immutable.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

// ============================================================================
// SECTION: AgentRun
// ============================================================================

/// One row per LLM invocation.
///
/// # Invariants
/// - Append-only: `completed`/`failed` rows are never mutated; see
///   [`AgentRun::complete`]/[`AgentRun::fail`], which consume `self` and
///   return a new row rather than mutating in place.
/// - `output` is `Some` only when `status == Completed`; `error` is `Some`
///   only when `status == Failed`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentRun {
    /// Identifier for this run.
    pub id: AgentRunId,
    /// Agent type invoked (`extractor`, `composer`, `reviewer`, `arbiter`, …).
    pub agent_type: String,
    /// Lifecycle status.
    pub status: AgentRunStatus,
    /// Serialized input sent to the agent.
    pub input: serde_json::Value,
    /// Serialized output, present once `status == Completed`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<serde_json::Value>,
    /// Wall-clock duration of the invocation, in milliseconds.
    pub duration_ms: u64,
    /// Confidence reported by the agent, present once `status == Completed`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<Confidence>,
    /// Error message, present once `status == Failed`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Correlation id for the pipeline run this invocation belongs to.
    pub run_id: RunId,
    /// Queue job that triggered this invocation.
    pub job_id: JobId,
    /// Parent job, when this invocation was spawned by another stage's job.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_job_id: Option<JobId>,
    /// Source slug the invocation concerns, when applicable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_slug: Option<String>,
    /// Queue this invocation's job was drawn from.
    pub queue_name: String,
}

impl AgentRun {
    /// Starts a new `Running` `AgentRun` row.
    #[must_use]
    pub fn start(
        id: AgentRunId,
        agent_type: impl Into<String>,
        input: serde_json::Value,
        run_id: RunId,
        job_id: JobId,
        queue_name: impl Into<String>,
    ) -> Self {
        Self {
            id,
            agent_type: agent_type.into(),
            status: AgentRunStatus::Running,
            input,
            output: None,
            duration_ms: 0,
            confidence: None,
            error: None,
            run_id,
            job_id,
            parent_job_id: None,
            source_slug: None,
            queue_name: queue_name.into(),
        }
    }

    /// Consumes a `Running` row and returns the `Completed` terminal row.
    ///
    /// Returns `self` unchanged (still `Running`) when called on a row that
    /// is already terminal, since terminal rows are immutable.
    #[must_use]
    pub fn complete(mut self, output: serde_json::Value, duration_ms: u64, confidence: Option<Confidence>) -> Self {
        if self.status.is_terminal() {
            return self;
        }
        self.status = AgentRunStatus::Completed;
        self.output = Some(output);
        self.duration_ms = duration_ms;
        self.confidence = confidence;
        self
    }

    /// Consumes a `Running` row and returns the `Failed` terminal row.
    ///
    /// Returns `self` unchanged when called on a row that is already
    /// terminal, since terminal rows are immutable.
    #[must_use]
    pub fn fail(mut self, error: impl Into<String>, duration_ms: u64) -> Self {
        if self.status.is_terminal() {
            return self;
        }
        self.status = AgentRunStatus::Failed;
        self.error = Some(error.into());
        self.duration_ms = duration_ms;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn running() -> AgentRun {
        AgentRun::start(
            AgentRunId::new("run-1"),
            "extractor",
            serde_json::json!({"evidence_id": "ev-1"}),
            RunId::new("corr-1"),
            JobId::new("job-1"),
            "extract",
        )
    }

    #[test]
    fn complete_sets_output_and_status() {
        let run = running().complete(serde_json::json!({"facts": []}), 120, Some(Confidence::new(0.9).unwrap()));
        assert_eq!(run.status, AgentRunStatus::Completed);
        assert!(run.output.is_some());
        assert_eq!(run.duration_ms, 120);
    }

    #[test]
    fn fail_sets_error_and_status() {
        let run = running().fail("timeout", 5000);
        assert_eq!(run.status, AgentRunStatus::Failed);
        assert_eq!(run.error.as_deref(), Some("timeout"));
    }

    #[test]
    fn completing_a_terminal_row_is_a_no_op() {
        let completed = running().complete(serde_json::json!({}), 10, None);
        let reattempt = completed.clone().fail("should not apply", 20);
        assert_eq!(reattempt, completed);
    }
}
