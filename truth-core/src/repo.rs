// truth-core/src/repo.rs
// ============================================================================
// Module: Repository Boundary
// Description: Typed persistence traits for every §3 entity (C1's boundary).
// Purpose: Let every pipeline stage depend on a narrow trait rather than a
//          concrete store, so `truth-store-sqlite` is the only crate that
//          knows about SQL (§2: "C1 exclusively owns persistence; all
//          components interact with it through typed repository boundaries").
// Dependencies: crate::identifiers, crate::model, thiserror
// ============================================================================

//! ## Overview
//! Every repository method is synchronous and blocking, matching the
//! teacher's `rusqlite`-backed store: pipeline stages run on worker threads
//! that block for the duration of a persistence round-trip rather than
//! holding an async runtime open across it (§5: "suspension points... queue
//! reserve/ack, KV read/write... persistence round-trips"). A single
//! [`RepoError`] carries a [`crate::error::ErrorCode`] so callers can map
//! storage failures onto the shared §7 taxonomy without a second enum.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

use crate::error::ErrorCode;
use crate::identifiers::AgentRunId;
use crate::identifiers::CandidateFactId;
use crate::identifiers::ConceptSlug;
use crate::identifiers::ConflictId;
use crate::identifiers::EvidenceId;
use crate::identifiers::ReleaseId;
use crate::identifiers::RuleId;
use crate::identifiers::SourceId;
use crate::model::AgentRun;
use crate::model::CandidateFact;
use crate::model::CandidateFactStatus;
use crate::model::Conflict;
use crate::model::ConflictResolution;
use crate::model::Evidence;
use crate::model::Release;
use crate::model::Rule;
use crate::model::RuleStatus;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Error surfaced by a repository implementation.
#[derive(Debug, Error)]
pub enum RepoError {
    /// The requested row does not exist.
    #[error("not found: {0}")]
    NotFound(String),
    /// The write violates an entity invariant (checked again at the
    /// repository boundary as defense in depth).
    #[error("invariant violation: {0}")]
    InvariantViolation(String),
    /// The status transition requested is not a legal DAG edge.
    #[error("illegal status transition: {0}")]
    IllegalTransition(String),
    /// The underlying storage backend failed.
    #[error("storage backend error: {0}")]
    Backend(String),
}

impl RepoError {
    /// Maps this storage error onto the shared §7 error code vocabulary.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::NotFound(_) => ErrorCode::NotFound,
            Self::InvariantViolation(_) | Self::IllegalTransition(_) => ErrorCode::ValidationError,
            Self::Backend(_) => ErrorCode::InternalError,
        }
    }
}

/// Convenience alias for repository results.
pub type RepoResult<T> = Result<T, RepoError>;

// ============================================================================
// SECTION: Evidence Repository
// ============================================================================

/// Persistence boundary for [`Evidence`] rows (§3).
///
/// # Invariants
/// - `put` is idempotent by content hash: re-fetching bytes that hash
///   identically to an already-stored row for the same `source_id`/`url`
///   must not create a new row (§3: "re-fetches that hash identically do
///   not create a new Evidence row but may update `hasChanged=false`").
pub trait EvidenceRepository {
    /// Persists a newly captured Evidence row, or returns the existing row
    /// unchanged (with `has_changed` left as previously stored) when an
    /// Evidence row for the same `source_id`/`url`/`content_hash` already
    /// exists.
    ///
    /// # Errors
    ///
    /// Returns [`RepoError::Backend`] on storage failure.
    fn put(&self, evidence: Evidence) -> RepoResult<Evidence>;

    /// Loads an Evidence row by id.
    ///
    /// # Errors
    ///
    /// Returns [`RepoError::NotFound`] when no row exists, or
    /// [`RepoError::Backend`] on storage failure.
    fn get(&self, id: &EvidenceId) -> RepoResult<Evidence>;

    /// Appends an artifact to an existing Evidence row without touching its
    /// captured payload.
    ///
    /// # Errors
    ///
    /// Returns [`RepoError::NotFound`] when no row exists, or
    /// [`RepoError::Backend`] on storage failure.
    fn append_artifact(&self, id: &EvidenceId, artifact: crate::model::EvidenceArtifact) -> RepoResult<Evidence>;

    /// Lists Evidence ids for a source, most recently fetched first.
    ///
    /// # Errors
    ///
    /// Returns [`RepoError::Backend`] on storage failure.
    fn list_by_source(&self, source_id: &SourceId) -> RepoResult<Vec<EvidenceId>>;

    /// Returns the most recent `fetched_at` timestamp recorded for a
    /// source, or `None` if the source has no Evidence yet (watchdog stale
    /// source check, §4.10).
    ///
    /// # Errors
    ///
    /// Returns [`RepoError::Backend`] on storage failure.
    fn last_fetched_at(&self, source_id: &SourceId) -> RepoResult<Option<time::OffsetDateTime>>;

    /// Lists every Evidence id in the store, in insertion order (extractor
    /// batch scan, §4.3).
    ///
    /// # Errors
    ///
    /// Returns [`RepoError::Backend`] on storage failure.
    fn list_all(&self) -> RepoResult<Vec<EvidenceId>>;
}

// ============================================================================
// SECTION: CandidateFact Repository
// ============================================================================

/// Persistence boundary for [`CandidateFact`] rows, plus the separate
/// dead-letter collection for rejected extractions (§3).
pub trait CandidateFactRepository {
    /// Persists a newly extracted CandidateFact.
    ///
    /// # Errors
    ///
    /// Returns [`RepoError::Backend`] on storage failure.
    fn put(&self, candidate: CandidateFact) -> RepoResult<CandidateFact>;

    /// Loads a CandidateFact by id.
    ///
    /// # Errors
    ///
    /// Returns [`RepoError::NotFound`] when no row exists, or
    /// [`RepoError::Backend`] on storage failure.
    fn get(&self, id: &CandidateFactId) -> RepoResult<CandidateFact>;

    /// Transitions a CandidateFact's status, rejecting illegal DAG edges.
    ///
    /// # Errors
    ///
    /// Returns [`RepoError::IllegalTransition`] when the move is not a
    /// legal edge, [`RepoError::NotFound`] when no row exists, or
    /// [`RepoError::Backend`] on storage failure.
    fn transition(&self, id: &CandidateFactId, to: CandidateFactStatus) -> RepoResult<CandidateFact>;

    /// Records a rejected extraction in the dead-letter collection. Rejected
    /// candidates are never constructed as ordinary `CandidateFact` rows —
    /// the raw LLM output and rejection reason are kept for analysis (§4.3).
    ///
    /// # Errors
    ///
    /// Returns [`RepoError::Backend`] on storage failure.
    fn record_rejection(&self, rejection: RejectedExtraction) -> RepoResult<()>;

    /// Lists CandidateFacts grouped by domain for Composer batch mode
    /// (§4.6) that have not yet been linked to any Rule.
    ///
    /// # Errors
    ///
    /// Returns [`RepoError::Backend`] on storage failure.
    fn list_ungrouped_by_domain(&self) -> RepoResult<std::collections::BTreeMap<String, Vec<CandidateFactId>>>;

    /// Returns the set of Evidence ids already linked to at least one
    /// CandidateFact (extractor batch mode dedup, §4.3).
    ///
    /// # Errors
    ///
    /// Returns [`RepoError::Backend`] on storage failure.
    fn evidence_ids_with_candidate_facts(&self) -> RepoResult<std::collections::BTreeSet<EvidenceId>>;

    /// Returns the earliest time a CandidateFact was created for a given
    /// Evidence id still lacking any Rule, used by the watchdog's progress
    /// gate (§4.10).
    ///
    /// # Errors
    ///
    /// Returns [`RepoError::Backend`] on storage failure.
    fn candidate_facts_without_rule(&self) -> RepoResult<Vec<(CandidateFactId, time::OffsetDateTime)>>;
}

/// A rejected extraction attempt, persisted for analysis rather than
/// discarded (§4.3: "Persist the rejection...continue").
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RejectedExtraction {
    /// Evidence the rejected extraction was attempted against.
    pub evidence_id: EvidenceId,
    /// Classified rejection reason (`INVALID_DOMAIN`, `OUT_OF_RANGE`, …).
    pub reason: String,
    /// Raw LLM output that triggered the rejection.
    pub raw_output: serde_json::Value,
    /// Timestamp the rejection was recorded.
    pub rejected_at: time::OffsetDateTime,
}

// ============================================================================
// SECTION: Rule Repository
// ============================================================================

/// Persistence boundary for [`Rule`] rows (§3).
pub trait RuleRepository {
    /// Persists a newly composed Rule in `DRAFT`.
    ///
    /// # Errors
    ///
    /// Returns [`RepoError::Backend`] on storage failure.
    fn put(&self, rule: Rule) -> RepoResult<Rule>;

    /// Loads a Rule by id.
    ///
    /// # Errors
    ///
    /// Returns [`RepoError::NotFound`] when no row exists, or
    /// [`RepoError::Backend`] on storage failure.
    fn get(&self, id: &RuleId) -> RepoResult<Rule>;

    /// Transitions a Rule's status, rejecting illegal DAG edges unless
    /// `bypass` is set (§4.8/§9: the rollback context's explicit
    /// `withBypass: true` parameter, never an ambient flag).
    ///
    /// # Errors
    ///
    /// Returns [`RepoError::IllegalTransition`] when the move is not a
    /// legal edge and `bypass` is false, [`RepoError::NotFound`] when no row
    /// exists, or [`RepoError::Backend`] on storage failure.
    fn transition(&self, id: &RuleId, to: RuleStatus, bypass: bool) -> RepoResult<Rule>;

    /// Sets `approved_by` on a Rule (human or auto-approval path, §4.7).
    ///
    /// # Errors
    ///
    /// Returns [`RepoError::NotFound`] when no row exists, or
    /// [`RepoError::Backend`] on storage failure.
    fn set_approved_by(&self, id: &RuleId, approved_by: Option<crate::identifiers::UserId>) -> RepoResult<Rule>;

    /// Upserts a Concept row by slug and links `rule_id` to it (§4.6 step
    /// 7). Returns the concept slug unchanged; concept attributes beyond
    /// the slug are out of scope (§1 domain ontology).
    ///
    /// # Errors
    ///
    /// Returns [`RepoError::Backend`] on storage failure.
    fn upsert_concept_link(&self, concept_slug: &ConceptSlug, rule_id: &RuleId) -> RepoResult<()>;

    /// Records an `AMENDS` edge from `rule_id` to `supersedes_id` (§4.6 step
    /// 7).
    ///
    /// # Errors
    ///
    /// Returns [`RepoError::Backend`] on storage failure.
    fn record_amends_edge(&self, rule_id: &RuleId, supersedes_id: &RuleId) -> RepoResult<()>;

    /// Lists Rules currently in `status`.
    ///
    /// # Errors
    ///
    /// Returns [`RepoError::Backend`] on storage failure.
    fn list_by_status(&self, status: RuleStatus) -> RepoResult<Vec<RuleId>>;

    /// Returns `(rule_id, transitioned_at)` pairs for Rules that have sat in
    /// `Approved` status since before the watchdog's release progress-gate
    /// cutoff (§4.10).
    ///
    /// # Errors
    ///
    /// Returns [`RepoError::Backend`] on storage failure.
    fn approved_since(&self) -> RepoResult<Vec<(RuleId, time::OffsetDateTime)>>;

    /// Returns `(rule_id, transitioned_at)` pairs for Rules currently
    /// `Rejected`, used alongside [`RuleRepository::approved_since`] by the
    /// watchdog's rejection-rate check (§4.10: "REJECTED / (APPROVED +
    /// REJECTED) over 7 days").
    ///
    /// # Errors
    ///
    /// Returns [`RepoError::Backend`] on storage failure.
    fn rejected_since(&self) -> RepoResult<Vec<(RuleId, time::OffsetDateTime)>>;
}

// ============================================================================
// SECTION: Conflict Repository
// ============================================================================

/// Persistence boundary for [`Conflict`] rows (§3).
pub trait ConflictRepository {
    /// Persists a newly detected Conflict.
    ///
    /// # Errors
    ///
    /// Returns [`RepoError::Backend`] on storage failure.
    fn put(&self, conflict: Conflict) -> RepoResult<Conflict>;

    /// Loads a Conflict by id.
    ///
    /// # Errors
    ///
    /// Returns [`RepoError::NotFound`] when no row exists, or
    /// [`RepoError::Backend`] on storage failure.
    fn get(&self, id: &ConflictId) -> RepoResult<Conflict>;

    /// Resolves a Conflict, recording the winner in `metadata.winner_id`
    /// (§4.6's Composer-side "Arbiter" contract in `SPEC_FULL.md`).
    ///
    /// # Errors
    ///
    /// Returns [`RepoError::NotFound`] when no row exists, or
    /// [`RepoError::Backend`] on storage failure.
    fn resolve(&self, id: &ConflictId, status: ConflictResolution, metadata: serde_json::Value) -> RepoResult<Conflict>;

    /// Returns true when any Conflict referencing `rule_id` (as
    /// `item_a_id`/`item_b_id`) is still `Open` (§4.8 release gate 3).
    ///
    /// # Errors
    ///
    /// Returns [`RepoError::Backend`] on storage failure.
    fn has_open_conflict_for_rule(&self, rule_id: &RuleId) -> RepoResult<bool>;

    /// Lists every `Open` conflict.
    ///
    /// # Errors
    ///
    /// Returns [`RepoError::Backend`] on storage failure.
    fn list_open(&self) -> RepoResult<Vec<ConflictId>>;
}

// ============================================================================
// SECTION: Release Repository
// ============================================================================

/// Persistence boundary for [`Release`] rows (§3).
pub trait ReleaseRepository {
    /// Persists a newly cut Release, marking it `is_latest` and clearing
    /// the flag on the previous latest release.
    ///
    /// # Errors
    ///
    /// Returns [`RepoError::InvariantViolation`] when `version` does not
    /// strictly increase over the current latest release, or
    /// [`RepoError::Backend`] on storage failure.
    fn put(&self, release: Release) -> RepoResult<Release>;

    /// Loads a Release by id.
    ///
    /// # Errors
    ///
    /// Returns [`RepoError::NotFound`] when no row exists, or
    /// [`RepoError::Backend`] on storage failure.
    fn get(&self, id: &ReleaseId) -> RepoResult<Release>;

    /// Returns the current latest Release, if any.
    ///
    /// # Errors
    ///
    /// Returns [`RepoError::Backend`] on storage failure.
    fn latest(&self) -> RepoResult<Option<Release>>;

    /// Returns the Release immediately preceding the current latest one, by
    /// version, if any (§4.8 rollback: "rules present in the previous
    /// release stay Published").
    ///
    /// # Errors
    ///
    /// Returns [`RepoError::Backend`] on storage failure.
    fn previous(&self) -> RepoResult<Option<Release>>;

    /// Detaches every rule from `id` and clears `is_latest`, restoring the
    /// previous release (if any) as latest. Used only by rollback (§4.8).
    ///
    /// # Errors
    ///
    /// Returns [`RepoError::NotFound`] when no row exists, or
    /// [`RepoError::Backend`] on storage failure.
    fn rollback(&self, id: &ReleaseId) -> RepoResult<Release>;
}

// ============================================================================
// SECTION: AgentRun Repository
// ============================================================================

/// Persistence boundary for [`AgentRun`] rows (§3): append-only.
pub trait AgentRunRepository {
    /// Persists a new, terminal, or in-flight AgentRun row.
    ///
    /// # Errors
    ///
    /// Returns [`RepoError::Backend`] on storage failure.
    fn put(&self, run: AgentRun) -> RepoResult<AgentRun>;

    /// Loads an AgentRun by id.
    ///
    /// # Errors
    ///
    /// Returns [`RepoError::NotFound`] when no row exists, or
    /// [`RepoError::Backend`] on storage failure.
    fn get(&self, id: &AgentRunId) -> RepoResult<AgentRun>;

    /// Returns the mean `confidence` across `Completed` runs of the given
    /// `agent_type` over the trailing window (watchdog quality-degradation
    /// check, §4.10), or `None` when no completed runs exist.
    ///
    /// # Errors
    ///
    /// Returns [`RepoError::Backend`] on storage failure.
    fn mean_confidence_since(
        &self,
        agent_type: &str,
        since: time::OffsetDateTime,
    ) -> RepoResult<Option<f64>>;
}

// ============================================================================
// SECTION: Audit Log
// ============================================================================

/// A single row in the append-only audit log (§6: "a single `auditLog`
/// table captures every state-changing event").
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct AuditEvent {
    /// Action name (`RULE_CREATED`, `RELEASE_PUBLISHED`, …).
    pub action: String,
    /// Entity type the action concerns (`rule`, `release`, `conflict`, …).
    pub entity_type: String,
    /// Entity id the action concerns.
    pub entity_id: String,
    /// User that performed the action, when human-initiated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub performed_by: Option<crate::identifiers::UserId>,
    /// Structured metadata describing the event.
    pub metadata: serde_json::Value,
    /// Timestamp the event was recorded.
    pub performed_at: time::OffsetDateTime,
}

/// Persistence boundary for the append-only audit log (§6).
pub trait AuditLogRepository {
    /// Appends an audit event.
    ///
    /// # Errors
    ///
    /// Returns [`RepoError::Backend`] on storage failure.
    fn append(&self, event: AuditEvent) -> RepoResult<()>;

    /// Lists audit events for an entity, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`RepoError::Backend`] on storage failure.
    fn list_for_entity(&self, entity_type: &str, entity_id: &str) -> RepoResult<Vec<AuditEvent>>;
}

// ============================================================================
// SECTION: Alert Repository
// ============================================================================

/// Severity classification for a watchdog alert (§4.10: every threshold
/// check classifies into `WARN`/`CRITICAL`; `HEALTHY` never raises a row).
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertSeverity {
    /// Threshold crossed the warning band.
    Warning,
    /// Threshold crossed the critical band.
    Critical,
}

/// A deduplicated watchdog alert row (§4.10: "within a configurable window...
/// an alert of the same `(type, entityId)` increments the occurrence count on
/// the existing row instead of creating a new one").
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Alert {
    /// Check that raised this alert (`stale_source`, `llm_circuit_open`, …).
    pub alert_type: String,
    /// Entity the alert concerns (source id, provider id, queue name, …).
    pub entity_id: String,
    /// Severity as classified by the originating check.
    pub severity: AlertSeverity,
    /// Human-readable message for the most recent occurrence.
    pub message: String,
    /// Number of occurrences folded into this row within the dedup window.
    pub occurrence_count: u64,
    /// Timestamp the first occurrence in the current window was recorded.
    pub first_seen_at: time::OffsetDateTime,
    /// Timestamp the most recent occurrence was recorded.
    pub last_seen_at: time::OffsetDateTime,
    /// Timestamp after which a new occurrence starts a fresh dedup window.
    pub dedup_window_expires_at: time::OffsetDateTime,
}

/// Persistence boundary for watchdog alerts (§4.10).
pub trait AlertRepository {
    /// Records an occurrence of `(alert_type, entity_id)`: folds into the
    /// existing row (bumping `occurrence_count`/`last_seen_at`) when one is
    /// still within its dedup window as of `now`, otherwise starts a fresh
    /// row. Returns the stored row and whether this occurrence started a new
    /// window (callers use this to decide whether to notify).
    ///
    /// # Errors
    ///
    /// Returns [`RepoError::Backend`] on storage failure.
    fn record_occurrence(
        &self,
        alert_type: &str,
        entity_id: &str,
        severity: AlertSeverity,
        message: &str,
        now: time::OffsetDateTime,
        dedup_window: time::Duration,
    ) -> RepoResult<(Alert, bool)>;

    /// Lists every currently persisted alert row.
    ///
    /// # Errors
    ///
    /// Returns [`RepoError::Backend`] on storage failure.
    fn list_all(&self) -> RepoResult<Vec<Alert>>;
}
