// truth-pipeline/src/arbiter.rs
// ============================================================================
// Module: Arbiter (C7)
// Description: Resolves OPEN SourceConflicts between disagreeing
//              CandidateFacts (SPEC_FULL.md Reviewer/Arbiter contract).
// Purpose: Pick a winner deterministically — higher authority tier first,
//          then higher overall confidence, then earliest capture — and
//          record the decision rather than silently discarding the loser.
// Dependencies: serde_json, time, tracing, truth-core
// ============================================================================

//! ## Overview
//! [`Arbiter::resolve`] looks up the two `CandidateFact`s named in a
//! `SourceConflict`'s `metadata.candidate_fact_ids`, resolves each one's
//! authority tier via its backing Evidence's `source_id`, and picks a
//! winner by `(authority_level desc, overall_confidence desc, fetched_at
//! asc)`. The conflict moves to `Resolved` with `metadata.winner_id`
//! recorded; the losing CandidateFact is left `Captured` but unlinked from
//! any Rule, preserved for audit rather than deleted.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use truth_core::AuditEvent;
use truth_core::AuditLogRepository;
use truth_core::CandidateFact;
use truth_core::CandidateFactId;
use truth_core::CandidateFactRepository;
use truth_core::ConflictId;
use truth_core::ConflictKind;
use truth_core::ConflictRepository;
use truth_core::ConflictResolution;
use truth_core::EvidenceRepository;
use truth_core::RepoError;

use crate::source_authority::SourceAuthorityResolver;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Error surfaced by [`Arbiter::resolve`].
#[derive(Debug, thiserror::Error)]
pub enum ArbiterError {
    /// The conflict is not a `SourceConflict`, or its
    /// `metadata.candidate_fact_ids` did not carry exactly two ids.
    #[error("conflict {0} is not a resolvable source conflict")]
    NotResolvable(ConflictId),
    /// A repository call failed.
    #[error("repository error: {0}")]
    Repo(#[from] RepoError),
}

// ============================================================================
// SECTION: Arbiter
// ============================================================================

/// Resolves `SourceConflict` rows left `Open` by the Composer (§7, C7).
pub struct Arbiter {
    candidate_repo: Arc<dyn CandidateFactRepository + Send + Sync>,
    evidence_repo: Arc<dyn EvidenceRepository + Send + Sync>,
    conflict_repo: Arc<dyn ConflictRepository + Send + Sync>,
    audit_repo: Arc<dyn AuditLogRepository + Send + Sync>,
    authority: Arc<dyn SourceAuthorityResolver>,
}

impl Arbiter {
    /// Builds an Arbiter from its collaborators.
    #[must_use]
    pub fn new(
        candidate_repo: Arc<dyn CandidateFactRepository + Send + Sync>,
        evidence_repo: Arc<dyn EvidenceRepository + Send + Sync>,
        conflict_repo: Arc<dyn ConflictRepository + Send + Sync>,
        audit_repo: Arc<dyn AuditLogRepository + Send + Sync>,
        authority: Arc<dyn SourceAuthorityResolver>,
    ) -> Self {
        Self { candidate_repo, evidence_repo, conflict_repo, audit_repo, authority }
    }

    /// Resolves one `Open` `SourceConflict`, picking a winning CandidateFact
    /// and marking the conflict `Resolved`.
    ///
    /// # Errors
    ///
    /// Returns [`ArbiterError::NotResolvable`] when `conflict_id` does not
    /// name a `SourceConflict` with exactly two candidate ids in its
    /// metadata, or [`ArbiterError::Repo`] on persistence failure.
    pub fn resolve(&self, conflict_id: &ConflictId) -> Result<CandidateFactId, ArbiterError> {
        let conflict = self.conflict_repo.get(conflict_id)?;
        if conflict.conflict_type != ConflictKind::SourceConflict {
            return Err(ArbiterError::NotResolvable(conflict_id.clone()));
        }
        let candidate_ids = conflict
            .metadata
            .get("candidate_fact_ids")
            .and_then(serde_json::Value::as_array)
            .map(|ids| ids.iter().filter_map(|id| id.as_str().map(CandidateFactId::new)).collect::<Vec<_>>())
            .unwrap_or_default();
        let [id_a, id_b] = candidate_ids.as_slice() else {
            return Err(ArbiterError::NotResolvable(conflict_id.clone()));
        };

        let candidate_a = self.candidate_repo.get(id_a)?;
        let candidate_b = self.candidate_repo.get(id_b)?;
        let winner_id = self.pick_winner(&candidate_a, &candidate_b)?;

        self.conflict_repo.resolve(
            conflict_id,
            ConflictResolution::Resolved,
            serde_json::json!({"winner_id": winner_id.as_str()}),
        )?;
        self.audit_repo.append(AuditEvent {
            action: "CONFLICT_RESOLVED".to_owned(),
            entity_type: "conflict".to_owned(),
            entity_id: conflict_id.as_str().to_owned(),
            performed_by: None,
            metadata: serde_json::json!({"winner_id": winner_id.as_str()}),
            performed_at: time::OffsetDateTime::now_utc(),
        })?;
        tracing::info!(conflict_id = %conflict_id, winner_id = %winner_id, "conflict resolved by arbiter");
        Ok(winner_id)
    }

    /// Picks the winning CandidateFact: higher authority tier, then higher
    /// `overall_confidence`, then earliest-fetched Evidence.
    fn pick_winner(&self, a: &CandidateFact, b: &CandidateFact) -> Result<CandidateFactId, RepoError> {
        let authority_a = self.max_authority(a)?;
        let authority_b = self.max_authority(b)?;
        if authority_a != authority_b {
            return Ok(if authority_a > authority_b { a.id.clone() } else { b.id.clone() });
        }

        if a.overall_confidence.value() != b.overall_confidence.value() {
            return Ok(if a.overall_confidence.value() > b.overall_confidence.value() { a.id.clone() } else { b.id.clone() });
        }

        let fetched_a = self.earliest_fetched_at(a)?;
        let fetched_b = self.earliest_fetched_at(b)?;
        Ok(if fetched_a <= fetched_b { a.id.clone() } else { b.id.clone() })
    }

    /// Returns the maximum authority tier among a CandidateFact's grounding
    /// quotes' sources.
    fn max_authority(&self, candidate: &CandidateFact) -> Result<truth_core::AuthorityLevel, RepoError> {
        let mut tiers = Vec::new();
        for quote in &candidate.grounding_quotes {
            let evidence = self.evidence_repo.get(&quote.evidence_id)?;
            tiers.push(self.authority.authority_for(&evidence.source_id));
        }
        Ok(truth_core::AuthorityLevel::max_of(&tiers))
    }

    /// Returns the earliest `fetched_at` among a CandidateFact's grounding
    /// quotes' Evidence rows.
    fn earliest_fetched_at(&self, candidate: &CandidateFact) -> Result<time::OffsetDateTime, RepoError> {
        let mut earliest = time::OffsetDateTime::now_utc();
        for (index, quote) in candidate.grounding_quotes.iter().enumerate() {
            let evidence = self.evidence_repo.get(&quote.evidence_id)?;
            if index == 0 || evidence.fetched_at < earliest {
                earliest = evidence.fetched_at;
            }
        }
        Ok(earliest)
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use truth_core::AuthorityLevel;

    #[test]
    fn higher_authority_wins_ordering() {
        assert!(AuthorityLevel::Law > AuthorityLevel::Regulation);
    }
}
