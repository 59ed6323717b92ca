// truth-watchdog/src/progress_gates.rs
// ============================================================================
// Module: Progress Gates
// Description: The three inter-stage gates watching for items stuck
//              between pipeline stages (§4.10).
// Purpose: Catch a stalled extractor/composer/releaser before a backlog of
//          unprocessed Evidence, CandidateFacts, or approved Rules grows
//          silently.
// Dependencies: time, truth-core
// ============================================================================

//! ## Overview
//! Each gate classifies by the count of stalled items, not by how stale the
//! single oldest one is (§4.10: "HEALTHY at 0, WARNING below 20, CRITICAL
//! at or above 20"). Gate 3 (Rule `APPROVED` with no Release membership)
//! is answered entirely by [`truth_core::RuleRepository::approved_since`]:
//! a released Rule has already transitioned out of `Approved` by the time
//! the Releaser publishes it (§4.8), so "still `Approved`" and "not yet in
//! a Release" are the same condition — no separate Release lookup is
//! needed.

use time::OffsetDateTime;
use truth_core::CandidateFactRepository;
use truth_core::EvidenceRepository;
use truth_core::RepoResult;
use truth_core::RuleRepository;

use crate::report::CheckResult;
use crate::report::CheckStatus;
use crate::thresholds::WatchdogThresholds;

/// Check identifier for gate 1 (Evidence with no CandidateFacts).
pub const EVIDENCE_WITHOUT_FACTS_ALERT_TYPE: &str = "PROGRESS_GATE_EVIDENCE_WITHOUT_FACTS";
/// Check identifier for gate 2 (CandidateFact with no Rule).
pub const FACT_WITHOUT_RULE_ALERT_TYPE: &str = "PROGRESS_GATE_FACT_WITHOUT_RULE";
/// Check identifier for gate 3 (Rule `APPROVED` with no Release).
pub const RULE_WITHOUT_RELEASE_ALERT_TYPE: &str = "PROGRESS_GATE_RULE_WITHOUT_RELEASE";

fn classify(stalled_count: u64, thresholds: &WatchdogThresholds) -> CheckStatus {
    if stalled_count == 0 {
        CheckStatus::Healthy
    } else if stalled_count < thresholds.progress_gate_warning_count {
        CheckStatus::Warning
    } else {
        CheckStatus::Critical
    }
}

/// Gate 1: Evidence fetched more than [`WatchdogThresholds::evidence_without_facts_after`]
/// ago with no CandidateFacts extracted from it yet.
///
/// # Errors
///
/// Returns [`truth_core::RepoError`] on storage failure.
pub fn evidence_without_facts(
    evidence_repo: &dyn EvidenceRepository,
    candidate_fact_repo: &dyn CandidateFactRepository,
    now: OffsetDateTime,
    thresholds: &WatchdogThresholds,
) -> RepoResult<CheckResult> {
    let cutoff = now - thresholds.evidence_without_facts_after;
    let linked = candidate_fact_repo.evidence_ids_with_candidate_facts()?;
    let mut stalled = 0_u64;
    for evidence_id in evidence_repo.list_all()? {
        if linked.contains(&evidence_id) {
            continue;
        }
        let evidence = evidence_repo.get(&evidence_id)?;
        if evidence.fetched_at <= cutoff {
            stalled += 1;
        }
    }
    let status = classify(stalled, thresholds);
    Ok(CheckResult::new(
        EVIDENCE_WITHOUT_FACTS_ALERT_TYPE,
        "pipeline",
        status,
        format!("{stalled} Evidence rows fetched over {} with no CandidateFacts", thresholds.evidence_without_facts_after),
    ))
}

/// Gate 2: a CandidateFact created more than
/// [`WatchdogThresholds::fact_without_rule_after`] ago with no Rule backed
/// by it yet.
///
/// # Errors
///
/// Returns [`truth_core::RepoError`] on storage failure.
pub fn fact_without_rule(
    candidate_fact_repo: &dyn CandidateFactRepository,
    now: OffsetDateTime,
    thresholds: &WatchdogThresholds,
) -> RepoResult<CheckResult> {
    let cutoff = now - thresholds.fact_without_rule_after;
    let stalled = candidate_fact_repo
        .candidate_facts_without_rule()?
        .into_iter()
        .filter(|(_, created_at)| *created_at <= cutoff)
        .count();
    let stalled = u64::try_from(stalled).unwrap_or(u64::MAX);
    let status = classify(stalled, thresholds);
    Ok(CheckResult::new(
        FACT_WITHOUT_RULE_ALERT_TYPE,
        "pipeline",
        status,
        format!("{stalled} CandidateFacts created over {} with no backing Rule", thresholds.fact_without_rule_after),
    ))
}

/// Gate 3: a Rule `APPROVED` more than
/// [`WatchdogThresholds::rule_without_release_after`] ago with no Release
/// membership.
///
/// # Errors
///
/// Returns [`truth_core::RepoError`] on storage failure.
pub fn rule_without_release(rule_repo: &dyn RuleRepository, now: OffsetDateTime, thresholds: &WatchdogThresholds) -> RepoResult<CheckResult> {
    let cutoff = now - thresholds.rule_without_release_after;
    let stalled = rule_repo.approved_since()?.into_iter().filter(|(_, transitioned_at)| *transitioned_at <= cutoff).count();
    let stalled = u64::try_from(stalled).unwrap_or(u64::MAX);
    let status = classify(stalled, thresholds);
    Ok(CheckResult::new(
        RULE_WITHOUT_RELEASE_ALERT_TYPE,
        "pipeline",
        status,
        format!("{stalled} Rules approved over {} with no Release", thresholds.rule_without_release_after),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_matches_spec_bands() {
        let thresholds = WatchdogThresholds::default();
        assert_eq!(classify(0, &thresholds), CheckStatus::Healthy);
        assert_eq!(classify(5, &thresholds), CheckStatus::Warning);
        assert_eq!(classify(20, &thresholds), CheckStatus::Critical);
    }
}
