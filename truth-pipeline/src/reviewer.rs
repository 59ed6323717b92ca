// truth-pipeline/src/reviewer.rs
// ============================================================================
// Module: Reviewer + Auto-Approval (C7)
// Description: Scores a draft Rule against the review rubric and, for
//              low-risk tiers, approves it without a human (SPEC_FULL.md
//              Reviewer/Auto-approval contract).
// Purpose: Express the rubric as a `ret-logic` tri-state requirement tree
//          rather than ad-hoc boolean arithmetic, matching how the rest of
//          the pipeline (the Applies-When DSL) already uses the same
//          algebra, and keep the fail-closed posture: a criterion this
//          reviewer cannot confidently measure counts against the Rule, not
//          for it.
// Dependencies: ret-logic, serde, time, tracing, truth-core
// ============================================================================

//! ## Overview
//! [`Reviewer::score`] evaluates five rubric criteria — backing-fact count,
//! mean `valueConfidence`, authority tier, Applies-When validity, and
//! conflict-freedom — as [`ret_logic::TriState`] leaves, combined with
//! [`ret_logic::Requirement::and`] under [`ret_logic::KleeneLogic`].
//! [`Reviewer::auto_approve`] applies the risk-tier-gated policy: only
//! `T2`/`T3` Rules scoring at least [`AUTO_APPROVAL_SCORE_THRESHOLD`] with no
//! open conflict move to `APPROVED` without a human `approved_by`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use ret_logic::KleeneLogic;
use ret_logic::Requirement;
use ret_logic::Row;
use ret_logic::TriState;
use ret_logic::TriStatePredicateEval;
use serde::Deserialize;
use serde::Serialize;
use truth_core::AuditEvent;
use truth_core::AuditLogRepository;
use truth_core::AuthorityLevel;
use truth_core::ConflictRepository;
use truth_core::RepoError;
use truth_core::Rule;
use truth_core::RuleId;
use truth_core::RuleRepository;
use truth_core::RuleStatus;
use truth_core::parse_applies_when;

// ============================================================================
// SECTION: Rubric Thresholds
// ============================================================================

/// Minimum mean `valueConfidence` across backing CandidateFacts for the
/// "confident extraction" criterion to be satisfied.
const MIN_MEAN_CONFIDENCE: f64 = 0.75;

/// Minimum authority tier for the "authoritative source" criterion to be
/// satisfied.
const MIN_AUTHORITY_TIER: AuthorityLevel = AuthorityLevel::Regulation;

/// Minimum [`ReviewScore::value`] for auto-approval eligibility.
pub const AUTO_APPROVAL_SCORE_THRESHOLD: f64 = 0.85;

// ============================================================================
// SECTION: Rubric Criterion
// ============================================================================

/// One rubric criterion, pre-evaluated to a tri-state result.
///
/// The criterion's own context-gathering (counting backing facts, querying
/// the conflict repository, …) happens before this leaf is built; the leaf
/// itself carries no context dependency, so it implements
/// [`TriStatePredicateEval`] over a unit reader.
#[derive(Debug, Clone, PartialEq)]
struct Criterion {
    name: &'static str,
    result: TriState,
}

impl TriStatePredicateEval for Criterion {
    type Reader<'a> = ();

    fn eval_row_tristate(&self, (): &Self::Reader<'_>, _row: Row) -> TriState {
        self.result
    }
}

// ============================================================================
// SECTION: Review Score
// ============================================================================

/// Outcome of scoring a draft Rule against the review rubric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewScore {
    /// Fraction of rubric criteria satisfied, in `[0, 1]`.
    pub value: f64,
    /// Human-readable notes, one per criterion, for the audit trail.
    pub reasons: Vec<String>,
    /// Whether the rubric as a whole evaluated to [`TriState::True`] under
    /// [`KleeneLogic`] conjunction (every criterion satisfied, none unknown
    /// or failed).
    pub all_satisfied: bool,
}

// ============================================================================
// SECTION: Reviewer
// ============================================================================

/// Scores draft Rules and applies the auto-approval policy (§4.7, C7).
pub struct Reviewer {
    rule_repo: Arc<dyn RuleRepository + Send + Sync>,
    conflict_repo: Arc<dyn ConflictRepository + Send + Sync>,
    audit_repo: Arc<dyn AuditLogRepository + Send + Sync>,
}

impl Reviewer {
    /// Builds a Reviewer from its collaborators.
    #[must_use]
    pub fn new(
        rule_repo: Arc<dyn RuleRepository + Send + Sync>,
        conflict_repo: Arc<dyn ConflictRepository + Send + Sync>,
        audit_repo: Arc<dyn AuditLogRepository + Send + Sync>,
    ) -> Self {
        Self { rule_repo, conflict_repo, audit_repo }
    }

    /// Scores `rule` against the review rubric.
    ///
    /// # Errors
    ///
    /// Returns [`RepoError`] when checking for open conflicts fails.
    pub fn score(&self, rule: &Rule, mean_value_confidence: Option<f64>) -> Result<ReviewScore, RepoError> {
        let has_open_conflict = self.conflict_repo.has_open_conflict_for_rule(&rule.id)?;
        let applies_when_valid = parse_applies_when(&rule.applies_when).is_ok();

        let criteria = vec![
            Criterion {
                name: "has_backing_facts",
                result: TriState::from(rule.has_backing_evidence()),
            },
            Criterion {
                name: "mean_value_confidence",
                result: mean_value_confidence.map_or(TriState::Unknown, |mean| TriState::from(mean >= MIN_MEAN_CONFIDENCE)),
            },
            Criterion {
                name: "authority_tier",
                result: TriState::from(rule.authority_level >= MIN_AUTHORITY_TIER),
            },
            Criterion {
                name: "applies_when_valid",
                result: TriState::from(applies_when_valid),
            },
            Criterion {
                name: "conflict_free",
                result: TriState::from(!has_open_conflict),
            },
        ];

        let satisfied = criteria.iter().filter(|c| c.result.is_true()).count();
        let total = criteria.len();
        #[allow(clippy::cast_precision_loss, reason = "criteria count is tiny and exact below f64's integer precision limit")]
        let value = satisfied as f64 / total as f64;
        let reasons = criteria.iter().map(|c| format!("{}: {:?}", c.name, c.result)).collect();

        let requirement: Requirement<Criterion> = Requirement::and(criteria.into_iter().map(Requirement::predicate).collect());
        let all_satisfied = requirement.eval_tristate(&(), 0, &KleeneLogic).is_true();

        Ok(ReviewScore { value, reasons, all_satisfied })
    }

    /// Applies the auto-approval policy to a scored, still-`Draft` Rule:
    /// moves it to `APPROVED` with `approved_by = None` when `risk_tier` is
    /// `T2`/`T3`, the score clears [`AUTO_APPROVAL_SCORE_THRESHOLD`], and no
    /// conflict is open. Returns `false` without transitioning otherwise,
    /// leaving the Rule for human review.
    ///
    /// # Errors
    ///
    /// Returns [`RepoError`] on persistence failure.
    pub fn auto_approve(&self, rule_id: &RuleId, score: &ReviewScore) -> Result<bool, RepoError> {
        let rule = self.rule_repo.get(rule_id)?;
        if rule.status != RuleStatus::Draft {
            return Ok(false);
        }
        let has_open_conflict = self.conflict_repo.has_open_conflict_for_rule(rule_id)?;
        let eligible = !rule.risk_tier.always_requires_human_approval()
            && score.value >= AUTO_APPROVAL_SCORE_THRESHOLD
            && !has_open_conflict;
        if !eligible {
            return Ok(false);
        }

        self.rule_repo.transition(rule_id, RuleStatus::Approved, false)?;
        self.audit_repo.append(AuditEvent {
            action: "RULE_AUTO_APPROVED".to_owned(),
            entity_type: "rule".to_owned(),
            entity_id: rule_id.as_str().to_owned(),
            performed_by: None,
            metadata: serde_json::json!({"score": score.value, "reasons": score.reasons}),
            performed_at: time::OffsetDateTime::now_utc(),
        })?;
        tracing::info!(rule_id = %rule_id, score = score.value, "rule auto-approved");
        Ok(true)
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn criterion_leaf_returns_its_fixed_result() {
        let criterion = Criterion { name: "x", result: TriState::True };
        assert_eq!(criterion.eval_row_tristate(&(), 0), TriState::True);
    }

    #[test]
    fn and_of_true_and_unknown_is_unknown_under_kleene() {
        let criteria = vec![
            Criterion { name: "a", result: TriState::True },
            Criterion { name: "b", result: TriState::Unknown },
        ];
        let requirement: Requirement<Criterion> = Requirement::and(criteria.into_iter().map(Requirement::predicate).collect());
        assert_eq!(requirement.eval_tristate(&(), 0, &KleeneLogic), TriState::Unknown);
    }
}
