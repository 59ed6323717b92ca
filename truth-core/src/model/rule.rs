// truth-core/src/model/rule.rs
// ============================================================================
// Module: Rule Entity
// Description: A published regulatory fact and its approval lifecycle (§3).
// Purpose: Enforce the DRAFT -> APPROVED -> PUBLISHED -> DEPRECATED status
//          DAG, the backing-evidence and human-approval gates, and the
//          effective-date ordering invariant.
// Dependencies: crate::authority, crate::identifiers, crate::model::value, serde, time
// ============================================================================

//! ## Overview
//! A `Rule` is created by the Composer (C6) in `DRAFT` status and
//! transitioned by the Reviewer/Arbiter (C7) and Releaser (C8). Its
//! `applies_when` DSL expression is stored as raw JSON rather than a parsed
//! [`crate::applies_when::Predicate`] tree so `Rule` stays trivially
//! serializable; callers parse it on demand with
//! [`crate::applies_when::parse_applies_when`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use serde::Deserialize;
use serde::Serialize;
use time::Date;

use crate::authority::AuthorityLevel;
use crate::identifiers::CandidateFactId;
use crate::identifiers::ConceptSlug;
use crate::identifiers::RuleId;
use crate::identifiers::UserId;
use crate::model::value::Confidence;
use crate::model::value::ValueType;

// ============================================================================
// SECTION: Risk Tier
// ============================================================================

/// Risk tier classification driving review strictness (§4.7/§4.8).
///
/// # Invariants
/// - Ordering is by declaration order: `T0` is highest risk, `T3` lowest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskTier {
    /// Highest risk tier; always requires human approval to publish.
    T0,
    /// High risk tier; always requires human approval to publish.
    T1,
    /// Medium risk tier; may be auto-approved under §4.7 policy.
    T2,
    /// Lowest risk tier; may be auto-approved under §4.7 policy.
    T3,
}

impl RiskTier {
    /// Returns true for the tiers that always require human `approved_by`
    /// before publication (§3: "PUBLISHED with riskTier in {T0, T1}
    /// requires non-null approvedBy").
    #[must_use]
    pub const fn always_requires_human_approval(self) -> bool {
        matches!(self, Self::T0 | Self::T1)
    }
}

// ============================================================================
// SECTION: Status
// ============================================================================

/// `Rule` lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleStatus {
    /// Composed, not yet reviewed.
    Draft,
    /// Approved by a human or the auto-approval policy (§4.7).
    Approved,
    /// Included in a Release.
    Published,
    /// Superseded or withdrawn.
    Deprecated,
    /// Rejected during review; never destructively deleted.
    Rejected,
}

impl RuleStatus {
    /// Returns true when moving from `self` to `to` is a legal DAG edge.
    ///
    /// The DAG is `Draft -> (Approved | Rejected)`, `Approved ->
    /// Published`, `Published -> Deprecated`, plus the controlled reversal
    /// `Published -> Approved` restricted to rollback context (§4.8), which
    /// callers must gate separately via [`Rule::can_rollback_to_approved`]
    /// rather than this general-purpose check.
    #[must_use]
    pub const fn can_transition(self, to: Self) -> bool {
        use RuleStatus::{Approved, Deprecated, Draft, Published, Rejected};
        matches!(
            (self, to),
            (Draft, Approved) | (Draft, Rejected) | (Approved, Published) | (Published, Deprecated) | (Published, Approved)
        )
    }
}

// ============================================================================
// SECTION: Rule
// ============================================================================

/// A published regulatory fact, derived from one or more backing
/// `CandidateFact`s.
///
/// # Invariants
/// - `Approved` or `Published` status requires at least one
///   `backing_candidate_fact_ids` entry — see [`Rule::has_backing_evidence`].
/// - `Published` with `risk_tier` in `{T0, T1}` requires `approved_by` to be
///   `Some` — see [`Rule::can_publish`].
/// - `effective_from <= effective_until` when both are present — see
///   [`Rule::effective_range_is_valid`].
/// - Status transitions follow [`RuleStatus::can_transition`]; a Rule is
///   never destructively deleted, only moved to `Deprecated`/`Rejected`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    /// Identifier for this Rule.
    pub id: RuleId,
    /// Regulatory concept this Rule is an instance of.
    pub concept_slug: ConceptSlug,
    /// Croatian-language title.
    pub title_hr: String,
    /// English-language title.
    pub title_en: String,
    /// Risk tier classification.
    pub risk_tier: RiskTier,
    /// Authority tier, derived as the maximum hierarchy tier among the
    /// sources backing `backing_candidate_fact_ids` (§4.6).
    pub authority_level: AuthorityLevel,
    /// Applies-When DSL expression, stored as raw JSON (§4.9); parse with
    /// [`crate::applies_when::parse_applies_when`].
    pub applies_when: serde_json::Value,
    /// Rule value; the concrete JSON shape follows `value_type`.
    pub value: serde_json::Value,
    /// Shape of `value`.
    pub value_type: ValueType,
    /// Date this Rule takes effect.
    pub effective_from: Date,
    /// Date this Rule stops applying, if bounded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effective_until: Option<Date>,
    /// Rule this one supersedes, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supersedes_id: Option<RuleId>,
    /// Lifecycle status.
    pub status: RuleStatus,
    /// Confidence in this Rule as composed.
    pub confidence: Confidence,
    /// Human approver, required for `Published` at `{T0, T1}`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved_by: Option<UserId>,
    /// CandidateFacts backing this Rule.
    pub backing_candidate_fact_ids: BTreeSet<CandidateFactId>,
}

impl Rule {
    /// Returns true when `backing_candidate_fact_ids` is non-empty, as
    /// required for `Approved`/`Published` status.
    #[must_use]
    pub fn has_backing_evidence(&self) -> bool {
        !self.backing_candidate_fact_ids.is_empty()
    }

    /// Returns true when `effective_from <= effective_until` (vacuously true
    /// when `effective_until` is `None`).
    #[must_use]
    pub fn effective_range_is_valid(&self) -> bool {
        self.effective_until.is_none_or(|until| self.effective_from <= until)
    }

    /// Returns true when this Rule may move to `Published`: `status` is
    /// currently `Approved`, it has backing evidence, its effective range is
    /// valid, and (if `risk_tier` requires it) `approved_by` is set.
    #[must_use]
    pub fn can_publish(&self) -> bool {
        self.status == RuleStatus::Approved
            && self.has_backing_evidence()
            && self.effective_range_is_valid()
            && (!self.risk_tier.always_requires_human_approval() || self.approved_by.is_some())
    }

    /// Returns true when a `Published -> Approved` rollback is legal in the
    /// rollback context (§4.8); non-rollback callers must not use this to
    /// justify the same transition.
    #[must_use]
    pub fn can_rollback_to_approved(&self) -> bool {
        self.status == RuleStatus::Published
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Month;

    fn draft() -> Rule {
        Rule {
            id: RuleId::new("rule-1"),
            concept_slug: ConceptSlug::new("vat-threshold"),
            title_hr: "Prag PDV-a".to_string(),
            title_en: "VAT threshold".to_string(),
            risk_tier: RiskTier::T1,
            authority_level: AuthorityLevel::Law,
            applies_when: serde_json::json!({"op": "true"}),
            value: serde_json::json!(40000),
            value_type: ValueType::Currency,
            effective_from: Date::from_calendar_date(2026, Month::January, 1).unwrap(),
            effective_until: None,
            supersedes_id: None,
            status: RuleStatus::Draft,
            confidence: Confidence::new(0.95).unwrap(),
            approved_by: None,
            backing_candidate_fact_ids: BTreeSet::from([CandidateFactId::new("cf-1")]),
        }
    }

    #[test]
    fn draft_to_approved_is_legal() {
        assert!(RuleStatus::Draft.can_transition(RuleStatus::Approved));
    }

    #[test]
    fn approved_to_draft_is_illegal() {
        assert!(!RuleStatus::Approved.can_transition(RuleStatus::Draft));
    }

    #[test]
    fn published_may_roll_back_to_approved() {
        assert!(RuleStatus::Published.can_transition(RuleStatus::Approved));
    }

    #[test]
    fn cannot_publish_t1_without_human_approval() {
        let mut rule = draft();
        rule.status = RuleStatus::Approved;
        assert!(!rule.can_publish());
        rule.approved_by = Some(UserId::new("reviewer-1"));
        assert!(rule.can_publish());
    }

    #[test]
    fn cannot_publish_without_backing_evidence() {
        let mut rule = draft();
        rule.status = RuleStatus::Approved;
        rule.approved_by = Some(UserId::new("reviewer-1"));
        rule.backing_candidate_fact_ids.clear();
        assert!(!rule.can_publish());
    }

    #[test]
    fn t3_may_publish_without_human_approval() {
        let mut rule = draft();
        rule.risk_tier = RiskTier::T3;
        rule.status = RuleStatus::Approved;
        assert!(rule.can_publish());
    }

    #[test]
    fn effective_range_rejects_until_before_from() {
        let mut rule = draft();
        rule.effective_until = Some(Date::from_calendar_date(2025, Month::January, 1).unwrap());
        assert!(!rule.effective_range_is_valid());
    }
}
