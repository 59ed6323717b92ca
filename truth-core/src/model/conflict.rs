// truth-core/src/model/conflict.rs
// ============================================================================
// Module: Conflict Entity
// Description: Detected source, rule, or authority disagreements (§3).
// Purpose: Enforce the null-FK rule for source-level conflicts and the
//          release-eligibility gate ("no OPEN conflicts").
// Dependencies: crate::identifiers, serde
// ============================================================================

//! ## Overview
//! `Conflict` rows are produced during review (C7) when two facts or rules
//! disagree. `SOURCE_CONFLICT` conflicts compare `CandidateFact`s rather than
//! `Rule`s, so `item_a_id`/`item_b_id` stay `None` and the conflicting
//! candidate ids live in `metadata` instead.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::identifiers::ConflictId;
use crate::identifiers::RuleId;

// ============================================================================
// SECTION: Kind / Resolution
// ============================================================================

/// Kind of disagreement a `Conflict` row records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictKind {
    /// Two `CandidateFact`s from different sources disagree.
    SourceConflict,
    /// Two `Rule`s disagree on the same concept/effective window.
    RuleConflict,
    /// Two `Rule`s backed by different authority tiers disagree.
    AuthorityConflict,
}

/// Lifecycle/resolution status of a `Conflict` row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictResolution {
    /// Unresolved; blocks release of any Rule it references.
    Open,
    /// Resolved by a reviewer/Arbiter decision.
    Resolved,
    /// Dismissed as not a genuine conflict.
    Dismissed,
}

// ============================================================================
// SECTION: Conflict
// ============================================================================

/// A detected disagreement between facts or rules.
///
/// # Invariants
/// - For `ConflictKind::SourceConflict`, `item_a_id` and `item_b_id` are
///   both `None`; the conflicting `CandidateFact` ids live in `metadata`.
/// - A Release may include a Rule only when none of its conflicts are
///   `ConflictResolution::Open` — see [`Conflict::blocks_release`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conflict {
    /// Identifier for this Conflict.
    pub id: ConflictId,
    /// Kind of disagreement.
    pub conflict_type: ConflictKind,
    /// First conflicting Rule, for `RuleConflict`/`AuthorityConflict`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_a_id: Option<RuleId>,
    /// Second conflicting Rule, for `RuleConflict`/`AuthorityConflict`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_b_id: Option<RuleId>,
    /// Resolution status.
    pub status: ConflictResolution,
    /// Human-readable description of the disagreement.
    pub description: String,
    /// Structured metadata; carries conflicting `CandidateFact` ids for
    /// `SourceConflict` rows.
    pub metadata: serde_json::Value,
}

impl Conflict {
    /// Returns true when this row's shape matches the `SOURCE_CONFLICT`
    /// null-FK invariant (both `item_a_id`/`item_b_id` absent for
    /// `ConflictKind::SourceConflict`, and at least one present otherwise).
    #[must_use]
    pub const fn shape_is_valid(&self) -> bool {
        match self.conflict_type {
            ConflictKind::SourceConflict => self.item_a_id.is_none() && self.item_b_id.is_none(),
            ConflictKind::RuleConflict | ConflictKind::AuthorityConflict => {
                self.item_a_id.is_some() || self.item_b_id.is_some()
            },
        }
    }

    /// Returns true when this Conflict blocks release of the Rules it
    /// references (i.e. it is still `Open`).
    #[must_use]
    pub const fn blocks_release(&self) -> bool {
        matches!(self.status, ConflictResolution::Open)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_conflict_with_null_fks_is_valid() {
        let conflict = Conflict {
            id: ConflictId::new("conf-1"),
            conflict_type: ConflictKind::SourceConflict,
            item_a_id: None,
            item_b_id: None,
            status: ConflictResolution::Open,
            description: "two sources disagree on the VAT threshold".to_string(),
            metadata: serde_json::json!({"candidate_fact_ids": ["cf-1", "cf-2"]}),
        };
        assert!(conflict.shape_is_valid());
    }

    #[test]
    fn source_conflict_with_rule_fk_is_invalid() {
        let conflict = Conflict {
            id: ConflictId::new("conf-2"),
            conflict_type: ConflictKind::SourceConflict,
            item_a_id: Some(RuleId::new("rule-1")),
            item_b_id: None,
            status: ConflictResolution::Open,
            description: "malformed".to_string(),
            metadata: serde_json::Value::Null,
        };
        assert!(!conflict.shape_is_valid());
    }

    #[test]
    fn open_conflict_blocks_release() {
        let conflict = Conflict {
            id: ConflictId::new("conf-3"),
            conflict_type: ConflictKind::RuleConflict,
            item_a_id: Some(RuleId::new("rule-1")),
            item_b_id: Some(RuleId::new("rule-2")),
            status: ConflictResolution::Open,
            description: "rules disagree".to_string(),
            metadata: serde_json::Value::Null,
        };
        assert!(conflict.blocks_release());
    }

    #[test]
    fn resolved_conflict_does_not_block_release() {
        let mut conflict = Conflict {
            id: ConflictId::new("conf-4"),
            conflict_type: ConflictKind::RuleConflict,
            item_a_id: Some(RuleId::new("rule-1")),
            item_b_id: Some(RuleId::new("rule-2")),
            status: ConflictResolution::Open,
            description: "rules disagree".to_string(),
            metadata: serde_json::Value::Null,
        };
        conflict.status = ConflictResolution::Resolved;
        assert!(!conflict.blocks_release());
    }
}
