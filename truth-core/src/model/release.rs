// truth-core/src/model/release.rs
// ============================================================================
// Module: Release Entity
// Description: An immutable, versioned bundle of published Rules (§3).
// Purpose: Enforce strict version ordering, derive `release_type` rather
//          than accept it from an LLM, and compute the deterministic
//          content hash over ordered rule tuples.
// Dependencies: crate::hashing, crate::identifiers, serde, time
// ============================================================================

//! ## Overview
//! A `Release` is produced by the Releaser (C8). `version` is a strict
//! `major.minor.patch` triple; `release_type` is always derived from the
//! version delta against the previous release (§3: "derived, never from
//! LLM") via [`Release::derive_release_type`], never stored independently of
//! that derivation path.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use time::Date;
use time::OffsetDateTime;

use crate::hashing::HashAlgorithm;
use crate::hashing::HashDigest;
use crate::hashing::HashError;
use crate::hashing::hash_canonical_json;
use crate::identifiers::ReleaseId;
use crate::identifiers::RuleId;
use crate::identifiers::UserId;

// ============================================================================
// SECTION: Version
// ============================================================================

/// Strict `major.minor.patch` semantic version for a Release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Version {
    /// Major component; bumped for breaking rule changes.
    pub major: u32,
    /// Minor component; bumped for additive rule changes.
    pub minor: u32,
    /// Patch component; bumped for corrections with no scope change.
    pub patch: u32,
}

impl Version {
    /// The initial release version.
    pub const INITIAL: Self = Self { major: 0, minor: 1, patch: 0 };

    /// Returns the [`ReleaseType`] implied by moving from `self` to `next`,
    /// or `None` if `next` does not strictly increase.
    #[must_use]
    pub const fn delta_type(self, next: Self) -> Option<ReleaseType> {
        if next.major > self.major {
            Some(ReleaseType::Major)
        } else if next.major == self.major && next.minor > self.minor {
            Some(ReleaseType::Minor)
        } else if next.major == self.major && next.minor == self.minor && next.patch > self.patch {
            Some(ReleaseType::Patch)
        } else {
            None
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Derived release kind, computed from the version delta rather than
/// accepted as LLM output (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReleaseType {
    /// Breaking change to at least one rule's applicability/value shape.
    Major,
    /// Additive change (new rules, widened applicability).
    Minor,
    /// Correction with no scope change.
    Patch,
}

// ============================================================================
// SECTION: Audit Trail
// ============================================================================

/// Counters summarizing the evidentiary basis of a Release (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct AuditTrail {
    /// Number of distinct Evidence rows backing this Release.
    pub source_evidence_count: u64,
    /// Number of distinct CandidateFacts backing this Release.
    pub source_pointer_count: u64,
    /// Number of review passes performed across the included Rules.
    pub review_count: u64,
    /// Number of distinct human approvals recorded.
    pub human_approvals: u64,
}

// ============================================================================
// SECTION: Rule Content Tuple
// ============================================================================

/// The ordered, normalized projection of a Rule used to compute
/// [`Release::content_hash`] (§3: "deterministic hash over ordered
/// `{conceptSlug, appliesWhen, value, valueType, effectiveFrom,
/// effectiveUntil}` of contained rules, normalized dates").
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleContentTuple {
    /// Rule's concept slug.
    pub concept_slug: String,
    /// Rule's Applies-When DSL expression.
    pub applies_when: serde_json::Value,
    /// Rule's value.
    pub value: serde_json::Value,
    /// Rule's value type tag.
    pub value_type: serde_json::Value,
    /// Normalized (ISO 8601) effective-from date.
    pub effective_from: String,
    /// Normalized (ISO 8601) effective-until date, if bounded.
    pub effective_until: Option<String>,
}

// ============================================================================
// SECTION: Release
// ============================================================================

/// An immutable, versioned bundle of published Rules.
///
/// # Invariants
/// - `version` is strictly increasing by `released_at` across the release
///   history (repository concern, enforced via [`Version::delta_type`]).
/// - `content_hash` is deterministic and reproducible: recomputing it from
///   the same rule set and `rule_ids` ordering always yields the same
///   digest — see [`Release::compute_content_hash`].
/// - Exactly one Release may be `is_latest`; rollback may only target the
///   current latest Release (repository concern).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Release {
    /// Identifier for this Release.
    pub id: ReleaseId,
    /// Strict semantic version.
    pub version: Version,
    /// Derived release kind.
    pub release_type: ReleaseType,
    /// Timestamp this Release was cut.
    pub released_at: OffsetDateTime,
    /// Date this Release's rules take effect.
    pub effective_from: Date,
    /// Deterministic content hash over `rule_ids`' content tuples.
    pub content_hash: HashDigest,
    /// Human-readable changelog.
    pub changelog: String,
    /// Users who approved this Release.
    pub approved_by: Vec<UserId>,
    /// Evidentiary audit trail counters.
    pub audit_trail: AuditTrail,
    /// Rules included in this Release.
    pub rule_ids: BTreeSet<RuleId>,
    /// Whether this is the current latest Release.
    pub is_latest: bool,
}

impl Release {
    /// Computes the deterministic content hash for an ordered set of rule
    /// content tuples (§3). Callers order `tuples` by `RuleId` before
    /// calling this so the hash is reproducible regardless of in-memory
    /// iteration order.
    ///
    /// # Errors
    ///
    /// Returns [`HashError`] when canonical-JSON serialization fails.
    pub fn compute_content_hash(tuples: &[RuleContentTuple]) -> Result<HashDigest, HashError> {
        hash_canonical_json(HashAlgorithm::Sha256, tuples)
    }

    /// Returns true when `content_hash` is still consistent with the
    /// supplied rule content tuples.
    ///
    /// # Errors
    ///
    /// Returns [`HashError`] when canonical-JSON serialization fails.
    pub fn content_hash_is_valid(&self, tuples: &[RuleContentTuple]) -> Result<bool, HashError> {
        Ok(Self::compute_content_hash(tuples)? == self.content_hash)
    }

    /// Returns the ordering of this Release relative to `other` by version,
    /// i.e. the basis for the "strictly increasing by `released_at`"
    /// invariant.
    #[must_use]
    pub fn version_cmp(&self, other: &Self) -> Ordering {
        self.version.cmp(&other.version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delta_type_detects_major_bump() {
        let from = Version { major: 1, minor: 2, patch: 3 };
        let to = Version { major: 2, minor: 0, patch: 0 };
        assert_eq!(from.delta_type(to), Some(ReleaseType::Major));
    }

    #[test]
    fn delta_type_detects_patch_bump() {
        let from = Version { major: 1, minor: 2, patch: 3 };
        let to = Version { major: 1, minor: 2, patch: 4 };
        assert_eq!(from.delta_type(to), Some(ReleaseType::Patch));
    }

    #[test]
    fn delta_type_rejects_non_increasing_version() {
        let from = Version { major: 1, minor: 2, patch: 3 };
        assert_eq!(from.delta_type(from), None);
    }

    #[test]
    fn content_hash_is_deterministic_across_calls() {
        let tuples = vec![RuleContentTuple {
            concept_slug: "vat-threshold".to_string(),
            applies_when: serde_json::json!({"op": "true"}),
            value: serde_json::json!(40000),
            value_type: serde_json::json!("currency"),
            effective_from: "2026-01-01".to_string(),
            effective_until: None,
        }];
        let a = Release::compute_content_hash(&tuples).unwrap();
        let b = Release::compute_content_hash(&tuples).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn content_hash_changes_with_rule_set() {
        let tuples_a = vec![RuleContentTuple {
            concept_slug: "vat-threshold".to_string(),
            applies_when: serde_json::json!({"op": "true"}),
            value: serde_json::json!(40000),
            value_type: serde_json::json!("currency"),
            effective_from: "2026-01-01".to_string(),
            effective_until: None,
        }];
        let mut tuples_b = tuples_a.clone();
        tuples_b[0].value = serde_json::json!(50000);
        let a = Release::compute_content_hash(&tuples_a).unwrap();
        let b = Release::compute_content_hash(&tuples_b).unwrap();
        assert_ne!(a, b);
    }
}
