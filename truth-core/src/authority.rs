// truth-core/src/authority.rs
// ============================================================================
// Module: Source Authority Hierarchy
// Description: Authority tiers backing Rules, and the "LAW authority" set
//              used by the evidence-strength release gate.
// Purpose: Resolve the Open Question left by spec.md §9 — the authority
//          hierarchy and the LAW-tier set were referenced but never
//          enumerated.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! §4.6 derives a Rule's `authorityLevel` as "the maximum hierarchy tier
//! among the sources backing the input CandidateFacts"; §4.8 gates
//! single-source rules on "LAW authority (the two top hierarchy tiers)".
//! This module fixes both: the ordered tier enum, and which tiers count as
//! LAW for the evidence-strength policy.
//!
//! Decision recorded in `DESIGN.md`: tiers follow the generic
//! constitution > law > regulation > guidance hierarchy named in the
//! glossary, since the regulatory domain ontology itself is out of scope
//! (§1) and no domain-specific hierarchy is supplied.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Authority Level
// ============================================================================

/// Authority tier backing a Rule, ordered from strongest to weakest.
///
/// # Invariants
/// - Ordering is by declaration order: `Constitution > Law > Regulation >
///   Guidance`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorityLevel {
    /// Guidance, circulars, non-binding interpretive notes.
    Guidance,
    /// Regulations and implementing rules issued under statutory authority.
    Regulation,
    /// Primary legislation (statute / act of law).
    Law,
    /// Constitutional provisions (highest tier).
    Constitution,
}

impl AuthorityLevel {
    /// Returns every tier ordered from weakest to strongest.
    #[must_use]
    pub const fn ascending() -> [Self; 4] {
        [Self::Guidance, Self::Regulation, Self::Law, Self::Constitution]
    }

    /// Returns the maximum (most authoritative) of two tiers.
    #[must_use]
    pub fn max(self, other: Self) -> Self {
        if self >= other { self } else { other }
    }

    /// Returns the maximum tier among a non-empty slice.
    ///
    /// Returns [`AuthorityLevel::Guidance`] for an empty slice — callers
    /// backing a Rule with zero sources is itself an invariant violation
    /// caught earlier (§3 Rule invariant), so this fallback is never
    /// reachable on a validated Rule.
    #[must_use]
    pub fn max_of(levels: &[Self]) -> Self {
        levels.iter().copied().fold(Self::Guidance, Self::max)
    }

    /// Returns true when this tier satisfies the evidence-strength
    /// "LAW authority" requirement (§4.8: "the two top hierarchy tiers").
    #[must_use]
    pub const fn is_law_tier(self) -> bool {
        matches!(self, Self::Law | Self::Constitution)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn law_tier_is_the_top_two() {
        assert!(!AuthorityLevel::Guidance.is_law_tier());
        assert!(!AuthorityLevel::Regulation.is_law_tier());
        assert!(AuthorityLevel::Law.is_law_tier());
        assert!(AuthorityLevel::Constitution.is_law_tier());
    }

    #[test]
    fn max_of_picks_highest_tier() {
        let levels = [AuthorityLevel::Guidance, AuthorityLevel::Law, AuthorityLevel::Regulation];
        assert_eq!(AuthorityLevel::max_of(&levels), AuthorityLevel::Law);
    }

    #[test]
    fn max_of_empty_defaults_to_guidance() {
        assert_eq!(AuthorityLevel::max_of(&[]), AuthorityLevel::Guidance);
    }

    #[test]
    fn ordering_is_constitution_highest() {
        assert!(AuthorityLevel::Constitution > AuthorityLevel::Law);
        assert!(AuthorityLevel::Law > AuthorityLevel::Regulation);
        assert!(AuthorityLevel::Regulation > AuthorityLevel::Guidance);
    }
}
