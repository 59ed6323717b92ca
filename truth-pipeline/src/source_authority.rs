// truth-pipeline/src/source_authority.rs
// ============================================================================
// Module: Source Authority Resolution
// Description: Maps a registered source to its authority tier (§4.6 step 5).
// Purpose: truth-core models `AuthorityLevel` but no entity carries it —
//          Evidence and CandidateFact name a `SourceId`/`EvidenceId` but not
//          a hierarchy tier. The Composer's authority derivation and the
//          Arbiter's tie-break both need that lookup, so it is specified
//          here as a narrow trait rather than widening `Evidence` or
//          `CandidateFact` with a field neither entity's invariants need.
//          Decision recorded in `DESIGN.md`.
// Dependencies: truth-core
// ============================================================================

//! ## Overview
//! [`SourceAuthorityResolver`] is the seam between a registered source and
//! the §3 authority hierarchy. [`StaticSourceAuthorityResolver`] is the
//! reference implementation: a fixed map populated at construction, falling
//! back to [`truth_core::AuthorityLevel::Guidance`] — the weakest tier —
//! for any source it was not told about, so an unregistered source can never
//! be mistaken for a stronger one than it is.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;

use truth_core::AuthorityLevel;
use truth_core::SourceId;

// ============================================================================
// SECTION: Resolver Trait
// ============================================================================

/// Resolves the authority tier a registered source carries.
pub trait SourceAuthorityResolver: Send + Sync {
    /// Returns the authority tier for `source_id`.
    fn authority_for(&self, source_id: &SourceId) -> AuthorityLevel;
}

// ============================================================================
// SECTION: Static Resolver
// ============================================================================

/// A [`SourceAuthorityResolver`] backed by a fixed map, set up once at
/// registration time.
#[derive(Debug, Clone, Default)]
pub struct StaticSourceAuthorityResolver {
    tiers: HashMap<SourceId, AuthorityLevel>,
}

impl StaticSourceAuthorityResolver {
    /// Builds an empty resolver; every source falls back to
    /// [`AuthorityLevel::Guidance`] until registered.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `source_id`'s authority tier, returning the resolver for
    /// chaining.
    #[must_use]
    pub fn with_source(mut self, source_id: SourceId, tier: AuthorityLevel) -> Self {
        self.tiers.insert(source_id, tier);
        self
    }
}

impl SourceAuthorityResolver for StaticSourceAuthorityResolver {
    fn authority_for(&self, source_id: &SourceId) -> AuthorityLevel {
        self.tiers.get(source_id).copied().unwrap_or(AuthorityLevel::Guidance)
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unregistered_source_defaults_to_weakest_tier() {
        let resolver = StaticSourceAuthorityResolver::new();
        assert_eq!(resolver.authority_for(&SourceId::new("unknown")), AuthorityLevel::Guidance);
    }

    #[test]
    fn registered_source_returns_its_tier() {
        let resolver =
            StaticSourceAuthorityResolver::new().with_source(SourceId::new("official-gazette"), AuthorityLevel::Law);
        assert_eq!(resolver.authority_for(&SourceId::new("official-gazette")), AuthorityLevel::Law);
    }
}
