// truth-capability/src/company.rs
// ============================================================================
// Module: Company Context Resolution
// Description: Resolves a user's default company membership and
//              permissions (§4.11 gate 3).
// Purpose: Narrow trait seam, matching `truth-pipeline::source_authority`'s
//          shape: the executor needs a lookup, not an implementation of
//          whatever membership/permission model the host application uses.
// Dependencies: truth-core
// ============================================================================

//! ## Overview
//! [`CompanyContextResolver`] answers "what company does this user act as,
//! by default, and with what permissions?" [`StaticCompanyContextResolver`]
//! is a fixed-map reference implementation for tests and small deployments.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;

use truth_core::CompanyId;
use truth_core::UserId;

// ============================================================================
// SECTION: Company Membership
// ============================================================================

/// A user's resolved company membership and the permissions it carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompanyMembership {
    /// The company the user is acting as.
    pub company_id: CompanyId,
    /// Permission strings granted to the user within this company.
    pub permissions: Vec<String>,
}

// ============================================================================
// SECTION: Resolver Trait
// ============================================================================

/// Resolves a user's default company membership (§4.11 gate 3).
pub trait CompanyContextResolver: Send + Sync {
    /// Returns the user's default company membership, or `None` when the
    /// user has no company context available.
    fn resolve_default_company(&self, user_id: &UserId) -> Option<CompanyMembership>;
}

// ============================================================================
// SECTION: Static Resolver
// ============================================================================

/// A [`CompanyContextResolver`] backed by a fixed map, set up once at
/// registration time.
#[derive(Debug, Clone, Default)]
pub struct StaticCompanyContextResolver {
    memberships: HashMap<UserId, CompanyMembership>,
}

impl StaticCompanyContextResolver {
    /// Builds an empty resolver; every user resolves to `None` until
    /// registered.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `user_id`'s default company membership, returning the
    /// resolver for chaining.
    #[must_use]
    pub fn with_membership(mut self, user_id: UserId, membership: CompanyMembership) -> Self {
        self.memberships.insert(user_id, membership);
        self
    }
}

impl CompanyContextResolver for StaticCompanyContextResolver {
    fn resolve_default_company(&self, user_id: &UserId) -> Option<CompanyMembership> {
        self.memberships.get(user_id).cloned()
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unregistered_user_has_no_company_context() {
        let resolver = StaticCompanyContextResolver::new();
        assert!(resolver.resolve_default_company(&UserId::new("u1")).is_none());
    }

    #[test]
    fn registered_user_resolves_to_its_membership() {
        let membership = CompanyMembership { company_id: CompanyId::new("c1"), permissions: vec!["invoices:write".to_owned()] };
        let resolver = StaticCompanyContextResolver::new().with_membership(UserId::new("u1"), membership.clone());
        assert_eq!(resolver.resolve_default_company(&UserId::new("u1")), Some(membership));
    }
}
