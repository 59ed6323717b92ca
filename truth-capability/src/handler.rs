// truth-capability/src/handler.rs
// ============================================================================
// Module: Handler Registry
// Description: Maps `(capabilityId, actionId)` to the business-action
//              handler that performs it (§4.11 gate 2, 6).
// Purpose: Route dispatch by a stable key rather than a match arm per
//          action, using a `BTreeMap<String, Box<dyn Trait + Send + Sync>>`
//          keyed lookup with policy enforcement ahead of it.
// Dependencies: std::collections, truth-core
// ============================================================================

//! ## Overview
//! An [`ActionHandler`] performs one `(capability_id, action_id)` action
//! given its resolved [`ActionContext`] and caller-supplied params. The
//! [`HandlerRegistry`] holds every registered handler; [`CapabilityExecutor`]
//! looks one up at gate 2 — a miss there is `NOT_FOUND`, not a handler
//! invocation that fails closed later.
//!
//! [`CapabilityExecutor`]: crate::executor::CapabilityExecutor

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use truth_core::ActionId;
use truth_core::CapabilityId;
use truth_core::CompanyId;
use truth_core::UserId;

// ============================================================================
// SECTION: Action Context
// ============================================================================

/// Resolved caller context passed to a handler (§4.11 gate 6).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionContext {
    /// The acting user.
    pub user_id: UserId,
    /// The company the user is acting as.
    pub company_id: CompanyId,
    /// The target entity id, when the action names one.
    pub entity_id: Option<String>,
    /// The target entity type, when the action names one.
    pub entity_type: Option<String>,
    /// Permissions granted to the user within `company_id`.
    pub permissions: Vec<String>,
}

// ============================================================================
// SECTION: Handler Trait
// ============================================================================

/// A business-action handler registered under one `(capability_id,
/// action_id)` pair.
///
/// A handler that fails returns `Err` with a human-readable message; the
/// executor wraps it as `INTERNAL_ERROR` (§4.11 gate 6: "catch exceptions
/// ... into the exception's message"). Handlers never panic — there is no
/// exception to catch in Rust, only `Result`.
pub trait ActionHandler: Send + Sync {
    /// Performs the action, returning its result payload or a failure
    /// message.
    fn invoke(&self, context: &ActionContext, params: serde_json::Value) -> Result<serde_json::Value, String>;
}

// ============================================================================
// SECTION: Registry
// ============================================================================

/// Key identifying one registered handler.
type HandlerKey = (CapabilityId, ActionId);

/// Routes `(capability_id, action_id)` to its registered handler.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: BTreeMap<HandlerKey, Box<dyn ActionHandler>>,
}

impl HandlerRegistry {
    /// Builds an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` under `(capability_id, action_id)`, replacing
    /// any previous registration for the same pair.
    pub fn register(&mut self, capability_id: CapabilityId, action_id: ActionId, handler: impl ActionHandler + 'static) {
        self.handlers.insert((capability_id, action_id), Box::new(handler));
    }

    /// Looks up the handler registered for `(capability_id, action_id)`.
    #[must_use]
    pub fn get(&self, capability_id: &CapabilityId, action_id: &ActionId) -> Option<&dyn ActionHandler> {
        self.handlers.get(&(capability_id.clone(), action_id.clone())).map(Box::as_ref)
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerRegistry").field("registered", &self.handlers.len()).finish()
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo;

    impl ActionHandler for Echo {
        fn invoke(&self, _context: &ActionContext, params: serde_json::Value) -> Result<serde_json::Value, String> {
            Ok(params)
        }
    }

    #[test]
    fn unregistered_pair_misses() {
        let registry = HandlerRegistry::new();
        assert!(registry.get(&CapabilityId::new("invoicing"), &ActionId::new("fiscalize")).is_none());
    }

    #[test]
    fn registered_pair_resolves_its_handler() {
        let mut registry = HandlerRegistry::new();
        registry.register(CapabilityId::new("invoicing"), ActionId::new("fiscalize"), Echo);
        assert!(registry.get(&CapabilityId::new("invoicing"), &ActionId::new("fiscalize")).is_some());
    }
}
