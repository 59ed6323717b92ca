// truth-capability/src/capability.rs
// ============================================================================
// Module: Capability State Resolution
// Description: Resolves a capability's current state and available actions
//              for an optional target entity (§4.11 gate 4–5).
// Purpose: Keep "is this capability usable right now, and by which actions"
//          behind a trait the host application implements against its own
//          business rules, keeping "what a predicate means" separate from
//          "who supplies the answer".
// Dependencies: std::collections, truth-core
// ============================================================================

//! ## Overview
//! [`CapabilityStateResolver::resolve`] answers gate 4: is the capability
//! `Ready`, `Blocked` (with reasons), `Unauthorized`, or `MissingInputs` for
//! this `(capability_id, entity_id, entity_type)`? When `Ready`, its
//! [`ResolvedCapability::actions`] map answers gate 5: is this specific
//! `action_id` enabled.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use truth_core::ActionId;
use truth_core::CapabilityId;

// ============================================================================
// SECTION: Blocker
// ============================================================================

/// One reason a capability (or action) is currently blocked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blocker {
    /// Machine-readable blocker category (e.g. `"PERIOD_LOCKED"`).
    pub blocker_type: String,
    /// Human-readable explanation surfaced to the caller.
    pub message: String,
    /// Optional guidance on how to clear the blocker.
    pub resolution: Option<String>,
}

// ============================================================================
// SECTION: Capability State
// ============================================================================

/// The resolved state of a capability for a given target (§4.11 gate 4).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CapabilityState {
    /// The capability is usable; consult [`ResolvedCapability::actions`]
    /// for which specific actions are enabled.
    Ready,
    /// The capability is blocked by one or more business-rule reasons.
    Blocked {
        /// The blockers in effect, at least one.
        blockers: Vec<Blocker>,
    },
    /// The caller is not authorized to use this capability at all.
    Unauthorized,
    /// Inputs required to resolve the capability's state were not
    /// supplied (e.g. a required `entity_id`).
    MissingInputs,
}

// ============================================================================
// SECTION: Action Descriptor
// ============================================================================

/// Whether a single action under a capability is currently invokable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionDescriptor {
    /// Whether the action can be invoked right now.
    pub enabled: bool,
    /// Why the action is disabled, when `enabled` is false.
    pub disabled_reason: Option<String>,
}

impl ActionDescriptor {
    /// An action that is currently invokable.
    #[must_use]
    pub const fn enabled() -> Self {
        Self { enabled: true, disabled_reason: None }
    }

    /// An action disabled for the given reason.
    #[must_use]
    pub fn disabled(reason: impl Into<String>) -> Self {
        Self { enabled: false, disabled_reason: Some(reason.into()) }
    }
}

// ============================================================================
// SECTION: Resolved Capability
// ============================================================================

/// The full result of resolving a capability's state (§4.11 gate 4).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedCapability {
    /// The capability's current state.
    pub state: CapabilityState,
    /// Actions available under this capability, keyed by action id. Only
    /// consulted when `state` is [`CapabilityState::Ready`].
    pub actions: BTreeMap<ActionId, ActionDescriptor>,
}

impl ResolvedCapability {
    /// A ready capability with the given actions.
    #[must_use]
    pub fn ready(actions: BTreeMap<ActionId, ActionDescriptor>) -> Self {
        Self { state: CapabilityState::Ready, actions }
    }

    /// A blocked capability; `blockers` must not be empty for gate 4 to
    /// have a message to surface.
    #[must_use]
    pub fn blocked(blockers: Vec<Blocker>) -> Self {
        Self { state: CapabilityState::Blocked { blockers }, actions: BTreeMap::new() }
    }

    /// An unauthorized capability.
    #[must_use]
    pub fn unauthorized() -> Self {
        Self { state: CapabilityState::Unauthorized, actions: BTreeMap::new() }
    }

    /// A capability whose state could not be resolved for lack of inputs.
    #[must_use]
    pub fn missing_inputs() -> Self {
        Self { state: CapabilityState::MissingInputs, actions: BTreeMap::new() }
    }
}

// ============================================================================
// SECTION: Resolver Trait
// ============================================================================

/// Resolves a capability's state for an optional target entity.
pub trait CapabilityStateResolver: Send + Sync {
    /// Resolves `capability_id`'s state, optionally scoped to
    /// `(entity_id, entity_type)`.
    fn resolve(&self, capability_id: &CapabilityId, entity_id: Option<&str>, entity_type: Option<&str>) -> ResolvedCapability;
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocked_capability_carries_no_actions() {
        let resolved = ResolvedCapability::blocked(vec![Blocker {
            blocker_type: "PERIOD_LOCKED".to_owned(),
            message: "Accounting period is locked".to_owned(),
            resolution: Some("Contact administrator".to_owned()),
        }]);
        assert!(resolved.actions.is_empty());
        assert_eq!(resolved.state, CapabilityState::Blocked {
            blockers: vec![Blocker {
                blocker_type: "PERIOD_LOCKED".to_owned(),
                message: "Accounting period is locked".to_owned(),
                resolution: Some("Contact administrator".to_owned()),
            }],
        });
    }

    #[test]
    fn disabled_action_carries_its_reason() {
        let action = ActionDescriptor::disabled("Account already fiscalized");
        assert!(!action.enabled);
        assert_eq!(action.disabled_reason.as_deref(), Some("Account already fiscalized"));
    }
}
