// truth-core/src/identifiers.rs
// ============================================================================
// Module: Pipeline Identifiers
// Description: Canonical opaque identifiers for every §3 entity.
// Purpose: Provide strongly typed, serializable IDs with stable string forms.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Identifiers are opaque newtypes over `String`. Validation (uniqueness,
//! referential integrity) is handled at the repository and gate boundaries,
//! not inside these wrappers.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Identifier Macro
// ============================================================================

macro_rules! opaque_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Returns the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self::new(value)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self::new(value)
            }
        }
    };
}

opaque_id!(
    /// Identifier for a registered external source (host registration).
    SourceId
);
opaque_id!(
    /// Identifier for a captured Evidence row.
    EvidenceId
);
opaque_id!(
    /// Identifier for an extracted CandidateFact (legacy: SourcePointer).
    CandidateFactId
);
opaque_id!(
    /// Identifier for a Rule.
    RuleId
);
opaque_id!(
    /// Identifier for a Conflict.
    ConflictId
);
opaque_id!(
    /// Identifier for a Release.
    ReleaseId
);
opaque_id!(
    /// Identifier for an AgentRun (one row per LLM invocation).
    AgentRunId
);
opaque_id!(
    /// Identifier for a regulatory concept (upserted by the Composer).
    ConceptSlug
);
opaque_id!(
    /// Identifier for a registered evidence provider (`http`, `ollama`, …).
    ProviderId
);
opaque_id!(
    /// Identifier for a queue job.
    JobId
);
opaque_id!(
    /// Identifier correlating a pipeline run across stages and AgentRuns.
    RunId
);
opaque_id!(
    /// Identifier for a user (session subject, approver, capability caller).
    UserId
);
opaque_id!(
    /// Identifier for a company/tenant context resolved for capability checks.
    CompanyId
);
opaque_id!(
    /// Identifier for a registered capability.
    CapabilityId
);
opaque_id!(
    /// Identifier for an action within a capability.
    ActionId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifier_round_trips_through_json() {
        let id = EvidenceId::new("ev-1");
        let json = serde_json::to_string(&id).expect("serialize");
        assert_eq!(json, "\"ev-1\"");
        let back: EvidenceId = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, id);
    }

    #[test]
    fn identifier_displays_as_raw_string() {
        let id = RuleId::from("rule-42");
        assert_eq!(id.to_string(), "rule-42");
        assert_eq!(id.as_str(), "rule-42");
    }
}
