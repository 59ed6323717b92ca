// truth-core/src/model/outcome.rs
// ============================================================================
// Module: Outcome Entity
// Description: The result classification of a pipeline stage invocation (§3).
// Purpose: Enforce `outcome == SUCCESS_APPLIED <=> itemsProduced > 0` by
//          construction, silently coercing mismatches to SUCCESS_NO_CHANGE.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! §3's hard invariant — `outcome = SUCCESS_APPLIED` if and only if
//! `itemsProduced > 0` — is enforced in [`Outcome::new`] rather than
//! validated after the fact: a caller claiming `SuccessApplied` with zero
//! items produced is silently coerced to `SuccessNoChange` with a captured
//! `no_change_code`, never rejected outright.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Status
// ============================================================================

/// Result classification of a pipeline stage invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    /// The invocation produced at least one item.
    SuccessApplied,
    /// The invocation succeeded but produced nothing new.
    SuccessNoChange,
    /// The invocation failed.
    Failure,
    /// The invocation partially succeeded.
    Partial,
}

/// Default code recorded when [`Outcome::new`] coerces a claimed
/// `SuccessApplied` with zero items down to `SuccessNoChange`.
const DEFAULT_NO_CHANGE_CODE: &str = "NO_ITEMS_PRODUCED";

// ============================================================================
// SECTION: Outcome
// ============================================================================

/// The result of a pipeline stage invocation.
///
/// # Invariants
/// - `status == SuccessApplied` if and only if `items_produced > 0`; see
///   [`Outcome::new`], the only public constructor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    /// Result classification.
    pub status: OutcomeStatus,
    /// Count of items the invocation produced.
    pub items_produced: u64,
    /// Code explaining why no change occurred, present whenever `status ==
    /// SuccessNoChange`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub no_change_code: Option<String>,
}

impl Outcome {
    /// Builds an `Outcome`, coercing `status == SuccessApplied` with
    /// `items_produced == 0` down to `SuccessNoChange` and recording
    /// `no_change_code` (falling back to [`DEFAULT_NO_CHANGE_CODE`] when the
    /// caller did not supply one).
    #[must_use]
    pub fn new(status: OutcomeStatus, items_produced: u64, no_change_code: Option<String>) -> Self {
        if matches!(status, OutcomeStatus::SuccessApplied) && items_produced == 0 {
            return Self {
                status: OutcomeStatus::SuccessNoChange,
                items_produced: 0,
                no_change_code: Some(no_change_code.unwrap_or_else(|| DEFAULT_NO_CHANGE_CODE.to_string())),
            };
        }
        Self { status, items_produced, no_change_code }
    }

    /// Shorthand for a `Failure` outcome.
    #[must_use]
    pub const fn failure() -> Self {
        Self { status: OutcomeStatus::Failure, items_produced: 0, no_change_code: None }
    }

    /// Shorthand for a `Partial` outcome with the given item count.
    #[must_use]
    pub const fn partial(items_produced: u64) -> Self {
        Self { status: OutcomeStatus::Partial, items_produced, no_change_code: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_applied_with_items_stays_applied() {
        let outcome = Outcome::new(OutcomeStatus::SuccessApplied, 3, None);
        assert_eq!(outcome.status, OutcomeStatus::SuccessApplied);
        assert_eq!(outcome.items_produced, 3);
    }

    #[test]
    fn success_applied_with_zero_items_coerces_to_no_change() {
        let outcome = Outcome::new(OutcomeStatus::SuccessApplied, 0, None);
        assert_eq!(outcome.status, OutcomeStatus::SuccessNoChange);
        assert_eq!(outcome.no_change_code.as_deref(), Some(DEFAULT_NO_CHANGE_CODE));
    }

    #[test]
    fn success_applied_with_zero_items_preserves_supplied_code() {
        let outcome = Outcome::new(OutcomeStatus::SuccessApplied, 0, Some("ALL_DUPLICATES".to_string()));
        assert_eq!(outcome.no_change_code.as_deref(), Some("ALL_DUPLICATES"));
    }

    #[test]
    fn failure_shorthand_has_zero_items() {
        assert_eq!(Outcome::failure().items_produced, 0);
    }
}
