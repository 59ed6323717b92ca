// truth-watchdog/src/report.rs
// ============================================================================
// Module: Check Results
// Description: The outcome of a single §4.10 check, before it becomes a
//              persisted, deduplicated Alert.
// Purpose: Let every check module return a uniform shape so the watchdog
//          run loop can persist/notify/summarize them identically.
// Dependencies: truth-core
// ============================================================================

//! ## Overview
//! Every check in `crate::checks` returns zero or more [`CheckResult`]s
//! (one per entity it evaluates, e.g. one per source for the stale-source
//! check). `Watchdog::run_cadence` turns each into a persisted
//! [`truth_core::Alert`] via [`truth_core::AlertRepository::record_occurrence`]
//! when its status is not [`CheckStatus::Healthy`], and returns the full
//! set as a [`WatchdogReport`] for the CLI's `watchdog audit` to print.

use truth_core::AlertSeverity;

// ============================================================================
// SECTION: Check Status
// ============================================================================

/// Outcome of evaluating one check against one entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum CheckStatus {
    /// No alert; the checked entity is within bounds.
    Healthy,
    /// Crossed the WARN threshold.
    Warning,
    /// Crossed the CRITICAL threshold.
    Critical,
}

impl CheckStatus {
    /// Maps a `Warning`/`Critical` status to the shared [`AlertSeverity`]
    /// vocabulary; `Healthy` has no severity since it raises no alert.
    #[must_use]
    pub const fn severity(self) -> Option<AlertSeverity> {
        match self {
            Self::Healthy => None,
            Self::Warning => Some(AlertSeverity::Warning),
            Self::Critical => Some(AlertSeverity::Critical),
        }
    }

    /// Classifies a metric against a WARN/CRITICAL pair, where crossing
    /// CRITICAL implies crossing WARN (§4.10's every threshold pair is
    /// monotonic in this sense).
    #[must_use]
    pub fn from_thresholds(value: f64, warn_at: f64, critical_at: f64, higher_is_worse: bool) -> Self {
        if higher_is_worse {
            if value >= critical_at {
                Self::Critical
            } else if value >= warn_at {
                Self::Warning
            } else {
                Self::Healthy
            }
        } else if value <= critical_at {
            Self::Critical
        } else if value <= warn_at {
            Self::Warning
        } else {
            Self::Healthy
        }
    }
}

// ============================================================================
// SECTION: Check Result
// ============================================================================

/// One check's verdict for one entity (§4.10).
#[derive(Debug, Clone, PartialEq)]
pub struct CheckResult {
    /// Check identifier, used as `Alert::alert_type` (e.g.
    /// `"STALE_SOURCE"`, `"LLM_CIRCUIT_OPEN"`).
    pub alert_type: &'static str,
    /// Entity this verdict concerns (a source id, a queue name, a worker
    /// id, …), used as `Alert::entity_id`.
    pub entity_id: String,
    /// Verdict.
    pub status: CheckStatus,
    /// Human-readable detail, stored as `Alert::message`.
    pub message: String,
}

impl CheckResult {
    /// Builds a result, formatting `message` only when `status` is not
    /// [`CheckStatus::Healthy`] (callers still pass a message for the
    /// healthy case so `watchdog audit` can show a reason either way).
    #[must_use]
    pub fn new(alert_type: &'static str, entity_id: impl Into<String>, status: CheckStatus, message: impl Into<String>) -> Self {
        Self {
            alert_type,
            entity_id: entity_id.into(),
            status,
            message: message.into(),
        }
    }
}

// ============================================================================
// SECTION: Report
// ============================================================================

/// The full set of check results from one watchdog cadence run (§4.10).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WatchdogReport {
    /// Every check result produced this run, healthy or not.
    pub results: Vec<CheckResult>,
}

impl WatchdogReport {
    /// Returns every result that is not [`CheckStatus::Healthy`].
    #[must_use]
    pub fn alerting(&self) -> Vec<&CheckResult> {
        self.results.iter().filter(|result| result.status != CheckStatus::Healthy).collect()
    }

    /// Returns true when any result is [`CheckStatus::Critical`] (§6: "exit
    /// non-zero on hard-gate failure").
    #[must_use]
    pub fn has_critical(&self) -> bool {
        self.results.iter().any(|result| result.status == CheckStatus::Critical)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn higher_is_worse_classifies_in_order() {
        assert_eq!(CheckStatus::from_thresholds(0.1, 0.3, 0.5, true), CheckStatus::Healthy);
        assert_eq!(CheckStatus::from_thresholds(0.3, 0.3, 0.5, true), CheckStatus::Warning);
        assert_eq!(CheckStatus::from_thresholds(0.5, 0.3, 0.5, true), CheckStatus::Critical);
    }

    #[test]
    fn lower_is_worse_classifies_in_order() {
        assert_eq!(CheckStatus::from_thresholds(0.9, 0.85, 0.75, false), CheckStatus::Healthy);
        assert_eq!(CheckStatus::from_thresholds(0.8, 0.85, 0.75, false), CheckStatus::Warning);
        assert_eq!(CheckStatus::from_thresholds(0.7, 0.85, 0.75, false), CheckStatus::Critical);
    }

    #[test]
    fn report_has_critical_reflects_worst_result() {
        let report = WatchdogReport {
            results: vec![
                CheckResult::new("STALE_SOURCE", "src-1", CheckStatus::Warning, "7 days"),
                CheckResult::new("STALE_SOURCE", "src-2", CheckStatus::Critical, "14 days"),
            ],
        };
        assert!(report.has_critical());
        assert_eq!(report.alerting().len(), 2);
    }
}
