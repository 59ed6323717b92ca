// truth-watchdog/src/thresholds.rs
// ============================================================================
// Module: Watchdog Thresholds
// Description: WARN/CRITICAL cutoffs for every cadence-run check (§4.10).
// Purpose: Keep every magic number from §4.10 in one place, with the
//          defaults the spec fixes; callers (the CLI, wired through
//          `truth-config`) override individual fields from `WATCHDOG_*`
//          environment variables.
// Dependencies: time
// ============================================================================

//! ## Overview
//! [`WatchdogThresholds::default`] matches §4.10 verbatim. Every check
//! module takes a `&WatchdogThresholds` rather than hardcoding its own
//! cutoffs, so a single struct literal captures the whole monitoring
//! policy.

use time::Duration;

// ============================================================================
// SECTION: Thresholds
// ============================================================================

/// WARN/CRITICAL cutoffs for every §4.10 cadence-run check.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WatchdogThresholds {
    /// Stale source: WARN at this many days since last Evidence.
    pub stale_source_warn_days: i64,
    /// Stale source: CRITICAL at this many days since last Evidence.
    pub stale_source_critical_days: i64,
    /// Scraper failure rate: WARN at this empty-content fraction.
    pub scraper_failure_rate_warn: f64,
    /// Scraper failure rate: CRITICAL at this empty-content fraction.
    pub scraper_failure_rate_critical: f64,
    /// Quality degradation: WARN below this mean confidence.
    pub quality_degradation_warn_confidence: f64,
    /// Quality degradation: CRITICAL below this mean confidence.
    pub quality_degradation_critical_confidence: f64,
    /// Rejection rate: WARN at or above this fraction.
    pub rejection_rate_warn: f64,
    /// Rejection rate: CRITICAL at or above this fraction.
    pub rejection_rate_critical: f64,
    /// Drainer stall: WARN at this many idle minutes.
    pub drainer_stall_warn_minutes: i64,
    /// Drainer stall: CRITICAL at this many idle minutes.
    pub drainer_stall_critical_minutes: i64,
    /// Queue backlog: WARN at this queue depth.
    pub queue_backlog_warn_depth: usize,
    /// Queue backlog: CRITICAL at this queue depth.
    pub queue_backlog_critical_depth: usize,
    /// Dead-letter depth: WARN at this depth.
    pub dead_letter_warn_depth: usize,
    /// Dead-letter depth: CRITICAL at this depth.
    pub dead_letter_critical_depth: usize,
    /// Progress gate: WARNING below this stalled-item count.
    pub progress_gate_warning_count: u64,
    /// Progress gate: CRITICAL at or above this stalled-item count.
    pub progress_gate_critical_count: u64,
    /// Progress gate 1 cutoff: Evidence fetched this long ago with no
    /// CandidateFacts counts as stalled.
    pub evidence_without_facts_after: Duration,
    /// Progress gate 2 cutoff: CandidateFact created this long ago with no
    /// Rule counts as stalled.
    pub fact_without_rule_after: Duration,
    /// Progress gate 3 cutoff: Rule APPROVED this long ago with no Release
    /// membership counts as stalled.
    pub rule_without_release_after: Duration,
    /// Lookback window for the scraper failure rate check (§4.10: "over
    /// 24h").
    pub scraper_failure_rate_window: Duration,
    /// Lookback window for quality degradation and rejection rate (§4.10:
    /// "over 7 days").
    pub trailing_window: Duration,
    /// Alert dedup window: repeat occurrences of the same `(type,
    /// entityId)` within this window fold into the existing row.
    pub alert_dedup_window: Duration,
}

impl Default for WatchdogThresholds {
    fn default() -> Self {
        Self {
            stale_source_warn_days: 7,
            stale_source_critical_days: 14,
            scraper_failure_rate_warn: 0.30,
            scraper_failure_rate_critical: 0.50,
            quality_degradation_warn_confidence: 0.85,
            quality_degradation_critical_confidence: 0.75,
            rejection_rate_warn: 0.40,
            rejection_rate_critical: 0.60,
            drainer_stall_warn_minutes: 15,
            drainer_stall_critical_minutes: 30,
            queue_backlog_warn_depth: 100,
            queue_backlog_critical_depth: 500,
            dead_letter_warn_depth: 10,
            dead_letter_critical_depth: 50,
            progress_gate_warning_count: 20,
            progress_gate_critical_count: 20,
            evidence_without_facts_after: Duration::hours(4),
            fact_without_rule_after: Duration::hours(6),
            rule_without_release_after: Duration::hours(24),
            scraper_failure_rate_window: Duration::hours(24),
            trailing_window: Duration::hours(24 * 7),
            alert_dedup_window: Duration::minutes(60),
        }
    }
}
