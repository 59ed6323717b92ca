// truth-watchdog/src/lib.rs
// ============================================================================
// Module: Truth Watchdog Library
// Description: Public API surface for the health monitors, progress gates,
//              and alert dispatch of C10 (§4.10).
// Purpose: Expose the threshold configuration, the per-check modules, the
//          report types, and the `Watchdog` orchestrator `truth-cli`'s
//          `watchdog run`/`watchdog audit` subcommands drive.
// Dependencies: crate::{drainer_stall, llm_health, notifier, progress_gates,
//              queue_backlog, quality_degradation, rejection_rate,
//              scraper_failure_rate, stale_source}
// ============================================================================

//! ## Overview
//! Each check lives in its own module and takes the repository/queue trait
//! objects it needs directly, so it can be unit tested against a hand-written
//! stub without touching the others. [`Watchdog`] is the only type that
//! wires them all together: it runs every check, persists non-healthy
//! results as deduplicated [`truth_core::Alert`]s, and fans critical ones
//! out through a [`Notifier`].

pub mod drainer_stall;
pub mod error;
pub mod llm_health;
pub mod notifier;
pub mod progress_gates;
pub mod queue_backlog;
pub mod quality_degradation;
pub mod rejection_rate;
pub mod report;
pub mod scraper_failure_rate;
pub mod stale_source;
pub mod thresholds;
pub mod watchdog;

pub use error::WatchdogError;
pub use llm_health::ProviderTarget;
pub use notifier::LogNotifier;
pub use notifier::Notifier;
pub use notifier::SlackNotifier;
pub use report::CheckResult;
pub use report::CheckStatus;
pub use report::WatchdogReport;
pub use thresholds::WatchdogThresholds;
pub use watchdog::Watchdog;
pub use watchdog::WatchdogTargets;
