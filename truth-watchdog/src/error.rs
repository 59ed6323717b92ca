// truth-watchdog/src/error.rs
// ============================================================================
// Module: Watchdog Errors
// Description: Error taxonomy for cadence-run checks and notification.
// Purpose: One enum every check module and the run loop share, so
//          `Watchdog::run_cadence` can short-circuit on a genuine backend
//          failure while still letting individual thresholds fail "loud"
//          as ordinary [`crate::report::CheckResult`]s.
// Dependencies: thiserror, truth-core, truth-llm, truth-queue
// ============================================================================

use thiserror::Error;

/// Error surfaced while running a cadence check or dispatching a
/// notification.
#[derive(Debug, Error)]
pub enum WatchdogError {
    /// A repository call failed.
    #[error("repository error: {0}")]
    Repo(#[from] truth_core::RepoError),
    /// A queue call failed.
    #[error("queue error: {0}")]
    Queue(#[from] truth_queue::QueueError),
    /// The circuit breaker store failed.
    #[error("circuit breaker store error: {0}")]
    CircuitBreakerStore(#[from] truth_llm::CircuitBreakerStoreError),
    /// A notification failed to dispatch.
    #[error("notification dispatch failed: {0}")]
    Notify(String),
}
