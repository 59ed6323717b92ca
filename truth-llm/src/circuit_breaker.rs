// truth-llm/src/circuit_breaker.rs
// ============================================================================
// Module: Circuit Breakers (C9)
// Description: Per-provider CLOSED/OPEN/HALF_OPEN state machine (§4.7).
// Purpose: Shared by the LLM runner (C3) and the watchdog (C10) health
//          checks; persisted through a small store trait rather than a
//          concrete backend, matching the repository-boundary pattern C1
//          uses for every other piece of durable state.
// Dependencies: thiserror, time
// ============================================================================

//! ## Overview
//! §4.7 verbatim: opens after 5 consecutive failures inside a 120 s window,
//! stays `OPEN` for 300 s, then lazily reports `HALF_OPEN` on the next
//! `canCall`/`refresh` check. State is a plain, `Copy`-friendly struct so a
//! [`CircuitBreakerStore`] implementation can persist it as a single row
//! without any circuit-breaker-specific schema logic leaking into this
//! crate.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;
use time::Duration;
use time::OffsetDateTime;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Consecutive failures required to open the circuit (§4.7).
pub const FAILURE_THRESHOLD: u32 = 5;
/// Window, in seconds, within which failures accumulate toward the
/// threshold; a success or a gap longer than this resets the counter.
pub const FAILURE_WINDOW: Duration = Duration::seconds(120);
/// How long the circuit stays `OPEN` before a lazy check reports
/// `HALF_OPEN`.
pub const OPEN_DURATION: Duration = Duration::seconds(300);
/// TTL applied to persisted circuit-breaker rows (§4.7: "shared KV with TTL
/// 3,600 s").
pub const STATE_TTL: Duration = Duration::seconds(3_600);

// ============================================================================
// SECTION: State
// ============================================================================

/// Circuit state (§4.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Calls are allowed.
    Closed,
    /// Calls are blocked.
    Open,
    /// A single probe call is allowed.
    HalfOpen,
}

/// Persisted per-provider circuit-breaker record.
#[derive(Debug, Clone, PartialEq)]
pub struct CircuitBreakerRecord {
    /// Provider this record tracks.
    pub provider_id: String,
    /// Current state, as of `as_of`.
    pub state: CircuitState,
    /// Consecutive failures recorded since the last success or window
    /// reset.
    pub consecutive_failures: u32,
    /// Timestamp of the most recent recorded failure.
    pub last_failure_at: Option<OffsetDateTime>,
    /// Timestamp of the most recent recorded success.
    pub last_success_at: Option<OffsetDateTime>,
    /// Timestamp the circuit most recently opened.
    pub opened_at: Option<OffsetDateTime>,
    /// Most recent error message, when the last recorded event was a
    /// failure.
    pub last_error: Option<String>,
}

impl CircuitBreakerRecord {
    /// Builds a fresh `CLOSED` record for `provider_id` with no history.
    #[must_use]
    pub fn closed(provider_id: impl Into<String>) -> Self {
        Self {
            provider_id: provider_id.into(),
            state: CircuitState::Closed,
            consecutive_failures: 0,
            last_failure_at: None,
            last_success_at: None,
            opened_at: None,
            last_error: None,
        }
    }

    /// Re-evaluates `state` against `now`, lazily transitioning
    /// `OPEN → HALF_OPEN` once [`OPEN_DURATION`] has elapsed (§4.7: "OPEN →
    /// HALF_OPEN on getState when now - openedAt ≥ 300 s"). Does not mutate
    /// any other field.
    #[must_use]
    pub fn refreshed(mut self, now: OffsetDateTime) -> Self {
        if self.state == CircuitState::Open {
            if let Some(opened_at) = self.opened_at {
                if now - opened_at >= OPEN_DURATION {
                    self.state = CircuitState::HalfOpen;
                }
            }
        }
        self
    }

    /// Whether a call may currently be attempted (§4.7: "canCall returns
    /// true for CLOSED and HALF_OPEN").
    #[must_use]
    pub fn can_call(&self, now: OffsetDateTime) -> bool {
        !matches!(self.refreshed(now).state, CircuitState::Open)
    }

    /// Records a successful call (§4.7: "CLOSED/HALF_OPEN → CLOSED on
    /// recorded success").
    #[must_use]
    pub fn record_success(self, now: OffsetDateTime) -> Self {
        Self {
            state: CircuitState::Closed,
            consecutive_failures: 0,
            last_success_at: Some(now),
            opened_at: None,
            last_error: None,
            ..self
        }
    }

    /// Records a failed call (§4.7: window reset, threshold trip,
    /// `HALF_OPEN → OPEN`).
    #[must_use]
    pub fn record_failure(self, now: OffsetDateTime, error: impl Into<String>) -> Self {
        let refreshed = self.refreshed(now);
        let within_window = refreshed
            .last_failure_at
            .is_some_and(|last| now - last <= FAILURE_WINDOW);
        let consecutive_failures = if within_window { refreshed.consecutive_failures + 1 } else { 1 };

        let next_state = if refreshed.state == CircuitState::HalfOpen {
            CircuitState::Open
        } else if consecutive_failures >= FAILURE_THRESHOLD {
            CircuitState::Open
        } else {
            CircuitState::Closed
        };

        let opened_at = if next_state == CircuitState::Open { Some(now) } else { refreshed.opened_at };

        Self {
            state: next_state,
            consecutive_failures,
            last_failure_at: Some(now),
            opened_at,
            last_error: Some(error.into()),
            ..refreshed
        }
    }

    /// Whether a record persisted at `as_of` has outlived [`STATE_TTL`] as
    /// of `now`, and must be treated as corrupt/expired (§4.7: "Corrupt
    /// persisted state is discarded and the provider reinitialized to
    /// CLOSED").
    #[must_use]
    pub fn is_expired(&self, now: OffsetDateTime, as_of: OffsetDateTime) -> bool {
        now - as_of > STATE_TTL
    }
}

// ============================================================================
// SECTION: Store Trait
// ============================================================================

/// Error surfaced by a [`CircuitBreakerStore`] implementation.
#[derive(Debug, Error)]
#[error("circuit breaker store error: {0}")]
pub struct CircuitBreakerStoreError(pub String);

/// Persists [`CircuitBreakerRecord`] rows keyed by provider id.
pub trait CircuitBreakerStore: Send + Sync {
    /// Loads the record for `provider_id`, along with the timestamp it was
    /// last persisted (used for TTL expiry), if one exists.
    ///
    /// # Errors
    ///
    /// Returns [`CircuitBreakerStoreError`] on backend failure.
    fn load(&self, provider_id: &str) -> Result<Option<(CircuitBreakerRecord, OffsetDateTime)>, CircuitBreakerStoreError>;

    /// Persists `record`, stamped with the current time.
    ///
    /// # Errors
    ///
    /// Returns [`CircuitBreakerStoreError`] on backend failure.
    fn save(&self, record: &CircuitBreakerRecord, now: OffsetDateTime) -> Result<(), CircuitBreakerStoreError>;
}

/// Loads `provider_id`'s record, discarding and reinitializing it to
/// `CLOSED` when absent or TTL-expired (§4.7).
///
/// # Errors
///
/// Returns [`CircuitBreakerStoreError`] on backend failure.
pub fn load_or_init(
    store: &dyn CircuitBreakerStore,
    provider_id: &str,
    now: OffsetDateTime,
) -> Result<CircuitBreakerRecord, CircuitBreakerStoreError> {
    match store.load(provider_id)? {
        Some((record, as_of)) if !record.is_expired(now, as_of) => Ok(record.refreshed(now)),
        _ => Ok(CircuitBreakerRecord::closed(provider_id)),
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use time::OffsetDateTime;

    use super::CircuitBreakerRecord;
    use super::CircuitState;
    use super::FAILURE_THRESHOLD;

    fn epoch(seconds: i64) -> OffsetDateTime {
        OffsetDateTime::from_unix_timestamp(seconds).expect("valid timestamp")
    }

    #[test]
    fn opens_after_five_consecutive_failures_within_window() {
        let mut record = CircuitBreakerRecord::closed("ollama");
        for i in 0..FAILURE_THRESHOLD {
            record = record.record_failure(epoch(i64::from(i) * 10), "boom");
        }
        assert_eq!(record.state, CircuitState::Open);
        assert_eq!(record.consecutive_failures, FAILURE_THRESHOLD);
    }

    #[test]
    fn does_not_open_before_five_failures() {
        let mut record = CircuitBreakerRecord::closed("ollama");
        for i in 0..FAILURE_THRESHOLD - 1 {
            record = record.record_failure(epoch(i64::from(i) * 10), "boom");
        }
        assert_eq!(record.state, CircuitState::Closed);
    }

    #[test]
    fn gap_longer_than_window_resets_the_counter() {
        let mut record = CircuitBreakerRecord::closed("ollama");
        record = record.record_failure(epoch(0), "boom");
        record = record.record_failure(epoch(10), "boom");
        record = record.record_failure(epoch(500), "boom");
        assert_eq!(record.consecutive_failures, 1);
    }

    #[test]
    fn open_transitions_to_half_open_after_the_duration_elapses() {
        let mut record = CircuitBreakerRecord::closed("ollama");
        for i in 0..FAILURE_THRESHOLD {
            record = record.record_failure(epoch(i64::from(i) * 10), "boom");
        }
        let opened_at = record.opened_at.expect("circuit is open");
        assert!(!record.can_call(opened_at + time::Duration::seconds(299)));
        assert!(record.can_call(opened_at + time::Duration::seconds(301)));
    }

    #[test]
    fn success_closes_the_circuit_and_clears_the_counter() {
        let mut record = CircuitBreakerRecord::closed("ollama");
        for i in 0..FAILURE_THRESHOLD {
            record = record.record_failure(epoch(i64::from(i) * 10), "boom");
        }
        let opened_at = record.opened_at.expect("circuit is open");
        let half_open_at = opened_at + time::Duration::seconds(301);
        let probe = record.refreshed(half_open_at);
        assert_eq!(probe.state, CircuitState::HalfOpen);
        let closed = probe.record_success(half_open_at);
        assert_eq!(closed.state, CircuitState::Closed);
        assert_eq!(closed.consecutive_failures, 0);
    }

    #[test]
    fn failure_in_half_open_reopens_with_refreshed_opened_at() {
        let mut record = CircuitBreakerRecord::closed("ollama");
        for i in 0..FAILURE_THRESHOLD {
            record = record.record_failure(epoch(i64::from(i) * 10), "boom");
        }
        let opened_at = record.opened_at.expect("circuit is open");
        let half_open_at = opened_at + time::Duration::seconds(301);
        let reopened = record.record_failure(half_open_at, "still down");
        assert_eq!(reopened.state, CircuitState::Open);
        assert_eq!(reopened.opened_at, Some(half_open_at));
    }
}
