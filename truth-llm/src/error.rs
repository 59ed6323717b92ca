// truth-llm/src/error.rs
// ============================================================================
// Module: LLM Runner Errors
// Description: Error taxonomy for the LLM runner and its transport (§4.2).
// Purpose: Classify failures into retryable/non-retryable and rate-limited/
//          general so the runner can drive backoff and circuit-breaker
//          recording without re-deriving classification at each call site.
// Dependencies: thiserror, truth_queue::FailureClass
// ============================================================================

//! ## Overview
//! [`TransportError`] is what a [`crate::transport::LlmTransport`] reports;
//! [`RunnerError`] is what [`crate::runner::LlmRunner::run`] can return after
//! retries are exhausted. Both know how to classify themselves into a
//! [`truth_queue::FailureClass`] for backoff purposes.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;
use truth_queue::FailureClass;

// ============================================================================
// SECTION: Transport Error
// ============================================================================

/// Failure reported by an [`crate::transport::LlmTransport`] implementation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The request timed out.
    #[error("request timed out")]
    Timeout,
    /// DNS resolution failed.
    #[error("dns resolution failed: {0}")]
    Dns(String),
    /// The provider rejected credentials.
    #[error("authentication failed")]
    Auth,
    /// The provider returned a 5xx response.
    #[error("server error: status {0}")]
    ServerError(u16),
    /// The provider returned a 429 or equivalent rate-limit signal.
    #[error("rate limited")]
    RateLimited,
    /// Any other network-level failure.
    #[error("network error: {0}")]
    Network(String),
    /// A response was received but could not be understood.
    #[error("unknown transport failure: {0}")]
    Unknown(String),
}

impl TransportError {
    /// Classifies this failure for backoff purposes (§4.2 step 8: "classify
    /// the error (rate-limited vs general)").
    #[must_use]
    pub const fn failure_class(&self) -> FailureClass {
        match self {
            Self::RateLimited => FailureClass::RateLimited,
            Self::Timeout | Self::Dns(_) | Self::Auth | Self::ServerError(_) | Self::Network(_) | Self::Unknown(_) => {
                FailureClass::General
            }
        }
    }
}

// ============================================================================
// SECTION: Health Classification
// ============================================================================

/// Classification of an LLM provider health probe (§4.10: "a ping... `{OK,
/// TIMEOUT, DNS, AUTH, 5XX, RATE_LIMIT, UNKNOWN}`").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthStatus {
    /// The probe succeeded.
    Ok,
    /// The probe timed out.
    Timeout,
    /// DNS resolution failed.
    Dns,
    /// Authentication failed.
    Auth,
    /// A 5xx response was returned.
    ServerError,
    /// A 429 or equivalent rate-limit signal was returned.
    RateLimit,
    /// Any other failure.
    Unknown,
}

impl HealthStatus {
    /// Returns true when this status represents a successful probe.
    #[must_use]
    pub const fn is_ok(self) -> bool {
        matches!(self, Self::Ok)
    }
}

impl From<&TransportError> for HealthStatus {
    fn from(error: &TransportError) -> Self {
        match error {
            TransportError::Timeout => Self::Timeout,
            TransportError::Dns(_) => Self::Dns,
            TransportError::Auth => Self::Auth,
            TransportError::ServerError(_) => Self::ServerError,
            TransportError::RateLimited => Self::RateLimit,
            TransportError::Network(_) | TransportError::Unknown(_) => Self::Unknown,
        }
    }
}

// ============================================================================
// SECTION: Runner Error
// ============================================================================

/// Failure surfaced by [`crate::runner::LlmRunner::run`] once retries are
/// exhausted or a non-retryable precondition fails.
#[derive(Debug, Error)]
pub enum RunnerError {
    /// Input failed schema validation before any call was made (§4.2 step 1).
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// The provider's circuit breaker is `OPEN` (§4.2 step 3).
    #[error("circuit open for provider {0}")]
    CircuitOpen(String),
    /// All retry attempts were exhausted.
    #[error("retries exhausted: {0}")]
    RetriesExhausted(String),
}
