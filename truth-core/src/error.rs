// truth-core/src/error.rs
// ============================================================================
// Module: Pipeline Error Taxonomy
// Description: Shared error codes surfaced at every component boundary.
// Purpose: Let every stage (queue, LLM runner, releaser, capability executor)
//          speak the same vocabulary instead of redefining error kinds.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! §7 defines a fixed set of error codes that cross component boundaries.
//! `PipelineError` carries them as a single enum with a stable `code()`
//! accessor so callers can match on the code without downcasting.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

// ============================================================================
// SECTION: Error Codes
// ============================================================================

/// Stable error code surfaced at component boundaries (§7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// No session, missing company context, or resolver returned unauthorized.
    Unauthorized,
    /// Input fails schema, required inputs missing, or a deterministic
    /// extraction validator failed.
    ValidationError,
    /// Handler registry miss, capability not registered, or unknown release
    /// version.
    NotFound,
    /// Capability resolved `BLOCKED` or the target action is disabled.
    CapabilityBlocked,
    /// Specialized blocker: an accounting/reporting period is locked.
    PeriodLocked,
    /// Specialized blocker: the target entity is immutable.
    EntityImmutable,
    /// Provider returned 429 or an equivalent rate-limit signal.
    RateLimited,
    /// Caught exception or unrecoverable failure after retries.
    InternalError,
}

impl ErrorCode {
    /// Returns the wire/log-stable string form of the code.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unauthorized => "UNAUTHORIZED",
            Self::ValidationError => "VALIDATION_ERROR",
            Self::NotFound => "NOT_FOUND",
            Self::CapabilityBlocked => "CAPABILITY_BLOCKED",
            Self::PeriodLocked => "PERIOD_LOCKED",
            Self::EntityImmutable => "ENTITY_IMMUTABLE",
            Self::RateLimited => "RATE_LIMITED",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Pipeline Error
// ============================================================================

/// Error surfaced at a component boundary, carrying a stable [`ErrorCode`].
#[derive(Debug, Error)]
#[error("{code}: {message}")]
pub struct PipelineError {
    /// Stable error code.
    pub code: ErrorCode,
    /// Human-readable message (safe for logs; must not include secrets).
    pub message: String,
    /// Optional structured details (e.g. blocker type/resolution).
    pub details: Option<serde_json::Value>,
}

impl PipelineError {
    /// Creates a new pipeline error with no structured details.
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    /// Creates a new pipeline error with structured details attached.
    #[must_use]
    pub fn with_details(
        code: ErrorCode,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            code,
            message: message.into(),
            details: Some(details),
        }
    }

    /// Shorthand for [`ErrorCode::Unauthorized`].
    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthorized, message)
    }

    /// Shorthand for [`ErrorCode::ValidationError`].
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ValidationError, message)
    }

    /// Shorthand for [`ErrorCode::NotFound`].
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    /// Shorthand for [`ErrorCode::InternalError`].
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_code_and_message() {
        let err = PipelineError::unauthorized("Authentication required");
        assert_eq!(err.to_string(), "UNAUTHORIZED: Authentication required");
    }
}
