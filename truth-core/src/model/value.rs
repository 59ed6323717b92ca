// truth-core/src/model/value.rs
// ============================================================================
// Module: Shared Value Types
// Description: Value-type tags, bounded confidence, and the domain allow-list
//              shared by CandidateFact and Rule (§3).
// Purpose: Avoid duplicating the confidence/value-type vocabulary across
//          entity modules.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! `ValueType` tags the shape of an extracted/ruled value without
//! constraining its representation: the value itself stays a `serde_json::Value`
//! on [`crate::model::CandidateFact`] and [`crate::model::Rule`] since the
//! regulatory domain ontology is out of scope (§1). `Confidence` is a bounded
//! `[0, 1]` newtype shared by both entities, and `Domain` enforces the
//! closed allow-list §3 requires for `CandidateFact.domain`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Value Type
// ============================================================================

/// Shape tag for an extracted or ruled value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    /// Monetary amount, currency unspecified at this layer.
    Currency,
    /// Percentage value.
    Percentage,
    /// Calendar date.
    Date,
    /// Numeric threshold (headcount, turnover band, etc).
    Threshold,
    /// Free-form text value.
    Text,
}

// ============================================================================
// SECTION: Confidence
// ============================================================================

/// Bounded confidence score in `[0.0, 1.0]`.
///
/// # Invariants
/// - `0.0 <= value <= 1.0`, enforced at construction; there is no public way
///   to construct an out-of-range `Confidence`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Confidence(f64);

/// Error returned when a confidence value falls outside `[0.0, 1.0]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfidenceRangeError {
    /// The out-of-range value that was rejected.
    pub rejected: f64,
}

impl fmt::Display for ConfidenceRangeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "confidence out of range [0,1]: {}", self.rejected)
    }
}

impl std::error::Error for ConfidenceRangeError {}

impl Confidence {
    /// Zero confidence.
    pub const ZERO: Self = Self(0.0);
    /// Full confidence.
    pub const ONE: Self = Self(1.0);

    /// Builds a confidence value, rejecting anything outside `[0.0, 1.0]` or
    /// non-finite.
    ///
    /// # Errors
    ///
    /// Returns [`ConfidenceRangeError`] when `value` is `NaN`, infinite, or
    /// outside `[0.0, 1.0]`.
    pub fn new(value: f64) -> Result<Self, ConfidenceRangeError> {
        if value.is_finite() && (0.0 ..= 1.0).contains(&value) {
            Ok(Self(value))
        } else {
            Err(ConfidenceRangeError { rejected: value })
        }
    }

    /// Returns the underlying `f64`.
    #[must_use]
    pub const fn value(self) -> f64 {
        self.0
    }
}

impl TryFrom<f64> for Confidence {
    type Error = ConfidenceRangeError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Confidence> for f64 {
    fn from(value: Confidence) -> Self {
        value.0
    }
}

// ============================================================================
// SECTION: Domain Allow-List
// ============================================================================

/// Closed allow-list of regulatory domains a `CandidateFact` may belong to.
///
/// The regulatory domain ontology itself is out of scope (§1); this list is
/// the minimal closed set needed to satisfy the §3 "domain (closed
/// allow-list)" invariant and is intentionally small. Decision recorded in
/// `DESIGN.md`.
pub const ALLOWED_DOMAINS: &[&str] = &[
    "taxation",
    "labor",
    "data_protection",
    "consumer_protection",
    "corporate_governance",
    "environmental",
    "financial_reporting",
    "anti_money_laundering",
];

/// Validated regulatory domain slug drawn from [`ALLOWED_DOMAINS`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Domain(String);

/// Error returned when a domain slug is not on [`ALLOWED_DOMAINS`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownDomainError {
    /// The rejected slug.
    pub slug: String,
}

impl fmt::Display for UnknownDomainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown domain: {}", self.slug)
    }
}

impl std::error::Error for UnknownDomainError {}

impl Domain {
    /// Parses a domain slug, rejecting anything not on [`ALLOWED_DOMAINS`].
    ///
    /// # Errors
    ///
    /// Returns [`UnknownDomainError`] when `slug` is not a member of
    /// [`ALLOWED_DOMAINS`].
    pub fn parse(slug: impl Into<String>) -> Result<Self, UnknownDomainError> {
        let slug = slug.into();
        if ALLOWED_DOMAINS.contains(&slug.as_str()) {
            Ok(Self(slug))
        } else {
            Err(UnknownDomainError { slug })
        }
    }

    /// Returns the domain slug as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Domain {
    type Error = UnknownDomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<Domain> for String {
    fn from(value: Domain) -> Self {
        value.0
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confidence_rejects_out_of_range() {
        assert!(Confidence::new(1.5).is_err());
        assert!(Confidence::new(-0.1).is_err());
        assert!(Confidence::new(f64::NAN).is_err());
    }

    #[test]
    fn confidence_accepts_bounds() {
        assert_eq!(Confidence::new(0.0).unwrap().value(), 0.0);
        assert_eq!(Confidence::new(1.0).unwrap().value(), 1.0);
    }

    #[test]
    fn domain_parse_accepts_allow_listed_slug() {
        assert!(Domain::parse("taxation").is_ok());
    }

    #[test]
    fn domain_parse_rejects_unknown_slug() {
        assert!(Domain::parse("astrology").is_err());
    }

    #[test]
    fn domain_round_trips_through_json() {
        let domain = Domain::parse("labor").unwrap();
        let json = serde_json::to_string(&domain).unwrap();
        assert_eq!(json, "\"labor\"");
        let back: Domain = serde_json::from_str(&json).unwrap();
        assert_eq!(back, domain);
    }
}
