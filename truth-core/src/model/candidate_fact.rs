// truth-core/src/model/candidate_fact.rs
// ============================================================================
// Module: CandidateFact Entity
// Description: Extracted, quote-grounded facts awaiting review (§3).
// Purpose: Enforce the grounding-quote containment invariant and the
//          CAPTURED -> REVIEWED -> PROMOTED|REJECTED status lifecycle.
// Dependencies: crate::identifiers, crate::model::value, crate::quote_normalize, serde
// ============================================================================

//! ## Overview
//! `CandidateFact` (legacy name: SourcePointer) is produced by the Extractor
//! (C5) and is read-only except for `status` transitions. Every grounding
//! quote must, after quote normalization (§4.5), be a contiguous substring
//! of the referenced Evidence's groundable text — [`CandidateFact::quotes_are_grounded`]
//! checks this against a caller-supplied text lookup rather than embedding
//! storage access in this type.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::identifiers::CandidateFactId;
use crate::identifiers::EvidenceId;
use crate::model::value::Confidence;
use crate::model::value::Domain;
use crate::model::value::ValueType;
use crate::quote_normalize::normalized_contains;

// ============================================================================
// SECTION: Grounding Quote
// ============================================================================

/// A single grounding quote anchoring a `CandidateFact` to its Evidence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroundingQuote {
    /// The quoted text, expected to appear verbatim (modulo quote
    /// normalization) in the referenced Evidence.
    pub text: String,
    /// Optional text immediately preceding the quote, for reviewer context.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_before: Option<String>,
    /// Optional text immediately following the quote, for reviewer context.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_after: Option<String>,
    /// Evidence this quote is grounded against.
    pub evidence_id: EvidenceId,
    /// Article/clause number, when the source text carries one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub article_number: Option<String>,
    /// Statute/regulation reference, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub law_reference: Option<String>,
}

// ============================================================================
// SECTION: Status
// ============================================================================

/// `CandidateFact` lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateFactStatus {
    /// Freshly extracted, not yet reviewed.
    Captured,
    /// A human or the Arbiter has reviewed this candidate.
    Reviewed,
    /// Backed a published Rule.
    Promoted,
    /// Rejected; persists in the dead-letter collection, never deleted.
    Rejected,
}

// ============================================================================
// SECTION: CandidateFact
// ============================================================================

/// An extracted, quote-grounded fact awaiting review (§3 synonym:
/// SourcePointer).
///
/// # Invariants
/// - Every [`GroundingQuote::text`], after quote normalization, must be a
///   contiguous substring of its referenced Evidence's groundable text —
///   see [`CandidateFact::quotes_are_grounded`].
/// - `domain` is restricted to [`crate::model::value::ALLOWED_DOMAINS`] by
///   construction of [`Domain`].
/// - Read-only except for `status` transitions once created by the
///   Extractor (C5); rejected candidates persist in a separate dead-letter
///   collection rather than being deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateFact {
    /// Identifier for this candidate.
    pub id: CandidateFactId,
    /// Regulatory domain this candidate belongs to.
    pub domain: Domain,
    /// Shape of `extracted_value`.
    pub value_type: ValueType,
    /// Extracted value; the concrete JSON shape follows `value_type`.
    pub extracted_value: serde_json::Value,
    /// Grounding quotes anchoring this candidate to its Evidence.
    pub grounding_quotes: Vec<GroundingQuote>,
    /// Confidence in the extracted value itself.
    pub value_confidence: Confidence,
    /// Confidence in the candidate as a whole (value plus grounding).
    pub overall_confidence: Confidence,
    /// Lifecycle status.
    pub status: CandidateFactStatus,
    /// Whether the Composer considered this candidate for promotion.
    pub promotion_candidate: bool,
}

impl CandidateFact {
    /// Returns true when every grounding quote is a contiguous substring
    /// (after quote normalization) of its referenced Evidence's groundable
    /// text.
    ///
    /// `evidence_text` is called once per quote with the quote's
    /// `evidence_id`; a missing lookup result fails the quote.
    #[must_use]
    pub fn quotes_are_grounded<'a, F>(&'a self, mut evidence_text: F) -> bool
    where
        F: FnMut(&'a EvidenceId) -> Option<&'a str>,
    {
        self.grounding_quotes.iter().all(|quote| match evidence_text(&quote.evidence_id) {
            Some(text) => normalized_contains(text, &quote.text),
            None => false,
        })
    }

    /// Returns true when the status transition is a legal lifecycle move.
    ///
    /// The only forward transitions are `Captured -> Reviewed`,
    /// `Reviewed -> Promoted`, and `Reviewed -> Rejected`; `Captured ->
    /// Rejected` is also legal for candidates rejected without review
    /// (e.g. failing schema validation outright).
    #[must_use]
    pub const fn can_transition(from: CandidateFactStatus, to: CandidateFactStatus) -> bool {
        use CandidateFactStatus::{Captured, Promoted, Rejected, Reviewed};
        matches!(
            (from, to),
            (Captured, Reviewed) | (Captured, Rejected) | (Reviewed, Promoted) | (Reviewed, Rejected)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> CandidateFact {
        CandidateFact {
            id: CandidateFactId::new("cf-1"),
            domain: Domain::parse("taxation").unwrap(),
            value_type: ValueType::Percentage,
            extracted_value: serde_json::json!(25),
            grounding_quotes: vec![GroundingQuote {
                text: "The rate is 25%.".to_string(),
                context_before: None,
                context_after: None,
                evidence_id: EvidenceId::new("ev-1"),
                article_number: Some("1".to_string()),
                law_reference: None,
            }],
            value_confidence: Confidence::new(0.9).unwrap(),
            overall_confidence: Confidence::new(0.9).unwrap(),
            status: CandidateFactStatus::Captured,
            promotion_candidate: true,
        }
    }

    #[test]
    fn quotes_are_grounded_when_substring_present() {
        let candidate = sample();
        assert!(candidate.quotes_are_grounded(|_id| Some("Preamble. The rate is 25%. Closing.")));
    }

    #[test]
    fn quotes_are_grounded_handles_smart_quote_drift() {
        let mut candidate = sample();
        candidate.grounding_quotes[0].text = "\u{201C}25%\u{201D}".to_string();
        assert!(candidate.quotes_are_grounded(|_id| Some("The value is \"25%\" per statute.")));
    }

    #[test]
    fn quotes_are_grounded_fails_when_text_missing() {
        let candidate = sample();
        assert!(!candidate.quotes_are_grounded(|_id| Some("Unrelated text entirely.")));
    }

    #[test]
    fn quotes_are_grounded_fails_when_evidence_missing() {
        let candidate = sample();
        assert!(!candidate.quotes_are_grounded(|_id| None));
    }

    #[test]
    fn status_transition_allows_captured_to_reviewed() {
        assert!(CandidateFact::can_transition(CandidateFactStatus::Captured, CandidateFactStatus::Reviewed));
    }

    #[test]
    fn status_transition_rejects_promoted_to_captured() {
        assert!(!CandidateFact::can_transition(CandidateFactStatus::Promoted, CandidateFactStatus::Captured));
    }
}
