// truth-core/src/model/evidence.rs
// ============================================================================
// Module: Evidence Entity
// Description: Captured source material backing every downstream fact (§3).
// Purpose: Enforce the content-hash invariant and immutability rules for
//          Evidence rows created by the Ingestor (C4).
// Dependencies: crate::hashing, crate::identifiers, serde, time
// ============================================================================

//! ## Overview
//! An `Evidence` row is the pipeline's only record of what was actually
//! fetched from a source. `content_hash` is always derived from
//! `(raw_bytes, content_type)` via [`crate::hashing::hash_evidence_bytes`];
//! there is no public constructor that accepts an arbitrary hash, so the
//! invariant `hash(canonical(rawBytes, contentType)) == contentHash` holds by
//! construction. Evidence is immutable once written except for appending
//! [`EvidenceArtifact`]s.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use time::OffsetDateTime;

use crate::hashing::HashAlgorithm;
use crate::hashing::HashDigest;
use crate::hashing::hash_evidence_bytes;
use crate::identifiers::EvidenceId;
use crate::identifiers::SourceId;

// ============================================================================
// SECTION: Content Type / Class
// ============================================================================

/// MIME-level content type of the fetched payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    /// HTML document.
    Html,
    /// PDF document.
    Pdf,
    /// JSON document.
    Json,
    /// XML document.
    Xml,
    /// Word/OOXML document.
    Docx,
    /// Anything else the Ingestor accepted.
    Other,
}

impl ContentType {
    /// Returns the wire/log-stable lowercase string form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Html => "html",
            Self::Pdf => "pdf",
            Self::Json => "json",
            Self::Xml => "xml",
            Self::Docx => "docx",
            Self::Other => "other",
        }
    }
}

/// Finer-grained extraction class, distinguishing text-bearing PDFs from
/// scanned (image-only) ones so the Extractor (C5) can route to OCR.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContentClass {
    /// HTML document.
    Html,
    /// PDF with an extractable text layer.
    PdfText,
    /// PDF with no text layer (scanned image).
    PdfScanned,
    /// JSON document.
    Json,
    /// XML document.
    Xml,
    /// Word/OOXML document.
    Docx,
    /// Anything else the Ingestor accepted.
    Other,
}

// ============================================================================
// SECTION: Evidence Artifact
// ============================================================================

/// Supplementary artifact attached to an Evidence row after capture (e.g. an
/// OCR pass, a rendered screenshot, a converted plain-text copy).
///
/// # Invariants
/// - Appending an artifact never mutates the parent Evidence's `raw_bytes`,
///   `content_hash`, or `fetched_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceArtifact {
    /// Artifact kind (`ocr_text`, `screenshot`, `rendered_pdf`, …).
    pub kind: String,
    /// Canonical hash of the artifact bytes.
    pub content_hash: HashDigest,
    /// Artifact bytes.
    pub bytes: Vec<u8>,
}

// ============================================================================
// SECTION: Evidence
// ============================================================================

/// Captured source material, the root of every downstream fact's
/// provenance chain.
///
/// # Invariants
/// - `content_hash == hash_evidence_bytes(algorithm, raw_bytes, content_type.as_str())`.
/// - Immutable once written, except that [`Evidence::with_artifact`] may
///   append to `artifacts`.
/// - Re-fetching identical bytes must not create a new row (repository
///   concern, see [`crate::repo::EvidenceRepository`]); this type only
///   exposes `has_changed` as a flag the repository sets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evidence {
    /// Identifier for this Evidence row.
    pub id: EvidenceId,
    /// Registered source this was fetched from.
    pub source_id: SourceId,
    /// URL the bytes were fetched from.
    pub url: String,
    /// MIME-level content type.
    pub content_type: ContentType,
    /// Extraction-routing content class.
    pub content_class: ContentClass,
    /// Raw fetched bytes, exactly as received.
    pub raw_bytes: Vec<u8>,
    /// Cleaned text (post §4.4 content cleaning), when extraction has run.
    pub cleaned_text: Option<String>,
    /// Canonical content hash, derived from `raw_bytes` and `content_type`.
    pub content_hash: HashDigest,
    /// Timestamp this capture completed.
    pub fetched_at: OffsetDateTime,
    /// Whether this fetch differed from the previously stored capture for
    /// the same URL.
    pub has_changed: bool,
    /// Supplementary artifacts appended after capture.
    pub artifacts: Vec<EvidenceArtifact>,
}

impl Evidence {
    /// Captures a new Evidence row, deriving `content_hash` from
    /// `raw_bytes`/`content_type` so the hash invariant holds by
    /// construction.
    #[must_use]
    pub fn capture(
        id: EvidenceId,
        source_id: SourceId,
        url: impl Into<String>,
        content_type: ContentType,
        content_class: ContentClass,
        raw_bytes: Vec<u8>,
        fetched_at: OffsetDateTime,
        has_changed: bool,
    ) -> Self {
        let content_hash = hash_evidence_bytes(HashAlgorithm::Sha256, &raw_bytes, content_type.as_str());
        Self {
            id,
            source_id,
            url: url.into(),
            content_type,
            content_class,
            raw_bytes,
            cleaned_text: None,
            content_hash,
            fetched_at,
            has_changed,
            artifacts: Vec::new(),
        }
    }

    /// Returns true when `content_hash` is still consistent with
    /// `raw_bytes`/`content_type` (defends against corrupted deserialized
    /// rows from storage).
    #[must_use]
    pub fn hash_is_valid(&self) -> bool {
        hash_evidence_bytes(HashAlgorithm::Sha256, &self.raw_bytes, self.content_type.as_str()) == self.content_hash
    }

    /// Sets `cleaned_text`, the only mutation besides appending artifacts
    /// that Evidence permits after capture.
    #[must_use]
    pub fn with_cleaned_text(mut self, cleaned_text: impl Into<String>) -> Self {
        self.cleaned_text = Some(cleaned_text.into());
        self
    }

    /// Appends a supplementary artifact without touching the captured
    /// payload.
    #[must_use]
    pub fn with_artifact(mut self, artifact: EvidenceArtifact) -> Self {
        self.artifacts.push(artifact);
        self
    }

    /// Returns the text the Extractor should ground quotes against:
    /// `cleaned_text` if present, otherwise the raw bytes decoded lossily.
    #[must_use]
    pub fn groundable_text(&self) -> std::borrow::Cow<'_, str> {
        match &self.cleaned_text {
            Some(text) => std::borrow::Cow::Borrowed(text.as_str()),
            None => String::from_utf8_lossy(&self.raw_bytes),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Evidence {
        Evidence::capture(
            EvidenceId::new("ev-1"),
            SourceId::new("src-1"),
            "https://example.test/law",
            ContentType::Html,
            ContentClass::Html,
            b"<p>Clanak 1.</p>".to_vec(),
            OffsetDateTime::UNIX_EPOCH,
            true,
        )
    }

    #[test]
    fn capture_derives_hash_from_bytes_and_content_type() {
        let evidence = sample();
        assert!(evidence.hash_is_valid());
    }

    #[test]
    fn same_bytes_different_content_type_hash_differently() {
        let html = sample();
        let json = Evidence::capture(
            EvidenceId::new("ev-2"),
            SourceId::new("src-1"),
            "https://example.test/law",
            ContentType::Json,
            ContentClass::Json,
            html.raw_bytes.clone(),
            OffsetDateTime::UNIX_EPOCH,
            true,
        );
        assert_ne!(html.content_hash, json.content_hash);
    }

    #[test]
    fn with_artifact_does_not_change_content_hash() {
        let before = sample();
        let hash_before = before.content_hash.clone();
        let after = before.with_artifact(EvidenceArtifact {
            kind: "ocr_text".to_string(),
            content_hash: HashDigest::new(HashAlgorithm::Sha256, b"ocr"),
            bytes: b"ocr".to_vec(),
        });
        assert_eq!(after.content_hash, hash_before);
        assert_eq!(after.artifacts.len(), 1);
    }

    #[test]
    fn groundable_text_prefers_cleaned_text() {
        let evidence = sample().with_cleaned_text("Clanak 1.");
        assert_eq!(evidence.groundable_text(), "Clanak 1.");
    }

    #[test]
    fn groundable_text_falls_back_to_raw_bytes() {
        let evidence = sample();
        assert!(evidence.groundable_text().contains("Clanak 1."));
    }
}
