// truth-providers/src/ocr.rs
// ============================================================================
// Module: OCR Routing
// Description: Seam through which a scanned PDF is routed to an OCR
//              backend (C4).
// Purpose: Give the Extractor (or a future OCR worker) a stable interface
//          to call for `ContentClass::PdfScanned` evidence without this
//          crate depending on, or implementing, an actual OCR engine.
// Dependencies: truth-core
// ============================================================================

//! ## Overview
//! Actual optical character recognition is a Non-goal of this system; what
//! C4 is responsible for is the routing decision — recognizing, via
//! [`crate::sniff::classify`], that a captured PDF has no extractable text
//! layer and needs a downstream OCR pass before the Extractor can read it.
//! [`OcrRouter`] is that seam. [`NullOcrRouter`] is the default
//! implementation: it reports every scanned document as needing OCR but
//! performs none, which is the correct behavior until an OCR backend is
//! wired in.

use truth_core::ContentClass;
use truth_core::Evidence;

/// Decides whether an [`Evidence`] row needs an OCR pass, and would, once a
/// backend is wired in, perform it.
pub trait OcrRouter: Send + Sync {
    /// Returns `true` if `evidence` should be routed through OCR before the
    /// Extractor reads it.
    fn needs_ocr(&self, evidence: &Evidence) -> bool {
        evidence.content_class == ContentClass::PdfScanned
    }

    /// Performs OCR on `evidence`, returning the recognized text.
    ///
    /// # Errors
    ///
    /// Returns [`OcrError::Unsupported`] unless a real backend overrides
    /// this method.
    fn recognize_text(&self, evidence: &Evidence) -> Result<String, OcrError>;
}

/// No OCR backend is wired in; scanned documents are recognized as needing
/// OCR but never actually processed.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullOcrRouter;

impl OcrRouter for NullOcrRouter {
    fn recognize_text(&self, _evidence: &Evidence) -> Result<String, OcrError> {
        Err(OcrError::Unsupported)
    }
}

/// Error surfaced by an [`OcrRouter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum OcrError {
    /// No OCR backend is configured.
    #[error("no ocr backend is configured")]
    Unsupported,
}

#[cfg(test)]
mod tests {
    use time::OffsetDateTime;
    use truth_core::ContentType;
    use truth_core::EvidenceId;
    use truth_core::SourceId;

    use super::*;

    fn scanned_evidence() -> Evidence {
        Evidence::capture(
            EvidenceId::new("ev-1"),
            SourceId::new("src-1"),
            "https://example.test/doc.pdf".to_string(),
            ContentType::Pdf,
            ContentClass::PdfScanned,
            b"%PDF-1.4".to_vec(),
            OffsetDateTime::now_utc(),
            true,
        )
    }

    #[test]
    fn null_router_flags_scanned_pdfs_as_needing_ocr() {
        let router = NullOcrRouter;
        assert!(router.needs_ocr(&scanned_evidence()));
    }

    #[test]
    fn null_router_never_actually_recognizes_text() {
        let router = NullOcrRouter;
        let err = router.recognize_text(&scanned_evidence()).expect_err("no backend configured");
        assert_eq!(err, OcrError::Unsupported);
    }
}
