// truth-providers/src/sniff.rs
// ============================================================================
// Module: Content Sniffer
// Description: Classifies fetched bytes into a `(ContentType, ContentClass)`
//              pair (§3 Evidence, §4.10 OCR routing).
// Purpose: Give the Ingestor a single place that decides, from magic bytes
//          and the response's declared `Content-Type`, whether an Evidence
//          row needs OCR routing before the Extractor can read it.
// Dependencies: truth-core
// ============================================================================

//! ## Overview
//! Classification prefers magic bytes over the declared `Content-Type`
//! header, since sources are untrusted and a mislabeled or absent header is
//! common. A PDF with no extractable text-layer marker is classified
//! `PdfScanned` rather than `PdfText`, which is the signal
//! [`crate::ocr::OcrRouter`] uses to decide whether a capture needs OCR.

use truth_core::ContentClass;
use truth_core::ContentType;

const PDF_MAGIC: &[u8] = b"%PDF-";
/// A PDF with no `/Font`, `/Text`, or a `stream`/`Tj`/`TJ` text-showing
/// operator anywhere in its bytes is almost certainly a scanned image with
/// no extractable text layer; a real check would parse the object graph,
/// but for a deterministic capture-time heuristic this substring scan is
/// sufficient and matches what the original Node implementation did with a
/// regex over the raw buffer.
const PDF_TEXT_MARKERS: &[&[u8]] = &[b"/Font", b"BT\n", b"BT\r", b" Tj", b" TJ"];
const DOCX_MAGIC: &[u8] = b"PK\x03\x04";
const XML_DECLARATION: &[u8] = b"<?xml";

/// Classifies fetched bytes, consulting `declared_content_type` (the
/// response's `Content-Type` header, if any) only when magic-byte sniffing
/// is inconclusive.
#[must_use]
pub fn classify(raw_bytes: &[u8], declared_content_type: Option<&str>) -> (ContentType, ContentClass) {
    if raw_bytes.starts_with(PDF_MAGIC) {
        return if has_pdf_text_layer(raw_bytes) { (ContentType::Pdf, ContentClass::PdfText) } else { (ContentType::Pdf, ContentClass::PdfScanned) };
    }
    if raw_bytes.starts_with(DOCX_MAGIC) {
        return (ContentType::Docx, ContentClass::Docx);
    }
    if looks_like_json(raw_bytes) {
        return (ContentType::Json, ContentClass::Json);
    }
    if raw_bytes.starts_with(XML_DECLARATION) {
        return (ContentType::Xml, ContentClass::Xml);
    }
    if looks_like_html(raw_bytes) {
        return (ContentType::Html, ContentClass::Html);
    }

    match declared_content_type.map(|value| value.split(';').next().unwrap_or(value).trim().to_ascii_lowercase()).as_deref() {
        Some("application/json") => (ContentType::Json, ContentClass::Json),
        Some("application/xml" | "text/xml") => (ContentType::Xml, ContentClass::Xml),
        Some("text/html" | "application/xhtml+xml") => (ContentType::Html, ContentClass::Html),
        Some("application/pdf") => (ContentType::Pdf, ContentClass::PdfScanned),
        Some("application/vnd.openxmlformats-officedocument.wordprocessingml.document") => (ContentType::Docx, ContentClass::Docx),
        _ => (ContentType::Other, ContentClass::Other),
    }
}

fn has_pdf_text_layer(raw_bytes: &[u8]) -> bool {
    PDF_TEXT_MARKERS.iter().any(|marker| contains(raw_bytes, marker))
}

fn looks_like_json(raw_bytes: &[u8]) -> bool {
    let trimmed = trim_leading_whitespace(raw_bytes);
    matches!(trimmed.first(), Some(b'{' | b'['))
}

fn looks_like_html(raw_bytes: &[u8]) -> bool {
    let trimmed = trim_leading_whitespace(raw_bytes);
    let lower: Vec<u8> = trimmed.iter().take(512).map(u8::to_ascii_lowercase).collect();
    contains(&lower, b"<!doctype html") || contains(&lower, b"<html")
}

fn trim_leading_whitespace(raw_bytes: &[u8]) -> &[u8] {
    let start = raw_bytes.iter().position(|byte| !byte.is_ascii_whitespace()).unwrap_or(raw_bytes.len());
    &raw_bytes[start..]
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    if needle.is_empty() || needle.len() > haystack.len() {
        return needle.is_empty();
    }
    haystack.windows(needle.len()).any(|window| window == needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_html_by_doctype() {
        let (content_type, content_class) = classify(b"<!DOCTYPE html><html></html>", None);
        assert_eq!(content_type, ContentType::Html);
        assert_eq!(content_class, ContentClass::Html);
    }

    #[test]
    fn detects_json_by_leading_brace() {
        let (content_type, content_class) = classify(b"  {\"a\":1}", None);
        assert_eq!(content_type, ContentType::Json);
        assert_eq!(content_class, ContentClass::Json);
    }

    #[test]
    fn pdf_with_text_markers_is_pdf_text() {
        let mut bytes = PDF_MAGIC.to_vec();
        bytes.extend_from_slice(b"1 0 obj << /Font >> BT\n(hello) Tj ET");
        let (content_type, content_class) = classify(&bytes, None);
        assert_eq!(content_type, ContentType::Pdf);
        assert_eq!(content_class, ContentClass::PdfText);
    }

    #[test]
    fn pdf_without_text_markers_is_pdf_scanned() {
        let mut bytes = PDF_MAGIC.to_vec();
        bytes.extend_from_slice(&[0_u8, 1, 2, 3, 4, 5]);
        let (content_type, content_class) = classify(&bytes, None);
        assert_eq!(content_type, ContentType::Pdf);
        assert_eq!(content_class, ContentClass::PdfScanned);
    }

    #[test]
    fn falls_back_to_declared_content_type() {
        let (content_type, content_class) = classify(b"garbage-bytes", Some("application/pdf; charset=binary"));
        assert_eq!(content_type, ContentType::Pdf);
        assert_eq!(content_class, ContentClass::PdfScanned);
    }

    #[test]
    fn unrecognized_bytes_and_header_are_other() {
        let (content_type, content_class) = classify(b"garbage-bytes", None);
        assert_eq!(content_type, ContentType::Other);
        assert_eq!(content_class, ContentClass::Other);
    }
}
