// truth-providers/src/lib.rs
// ============================================================================
// Module: Truth Providers
// Description: Fetchers, webhook ingest, content sniffing, and OCR routing
//              (C4).
// Purpose: The only crate that turns an untrusted external source — a
//          polled URL or an inbound webhook — into an Evidence row.
// Dependencies: truth-core, reqwest, hmac, sha1, sha2, subtle
// ============================================================================

//! ## Overview
//! `truth-providers` is the ingestion boundary of the pipeline. [`Fetcher`]
//! performs scheme- and host-validated, size-limited HTTP GETs; the
//! [`webhook`] module verifies inbound signatures and extracts URLs from
//! the three accepted event shapes so they can be handed to the same
//! [`Fetcher`]; [`sniff::classify`] turns raw bytes into a
//! `(ContentType, ContentClass)` pair; and [`ocr`] is the routing seam for
//! scanned PDFs. None of these touch a repository — every function here is
//! a pure transformation from untrusted bytes to a typed result, leaving
//! persistence to the caller.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod error;
pub mod fetcher;
pub mod ocr;
pub mod sniff;
pub mod webhook;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use error::ProviderError;
pub use fetcher::Fetcher;
pub use fetcher::FetcherConfig;
pub use ocr::NullOcrRouter;
pub use ocr::OcrError;
pub use ocr::OcrRouter;
pub use sniff::classify;
pub use webhook::SignatureAlgorithm;
pub use webhook::extract_urls;
pub use webhook::verify_signature;
pub use webhook::verify_timestamped_signature;
