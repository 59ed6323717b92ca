// truth-providers/src/error.rs
// ============================================================================
// Module: Provider Errors
// Description: Error taxonomy for fetching and webhook ingest (C4).
// Purpose: One enum every provider-facing operation returns, covering both
//          fetch-time and webhook-verification failures.
// Dependencies: thiserror
// ============================================================================

use thiserror::Error;

/// Error surfaced by a fetch or webhook-ingest operation.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The URL's scheme is not `https` (or `http` when explicitly allowed).
    #[error("unsupported url scheme: {0}")]
    UnsupportedScheme(String),
    /// The URL's host failed the configured allowlist check.
    #[error("url host not allowed: {0}")]
    HostNotAllowed(String),
    /// The URL could not be parsed.
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    /// The HTTP client could not be constructed.
    #[error("http client build failed: {0}")]
    ClientBuild(String),
    /// The HTTP request itself failed (DNS, connect, timeout, TLS).
    #[error("http request failed: {0}")]
    Request(String),
    /// The response exceeded [`crate::fetcher::FetcherConfig::max_response_bytes`].
    #[error("response exceeds the configured size limit")]
    ResponseTooLarge,
    /// The response body could not be fully read.
    #[error("failed to read response body: {0}")]
    ReadFailed(String),
    /// The webhook signature header was missing, malformed, or did not
    /// match the computed HMAC.
    #[error("webhook signature verification failed: {0}")]
    SignatureInvalid(String),
    /// The Stripe-style `<timestamp>.<body>` signature's timestamp fell
    /// outside the 300s freshness window.
    #[error("webhook timestamp outside freshness window")]
    SignatureStale,
    /// The webhook body could not be parsed as one of the accepted event
    /// shapes.
    #[error("unrecognized webhook event shape: {0}")]
    UnrecognizedEvent(String),
}
