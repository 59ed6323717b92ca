// truth-providers/src/fetcher.rs
// ============================================================================
// Module: HTTP Fetcher
// Description: Scheme-validated, size-limited HTTP capture that produces an
//              Evidence row (C4, §3).
// Purpose: The only place raw bytes from an external source enter the
//          pipeline, so every fail-closed limit (scheme, host, size) lives
//          here rather than being re-litigated by every caller.
// Dependencies: reqwest, time, truth-core
// ============================================================================

//! ## Overview
//! `Fetcher::fetch` mints a fresh [`truth_core::EvidenceId`], issues a
//! bounded GET, classifies the response via [`crate::sniff::classify`], and
//! returns an [`truth_core::Evidence`] whose `content_hash` holds by
//! construction (see [`truth_core::Evidence::capture`]). It does not touch a
//! repository — the caller decides whether the result is new or a
//! re-fetch of unchanged content, passing the previously stored hash (if
//! any) as `previous_hash` so `has_changed` can be computed honestly.

use std::collections::BTreeSet;
use std::io::Read;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::time::Duration;

use reqwest::Url;
use reqwest::blocking::Client;
use reqwest::redirect::Policy;
use time::OffsetDateTime;
use truth_core::Evidence;
use truth_core::EvidenceId;
use truth_core::HashAlgorithm;
use truth_core::HashDigest;
use truth_core::SourceId;
use truth_core::hash_evidence_bytes;

use crate::error::ProviderError;
use crate::sniff;

static EVIDENCE_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

fn generate_evidence_id(now: OffsetDateTime) -> EvidenceId {
    let sequence = EVIDENCE_ID_COUNTER.fetch_add(1, Ordering::Relaxed);
    EvidenceId::new(format!("ev_{}_{:09}_{sequence:x}", now.unix_timestamp(), now.nanosecond()))
}

/// Configuration for [`Fetcher`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetcherConfig {
    /// Allow cleartext `http://` URLs (disabled by default).
    pub allow_http: bool,
    /// Request timeout.
    pub timeout: Duration,
    /// Maximum response size accepted, in bytes.
    pub max_response_bytes: usize,
    /// Optional host allowlist; `None` permits any host that passes the
    /// scheme check.
    pub allowed_hosts: Option<BTreeSet<String>>,
    /// `User-Agent` sent with every request.
    pub user_agent: String,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            allow_http: false,
            timeout: Duration::from_secs(30),
            max_response_bytes: 25 * 1024 * 1024,
            allowed_hosts: None,
            user_agent: "truth-pipeline/0.1".to_string(),
        }
    }
}

/// Captures Evidence from HTTP(S) sources (C4).
pub struct Fetcher {
    config: FetcherConfig,
    client: Client,
}

impl Fetcher {
    /// Builds a fetcher from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::ClientBuild`] if the underlying HTTP client
    /// cannot be constructed.
    pub fn new(config: FetcherConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .redirect(Policy::none())
            .build()
            .map_err(|err| ProviderError::ClientBuild(err.to_string()))?;
        Ok(Self { config, client })
    }

    /// Fetches `url` for `source_id`, returning a freshly minted
    /// [`Evidence`] row. `previous_hash`, when supplied by a caller that
    /// holds the repository, determines `has_changed`.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] if the URL fails validation, the request
    /// fails, or the response exceeds [`FetcherConfig::max_response_bytes`].
    pub fn fetch(&self, source_id: &SourceId, url: &str, previous_hash: Option<&HashDigest>) -> Result<Evidence, ProviderError> {
        let parsed = Url::parse(url).map_err(|err| ProviderError::InvalidUrl(err.to_string()))?;
        self.validate_url(&parsed)?;

        let mut response = self.client.get(parsed.clone()).send().map_err(|err| ProviderError::Request(err.to_string()))?;
        let declared_content_type = response.headers().get(reqwest::header::CONTENT_TYPE).and_then(|value| value.to_str().ok()).map(str::to_string);
        let raw_bytes = read_response_limited(&mut response, self.config.max_response_bytes)?;

        let (content_type, content_class) = sniff::classify(&raw_bytes, declared_content_type.as_deref());
        let content_hash = hash_evidence_bytes(HashAlgorithm::Sha256, &raw_bytes, content_type.as_str());
        let has_changed = previous_hash != Some(&content_hash);

        let now = OffsetDateTime::now_utc();
        Ok(Evidence::capture(generate_evidence_id(now), source_id.clone(), parsed.to_string(), content_type, content_class, raw_bytes, now, has_changed))
    }

    fn validate_url(&self, url: &Url) -> Result<(), ProviderError> {
        match url.scheme() {
            "https" => {}
            "http" if self.config.allow_http => {}
            other => return Err(ProviderError::UnsupportedScheme(other.to_string())),
        }
        if let Some(allowlist) = &self.config.allowed_hosts {
            let host = url.host_str().ok_or_else(|| ProviderError::HostNotAllowed(String::new()))?;
            if !allowlist.contains(host) {
                return Err(ProviderError::HostNotAllowed(host.to_string()));
            }
        }
        Ok(())
    }
}

fn read_response_limited(response: &mut reqwest::blocking::Response, max_bytes: usize) -> Result<Vec<u8>, ProviderError> {
    let expected_len = response.content_length();
    let max_bytes_u64 = u64::try_from(max_bytes).unwrap_or(u64::MAX);
    if let Some(expected) = expected_len {
        if expected > max_bytes_u64 {
            return Err(ProviderError::ResponseTooLarge);
        }
    }
    let mut buf = Vec::new();
    let limit = max_bytes_u64.saturating_add(1);
    let mut handle = response.take(limit);
    handle.read_to_end(&mut buf).map_err(|err| ProviderError::ReadFailed(err.to_string()))?;
    if buf.len() > max_bytes {
        return Err(ProviderError::ResponseTooLarge);
    }
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use truth_core::SourceId;

    use super::*;

    #[test]
    fn rejects_http_scheme_by_default() {
        let fetcher = Fetcher::new(FetcherConfig::default()).expect("build fetcher");
        let err = fetcher.fetch(&SourceId::new("src-1"), "http://example.test/a", None).expect_err("http should be rejected");
        assert!(matches!(err, ProviderError::UnsupportedScheme(_)));
    }

    #[test]
    fn rejects_disallowed_host() {
        let mut config = FetcherConfig::default();
        config.allow_http = true;
        config.allowed_hosts = Some(std::iter::once("allowed.test".to_string()).collect());
        let fetcher = Fetcher::new(config).expect("build fetcher");
        let err = fetcher.fetch(&SourceId::new("src-1"), "http://blocked.test/a", None).expect_err("host should be rejected");
        assert!(matches!(err, ProviderError::HostNotAllowed(_)));
    }

    #[test]
    fn fetches_and_classifies_html_over_http() {
        let server = tiny_http::Server::http("127.0.0.1:0").expect("bind");
        let addr = server.server_addr();
        let url = format!("http://{addr}/");
        let handle = std::thread::spawn(move || {
            let request = server.recv().expect("recv request");
            let response = tiny_http::Response::from_string("<!DOCTYPE html><html></html>")
                .with_header(tiny_http::Header::from_bytes(&b"Content-Type"[..], &b"text/html"[..]).expect("header"));
            request.respond(response).expect("respond");
        });

        let mut config = FetcherConfig::default();
        config.allow_http = true;
        let fetcher = Fetcher::new(config).expect("build fetcher");
        let evidence = fetcher.fetch(&SourceId::new("src-1"), &url, None).expect("fetch");
        handle.join().expect("server thread");

        assert_eq!(evidence.content_type, truth_core::ContentType::Html);
        assert_eq!(evidence.content_class, truth_core::ContentClass::Html);
        assert!(evidence.has_changed);
        assert!(evidence.hash_is_valid());
    }

    #[test]
    fn unchanged_hash_reports_has_changed_false() {
        let server = tiny_http::Server::http("127.0.0.1:0").expect("bind");
        let addr = server.server_addr();
        let url = format!("http://{addr}/");
        let handle = std::thread::spawn(move || {
            let request = server.recv().expect("recv request");
            let response = tiny_http::Response::from_string("{}")
                .with_header(tiny_http::Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..]).expect("header"));
            request.respond(response).expect("respond");
        });

        let mut config = FetcherConfig::default();
        config.allow_http = true;
        let fetcher = Fetcher::new(config).expect("build fetcher");
        let previous_hash = hash_evidence_bytes(HashAlgorithm::Sha256, b"{}", truth_core::ContentType::Json.as_str());
        let evidence = fetcher.fetch(&SourceId::new("src-1"), &url, Some(&previous_hash)).expect("fetch");
        handle.join().expect("server thread");

        assert!(!evidence.has_changed);
    }
}
