// truth-pipeline/src/queues.rs
// ============================================================================
// Module: Pipeline Queue Names & Blocklist
// Description: Shared constants for the staged job model (§4.1, §4.3).
// Purpose: Give every stage's worker loop and the CLI wiring a single source
//          of truth for queue names, rather than sprinkling string literals.
// Dependencies: none
// ============================================================================

//! ## Overview
//! C5–C8 each schedule work through [`truth_queue::Queue`] on their own named
//! queue; the releaser's queue additionally runs at concurrency 1 via
//! [`truth_queue::SingletonQueue`] (§4.1, §9). [`BLOCKED_TEST_DOMAINS`] is the
//! Extractor's host blocklist (§4.3 step 1).

// ============================================================================
// SECTION: Queue Names
// ============================================================================

/// Queue the Extractor (C5) schedules work on.
pub const QUEUE_EXTRACT: &str = "extract";
/// Queue the Composer (C6) schedules work on.
pub const QUEUE_COMPOSE: &str = "compose";
/// Queue the Reviewer/Arbiter (C7) schedules work on.
pub const QUEUE_REVIEW: &str = "review";
/// Queue the Releaser (C8) schedules work on; wrapped in
/// [`truth_queue::SingletonQueue`] by callers so at most one release runs at
/// a time (§9).
pub const QUEUE_RELEASE: &str = "release";

// ============================================================================
// SECTION: Blocklist
// ============================================================================

/// Hosts the Extractor refuses to pull Evidence from (§4.3 step 1: "test
/// domains"). Matched case-insensitively against the Evidence URL's host,
/// including subdomains.
pub const BLOCKED_TEST_DOMAINS: &[&str] = &[
    "example.com",
    "example.org",
    "example.net",
    "test.com",
    "localhost",
    "localhost.localdomain",
];

/// Returns true when `url`'s host matches [`BLOCKED_TEST_DOMAINS`], exactly
/// or as a subdomain.
#[must_use]
pub fn is_blocked_host(url: &str) -> bool {
    let Ok(parsed) = url::Url::parse(url) else {
        return false;
    };
    let Some(host) = parsed.host_str() else {
        return false;
    };
    let host = host.to_ascii_lowercase();
    BLOCKED_TEST_DOMAINS
        .iter()
        .any(|blocked| host == *blocked || host.ends_with(&format!(".{blocked}")))
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocks_exact_and_subdomain_matches() {
        assert!(is_blocked_host("https://example.com/law"));
        assert!(is_blocked_host("https://gov.example.com/law"));
        assert!(is_blocked_host("http://localhost:8080/x"));
    }

    #[test]
    fn allows_unblocked_hosts() {
        assert!(!is_blocked_host("https://narodne-novine.nn.hr/clanci/1"));
    }

    #[test]
    fn unparseable_url_is_not_blocked() {
        assert!(!is_blocked_host("not a url"));
    }
}
