// truth-providers/src/webhook.rs
// ============================================================================
// Module: Webhook Ingest
// Description: HMAC signature verification and event-shape parsing for
//              inbound webhooks (C4, §6 "Webhook intake").
// Purpose: Turn an untrusted HTTP POST body into a verified list of URLs
//          the fetcher can then capture as Evidence.
// Dependencies: hmac, sha1, sha2, subtle, time
// ============================================================================

//! ## Overview
//! Two signature schemes are accepted, matching the two families real
//! webhook senders use: a GitHub-style single HMAC over the raw body
//! ([`verify_signature`]), and a Stripe-style `<timestamp>.<body>` binding
//! with a freshness window ([`verify_timestamped_signature`]). Both compare
//! digests with [`subtle::ConstantTimeEq`] rather than `==`, since a
//! data-dependent early return on secret material is a timing side-channel.
//!
//! Once a payload's signature is verified, [`extract_urls`] pulls the set of
//! URLs to fetch out of whichever of the three accepted event shapes
//! (`RSS_ITEM`, `EMAIL_NOTIFICATION`, `HTTP_POST`) the body matches.

use hmac::Hmac;
use hmac::Mac;
use sha1::Sha1;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use time::Duration;
use time::OffsetDateTime;

use crate::error::ProviderError;

/// Freshness window for Stripe-style timestamped signatures (§6: "rejects
/// timestamps older than 300 s").
pub const SIGNATURE_FRESHNESS_WINDOW: Duration = Duration::seconds(300);

/// Hash algorithm used to verify a signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureAlgorithm {
    /// HMAC-SHA256 (the default).
    Sha256,
    /// HMAC-SHA1 (accepted for legacy senders).
    Sha1,
}

fn hmac_digest(algorithm: SignatureAlgorithm, secret: &[u8], body: &[u8]) -> Vec<u8> {
    match algorithm {
        SignatureAlgorithm::Sha256 => {
            let mut mac = <Hmac<Sha256> as Mac>::new_from_slice(secret).unwrap_or_else(|_| <Hmac<Sha256> as Mac>::new_from_slice(&[]).unwrap_or_else(|_| unreachable_hmac()));
            mac.update(body);
            mac.finalize().into_bytes().to_vec()
        }
        SignatureAlgorithm::Sha1 => {
            let mut mac = <Hmac<Sha1> as Mac>::new_from_slice(secret).unwrap_or_else(|_| <Hmac<Sha1> as Mac>::new_from_slice(&[]).unwrap_or_else(|_| unreachable_hmac()));
            mac.update(body);
            mac.finalize().into_bytes().to_vec()
        }
    }
}

/// `Hmac::new_from_slice` only fails for algorithms with a block size of
/// zero, which neither SHA-1 nor SHA-256 has; this path is unreachable but
/// the `Mac` API is fallible, so it must be handled rather than `unwrap`ped.
fn unreachable_hmac() -> ! {
    unreachable!("HMAC-SHA1/256 accept keys of any length")
}

fn decode_signature(encoded: &str) -> Option<Vec<u8>> {
    if let Ok(bytes) = hex_decode(encoded) {
        return Some(bytes);
    }
    base64_decode(encoded)
}

fn hex_decode(value: &str) -> Result<Vec<u8>, ()> {
    if value.len() % 2 != 0 || value.is_empty() {
        return Err(());
    }
    value.as_bytes().chunks(2).map(|pair| u8::from_str_radix(std::str::from_utf8(pair).map_err(|_| ())?, 16).map_err(|_| ())).collect()
}

const BASE64_ALPHABET: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

fn base64_decode(value: &str) -> Option<Vec<u8>> {
    let trimmed = value.trim_end_matches('=');
    let mut bits: u32 = 0;
    let mut bit_count = 0_u32;
    let mut out = Vec::with_capacity(trimmed.len() * 3 / 4 + 1);
    for byte in trimmed.bytes() {
        let index = BASE64_ALPHABET.iter().position(|candidate| *candidate == byte)?;
        bits = (bits << 6) | u32::try_from(index).ok()?;
        bit_count += 6;
        if bit_count >= 8 {
            bit_count -= 8;
            out.push(u8::try_from((bits >> bit_count) & 0xFF).ok()?);
        }
    }
    Some(out)
}

/// Strips a GitHub-style `sha256=<hex>` / `sha1=<hex>` prefix, if present,
/// returning the bare encoded digest plus the algorithm it named.
fn split_algo_prefix(header: &str, default_algorithm: SignatureAlgorithm) -> (SignatureAlgorithm, &str) {
    if let Some(rest) = header.strip_prefix("sha256=") {
        (SignatureAlgorithm::Sha256, rest)
    } else if let Some(rest) = header.strip_prefix("sha1=") {
        (SignatureAlgorithm::Sha1, rest)
    } else {
        (default_algorithm, header)
    }
}

/// Verifies a GitHub-style webhook signature header against `body`,
/// accepting `algo=<hex>`, raw hex, or base64 encodings (§6).
///
/// # Errors
///
/// Returns [`ProviderError::SignatureInvalid`] if the header cannot be
/// decoded or does not match the computed HMAC.
pub fn verify_signature(secret: &[u8], body: &[u8], signature_header: &str) -> Result<(), ProviderError> {
    let (algorithm, encoded) = split_algo_prefix(signature_header.trim(), SignatureAlgorithm::Sha256);
    let provided = decode_signature(encoded).ok_or_else(|| ProviderError::SignatureInvalid("signature header is neither hex nor base64".to_string()))?;
    let expected = hmac_digest(algorithm, secret, body);
    if bool::from(provided.ct_eq(&expected)) {
        Ok(())
    } else {
        Err(ProviderError::SignatureInvalid("computed HMAC did not match".to_string()))
    }
}

/// Verifies a Stripe-style `t=<unix_ts>,v1=<hex>` signature header,
/// binding the signature to `<timestamp>.<body>` and rejecting timestamps
/// older than [`SIGNATURE_FRESHNESS_WINDOW`] relative to `now` (§6).
///
/// # Errors
///
/// Returns [`ProviderError::SignatureInvalid`] if the header is malformed
/// or does not match, or [`ProviderError::SignatureStale`] if the bound
/// timestamp has aged out of the freshness window.
pub fn verify_timestamped_signature(secret: &[u8], body: &[u8], signature_header: &str, now: OffsetDateTime) -> Result<(), ProviderError> {
    let mut timestamp = None;
    let mut digest_hex = None;
    for element in signature_header.split(',') {
        let mut parts = element.splitn(2, '=');
        match (parts.next(), parts.next()) {
            (Some("t"), Some(value)) => timestamp = value.parse::<i64>().ok(),
            (Some("v1"), Some(value)) => digest_hex = Some(value),
            _ => {}
        }
    }
    let timestamp = timestamp.ok_or_else(|| ProviderError::SignatureInvalid("missing t= field".to_string()))?;
    let digest_hex = digest_hex.ok_or_else(|| ProviderError::SignatureInvalid("missing v1= field".to_string()))?;
    let provided = hex_decode(digest_hex).map_err(|()| ProviderError::SignatureInvalid("v1 field is not hex".to_string()))?;

    let signed_at = OffsetDateTime::from_unix_timestamp(timestamp).map_err(|_| ProviderError::SignatureInvalid("t= field out of range".to_string()))?;
    if (now - signed_at).abs() > SIGNATURE_FRESHNESS_WINDOW {
        return Err(ProviderError::SignatureStale);
    }

    let mut signed_payload = timestamp.to_string();
    signed_payload.push('.');
    let mut signed_bytes = signed_payload.into_bytes();
    signed_bytes.extend_from_slice(body);

    let expected = hmac_digest(SignatureAlgorithm::Sha256, secret, &signed_bytes);
    if bool::from(provided.ct_eq(&expected)) {
        Ok(())
    } else {
        Err(ProviderError::SignatureInvalid("computed HMAC did not match".to_string()))
    }
}

// ============================================================================
// SECTION: Event Shapes
// ============================================================================

/// Extracts the URLs to fetch from a webhook body matching one of the
/// three accepted event shapes (§6): `RSS_ITEM` (`items[].link` or
/// top-level `link`), `EMAIL_NOTIFICATION` (URLs scraped from a `body`
/// field), and `HTTP_POST` (explicit `url` or `urls[]`).
///
/// # Errors
///
/// Returns [`ProviderError::UnrecognizedEvent`] if none of the three
/// shapes match.
pub fn extract_urls(payload: &serde_json::Value) -> Result<Vec<String>, ProviderError> {
    if let Some(urls) = extract_http_post(payload) {
        return Ok(urls);
    }
    if let Some(urls) = extract_rss_item(payload) {
        return Ok(urls);
    }
    if let Some(urls) = extract_email_notification(payload) {
        return Ok(urls);
    }
    Err(ProviderError::UnrecognizedEvent("body matched neither RSS_ITEM, EMAIL_NOTIFICATION, nor HTTP_POST".to_string()))
}

fn extract_http_post(payload: &serde_json::Value) -> Option<Vec<String>> {
    if let Some(url) = payload.get("url").and_then(serde_json::Value::as_str) {
        return Some(vec![url.to_string()]);
    }
    let urls = payload.get("urls")?.as_array()?;
    let urls: Vec<String> = urls.iter().filter_map(serde_json::Value::as_str).map(str::to_string).collect();
    if urls.is_empty() { None } else { Some(urls) }
}

fn extract_rss_item(payload: &serde_json::Value) -> Option<Vec<String>> {
    if let Some(items) = payload.get("items").and_then(serde_json::Value::as_array) {
        let links: Vec<String> = items.iter().filter_map(|item| item.get("link").and_then(serde_json::Value::as_str)).map(str::to_string).collect();
        if !links.is_empty() {
            return Some(links);
        }
    }
    payload.get("link").and_then(serde_json::Value::as_str).map(|link| vec![link.to_string()])
}

fn extract_email_notification(payload: &serde_json::Value) -> Option<Vec<String>> {
    let body = payload.get("body")?.as_str()?;
    let urls = scrape_urls(body);
    if urls.is_empty() { None } else { Some(urls) }
}

/// Scans `text` for `https?://[^\s<>"]+` matches (§6), without pulling in a
/// regex dependency for a single fixed pattern.
fn scrape_urls(text: &str) -> Vec<String> {
    let mut urls = Vec::new();
    let mut rest = text;
    loop {
        let Some(start) = rest.find("http://").or_else(|| rest.find("https://")) else {
            break;
        };
        let candidate = &rest[start..];
        let end = candidate.find(|character: char| character.is_whitespace() || character == '<' || character == '>' || character == '"').unwrap_or(candidate.len());
        urls.push(candidate[..end].to_string());
        rest = &candidate[end..];
    }
    urls
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verifies_github_style_sha256_prefixed_hex() {
        let secret = b"wh-secret";
        let body = b"{\"hello\":\"world\"}";
        let digest = hmac_digest(SignatureAlgorithm::Sha256, secret, body);
        let header = format!("sha256={}", hex_encode(&digest));
        verify_signature(secret, body, &header).expect("valid signature should verify");
    }

    #[test]
    fn rejects_tampered_body() {
        let secret = b"wh-secret";
        let digest = hmac_digest(SignatureAlgorithm::Sha256, secret, b"original");
        let header = format!("sha256={}", hex_encode(&digest));
        let err = verify_signature(secret, b"tampered", &header).expect_err("tampered body should fail");
        assert!(matches!(err, ProviderError::SignatureInvalid(_)));
    }

    #[test]
    fn verifies_sha1_variant() {
        let secret = b"legacy-secret";
        let body = b"payload";
        let digest = hmac_digest(SignatureAlgorithm::Sha1, secret, body);
        let header = format!("sha1={}", hex_encode(&digest));
        verify_signature(secret, body, &header).expect("valid sha1 signature should verify");
    }

    #[test]
    fn stripe_style_signature_within_window_verifies() {
        let secret = b"stripe-secret";
        let body = b"{\"id\":\"evt_1\"}";
        let now = OffsetDateTime::now_utc();
        let signed_payload = format!("{}.", now.unix_timestamp());
        let mut signed_bytes = signed_payload.into_bytes();
        signed_bytes.extend_from_slice(body);
        let digest = hmac_digest(SignatureAlgorithm::Sha256, secret, &signed_bytes);
        let header = format!("t={},v1={}", now.unix_timestamp(), hex_encode(&digest));
        verify_timestamped_signature(secret, body, &header, now).expect("fresh signature should verify");
    }

    #[test]
    fn stripe_style_signature_past_window_is_stale() {
        let secret = b"stripe-secret";
        let body = b"{}";
        let signed_at = OffsetDateTime::now_utc() - Duration::seconds(301);
        let signed_payload = format!("{}.", signed_at.unix_timestamp());
        let mut signed_bytes = signed_payload.into_bytes();
        signed_bytes.extend_from_slice(body);
        let digest = hmac_digest(SignatureAlgorithm::Sha256, secret, &signed_bytes);
        let header = format!("t={},v1={}", signed_at.unix_timestamp(), hex_encode(&digest));
        let err = verify_timestamped_signature(secret, body, &header, OffsetDateTime::now_utc()).expect_err("stale signature should be rejected");
        assert!(matches!(err, ProviderError::SignatureStale));
    }

    #[test]
    fn extracts_http_post_explicit_url() {
        let payload = serde_json::json!({"url": "https://example.test/a"});
        assert_eq!(extract_urls(&payload).expect("urls"), vec!["https://example.test/a".to_string()]);
    }

    #[test]
    fn extracts_rss_item_links() {
        let payload = serde_json::json!({"items": [{"link": "https://example.test/1"}, {"link": "https://example.test/2"}]});
        assert_eq!(extract_urls(&payload).expect("urls"), vec!["https://example.test/1".to_string(), "https://example.test/2".to_string()]);
    }

    #[test]
    fn extracts_email_notification_scraped_urls() {
        let payload = serde_json::json!({"body": "see https://example.test/notice for details"});
        assert_eq!(extract_urls(&payload).expect("urls"), vec!["https://example.test/notice".to_string()]);
    }

    #[test]
    fn unrecognized_shape_is_rejected() {
        let payload = serde_json::json!({"unrelated": true});
        let err = extract_urls(&payload).expect_err("should be rejected");
        assert!(matches!(err, ProviderError::UnrecognizedEvent(_)));
    }

    fn hex_encode(bytes: &[u8]) -> String {
        bytes.iter().map(|byte| format!("{byte:02x}")).collect()
    }
}
