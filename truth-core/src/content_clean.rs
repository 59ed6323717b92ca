// truth-core/src/content_clean.rs
// ============================================================================
// Module: Content Cleaning
// Description: Host-aware boilerplate stripping for extractable text (§4.4).
// Purpose: Provide a pure, idempotent `clean` function plus a pluggable
//          `ContentCleaner` trait so host-specific heuristics (out of scope
//          per §1: "the HTML cleaner's DOM heuristics") can be swapped in
//          without touching the Extractor.
// Dependencies: none
// ============================================================================

//! ## Overview
//! Cleaning removes navigation, script, style, and boilerplate header/footer
//! content while preserving article-number markers ("Članak 1.", paragraph
//! numerals "(1)") that the Extractor and Composer rely on for
//! `article_number` grounding. The default implementation here is a
//! deliberately simple line-based heuristic; production deployments supply
//! their own [`ContentCleaner`] for the real DOM-aware cleaner (§1 Non-goal).

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

// ============================================================================
// SECTION: Cleaning Statistics
// ============================================================================

/// Before/after statistics for a cleaning pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CleaningStats {
    /// Length of the original content, in bytes.
    pub original_length: usize,
    /// Length of the cleaned content, in bytes.
    pub cleaned_length: usize,
    /// Reduction percentage, rounded down, in `[0, 100]`.
    pub reduction_percent: u8,
    /// Count of lines that look like article/clause markers retained.
    pub news_items_found: usize,
}

/// Computes cleaning statistics for a raw/cleaned content pair.
#[must_use]
pub fn stats(raw: &str, cleaned: &str) -> CleaningStats {
    let original_length = raw.len();
    let cleaned_length = cleaned.len();
    let reduction_percent = if original_length == 0 {
        0
    } else {
        let reduced = original_length.saturating_sub(cleaned_length);
        u8::try_from((reduced * 100) / original_length).unwrap_or(100)
    };
    let news_items_found = cleaned.lines().filter(|line| looks_like_article_marker(line)).count();
    CleaningStats {
        original_length,
        cleaned_length,
        reduction_percent,
        news_items_found,
    }
}

// ============================================================================
// SECTION: Cleaner Trait
// ============================================================================

/// Host-aware content cleaner.
///
/// # Invariants
/// - Implementations must be idempotent: `clean(clean(x)) == clean(x)`.
pub trait ContentCleaner {
    /// Cleans raw extractable content for the given source URL.
    fn clean(&self, raw_content: &str, url: &str) -> String;
}

/// Default line-heuristic cleaner used when no host-specific cleaner is
/// configured.
///
/// Strips common navigation/boilerplate lines (by keyword match, case
/// insensitive) and collapses runs of blank lines, while always preserving
/// lines that look like article or paragraph markers.
#[derive(Debug, Clone, Default)]
pub struct DefaultContentCleaner {
    /// Additional per-host boilerplate keywords, merged with the built-ins.
    extra_boilerplate_markers: BTreeSet<String>,
}

impl DefaultContentCleaner {
    /// Creates a cleaner with additional boilerplate keywords for specific
    /// hosts.
    #[must_use]
    pub fn with_extra_markers(markers: impl IntoIterator<Item = String>) -> Self {
        Self {
            extra_boilerplate_markers: markers.into_iter().collect(),
        }
    }
}

impl ContentCleaner for DefaultContentCleaner {
    fn clean(&self, raw_content: &str, _url: &str) -> String {
        clean(raw_content, &self.extra_boilerplate_markers)
    }
}

// ============================================================================
// SECTION: Cleaning
// ============================================================================

const BUILTIN_BOILERPLATE_MARKERS: &[&str] = &[
    "skip to content",
    "skip to main",
    "cookie",
    "subscribe to our newsletter",
    "all rights reserved",
    "share this",
    "related articles",
    "back to top",
    "privacy policy",
    "terms of service",
    "follow us on",
];

/// Cleans raw content, stripping boilerplate lines while preserving article
/// and paragraph numeral markers.
///
/// # Invariants
/// - Idempotent: calling `clean` on already-cleaned content returns the same
///   text unchanged.
#[must_use]
pub fn clean(raw_content: &str, extra_markers: &BTreeSet<String>) -> String {
    let mut out_lines: Vec<&str> = Vec::new();
    let mut previous_blank = false;

    for line in raw_content.lines() {
        let trimmed = line.trim();

        if trimmed.is_empty() {
            if !previous_blank {
                out_lines.push("");
            }
            previous_blank = true;
            continue;
        }

        if looks_like_article_marker(trimmed) {
            out_lines.push(line);
            previous_blank = false;
            continue;
        }

        if is_boilerplate_line(trimmed, extra_markers) {
            continue;
        }

        out_lines.push(line);
        previous_blank = false;
    }

    let mut cleaned = out_lines.join("\n");
    while cleaned.starts_with('\n') {
        cleaned.remove(0);
    }
    while cleaned.ends_with('\n') {
        cleaned.pop();
    }
    cleaned
}

/// Returns true when a trimmed line matches a known boilerplate marker.
fn is_boilerplate_line(trimmed: &str, extra_markers: &BTreeSet<String>) -> bool {
    let lower = trimmed.to_lowercase();
    BUILTIN_BOILERPLATE_MARKERS.iter().any(|marker| lower.contains(marker))
        || extra_markers.iter().any(|marker| lower.contains(marker.as_str()))
}

/// Returns true when a trimmed line looks like an article-number or
/// paragraph-numeral marker ("Članak 1.", "(1)", "Article 5").
#[must_use]
pub fn looks_like_article_marker(trimmed: &str) -> bool {
    let lower = trimmed.to_lowercase();
    if lower.starts_with("članak") || lower.starts_with("article") || lower.starts_with("clause") {
        return true;
    }
    let bytes = trimmed.as_bytes();
    if bytes.first() == Some(&b'(') {
        if let Some(close) = trimmed.find(')') {
            let inner = &trimmed[1..close];
            return !inner.is_empty() && inner.chars().all(|c| c.is_ascii_digit());
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_boilerplate_lines() {
        let raw = "Cookie policy notice\nČlanak 1.\nThe rate is 25%.\nAll rights reserved.";
        let cleaned = clean(raw, &BTreeSet::new());
        assert!(!cleaned.contains("Cookie policy"));
        assert!(!cleaned.contains("All rights reserved"));
        assert!(cleaned.contains("Članak 1."));
        assert!(cleaned.contains("The rate is 25%."));
    }

    #[test]
    fn preserves_paragraph_numerals() {
        let raw = "(1) The threshold applies to all buyers.";
        let cleaned = clean(raw, &BTreeSet::new());
        assert_eq!(cleaned, raw);
    }

    #[test]
    fn is_idempotent() {
        let raw = "Cookie policy\nČlanak 2.\nSome text.\n\n\nMore text.";
        let once = clean(raw, &BTreeSet::new());
        let twice = clean(&once, &BTreeSet::new());
        assert_eq!(once, twice);
    }

    #[test]
    fn stats_report_reduction() {
        let raw = "Cookie policy\nČlanak 2.\nSome text.";
        let cleaned = clean(raw, &BTreeSet::new());
        let computed = stats(raw, &cleaned);
        assert_eq!(computed.original_length, raw.len());
        assert_eq!(computed.cleaned_length, cleaned.len());
        assert_eq!(computed.news_items_found, 1);
    }

    #[test]
    fn default_cleaner_merges_extra_markers() {
        let cleaner = DefaultContentCleaner::with_extra_markers(["bespoke boilerplate".to_string()]);
        let raw = "Bespoke boilerplate line\nČlanak 3.\nKept text.";
        let cleaned = cleaner.clean(raw, "https://example.test");
        assert!(!cleaned.contains("Bespoke boilerplate"));
        assert!(cleaned.contains("Kept text."));
    }
}
