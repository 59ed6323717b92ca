// truth-cli/src/i18n.rs
// ============================================================================
// Module: CLI Internationalization Helpers
// Description: Provides message catalog and translation utilities for the CLI.
// Purpose: Centralize user-facing strings for future localization support.
// Dependencies: Standard library collections and formatting utilities.
// ============================================================================

//! ## Overview
//! The Truth Pipeline CLI stores user-facing strings in a small translation
//! catalog to enforce consistent messaging and to prepare for future locales.
//! All runtime output should be routed through the [`t!`](crate::t) macro.
//!
//! ## Invariants
//! - The catalog is initialized once and read-only thereafter.
//! - Missing keys fall back to the key itself to avoid panics.
//! - Placeholder substitutions preserve deterministic order.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::sync::OnceLock;

// ============================================================================
// SECTION: Types
// ============================================================================

/// A formatted message argument captured by the [`macro@crate::t`] macro.
#[derive(Clone)]
pub struct MessageArg {
    /// The placeholder name used in message templates (e.g., `"path"`).
    pub key: &'static str,
    /// The formatted string value to substitute for this placeholder.
    pub value: String,
}

impl MessageArg {
    /// Constructs a new [`MessageArg`] from a key and displayable value.
    pub fn new(key: &'static str, value: impl Into<String>) -> Self {
        Self { key, value: value.into() }
    }
}

// ============================================================================
// SECTION: Catalog
// ============================================================================

/// Static catalog entries loaded into the localized message bundle.
const CATALOG_ITEMS: &[(&str, &str)] = &[
    ("main.version", "truth-pipeline-cli {version}"),
    ("output.stream.stdout", "stdout"),
    ("output.stream.stderr", "stderr"),
    ("output.stream.unknown", "output"),
    ("output.write_failed", "Failed to write to {stream}: {error}"),
    ("config.load_failed", "Failed to load config: {error}"),
    ("runtime.build_failed", "Failed to initialize runtime: {error}"),
    ("extractor.run.ok", "Evidence {evidence_id}: {status} ({count} candidate fact(s) produced)"),
    ("extractor.run.failed", "Extractor run failed: {error}"),
    ("extractor.batch.summary", "Extractor batch: {succeeded} succeeded, {failed} failed"),
    ("extractor.batch.error_line", "- {error}"),
    ("extractor.batch.failed", "Extractor batch failed: {error}"),
    ("composer.batch.summary", "Composer batch: {succeeded} succeeded, {failed} failed"),
    ("composer.batch.error_line", "- {error}"),
    ("composer.batch.failed", "Composer batch failed: {error}"),
    ("releaser.release.ok", "Released {release_id} (version {version})"),
    ("releaser.release.failed", "Release failed: {error}"),
    ("releaser.rollback.version_invalid", "Invalid --version {version}: expected major.minor.patch"),
    ("releaser.rollback.not_latest", "Release {release_id} (version {version}) is not the current latest release; rollback refused"),
    ("releaser.rollback.no_releases", "No release has been cut yet; nothing to roll back"),
    ("releaser.rollback.dry_run", "Dry run: would roll back {release_id} (version {version}), restoring {previous} as latest"),
    ("releaser.rollback.dry_run.no_previous", "none"),
    ("releaser.rollback.ok", "Rolled back to the release preceding {release_id} (version {version})"),
    ("releaser.rollback.failed", "Rollback failed: {error}"),
    ("watchdog.report.header", "Watchdog report ({count} check(s))"),
    ("watchdog.report.line", "[{status}] {alert_type} {entity_id}: {message}"),
    ("watchdog.report.critical_summary", "{count} critical check(s) failed"),
    ("watchdog.run.failed", "Watchdog run failed: {error}"),
    ("watchdog.audit.failed", "Watchdog audit failed: {error}"),
    ("watchdog.notifier.failed", "Failed to build notifier: {error}"),
];

// ============================================================================
// SECTION: Translation
// ============================================================================

/// Translates `key` using the English fallback catalog while substituting `args`.
#[must_use]
pub fn translate(key: &str, args: Vec<MessageArg>) -> String {
    let template = catalog().get(key).copied().unwrap_or(key);
    if args.is_empty() {
        return template.to_string();
    }

    let mut result = template.to_string();
    for arg in args {
        let placeholder = format!("{{{}}}", arg.key);
        result = result.replace(&placeholder, &arg.value);
    }
    result
}

/// Returns the static English catalog used by the CLI.
fn catalog() -> &'static HashMap<&'static str, &'static str> {
    static CATALOG: OnceLock<HashMap<&'static str, &'static str>> = OnceLock::new();

    CATALOG.get_or_init(|| CATALOG_ITEMS.iter().copied().collect())
}

// ============================================================================
// SECTION: Macro
// ============================================================================

/// Formats a localized message from a key and named arguments.
///
/// # Arguments
///
/// - `$key` must match a catalog entry.
/// - Named arguments are substituted into `{placeholder}` positions.
///
/// # Returns
///
/// A localized [`String`] with placeholders substituted.
#[macro_export]
macro_rules! t {
    ($key:literal $(, $name:ident = $value:expr )* $(,)?) => {{
        let args = ::std::vec![
            $(
                $crate::i18n::MessageArg::new(stringify!($name), $value.to_string()),
            )*
        ];
        $crate::i18n::translate($key, args)
    }};
}
