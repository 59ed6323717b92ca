// truth-config/src/config.rs
// ============================================================================
// Module: Truth Pipeline Configuration
// Description: Configuration loading and validation for the regulatory-truth
//              pipeline.
// Purpose: Provide strict, fail-closed config parsing with hard limits,
//          assembling the TOML-loaded base with the §6 environment
//          variable overrides into one runtime config object.
// Dependencies: truth-core, truth-store-sqlite, truth-providers,
//               truth-watchdog, serde, toml, thiserror
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path
//! limits. Missing or invalid configuration fails closed to preserve the
//! pipeline's security posture: an unparseable or over-limit file is a hard
//! error, never silently skipped. [`TruthConfig::load`] reads the TOML,
//! validates every section, then merges the process environment's
//! [`crate::env::EnvOverrides`] on top to produce the object every binary
//! in this workspace actually runs with.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use thiserror::Error;
use truth_providers::FetcherConfig;
use truth_store_sqlite::SqliteStoreConfig;
use truth_watchdog::WatchdogThresholds;

use crate::env::EnvOverrides;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "truth-pipeline.toml";
/// Environment variable used to override the config path.
pub(crate) const CONFIG_ENV_VAR: &str = "TRUTH_PIPELINE_CONFIG";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Default HTTP fetch timeout in milliseconds.
const DEFAULT_FETCH_TIMEOUT_MS: u64 = 30_000;
/// Default maximum fetched-response size in bytes (§4.3: fetch concurrency
/// model implies bounded per-response memory use).
const DEFAULT_MAX_RESPONSE_BYTES: usize = 25 * 1024 * 1024;
/// Default fetch concurrency (§5: "fetch concurrency 4").
const DEFAULT_FETCH_CONCURRENCY: usize = 4;
/// Maximum length of a webhook HMAC secret.
const MAX_WEBHOOK_SECRET_LENGTH: usize = 512;

// ============================================================================
// SECTION: Top-Level Config
// ============================================================================

/// Regulatory-truth pipeline configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct TruthConfig {
    /// Content store configuration (C1).
    pub database: DatabaseConfig,
    /// Fetcher configuration (C4).
    #[serde(default)]
    pub fetcher: FetcherSettings,
    /// Concurrency configuration (§5).
    #[serde(default)]
    pub concurrency: ConcurrencyConfig,
    /// Webhook ingest configuration (C4, §6).
    #[serde(default)]
    pub webhook: WebhookConfig,
    /// Alerting configuration (C10, §6).
    #[serde(default)]
    pub alerting: AlertingConfig,
    /// Watchdog threshold overrides (C10, §4.10).
    #[serde(default)]
    pub watchdog: WatchdogConfig,
}

impl TruthConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading, parsing, or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes).map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        let config: Self = toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.database.validate()?;
        self.fetcher.validate()?;
        self.concurrency.validate()?;
        self.webhook.validate()?;
        self.alerting.validate()?;
        Ok(())
    }

    /// Builds the watchdog thresholds this configuration resolves to,
    /// after applying `overrides` on top of the TOML-declared base.
    #[must_use]
    pub fn resolved_watchdog_thresholds(&self, overrides: &EnvOverrides) -> WatchdogThresholds {
        let mut thresholds = self.watchdog.to_thresholds();
        overrides.apply_to_thresholds(&mut thresholds);
        thresholds
    }
}

// ============================================================================
// SECTION: Database
// ============================================================================

/// Content-store configuration (C1), wrapping [`SqliteStoreConfig`].
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// The underlying `SQLite` store configuration.
    #[serde(flatten)]
    pub store: SqliteStoreConfig,
}

impl DatabaseConfig {
    /// Validates the database path against security limits.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_path_string("database.path", &self.store.path.to_string_lossy())
    }
}

// ============================================================================
// SECTION: Fetcher
// ============================================================================

/// TOML-facing fetcher settings (C4), converted into
/// [`truth_providers::FetcherConfig`] via [`FetcherSettings::to_fetcher_config`].
/// Timeouts are expressed in milliseconds rather than `Duration` so the
/// struct can derive [`Deserialize`] directly.
#[derive(Debug, Clone, Deserialize)]
pub struct FetcherSettings {
    /// Allow cleartext `http://` URLs (disabled by default).
    #[serde(default)]
    pub allow_http: bool,
    /// Request timeout in milliseconds.
    #[serde(default = "default_fetch_timeout_ms")]
    pub timeout_ms: u64,
    /// Maximum response size accepted, in bytes.
    #[serde(default = "default_max_response_bytes")]
    pub max_response_bytes: usize,
    /// Optional host allowlist; empty permits any host that passes the
    /// scheme check.
    #[serde(default)]
    pub allowed_hosts: Vec<String>,
    /// `User-Agent` sent with every request.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for FetcherSettings {
    fn default() -> Self {
        Self {
            allow_http: false,
            timeout_ms: default_fetch_timeout_ms(),
            max_response_bytes: default_max_response_bytes(),
            allowed_hosts: Vec::new(),
            user_agent: default_user_agent(),
        }
    }
}

impl FetcherSettings {
    /// Validates fetcher settings.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout_ms == 0 {
            return Err(ConfigError::Invalid("fetcher.timeout_ms must be greater than zero".to_string()));
        }
        if self.max_response_bytes == 0 {
            return Err(ConfigError::Invalid("fetcher.max_response_bytes must be greater than zero".to_string()));
        }
        if self.user_agent.trim().is_empty() {
            return Err(ConfigError::Invalid("fetcher.user_agent must be non-empty".to_string()));
        }
        Ok(())
    }

    /// Converts these settings into a runtime [`FetcherConfig`].
    #[must_use]
    pub fn to_fetcher_config(&self) -> FetcherConfig {
        let allowed_hosts = if self.allowed_hosts.is_empty() { None } else { Some(self.allowed_hosts.iter().cloned().collect()) };
        FetcherConfig {
            allow_http: self.allow_http,
            timeout: std::time::Duration::from_millis(self.timeout_ms),
            max_response_bytes: self.max_response_bytes,
            allowed_hosts,
            user_agent: self.user_agent.clone(),
        }
    }
}

const fn default_fetch_timeout_ms() -> u64 {
    DEFAULT_FETCH_TIMEOUT_MS
}

const fn default_max_response_bytes() -> usize {
    DEFAULT_MAX_RESPONSE_BYTES
}

fn default_user_agent() -> String {
    "truth-pipeline/0.1".to_string()
}

// ============================================================================
// SECTION: Concurrency
// ============================================================================

/// Concurrency configuration (§5).
#[derive(Debug, Clone, Deserialize)]
pub struct ConcurrencyConfig {
    /// Number of concurrent fetch workers (§5: default 4).
    #[serde(default = "default_fetch_concurrency")]
    pub fetch_concurrency: usize,
}

impl Default for ConcurrencyConfig {
    fn default() -> Self {
        Self { fetch_concurrency: default_fetch_concurrency() }
    }
}

impl ConcurrencyConfig {
    /// Validates concurrency settings.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.fetch_concurrency == 0 {
            return Err(ConfigError::Invalid("concurrency.fetch_concurrency must be greater than zero".to_string()));
        }
        Ok(())
    }
}

const fn default_fetch_concurrency() -> usize {
    DEFAULT_FETCH_CONCURRENCY
}

// ============================================================================
// SECTION: Webhook
// ============================================================================

/// Webhook ingest configuration (C4, §6).
#[derive(Debug, Clone, Deserialize, Default)]
pub struct WebhookConfig {
    /// Shared HMAC secret used to verify inbound webhook signatures.
    #[serde(default)]
    pub hmac_secret: Option<String>,
}

impl WebhookConfig {
    /// Validates webhook configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(secret) = &self.hmac_secret {
            if secret.trim().is_empty() {
                return Err(ConfigError::Invalid("webhook.hmac_secret must be non-empty when set".to_string()));
            }
            if secret.len() > MAX_WEBHOOK_SECRET_LENGTH {
                return Err(ConfigError::Invalid("webhook.hmac_secret exceeds max length".to_string()));
            }
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Alerting
// ============================================================================

/// Alerting and notification configuration (C10, §6).
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AlertingConfig {
    /// Slack incoming-webhook URL for critical alerts.
    #[serde(default)]
    pub slack_webhook_url: Option<String>,
    /// Optional Slack channel override.
    #[serde(default)]
    pub slack_channel: Option<String>,
    /// Recipient for the daily digest email.
    #[serde(default)]
    pub digest_email: Option<String>,
}

impl AlertingConfig {
    /// Validates alerting configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(url) = &self.slack_webhook_url
            && !(url.starts_with("https://") || url.starts_with("http://"))
        {
            return Err(ConfigError::Invalid("alerting.slack_webhook_url must include http:// or https://".to_string()));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Watchdog
// ============================================================================

/// TOML-facing watchdog threshold overrides (C10, §4.10). Any field left
/// unset in the config file falls back to [`WatchdogThresholds::default`];
/// fields set here are in turn overridable by `WATCHDOG_*` environment
/// variables via [`EnvOverrides::apply_to_thresholds`].
#[derive(Debug, Clone, Deserialize, Default)]
pub struct WatchdogConfig {
    /// Stale source WARN threshold, in days.
    #[serde(default)]
    pub stale_source_warn_days: Option<i64>,
    /// Stale source CRITICAL threshold, in days.
    #[serde(default)]
    pub stale_source_critical_days: Option<i64>,
    /// Scraper failure rate WARN threshold.
    #[serde(default)]
    pub scraper_failure_rate_warn: Option<f64>,
    /// Scraper failure rate CRITICAL threshold.
    #[serde(default)]
    pub scraper_failure_rate_critical: Option<f64>,
    /// Quality degradation WARN confidence threshold.
    #[serde(default)]
    pub quality_degradation_warn_confidence: Option<f64>,
    /// Quality degradation CRITICAL confidence threshold.
    #[serde(default)]
    pub quality_degradation_critical_confidence: Option<f64>,
    /// Rejection rate WARN threshold.
    #[serde(default)]
    pub rejection_rate_warn: Option<f64>,
    /// Rejection rate CRITICAL threshold.
    #[serde(default)]
    pub rejection_rate_critical: Option<f64>,
    /// Drainer stall WARN threshold, in minutes.
    #[serde(default)]
    pub drainer_stall_warn_minutes: Option<i64>,
    /// Drainer stall CRITICAL threshold, in minutes.
    #[serde(default)]
    pub drainer_stall_critical_minutes: Option<i64>,
    /// Queue backlog WARN depth.
    #[serde(default)]
    pub queue_backlog_warn_depth: Option<usize>,
    /// Queue backlog CRITICAL depth.
    #[serde(default)]
    pub queue_backlog_critical_depth: Option<usize>,
    /// Dead-letter WARN depth.
    #[serde(default)]
    pub dead_letter_warn_depth: Option<usize>,
    /// Dead-letter CRITICAL depth.
    #[serde(default)]
    pub dead_letter_critical_depth: Option<usize>,
    /// Alert dedup window, in minutes (§6: `ALERT_DEDUP_WINDOW_MINUTES`).
    #[serde(default)]
    pub alert_dedup_window_minutes: Option<i64>,
}

impl WatchdogConfig {
    /// Builds a [`WatchdogThresholds`] starting from
    /// [`WatchdogThresholds::default`] with every set field overridden.
    #[must_use]
    pub fn to_thresholds(&self) -> WatchdogThresholds {
        let mut thresholds = WatchdogThresholds::default();
        if let Some(value) = self.stale_source_warn_days {
            thresholds.stale_source_warn_days = value;
        }
        if let Some(value) = self.stale_source_critical_days {
            thresholds.stale_source_critical_days = value;
        }
        if let Some(value) = self.scraper_failure_rate_warn {
            thresholds.scraper_failure_rate_warn = value;
        }
        if let Some(value) = self.scraper_failure_rate_critical {
            thresholds.scraper_failure_rate_critical = value;
        }
        if let Some(value) = self.quality_degradation_warn_confidence {
            thresholds.quality_degradation_warn_confidence = value;
        }
        if let Some(value) = self.quality_degradation_critical_confidence {
            thresholds.quality_degradation_critical_confidence = value;
        }
        if let Some(value) = self.rejection_rate_warn {
            thresholds.rejection_rate_warn = value;
        }
        if let Some(value) = self.rejection_rate_critical {
            thresholds.rejection_rate_critical = value;
        }
        if let Some(value) = self.drainer_stall_warn_minutes {
            thresholds.drainer_stall_warn_minutes = value;
        }
        if let Some(value) = self.drainer_stall_critical_minutes {
            thresholds.drainer_stall_critical_minutes = value;
        }
        if let Some(value) = self.queue_backlog_warn_depth {
            thresholds.queue_backlog_warn_depth = value;
        }
        if let Some(value) = self.queue_backlog_critical_depth {
            thresholds.queue_backlog_critical_depth = value;
        }
        if let Some(value) = self.dead_letter_warn_depth {
            thresholds.dead_letter_warn_depth = value;
        }
        if let Some(value) = self.dead_letter_critical_depth {
            thresholds.dead_letter_critical_depth = value;
        }
        if let Some(minutes) = self.alert_dedup_window_minutes {
            thresholds.alert_dedup_window = time::Duration::minutes(minutes);
        }
        thresholds
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Error surfaced while loading or validating [`TruthConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Path Helpers
// ============================================================================

/// Resolves the config path from CLI or environment defaults.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates the resolved path against security limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a path string against length constraints.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    let path = Path::new(trimmed);
    for component in path.components() {
        let component_value = component.as_os_str().to_string_lossy();
        if component_value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_with_only_database_parses() {
        let config: TruthConfig = toml::from_str("[database]\npath = \"truth.db\"\n").expect("parse minimal config");
        config.validate().expect("minimal config validates");
        assert_eq!(config.concurrency.fetch_concurrency, DEFAULT_FETCH_CONCURRENCY);
        assert_eq!(config.fetcher.max_response_bytes, DEFAULT_MAX_RESPONSE_BYTES);
    }

    #[test]
    fn empty_database_path_is_rejected() {
        let config: TruthConfig = toml::from_str("[database]\npath = \"\"\n").expect("parse config");
        let err = config.validate().expect_err("empty path should be rejected");
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn zero_fetch_concurrency_is_rejected() {
        let config: TruthConfig = toml::from_str("[database]\npath = \"truth.db\"\n[concurrency]\nfetch_concurrency = 0\n").expect("parse config");
        let err = config.validate().expect_err("zero concurrency should be rejected");
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn slack_webhook_without_scheme_is_rejected() {
        let config: TruthConfig = toml::from_str("[database]\npath = \"truth.db\"\n[alerting]\nslack_webhook_url = \"hooks.slack.com/x\"\n").expect("parse config");
        let err = config.validate().expect_err("bad url should be rejected");
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn watchdog_overrides_apply_over_defaults() {
        let config: TruthConfig = toml::from_str("[database]\npath = \"truth.db\"\n[watchdog]\nstale_source_warn_days = 3\nalert_dedup_window_minutes = 15\n").expect("parse config");
        let thresholds = config.watchdog.to_thresholds();
        assert_eq!(thresholds.stale_source_warn_days, 3);
        assert_eq!(thresholds.alert_dedup_window, time::Duration::minutes(15));
        assert_eq!(thresholds.stale_source_critical_days, WatchdogThresholds::default().stale_source_critical_days);
    }

    #[test]
    fn fetcher_settings_convert_to_runtime_config() {
        let settings = FetcherSettings { allowed_hosts: vec!["example.test".to_string()], ..FetcherSettings::default() };
        let fetcher_config = settings.to_fetcher_config();
        assert!(fetcher_config.allowed_hosts.expect("allowlist set").contains("example.test"));
    }
}
