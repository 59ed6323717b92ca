// truth-config/src/env.rs
// ============================================================================
// Module: Environment Overrides
// Description: Resolves the §6 environment variables that override
//              watchdog thresholds and notification routing.
// Purpose: Keep the override-merge cascade (TOML base, then environment)
//          in one place, testable without touching the real process
//          environment.
// Dependencies: truth-watchdog
// ============================================================================

//! ## Overview
//! §6 names a handful of environment variables that are recognized
//! regardless of what the TOML config declares: `ALERT_DEDUP_WINDOW_MINUTES`,
//! `WATCHDOG_*` per-threshold overrides, `SLACK_WEBHOOK_URL`,
//! `SLACK_CHANNEL`, and `TRUTH_DIGEST_EMAIL`. [`EnvOverrides::resolve`]
//! reads every recognized variable once; [`EnvOverrides::apply_to_thresholds`]
//! then merges the resolved values onto a [`WatchdogThresholds`] built from
//! the TOML config. The `OLLAMA_*` and `AI_PROVIDER` variables are deliberately
//! not duplicated here: `truth-llm::env` already owns that cascade.

use truth_watchdog::WatchdogThresholds;

/// Looks up an environment-style variable by name.
pub trait EnvLookup {
    /// Returns the value of `key`, or `None` if unset.
    fn get(&self, key: &str) -> Option<String>;
}

impl<F> EnvLookup for F
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, key: &str) -> Option<String> {
        self(key)
    }
}

/// [`EnvLookup`] backed by the real process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvLookup for ProcessEnv {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

/// Resolved §6 environment overrides for alerting and watchdog thresholds.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnvOverrides {
    /// `ALERT_DEDUP_WINDOW_MINUTES`.
    pub alert_dedup_window_minutes: Option<i64>,
    /// `WATCHDOG_STALE_SOURCE_WARN_DAYS`.
    pub stale_source_warn_days: Option<i64>,
    /// `WATCHDOG_STALE_SOURCE_CRITICAL_DAYS`.
    pub stale_source_critical_days: Option<i64>,
    /// `WATCHDOG_SCRAPER_FAILURE_RATE_WARN`.
    pub scraper_failure_rate_warn: Option<f64>,
    /// `WATCHDOG_SCRAPER_FAILURE_RATE_CRITICAL`.
    pub scraper_failure_rate_critical: Option<f64>,
    /// `WATCHDOG_QUALITY_DEGRADATION_WARN_CONFIDENCE`.
    pub quality_degradation_warn_confidence: Option<f64>,
    /// `WATCHDOG_QUALITY_DEGRADATION_CRITICAL_CONFIDENCE`.
    pub quality_degradation_critical_confidence: Option<f64>,
    /// `WATCHDOG_REJECTION_RATE_WARN`.
    pub rejection_rate_warn: Option<f64>,
    /// `WATCHDOG_REJECTION_RATE_CRITICAL`.
    pub rejection_rate_critical: Option<f64>,
    /// `WATCHDOG_DRAINER_STALL_WARN_MINUTES`.
    pub drainer_stall_warn_minutes: Option<i64>,
    /// `WATCHDOG_DRAINER_STALL_CRITICAL_MINUTES`.
    pub drainer_stall_critical_minutes: Option<i64>,
    /// `WATCHDOG_QUEUE_BACKLOG_WARN_DEPTH`.
    pub queue_backlog_warn_depth: Option<usize>,
    /// `WATCHDOG_QUEUE_BACKLOG_CRITICAL_DEPTH`.
    pub queue_backlog_critical_depth: Option<usize>,
    /// `WATCHDOG_DEAD_LETTER_WARN_DEPTH`.
    pub dead_letter_warn_depth: Option<usize>,
    /// `WATCHDOG_DEAD_LETTER_CRITICAL_DEPTH`.
    pub dead_letter_critical_depth: Option<usize>,
    /// `SLACK_WEBHOOK_URL`.
    pub slack_webhook_url: Option<String>,
    /// `SLACK_CHANNEL`.
    pub slack_channel: Option<String>,
    /// `TRUTH_DIGEST_EMAIL`.
    pub digest_email: Option<String>,
}

impl EnvOverrides {
    /// Resolves every recognized §6 environment variable via `env`.
    #[must_use]
    pub fn resolve(env: &dyn EnvLookup) -> Self {
        Self {
            alert_dedup_window_minutes: parse_env(env, "ALERT_DEDUP_WINDOW_MINUTES"),
            stale_source_warn_days: parse_env(env, "WATCHDOG_STALE_SOURCE_WARN_DAYS"),
            stale_source_critical_days: parse_env(env, "WATCHDOG_STALE_SOURCE_CRITICAL_DAYS"),
            scraper_failure_rate_warn: parse_env(env, "WATCHDOG_SCRAPER_FAILURE_RATE_WARN"),
            scraper_failure_rate_critical: parse_env(env, "WATCHDOG_SCRAPER_FAILURE_RATE_CRITICAL"),
            quality_degradation_warn_confidence: parse_env(env, "WATCHDOG_QUALITY_DEGRADATION_WARN_CONFIDENCE"),
            quality_degradation_critical_confidence: parse_env(env, "WATCHDOG_QUALITY_DEGRADATION_CRITICAL_CONFIDENCE"),
            rejection_rate_warn: parse_env(env, "WATCHDOG_REJECTION_RATE_WARN"),
            rejection_rate_critical: parse_env(env, "WATCHDOG_REJECTION_RATE_CRITICAL"),
            drainer_stall_warn_minutes: parse_env(env, "WATCHDOG_DRAINER_STALL_WARN_MINUTES"),
            drainer_stall_critical_minutes: parse_env(env, "WATCHDOG_DRAINER_STALL_CRITICAL_MINUTES"),
            queue_backlog_warn_depth: parse_env(env, "WATCHDOG_QUEUE_BACKLOG_WARN_DEPTH"),
            queue_backlog_critical_depth: parse_env(env, "WATCHDOG_QUEUE_BACKLOG_CRITICAL_DEPTH"),
            dead_letter_warn_depth: parse_env(env, "WATCHDOG_DEAD_LETTER_WARN_DEPTH"),
            dead_letter_critical_depth: parse_env(env, "WATCHDOG_DEAD_LETTER_CRITICAL_DEPTH"),
            slack_webhook_url: env.get("SLACK_WEBHOOK_URL"),
            slack_channel: env.get("SLACK_CHANNEL"),
            digest_email: env.get("TRUTH_DIGEST_EMAIL"),
        }
    }

    /// Merges the resolved overrides onto `thresholds` in place. Unset
    /// variables leave the corresponding field untouched.
    pub fn apply_to_thresholds(&self, thresholds: &mut WatchdogThresholds) {
        if let Some(value) = self.alert_dedup_window_minutes {
            thresholds.alert_dedup_window = time::Duration::minutes(value);
        }
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
    }
}

fn parse_env<T: std::str::FromStr>(env: &dyn EnvLookup, key: &str) -> Option<T> {
    env.get(key).and_then(|value| value.parse().ok())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> + use<> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| ((*k).to_owned(), (*v).to_owned())).collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn unset_variables_leave_thresholds_untouched() {
        let overrides = EnvOverrides::resolve(&env_from(&[]));
        let mut thresholds = WatchdogThresholds::default();
        let baseline = thresholds;
        overrides.apply_to_thresholds(&mut thresholds);
        assert_eq!(thresholds, baseline);
    }

    #[test]
    fn alert_dedup_window_minutes_overrides_thresholds() {
        let overrides = EnvOverrides::resolve(&env_from(&[("ALERT_DEDUP_WINDOW_MINUTES", "90")]));
        let mut thresholds = WatchdogThresholds::default();
        overrides.apply_to_thresholds(&mut thresholds);
        assert_eq!(thresholds.alert_dedup_window, time::Duration::minutes(90));
    }

    #[test]
    fn watchdog_numeric_overrides_apply() {
        let overrides = EnvOverrides::resolve(&env_from(&[
            ("WATCHDOG_STALE_SOURCE_WARN_DAYS", "3"),
            ("WATCHDOG_QUEUE_BACKLOG_CRITICAL_DEPTH", "1000"),
        ]));
        let mut thresholds = WatchdogThresholds::default();
        overrides.apply_to_thresholds(&mut thresholds);
        assert_eq!(thresholds.stale_source_warn_days, 3);
        assert_eq!(thresholds.queue_backlog_critical_depth, 1000);
    }

    #[test]
    fn malformed_numeric_override_is_ignored() {
        let overrides = EnvOverrides::resolve(&env_from(&[("WATCHDOG_STALE_SOURCE_WARN_DAYS", "not-a-number")]));
        assert_eq!(overrides.stale_source_warn_days, None);
    }

    #[test]
    fn slack_and_digest_overrides_are_captured_verbatim() {
        let overrides = EnvOverrides::resolve(&env_from(&[
            ("SLACK_WEBHOOK_URL", "https://hooks.slack.com/services/x"),
            ("SLACK_CHANNEL", "#alerts"),
            ("TRUTH_DIGEST_EMAIL", "oncall@example.test"),
        ]));
        assert_eq!(overrides.slack_webhook_url.as_deref(), Some("https://hooks.slack.com/services/x"));
        assert_eq!(overrides.slack_channel.as_deref(), Some("#alerts"));
        assert_eq!(overrides.digest_email.as_deref(), Some("oncall@example.test"));
    }
}
