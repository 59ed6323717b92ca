// truth-config/src/examples.rs
// ============================================================================
// Module: Config Examples
// Description: Canonical example configuration payload.
// Purpose: Deterministic example for docs, onboarding, and the CLI's
//          `--print-example-config` convenience.
// Dependencies: std
// ============================================================================

//! ## Overview
//! One canonical example `truth-pipeline.toml`, covering every top-level
//! section [`crate::TruthConfig`] parses.

/// Returns a canonical example `truth-pipeline.toml` configuration.
#[must_use]
pub fn config_toml_example() -> String {
    String::from(
        r#"[database]
path = "truth-pipeline.db"
journal_mode = "wal"
sync_mode = "full"
busy_timeout_ms = 5000

[fetcher]
allow_http = false
timeout_ms = 30000
max_response_bytes = 26214400
allowed_hosts = []
user_agent = "truth-pipeline/0.1"

[concurrency]
fetch_concurrency = 4

[webhook]
# hmac_secret = "replace-me"

[alerting]
# slack_webhook_url = "https://hooks.slack.com/services/..."
# slack_channel = "#truth-pipeline-alerts"
# digest_email = "oncall@example.test"

[watchdog]
# stale_source_warn_days = 7
# stale_source_critical_days = 14
# alert_dedup_window_minutes = 60
"#,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TruthConfig;

    #[test]
    fn example_config_parses_and_validates() {
        let config: TruthConfig = toml::from_str(&config_toml_example()).expect("example config parses");
        config.validate().expect("example config validates");
    }
}
