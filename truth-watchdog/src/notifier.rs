// truth-watchdog/src/notifier.rs
// ============================================================================
// Module: Alert Notifier
// Description: Fan-out for CRITICAL watchdog alerts (§4.10).
// Purpose: Deliver an alert to whatever external channel the deployment
//          configures, or log it when none is configured.
// Dependencies: reqwest, serde_json, tracing
// ============================================================================

//! ## Overview
//! §4.10 calls for critical alerts to "fan out to Slack and email". No SMTP
//! dependency exists anywhere in this workspace's stack, so [`SlackNotifier`]
//! is the only wired external channel; email fan-out is left as an open
//! decision (see `DESIGN.md`). [`LogNotifier`] is the always-available
//! fallback, grounded in the same one-record-per-delivery shape the broker's
//! log sink uses, adapted to `tracing` rather than a raw [`std::io::Write`]
//! so it composes with the rest of the ambient logging stack.

use reqwest::blocking::Client;
use std::time::Duration;

use crate::error::WatchdogError;
use crate::report::CheckResult;

const USER_AGENT: &str = "truth-watchdog/0.1";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Delivers a critical watchdog alert to an external channel.
pub trait Notifier: Send + Sync {
    /// Dispatches `result`, which the caller has already confirmed is
    /// [`crate::report::CheckStatus::Critical`].
    ///
    /// # Errors
    ///
    /// Returns [`WatchdogError::Notify`] if the channel rejects or cannot
    /// reach the alert.
    fn notify(&self, result: &CheckResult) -> Result<(), WatchdogError>;
}

/// Posts a Slack incoming-webhook message for each critical alert.
pub struct SlackNotifier {
    client: Client,
    webhook_url: String,
    channel: Option<String>,
}

impl SlackNotifier {
    /// Builds a notifier posting to `webhook_url`, optionally overriding
    /// the channel the webhook was configured with.
    ///
    /// # Errors
    ///
    /// Returns [`WatchdogError::Notify`] if the underlying HTTP client
    /// cannot be constructed.
    pub fn new(webhook_url: impl Into<String>, channel: Option<String>) -> Result<Self, WatchdogError> {
        let client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|err| WatchdogError::Notify(err.to_string()))?;
        Ok(Self { client, webhook_url: webhook_url.into(), channel })
    }
}

impl Notifier for SlackNotifier {
    fn notify(&self, result: &CheckResult) -> Result<(), WatchdogError> {
        let mut body = serde_json::json!({
            "text": format!(
                "*{}* CRITICAL on `{}`: {}",
                result.alert_type, result.entity_id, result.message
            ),
        });
        if let Some(channel) = &self.channel {
            body["channel"] = serde_json::Value::String(channel.clone());
        }
        let response = self.client.post(&self.webhook_url).json(&body).send().map_err(|err| WatchdogError::Notify(err.to_string()))?;
        if !response.status().is_success() {
            return Err(WatchdogError::Notify(format!("slack webhook returned status {}", response.status())));
        }
        Ok(())
    }
}

/// Log-only fallback notifier used when no external channel is
/// configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, result: &CheckResult) -> Result<(), WatchdogError> {
        tracing::error!(
            alert_type = result.alert_type,
            entity_id = %result.entity_id,
            message = %result.message,
            "critical watchdog alert (no external notifier configured)"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::report::CheckStatus;

    use super::*;

    #[test]
    fn log_notifier_never_fails() {
        let notifier = LogNotifier;
        let result = CheckResult::new("STALE_SOURCE", "source-1", CheckStatus::Critical, "14 days stale");
        notifier.notify(&result).expect("notify");
    }
}
