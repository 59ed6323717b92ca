// truth-watchdog/src/llm_health.rs
// ============================================================================
// Module: LLM Health Check
// Description: Probes each configured LLM provider endpoint and folds the
//              result into its circuit breaker (§4.10, §4.5).
// Purpose: Surface a provider outage as a CRITICAL alert the moment its
//          circuit opens, rather than waiting for the next extractor run
//          to hit `CircuitOpen`.
// Dependencies: time, truth-llm
// ============================================================================

//! ## Overview
//! The health probe uses its own 5-second deadline (§5), distinct from the
//! 60-second deadline `LlmRunner` uses for real chat completions — a stuck
//! provider should not make the watchdog cadence itself stall.

use std::time::Duration;

use time::OffsetDateTime;
use truth_llm::CircuitBreakerStore;
use truth_llm::CircuitState;
use truth_llm::HealthStatus;
use truth_llm::HttpLlmTransport;
use truth_llm::LlmTransport;
use truth_llm::load_or_init;

use crate::error::WatchdogError;
use crate::report::CheckResult;
use crate::report::CheckStatus;

/// Check identifier used as `Alert::alert_type`.
pub const ALERT_TYPE: &str = "LLM_CIRCUIT_OPEN";

/// Deadline for the health probe itself, independent of the runner's
/// normal chat-completion timeout (§5).
pub const HEALTH_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// A provider endpoint this check probes and folds into its circuit
/// breaker state.
pub struct ProviderTarget {
    /// Identifier used both as the circuit breaker key and the alert's
    /// `entity_id`.
    pub provider_id: String,
    /// Base URL the health probe is issued against.
    pub endpoint: String,
    /// Bearer credential for cloud providers; `None` for local ones.
    pub api_key: Option<String>,
}

/// Probes every target in `targets`, updates its persisted circuit
/// breaker record, and raises [`CheckStatus::Critical`] for any provider
/// whose circuit is open as a result (§4.10).
///
/// # Errors
///
/// Returns [`WatchdogError`] if the probe transport cannot be constructed
/// or the circuit breaker store fails.
pub fn check(store: &dyn CircuitBreakerStore, targets: &[ProviderTarget], now: OffsetDateTime) -> Result<Vec<CheckResult>, WatchdogError> {
    let transport = HttpLlmTransport::new(HEALTH_PROBE_TIMEOUT).map_err(|err| WatchdogError::Notify(err.to_string()))?;
    check_with_transport(&transport, store, targets, now)
}

/// As [`check`], but against a caller-supplied [`LlmTransport`] so tests
/// can substitute a fake without binding to `reqwest`.
///
/// # Errors
///
/// Returns [`WatchdogError`] if the circuit breaker store fails.
pub fn check_with_transport(
    transport: &dyn LlmTransport,
    store: &dyn CircuitBreakerStore,
    targets: &[ProviderTarget],
    now: OffsetDateTime,
) -> Result<Vec<CheckResult>, WatchdogError> {
    let mut results = Vec::with_capacity(targets.len());
    for target in targets {
        let record = load_or_init(store, &target.provider_id, now)?;
        let status = transport.health(&target.endpoint, target.api_key.as_deref());
        let record = match status {
            Ok(health) if health.is_ok() => record.record_success(now),
            Ok(health) => record.record_failure(now, format!("{health:?}")),
            Err(err) => record.record_failure(now, err.to_string()),
        };
        store.save(&record, now)?;

        let check_status = if record.state == CircuitState::Open { CheckStatus::Critical } else { CheckStatus::Healthy };
        let message = format!("circuit {:?}, {} consecutive failures", record.state, record.consecutive_failures);
        results.push(CheckResult::new(ALERT_TYPE, target.provider_id.clone(), check_status, message));
    }
    Ok(results)
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::sync::Mutex;

    use truth_llm::ChatRequest;
    use truth_llm::ChatResponse;
    use truth_llm::TransportError;

    use super::*;

    struct StubTransport {
        outcome: Result<HealthStatus, TransportError>,
    }

    impl LlmTransport for StubTransport {
        fn chat(&self, _request: &ChatRequest) -> Result<ChatResponse, TransportError> {
            Err(TransportError::Unknown("not used in this test".to_string()))
        }

        fn health(&self, _endpoint: &str, _api_key: Option<&str>) -> Result<HealthStatus, TransportError> {
            self.outcome.clone()
        }
    }

    struct StubStore {
        records: Mutex<RefCell<HashMap<String, (truth_llm::CircuitBreakerRecord, OffsetDateTime)>>>,
    }

    impl StubStore {
        fn new() -> Self {
            Self { records: Mutex::new(RefCell::new(HashMap::new())) }
        }
    }

    impl CircuitBreakerStore for StubStore {
        fn load(&self, provider_id: &str) -> Result<Option<(truth_llm::CircuitBreakerRecord, OffsetDateTime)>, truth_llm::CircuitBreakerStoreError> {
            Ok(self.records.lock().expect("lock").borrow().get(provider_id).cloned())
        }

        fn save(&self, record: &truth_llm::CircuitBreakerRecord, now: OffsetDateTime) -> Result<(), truth_llm::CircuitBreakerStoreError> {
            self.records.lock().expect("lock").borrow_mut().insert(record.provider_id.clone(), (record.clone(), now));
            Ok(())
        }
    }

    #[test]
    fn healthy_probe_keeps_circuit_healthy() {
        let transport = StubTransport { outcome: Ok(HealthStatus::Ok) };
        let store = StubStore::new();
        let targets = vec![ProviderTarget { provider_id: "ollama".to_string(), endpoint: "http://localhost:11434".to_string(), api_key: None }];
        let results = check_with_transport(&transport, &store, &targets, OffsetDateTime::now_utc()).expect("check");
        assert_eq!(results[0].status, CheckStatus::Healthy);
    }

    #[test]
    fn repeated_failures_open_the_circuit() {
        let transport = StubTransport { outcome: Err(TransportError::Timeout) };
        let store = StubStore::new();
        let now = OffsetDateTime::now_utc();
        let targets = vec![ProviderTarget { provider_id: "openai".to_string(), endpoint: "https://api.openai.com".to_string(), api_key: None }];
        for _ in 0..5 {
            check_with_transport(&transport, &store, &targets, now).expect("check");
        }
        let results = check_with_transport(&transport, &store, &targets, now).expect("check");
        assert_eq!(results[0].status, CheckStatus::Critical);
    }
}
