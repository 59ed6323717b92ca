// truth-watchdog/src/quality_degradation.rs
// ============================================================================
// Module: Quality Degradation Check
// Description: Mean AgentRun confidence per agent type over the trailing
//              7-day window (§4.10).
// Purpose: Catch a prompt regression or provider drift before it produces
//          a run of low-confidence Rules.
// Dependencies: time, truth-core
// ============================================================================

use time::OffsetDateTime;
use truth_core::AgentRunRepository;
use truth_core::RepoResult;

use crate::report::CheckResult;
use crate::report::CheckStatus;
use crate::thresholds::WatchdogThresholds;

/// Check identifier used as `Alert::alert_type`.
pub const ALERT_TYPE: &str = "QUALITY_DEGRADATION";

/// Evaluates the quality-degradation check for every agent type in
/// `agent_types` (§4.10: "mean Rule confidence over 7 days; WARN below
/// 0.85, CRITICAL below 0.75"; confidence is tracked per `AgentRun`, the
/// producer of every composed Rule — see [`crate::DESIGN`]).
///
/// # Errors
///
/// Returns [`truth_core::RepoError`] on storage failure.
pub fn check(
    agent_run_repo: &dyn AgentRunRepository,
    agent_types: &[String],
    now: OffsetDateTime,
    thresholds: &WatchdogThresholds,
) -> RepoResult<Vec<CheckResult>> {
    let since = now - thresholds.trailing_window;
    let mut results = Vec::with_capacity(agent_types.len());
    for agent_type in agent_types {
        let mean_confidence = agent_run_repo.mean_confidence_since(agent_type, since)?;
        let result = match mean_confidence {
            None => CheckResult::new(ALERT_TYPE, agent_type.clone(), CheckStatus::Healthy, "no completed runs in the trailing window"),
            Some(mean_confidence) => {
                let status = CheckStatus::from_thresholds(
                    mean_confidence,
                    thresholds.quality_degradation_warn_confidence,
                    thresholds.quality_degradation_critical_confidence,
                    false,
                );
                CheckResult::new(ALERT_TYPE, agent_type.clone(), status, format!("mean confidence {mean_confidence:.3} over the trailing window"))
            }
        };
        results.push(result);
    }
    Ok(results)
}

#[cfg(test)]
mod tests {
    use truth_core::model::AgentRun;
    use truth_core::repo::RepoError;
    use truth_core::AgentRunId;

    use super::*;

    struct StubAgentRunRepo {
        mean_confidence: Option<f64>,
    }

    impl AgentRunRepository for StubAgentRunRepo {
        fn put(&self, run: AgentRun) -> RepoResult<AgentRun> {
            Ok(run)
        }
        fn get(&self, id: &AgentRunId) -> RepoResult<AgentRun> {
            Err(RepoError::NotFound(id.to_string()))
        }
        fn mean_confidence_since(&self, _agent_type: &str, _since: OffsetDateTime) -> RepoResult<Option<f64>> {
            Ok(self.mean_confidence)
        }
    }

    #[test]
    fn high_confidence_is_healthy() {
        let repo = StubAgentRunRepo { mean_confidence: Some(0.95) };
        let results = check(&repo, &["extractor".to_string()], OffsetDateTime::UNIX_EPOCH, &WatchdogThresholds::default()).expect("check");
        assert_eq!(results[0].status, CheckStatus::Healthy);
    }

    #[test]
    fn below_warn_confidence_is_warning() {
        let repo = StubAgentRunRepo { mean_confidence: Some(0.80) };
        let results = check(&repo, &["extractor".to_string()], OffsetDateTime::UNIX_EPOCH, &WatchdogThresholds::default()).expect("check");
        assert_eq!(results[0].status, CheckStatus::Warning);
    }

    #[test]
    fn below_critical_confidence_is_critical() {
        let repo = StubAgentRunRepo { mean_confidence: Some(0.60) };
        let results = check(&repo, &["extractor".to_string()], OffsetDateTime::UNIX_EPOCH, &WatchdogThresholds::default()).expect("check");
        assert_eq!(results[0].status, CheckStatus::Critical);
    }

    #[test]
    fn no_runs_is_healthy() {
        let repo = StubAgentRunRepo { mean_confidence: None };
        let results = check(&repo, &["extractor".to_string()], OffsetDateTime::UNIX_EPOCH, &WatchdogThresholds::default()).expect("check");
        assert_eq!(results[0].status, CheckStatus::Healthy);
    }
}
