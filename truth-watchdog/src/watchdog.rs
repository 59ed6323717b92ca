// truth-watchdog/src/watchdog.rs
// ============================================================================
// Module: Watchdog Orchestrator
// Description: Runs every §4.10 check, persists and dedups the resulting
//              alerts, and fans critical ones out to a notifier.
// Purpose: The single entry point `truth-cli`'s `watchdog run`/`watchdog
//          audit` subcommands drive (C10).
// Dependencies: time, truth-core, truth-llm, truth-queue
// ============================================================================

//! ## Overview
//! `run_cadence` is the side-effecting path: every non-healthy result is
//! folded into [`truth_core::AlertRepository::record_occurrence`] (which
//! applies its own dedup window) and every critical one is handed to the
//! configured [`Notifier`]. `audit` runs the identical checks but performs
//! no persistence or notification, for a read-only CLI inspection.

use std::sync::Arc;

use time::OffsetDateTime;
use truth_core::AgentRunRepository;
use truth_core::AlertRepository;
use truth_core::CandidateFactRepository;
use truth_core::EvidenceRepository;
use truth_core::RuleRepository;
use truth_core::SourceId;
use truth_llm::CircuitBreakerStore;
use truth_queue::Queue;

use crate::drainer_stall;
use crate::error::WatchdogError;
use crate::llm_health;
use crate::llm_health::ProviderTarget;
use crate::notifier::Notifier;
use crate::progress_gates;
use crate::queue_backlog;
use crate::quality_degradation;
use crate::rejection_rate;
use crate::report::CheckResult;
use crate::report::CheckStatus;
use crate::report::WatchdogReport;
use crate::scraper_failure_rate;
use crate::stale_source;
use crate::thresholds::WatchdogThresholds;

/// The fixed set of entities each cadence run evaluates. None of these
/// change between runs within a deployment, so they are configured once
/// rather than threaded through every call.
pub struct WatchdogTargets {
    /// Sources checked for staleness and scraper failure rate.
    pub sources: Vec<SourceId>,
    /// Agent types checked for quality degradation.
    pub agent_types: Vec<String>,
    /// Worker ids checked for drainer stall.
    pub worker_ids: Vec<String>,
    /// Queue names checked for backlog depth.
    pub queue_names: Vec<String>,
    /// LLM providers checked for health.
    pub llm_providers: Vec<ProviderTarget>,
}

/// Orchestrates the full §4.10 check suite.
pub struct Watchdog {
    evidence_repo: Arc<dyn EvidenceRepository + Send + Sync>,
    candidate_repo: Arc<dyn CandidateFactRepository + Send + Sync>,
    rule_repo: Arc<dyn RuleRepository + Send + Sync>,
    agent_run_repo: Arc<dyn AgentRunRepository + Send + Sync>,
    alert_repo: Arc<dyn AlertRepository + Send + Sync>,
    queue: Arc<dyn Queue>,
    circuit_store: Arc<dyn CircuitBreakerStore>,
    notifier: Arc<dyn Notifier>,
    targets: WatchdogTargets,
    thresholds: WatchdogThresholds,
}

impl Watchdog {
    /// Builds a Watchdog from its collaborators.
    #[must_use]
    #[allow(clippy::too_many_arguments, reason = "each argument is a distinct required collaborator")]
    pub fn new(
        evidence_repo: Arc<dyn EvidenceRepository + Send + Sync>,
        candidate_repo: Arc<dyn CandidateFactRepository + Send + Sync>,
        rule_repo: Arc<dyn RuleRepository + Send + Sync>,
        agent_run_repo: Arc<dyn AgentRunRepository + Send + Sync>,
        alert_repo: Arc<dyn AlertRepository + Send + Sync>,
        queue: Arc<dyn Queue>,
        circuit_store: Arc<dyn CircuitBreakerStore>,
        notifier: Arc<dyn Notifier>,
        targets: WatchdogTargets,
        thresholds: WatchdogThresholds,
    ) -> Self {
        Self {
            evidence_repo,
            candidate_repo,
            rule_repo,
            agent_run_repo,
            alert_repo,
            queue,
            circuit_store,
            notifier,
            targets,
            thresholds,
        }
    }

    /// Runs every check and returns the aggregated report without
    /// persisting alerts or notifying anyone (`watchdog audit`).
    ///
    /// # Errors
    ///
    /// Returns [`WatchdogError`] if any check's backing repository, queue,
    /// or circuit breaker store fails.
    pub fn audit(&self, now: OffsetDateTime) -> Result<WatchdogReport, WatchdogError> {
        let mut results = Vec::new();
        results.extend(stale_source::check(self.evidence_repo.as_ref(), &self.targets.sources, now, &self.thresholds)?);
        results.extend(scraper_failure_rate::check(self.evidence_repo.as_ref(), &self.targets.sources, now, &self.thresholds)?);
        results.extend(quality_degradation::check(self.agent_run_repo.as_ref(), &self.targets.agent_types, now, &self.thresholds)?);
        results.push(rejection_rate::check(self.rule_repo.as_ref(), now, &self.thresholds)?);
        results.extend(drainer_stall::check(self.queue.as_ref(), &self.targets.worker_ids, now, &self.thresholds)?);
        results.extend(queue_backlog::check(self.queue.as_ref(), &self.targets.queue_names, &self.thresholds)?);
        results.push(progress_gates::evidence_without_facts(self.evidence_repo.as_ref(), self.candidate_repo.as_ref(), now, &self.thresholds)?);
        results.push(progress_gates::fact_without_rule(self.candidate_repo.as_ref(), now, &self.thresholds)?);
        results.push(progress_gates::rule_without_release(self.rule_repo.as_ref(), now, &self.thresholds)?);
        results.extend(llm_health::check(self.circuit_store.as_ref(), &self.targets.llm_providers, now)?);
        Ok(WatchdogReport { results })
    }

    /// Runs every check, persists each non-healthy result as a deduplicated
    /// [`truth_core::Alert`], notifies on every critical result, and
    /// returns the aggregated report (`watchdog run`).
    ///
    /// # Errors
    ///
    /// Returns [`WatchdogError`] if a check fails outright. A failure to
    /// persist or notify a single alert is logged and does not abort the
    /// remaining checks.
    pub fn run_cadence(&self, now: OffsetDateTime) -> Result<WatchdogReport, WatchdogError> {
        let report = self.audit(now)?;
        for result in &report.results {
            self.record_and_notify(result, now);
        }
        Ok(report)
    }

    fn record_and_notify(&self, result: &CheckResult, now: OffsetDateTime) {
        let Some(severity) = result.status.severity() else {
            return;
        };
        match self.alert_repo.record_occurrence(result.alert_type, &result.entity_id, severity, &result.message, now, self.thresholds.alert_dedup_window) {
            Ok((_, is_new)) if is_new && result.status == CheckStatus::Critical => {
                if let Err(err) = self.notifier.notify(result) {
                    tracing::warn!(alert_type = result.alert_type, entity_id = %result.entity_id, error = %err, "critical alert notification failed");
                }
            }
            Ok(_) => {}
            Err(err) => {
                tracing::warn!(alert_type = result.alert_type, entity_id = %result.entity_id, error = %err, "failed to record alert occurrence");
            }
        }
    }
}
