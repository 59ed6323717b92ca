// truth-pipeline/src/composer.rs
// ============================================================================
// Module: Composer (C6)
// Description: Turns a domain's CandidateFacts into a draft Rule (§4.6).
// Purpose: Drive the Composer's per-domain flow end to end: the C3 call,
//          conflict detection, Applies-When validation, authority
//          derivation, and Rule/Concept/AMENDS persistence — plus the
//          batch-mode sweep grouped by domain.
// Dependencies: serde_json, thiserror, time, tracing, truth-core, truth-llm,
//              truth-queue
// ============================================================================

//! ## Overview
//! [`Composer::run`] implements §4.6 steps 1–8 against one domain's
//! unlinked CandidateFacts; [`Composer::run_batch`] implements the batch
//! sweep grouped by domain with a 3,000 ms inter-group sleep. Disagreement
//! between CandidateFacts is never silently averaged — it becomes an
//! `Open` `SourceConflict` and the domain is skipped for this pass.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering as AtomicOrdering;

use serde::Deserialize;
use serde::Serialize;
use time::OffsetDateTime;
use truth_core::AuditEvent;
use truth_core::AuditLogRepository;
use truth_core::AuthorityLevel;
use truth_core::CandidateFact;
use truth_core::CandidateFactId;
use truth_core::CandidateFactRepository;
use truth_core::Confidence;
use truth_core::Conflict;
use truth_core::ConflictId;
use truth_core::ConflictKind;
use truth_core::ConflictRepository;
use truth_core::ConflictResolution;
use truth_core::EvidenceRepository;
use truth_core::JobId;
use truth_core::RepoError;
use truth_core::Rule;
use truth_core::RuleId;
use truth_core::RuleRepository;
use truth_core::RuleStatus;
use truth_core::RunId;
use truth_core::ValueType;
use truth_core::identifiers::ConceptSlug;
use truth_core::parse_or_trivial_accept;
use truth_llm::AgentType;
use truth_llm::LlmRunner;
use truth_llm::RunRequest;
use truth_llm::SchemaValidator;
use truth_llm::Sleeper;

use crate::queues::QUEUE_COMPOSE;
use crate::source_authority::SourceAuthorityResolver;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Error surfaced by [`Composer::run`].
#[derive(Debug, thiserror::Error)]
pub enum ComposerError {
    /// The C3 call failed after exhausting retries.
    #[error("llm composition failed: {0}")]
    LlmFailed(String),
    /// The LLM output could not be parsed into the expected shape.
    #[error("llm output did not match the expected composer shape: {0}")]
    MalformedOutput(String),
    /// A repository call failed.
    #[error("repository error: {0}")]
    Repo(#[from] RepoError),
}

// ============================================================================
// SECTION: LLM Output Shape
// ============================================================================

/// Conflicting pair the Composer agent flagged instead of drafting a Rule
/// (§4.6 step 2).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConflictingPair {
    /// First conflicting CandidateFact id.
    pub candidate_fact_id_a: String,
    /// Second conflicting CandidateFact id.
    pub candidate_fact_id_b: String,
    /// Human-readable description of the disagreement.
    pub description: String,
}

/// A draft Rule reported by the Composer agent (§4.6 step 3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DraftRule {
    /// Regulatory concept slug this Rule is an instance of.
    pub concept_slug: String,
    /// Croatian-language title.
    pub title_hr: String,
    /// English-language title.
    pub title_en: String,
    /// Risk tier classification, as a string (`T0`..`T3`).
    pub risk_tier: String,
    /// Applies-When DSL expression; validated/repaired in step 4.
    pub applies_when: serde_json::Value,
    /// Rule value; shape follows `value_type`.
    pub value: serde_json::Value,
    /// Shape of `value`.
    pub value_type: ValueType,
    /// Date this Rule takes effect, ISO-8601.
    pub effective_from: String,
    /// Date this Rule stops applying, ISO-8601, if bounded.
    #[serde(default)]
    pub effective_until: Option<String>,
    /// Rule this one supersedes, if the agent identified one.
    #[serde(default)]
    pub supersedes_id: Option<String>,
    /// The LLM's claimed backing CandidateFact ids; intentionally ignored by
    /// the Composer in favor of the exact input set (§4.6 step 6: LLMs
    /// hallucinate ids that were never in the input).
    #[serde(default)]
    pub source_pointer_ids: Vec<String>,
    /// Composer's confidence in the drafted Rule.
    pub confidence: f64,
}

/// Top-level shape of the Composer agent's output (§4.6 step 3): either a
/// drafted Rule or a conflict report, never both.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ComposerOutput {
    #[serde(default)]
    draft_rule: Option<DraftRule>,
    #[serde(default)]
    conflicts_detected: Vec<ConflictingPair>,
}

/// Validates that the Composer's output carries exactly one of
/// `draft_rule`/`conflicts_detected`.
#[derive(Debug, Clone, Copy, Default)]
struct ComposerShapeValidator;

impl SchemaValidator for ComposerShapeValidator {
    fn validate(&self, value: &serde_json::Value) -> Result<(), String> {
        let has_draft = value.get("draft_rule").is_some_and(|v| !v.is_null());
        let has_conflicts = value.get("conflicts_detected").is_some_and(|v| v.as_array().is_some_and(|a| !a.is_empty()));
        if has_draft == has_conflicts {
            return Err("expected exactly one of `draft_rule` or a non-empty `conflicts_detected`".to_owned());
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Batch Outcome
// ============================================================================

/// Accumulated result of [`Composer::run_batch`] (§4.6: batch mode
/// "accumulates {success, failed, errors}").
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchOutcome {
    /// Domains composed without error (a Rule drafted or a conflict
    /// recorded both count as success).
    pub succeeded: u64,
    /// Domains that failed (the batch continues regardless).
    pub failed: u64,
    /// Error messages, one per failure, in processing order.
    pub errors: Vec<String>,
}

/// Milliseconds slept between domain groups (§4.6: "3,000 ms").
const BATCH_INTER_GROUP_DELAY_MS: u64 = 3_000;

// ============================================================================
// SECTION: Composer
// ============================================================================

/// Drives the Composer's per-domain and batch flows (§4.6).
pub struct Composer {
    evidence_repo: Arc<dyn EvidenceRepository + Send + Sync>,
    candidate_repo: Arc<dyn CandidateFactRepository + Send + Sync>,
    rule_repo: Arc<dyn RuleRepository + Send + Sync>,
    conflict_repo: Arc<dyn ConflictRepository + Send + Sync>,
    audit_repo: Arc<dyn AuditLogRepository + Send + Sync>,
    authority: Arc<dyn SourceAuthorityResolver>,
    llm: Arc<LlmRunner>,
    sleeper: Arc<dyn Sleeper>,
    endpoint: String,
    api_key: Option<String>,
    model: String,
    provider_id: String,
    max_retries: u32,
    rule_id_counter: AtomicU64,
    conflict_id_counter: AtomicU64,
}

impl Composer {
    /// Builds a Composer from its collaborators and LLM endpoint
    /// configuration.
    #[must_use]
    #[allow(clippy::too_many_arguments, reason = "each argument is a distinct required collaborator")]
    pub fn new(
        evidence_repo: Arc<dyn EvidenceRepository + Send + Sync>,
        candidate_repo: Arc<dyn CandidateFactRepository + Send + Sync>,
        rule_repo: Arc<dyn RuleRepository + Send + Sync>,
        conflict_repo: Arc<dyn ConflictRepository + Send + Sync>,
        audit_repo: Arc<dyn AuditLogRepository + Send + Sync>,
        authority: Arc<dyn SourceAuthorityResolver>,
        llm: Arc<LlmRunner>,
        sleeper: Arc<dyn Sleeper>,
        endpoint: impl Into<String>,
        api_key: Option<String>,
        model: impl Into<String>,
        provider_id: impl Into<String>,
    ) -> Self {
        Self {
            evidence_repo,
            candidate_repo,
            rule_repo,
            conflict_repo,
            audit_repo,
            authority,
            llm,
            sleeper,
            endpoint: endpoint.into(),
            api_key,
            model: model.into(),
            provider_id: provider_id.into(),
            max_retries: 3,
            rule_id_counter: AtomicU64::new(0),
            conflict_id_counter: AtomicU64::new(0),
        }
    }

    /// Runs the full §4.6 flow for one domain's ungrouped CandidateFacts.
    ///
    /// # Errors
    ///
    /// Returns [`ComposerError::LlmFailed`] when the C3 call never
    /// succeeds, [`ComposerError::MalformedOutput`] when the output cannot
    /// be parsed, or [`ComposerError::Repo`] on persistence failure.
    pub fn run(
        &self,
        domain: &str,
        candidate_fact_ids: &[CandidateFactId],
        run_id: RunId,
        job_id: JobId,
    ) -> Result<Option<RuleId>, ComposerError> {
        // Step 1.
        let candidates: Vec<_> = candidate_fact_ids
            .iter()
            .map(|id| self.candidate_repo.get(id))
            .collect::<Result<Vec<_>, _>>()?;

        // Step 2/3.
        let input = serde_json::json!({
            "domain": domain,
            "candidateFacts": candidates.iter().map(|candidate| serde_json::json!({
                "id": candidate.id.as_str(),
                "valueType": candidate.value_type,
                "extractedValue": candidate.extracted_value,
                "valueConfidence": candidate.value_confidence.value(),
                "groundingQuotes": candidate.grounding_quotes,
            })).collect::<Vec<_>>(),
        });
        let validator = ComposerShapeValidator;
        let request = RunRequest {
            agent_type: AgentType::Composer,
            input,
            input_validator: &validator,
            output_validator: &validator,
            temperature: 0.1,
            max_retries: self.max_retries,
            run_id,
            job_id,
            queue_name: QUEUE_COMPOSE.to_owned(),
            provider_id: self.provider_id.clone(),
        };
        let outcome = self
            .llm
            .run(&request, &self.endpoint, self.api_key.as_deref(), &self.model)
            .map_err(|err| ComposerError::LlmFailed(err.to_string()))?;
        if !outcome.success {
            return Err(ComposerError::LlmFailed(outcome.error.unwrap_or_else(|| "unknown failure".to_owned())));
        }
        let output = outcome.output.unwrap_or(serde_json::Value::Null);
        let parsed: ComposerOutput =
            serde_json::from_value(output).map_err(|err| ComposerError::MalformedOutput(err.to_string()))?;

        if !parsed.conflicts_detected.is_empty() {
            for pair in parsed.conflicts_detected {
                self.record_conflict(domain, candidate_fact_ids, &pair)?;
            }
            return Ok(None);
        }
        let Some(draft) = parsed.draft_rule else {
            return Ok(None);
        };

        // Step 4: validate/repair the Applies-When DSL.
        let (_requirement, fell_back) = parse_or_trivial_accept(&draft.applies_when);
        let applies_when = if fell_back { serde_json::json!({"op": "true"}) } else { draft.applies_when.clone() };
        if fell_back {
            tracing::warn!(domain, "composer draft applies_when failed validation; replaced with trivial accept");
        }

        // Step 5: derive authority as the maximum tier among backing
        // CandidateFacts' sources.
        let authority_level = self.derive_authority(&candidates)?;

        // Step 6: persist the Rule with the exact input candidate ids,
        // never the LLM's self-reported (and hallucination-prone) list.
        let risk_tier = parse_risk_tier(&draft.risk_tier);
        let effective_from = parse_date(&draft.effective_from).unwrap_or(time::Date::MIN);
        let effective_until = draft.effective_until.as_deref().and_then(parse_date);
        let confidence = Confidence::new(draft.confidence).unwrap_or(Confidence::ZERO);
        let concept_slug = ConceptSlug::new(draft.concept_slug.clone());
        let supersedes_id = draft.supersedes_id.clone().map(RuleId::new);
        let rule_id = self.next_rule_id(domain);
        let rule = Rule {
            id: rule_id.clone(),
            concept_slug: concept_slug.clone(),
            title_hr: draft.title_hr,
            title_en: draft.title_en,
            risk_tier,
            authority_level,
            applies_when,
            value: draft.value,
            value_type: draft.value_type,
            effective_from,
            effective_until,
            supersedes_id: supersedes_id.clone(),
            status: RuleStatus::Draft,
            confidence,
            approved_by: None,
            backing_candidate_fact_ids: candidate_fact_ids.iter().cloned().collect(),
        };
        self.rule_repo.put(rule)?;

        // Step 7: upsert the Concept and record the AMENDS edge.
        self.rule_repo.upsert_concept_link(&concept_slug, &rule_id)?;
        if let Some(previous) = &supersedes_id {
            self.rule_repo.record_amends_edge(&rule_id, previous)?;
        }

        // Step 8: audit trail.
        self.audit_repo.append(AuditEvent {
            action: "RULE_CREATED".to_owned(),
            entity_type: "rule".to_owned(),
            entity_id: rule_id.as_str().to_owned(),
            performed_by: None,
            metadata: serde_json::json!({"domain": domain, "candidate_fact_count": candidate_fact_ids.len()}),
            performed_at: OffsetDateTime::now_utc(),
        })?;

        Ok(Some(rule_id))
    }

    /// Derives a Rule's authority level as the maximum tier among the
    /// sources backing its CandidateFacts (§4.6 step 5): each grounding
    /// quote names an Evidence row, whose `source_id` is resolved to a
    /// tier via [`SourceAuthorityResolver`].
    fn derive_authority(&self, candidates: &[CandidateFact]) -> Result<AuthorityLevel, ComposerError> {
        let mut tiers = Vec::new();
        for candidate in candidates {
            for quote in &candidate.grounding_quotes {
                let evidence = self.evidence_repo.get(&quote.evidence_id)?;
                tiers.push(self.authority.authority_for(&evidence.source_id));
            }
        }
        Ok(AuthorityLevel::max_of(&tiers))
    }

    /// Records a `SourceConflict` for a disagreeing CandidateFact pair,
    /// leaving it `Open` for the Arbiter (§4.6 step 2; SPEC_FULL.md
    /// Arbiter contract).
    ///
    /// `metadata.candidate_fact_ids` is always the first two of the
    /// Composer's own input CandidateFact ids (§4.6 step 3:
    /// `conflictingPointerIds = first two inputs`), never the LLM's
    /// self-reported pair — the model hallucinates ids that were never in
    /// the input, and `arbiter.rs` looks these ids up directly, so a
    /// hallucinated id would make the conflict permanently unresolvable.
    fn record_conflict(
        &self,
        domain: &str,
        candidate_fact_ids: &[CandidateFactId],
        pair: &ConflictingPair,
    ) -> Result<(), ComposerError> {
        let conflict_id = self.next_conflict_id(domain);
        let conflicting_ids: Vec<&str> = candidate_fact_ids.iter().take(2).map(CandidateFactId::as_str).collect();
        self.conflict_repo.put(Conflict {
            id: conflict_id.clone(),
            conflict_type: ConflictKind::SourceConflict,
            item_a_id: None,
            item_b_id: None,
            status: ConflictResolution::Open,
            description: pair.description.clone(),
            metadata: serde_json::json!({
                "candidate_fact_ids": conflicting_ids,
                "domain": domain,
            }),
        })?;
        self.audit_repo.append(AuditEvent {
            action: "CONFLICT_DETECTED".to_owned(),
            entity_type: "conflict".to_owned(),
            entity_id: conflict_id.as_str().to_owned(),
            performed_by: None,
            metadata: serde_json::json!({"domain": domain}),
            performed_at: OffsetDateTime::now_utc(),
        })?;
        Ok(())
    }

    /// Mints a process-unique `RuleId` scoped to `domain`.
    fn next_rule_id(&self, domain: &str) -> RuleId {
        let sequence = self.rule_id_counter.fetch_add(1, AtomicOrdering::Relaxed);
        RuleId::new(format!("rule_{domain}_{sequence:x}"))
    }

    /// Mints a process-unique `ConflictId` scoped to `domain`.
    fn next_conflict_id(&self, domain: &str) -> ConflictId {
        let sequence = self.conflict_id_counter.fetch_add(1, AtomicOrdering::Relaxed);
        ConflictId::new(format!("conf_{domain}_{sequence:x}"))
    }

    /// Runs the batch sweep: groups ungrouped CandidateFacts by domain and
    /// composes each group in turn, sleeping between groups (§4.6: batch
    /// mode).
    ///
    /// # Errors
    ///
    /// Returns [`ComposerError::Repo`] when listing ungrouped CandidateFacts
    /// fails; per-domain failures are captured in the returned
    /// [`BatchOutcome`] instead of aborting the sweep.
    pub fn run_batch(&self) -> Result<BatchOutcome, ComposerError> {
        let groups = self.candidate_repo.list_ungrouped_by_domain()?;
        let mut result = BatchOutcome::default();
        for (index, (domain, candidate_ids)) in groups.into_iter().enumerate() {
            if index > 0 {
                self.sleeper.sleep_ms(BATCH_INTER_GROUP_DELAY_MS);
            }
            let run_id = RunId::new(format!("run-compose-batch-{domain}"));
            let job_id = truth_queue::generate_job_id();
            match self.run(&domain, &candidate_ids, run_id, job_id) {
                Ok(_) => result.succeeded += 1,
                Err(err) => {
                    result.failed += 1;
                    result.errors.push(err.to_string());
                }
            }
        }
        Ok(result)
    }
}

// ============================================================================
// SECTION: Parsing Helpers
// ============================================================================

/// Parses a risk-tier string, defaulting to the strictest tier (`T0`) on
/// anything unrecognized — an unparseable tier must never be treated as
/// lower-risk than it might be.
fn parse_risk_tier(raw: &str) -> truth_core::RiskTier {
    use truth_core::RiskTier::{T0, T1, T2, T3};
    match raw.to_ascii_uppercase().as_str() {
        "T1" => T1,
        "T2" => T2,
        "T3" => T3,
        _ => T0,
    }
}

/// Parses an ISO-8601 calendar date, returning `None` on failure.
fn parse_date(raw: &str) -> Option<time::Date> {
    time::Date::parse(raw, &time::format_description::well_known::Iso8601::DEFAULT).ok()
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn risk_tier_defaults_to_strictest_on_unknown_input() {
        assert_eq!(parse_risk_tier("bogus"), truth_core::RiskTier::T0);
        assert_eq!(parse_risk_tier("t2"), truth_core::RiskTier::T2);
    }

    #[test]
    fn date_parsing_accepts_iso8601() {
        assert!(parse_date("2026-01-01").is_some());
        assert!(parse_date("not-a-date").is_none());
    }

    #[test]
    fn shape_validator_rejects_both_present() {
        let validator = ComposerShapeValidator;
        let value = serde_json::json!({
            "draft_rule": {"concept_slug": "x"},
            "conflicts_detected": [{"candidate_fact_id_a": "a", "candidate_fact_id_b": "b", "description": "d"}],
        });
        assert!(validator.validate(&value).is_err());
    }

    #[test]
    fn shape_validator_rejects_neither_present() {
        let validator = ComposerShapeValidator;
        assert!(validator.validate(&serde_json::json!({})).is_err());
    }

    #[test]
    fn shape_validator_accepts_draft_only() {
        let validator = ComposerShapeValidator;
        let value = serde_json::json!({"draft_rule": {"concept_slug": "x"}});
        assert!(validator.validate(&value).is_ok());
    }
}
