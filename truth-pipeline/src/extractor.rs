// truth-pipeline/src/extractor.rs
// ============================================================================
// Module: Extractor (C5)
// Description: Turns cleaned Evidence text into grounded CandidateFacts (§4.3).
// Purpose: Drive the Extractor's per-Evidence flow end to end: blocklist
//          check, content cleaning, the C3 call, per-extraction domain and
//          deterministic validation, quote normalization, and the coverage
//          report — plus the batch-mode sweep over ungrouped Evidence.
// Dependencies: ret-logic (none directly), serde_json, thiserror, time,
//              tracing, truth-core, truth-llm, truth-queue
// ============================================================================

//! ## Overview
//! [`Extractor::run`] implements §4.3 steps 1–5 against one `EvidenceId`;
//! [`Extractor::run_batch`] implements the batch-mode sweep (§4.3: "selects
//! up to `limit` Evidences with no CandidateFacts linked... sleeps 5,000 ms
//! between invocations... soft-fail wrapper"). Rejections are never
//! discarded — every one is persisted via
//! [`truth_core::CandidateFactRepository::record_rejection`] before the loop
//! continues to the next extraction.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use serde::Deserialize;
use serde::Serialize;
use time::OffsetDateTime;
use time::format_description::well_known::Iso8601;
use truth_core::AuditEvent;
use truth_core::AuditLogRepository;
use truth_core::CandidateFact;
use truth_core::CandidateFactRepository;
use truth_core::CandidateFactStatus;
use truth_core::Confidence;
use truth_core::ContentType;
use truth_core::Domain;
use truth_core::EvidenceId;
use truth_core::EvidenceRepository;
use truth_core::GroundingQuote;
use truth_core::JobId;
use truth_core::Outcome;
use truth_core::OutcomeStatus;
use truth_core::RepoError;
use truth_core::RunId;
use truth_core::ValueType;
use truth_core::identifiers::CandidateFactId;
use truth_core::normalize_quotes;
use truth_core::normalized_contains;
use truth_core::repo::RejectedExtraction;
use truth_llm::AgentType;
use truth_llm::LlmRunner;
use truth_llm::RunRequest;
use truth_llm::SchemaValidator;
use truth_llm::Sleeper;

use crate::queues::QUEUE_EXTRACT;
use crate::queues::is_blocked_host;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Error surfaced by [`Extractor::run`].
#[derive(Debug, thiserror::Error)]
pub enum ExtractorError {
    /// The Evidence's URL host matched the blocklist (§4.3 step 1).
    #[error("evidence {0} host is on the extractor blocklist")]
    BlockedHost(EvidenceId),
    /// The C3 call failed after exhausting retries.
    #[error("llm extraction failed: {0}")]
    LlmFailed(String),
    /// The LLM output could not be parsed into the expected shape.
    #[error("llm output did not match the expected extractions shape: {0}")]
    MalformedOutput(String),
    /// A repository call failed.
    #[error("repository error: {0}")]
    Repo(#[from] RepoError),
}

// ============================================================================
// SECTION: Rejection Reasons
// ============================================================================

/// Classified reason an extraction was rejected (§4.3 steps 4a/4b).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionReason {
    /// `domain` is not in the closed allow-list.
    InvalidDomain,
    /// A numeric value fell outside its expected range (percentage).
    OutOfRange,
    /// A currency-typed quote did not match the expected shape.
    InvalidCurrency,
    /// A date-typed value did not parse as a valid calendar date.
    InvalidDate,
    /// `exact_quote` was not found in the Evidence content.
    NoQuoteMatch,
    /// A deterministic validator failed for a reason not otherwise
    /// classified.
    ValidationFailed,
}

impl RejectionReason {
    /// Returns the wire/log-stable string form of this reason.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidDomain => "INVALID_DOMAIN",
            Self::OutOfRange => "OUT_OF_RANGE",
            Self::InvalidCurrency => "INVALID_CURRENCY",
            Self::InvalidDate => "INVALID_DATE",
            Self::NoQuoteMatch => "NO_QUOTE_MATCH",
            Self::ValidationFailed => "VALIDATION_FAILED",
        }
    }
}

// ============================================================================
// SECTION: LLM Output Shape
// ============================================================================

/// One extraction reported by the Extractor agent (§4.3 step 3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawExtraction {
    /// Regulatory domain slug, validated against the closed allow-list.
    pub domain: String,
    /// Shape of `extracted_value`.
    pub value_type: ValueType,
    /// Extracted value; shape follows `value_type`.
    pub extracted_value: serde_json::Value,
    /// Verbatim quote the value was extracted from.
    pub exact_quote: String,
    /// Text immediately preceding the quote, if reported.
    #[serde(default)]
    pub context_before: Option<String>,
    /// Text immediately following the quote, if reported.
    #[serde(default)]
    pub context_after: Option<String>,
    /// Confidence in `extracted_value` and its grounding.
    pub confidence: f64,
    /// Article/clause number, if the source text carries one.
    #[serde(default)]
    pub article_number: Option<String>,
    /// Statute/regulation reference, if known.
    #[serde(default)]
    pub law_reference: Option<String>,
    /// Free-text notes the agent attached; the Extractor also appends its
    /// own notes here (e.g. "quote repaired for JSON source").
    #[serde(default)]
    pub extraction_notes: Option<String>,
}

/// Top-level shape of the Extractor agent's output (§4.3 step 3).
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ExtractionsOutput {
    extractions: Vec<RawExtraction>,
}

/// Validates that the LLM output is at least shaped like
/// `{"extractions": [...]}`; per-extraction content is validated separately
/// by the deterministic checks in §4.3 step 4.
#[derive(Debug, Clone, Copy, Default)]
struct ExtractionsShapeValidator;

impl SchemaValidator for ExtractionsShapeValidator {
    fn validate(&self, value: &serde_json::Value) -> Result<(), String> {
        match value.get("extractions") {
            Some(serde_json::Value::Array(_)) => Ok(()),
            _ => Err("expected a JSON object with an `extractions` array".to_owned()),
        }
    }
}

// ============================================================================
// SECTION: Coverage Report
// ============================================================================

/// Per-Evidence extraction coverage, persisted as an audit event (§4.3 step
/// 5).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoverageReport {
    /// Ratio of distinct domains captured to the closed domain allow-list
    /// size, in `[0, 1]`.
    pub score: f64,
    /// Whether every allow-listed domain was represented among captured
    /// extractions.
    pub complete: bool,
}

// ============================================================================
// SECTION: Batch Outcome
// ============================================================================

/// Accumulated result of [`Extractor::run_batch`] (§4.3: "accumulates
/// {success, failed, errors}").
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchOutcome {
    /// Evidences processed without error.
    pub succeeded: u64,
    /// Evidences that failed (the batch continues regardless).
    pub failed: u64,
    /// Error messages, one per failure, in processing order.
    pub errors: Vec<String>,
}

/// Milliseconds slept between batch invocations (§4.3: "5,000 ms").
const BATCH_INTER_CALL_DELAY_MS: u64 = 5_000;

// ============================================================================
// SECTION: Extractor
// ============================================================================

/// Drives the Extractor's per-Evidence and batch flows (§4.3).
pub struct Extractor {
    evidence_repo: Arc<dyn EvidenceRepository + Send + Sync>,
    candidate_repo: Arc<dyn CandidateFactRepository + Send + Sync>,
    audit_repo: Arc<dyn AuditLogRepository + Send + Sync>,
    llm: Arc<LlmRunner>,
    sleeper: Arc<dyn Sleeper>,
    endpoint: String,
    api_key: Option<String>,
    model: String,
    provider_id: String,
    max_retries: u32,
    candidate_id_counter: std::sync::atomic::AtomicU64,
}

impl Extractor {
    /// Builds an Extractor from its collaborators and LLM endpoint
    /// configuration.
    #[must_use]
    #[allow(clippy::too_many_arguments, reason = "each argument is a distinct required collaborator")]
    pub fn new(
        evidence_repo: Arc<dyn EvidenceRepository + Send + Sync>,
        candidate_repo: Arc<dyn CandidateFactRepository + Send + Sync>,
        audit_repo: Arc<dyn AuditLogRepository + Send + Sync>,
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
            audit_repo,
            llm,
            sleeper,
            endpoint: endpoint.into(),
            api_key,
            model: model.into(),
            provider_id: provider_id.into(),
            max_retries: 3,
            candidate_id_counter: std::sync::atomic::AtomicU64::new(0),
        }
    }

    /// Runs the full §4.3 flow for one Evidence row.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractorError::BlockedHost`] when the Evidence's host is
    /// blocklisted, [`ExtractorError::LlmFailed`] when the C3 call never
    /// succeeds, [`ExtractorError::MalformedOutput`] when the output cannot
    /// be parsed, or [`ExtractorError::Repo`] on persistence failure.
    pub fn run(&self, evidence_id: &EvidenceId, run_id: RunId, job_id: JobId) -> Result<Outcome, ExtractorError> {
        // Step 1.
        let evidence = self.evidence_repo.get(evidence_id)?;
        if is_blocked_host(&evidence.url) {
            return Err(ExtractorError::BlockedHost(evidence_id.clone()));
        }

        // Step 2.
        let raw_for_cleaning = evidence.groundable_text().into_owned();
        let cleaned = truth_core::clean(&raw_for_cleaning, &std::collections::BTreeSet::new());
        let stats = truth_core::content_clean::stats(&raw_for_cleaning, &cleaned);
        tracing::info!(
            evidence_id = %evidence_id,
            original_length = stats.original_length,
            cleaned_length = stats.cleaned_length,
            reduction_percent = stats.reduction_percent,
            "cleaned evidence content before extraction"
        );

        // Step 3.
        let input = serde_json::json!({
            "evidenceId": evidence_id.as_str(),
            "content": cleaned,
            "contentType": evidence.content_type.as_str(),
            "sourceUrl": evidence.url,
        });
        let validator = ExtractionsShapeValidator;
        let request = RunRequest {
            agent_type: AgentType::Extractor,
            input,
            input_validator: &validator,
            output_validator: &validator,
            temperature: 0.1,
            max_retries: self.max_retries,
            run_id,
            job_id,
            queue_name: QUEUE_EXTRACT.to_owned(),
            provider_id: self.provider_id.clone(),
        };
        let outcome = self
            .llm
            .run(&request, &self.endpoint, self.api_key.as_deref(), &self.model)
            .map_err(|err| ExtractorError::LlmFailed(err.to_string()))?;
        if !outcome.success {
            return Err(ExtractorError::LlmFailed(outcome.error.unwrap_or_else(|| "unknown failure".to_owned())));
        }
        let output = outcome.output.unwrap_or(serde_json::Value::Null);
        let parsed: ExtractionsOutput =
            serde_json::from_value(output).map_err(|err| ExtractorError::MalformedOutput(err.to_string()))?;

        // Step 4.
        let mut captured_domains: std::collections::BTreeSet<String> = std::collections::BTreeSet::new();
        let mut captured_count: u64 = 0;
        for mut extraction in parsed.extractions {
            let Ok(domain) = Domain::parse(extraction.domain.clone()) else {
                self.reject(evidence_id, RejectionReason::InvalidDomain, &extraction)?;
                continue;
            };

            if evidence.content_type == ContentType::Json {
                if let Some(repaired) = repair_json_quote(&raw_for_cleaning, &extraction.extracted_value) {
                    extraction.exact_quote = repaired;
                    extraction.extraction_notes = Some(append_note(
                        extraction.extraction_notes.as_deref(),
                        "quote repaired for JSON source",
                    ));
                }
            }

            if let Err(reason) = validate_extraction(&extraction, &raw_for_cleaning, &cleaned) {
                self.reject(evidence_id, reason, &extraction)?;
                continue;
            }

            let normalized_text = normalize_quotes(&extraction.exact_quote);
            let grounding_quote = GroundingQuote {
                text: normalized_text,
                context_before: extraction.context_before.as_deref().map(normalize_quotes),
                context_after: extraction.context_after.as_deref().map(normalize_quotes),
                evidence_id: evidence_id.clone(),
                article_number: extraction.article_number.clone(),
                law_reference: extraction.law_reference.clone(),
            };
            let confidence = Confidence::new(extraction.confidence).unwrap_or(Confidence::ZERO);
            let candidate = CandidateFact {
                id: self.next_candidate_id(evidence_id),
                domain: domain.clone(),
                value_type: extraction.value_type,
                extracted_value: extraction.extracted_value.clone(),
                grounding_quotes: vec![grounding_quote],
                value_confidence: confidence,
                overall_confidence: confidence,
                status: CandidateFactStatus::Captured,
                promotion_candidate: confidence.value() >= 0.9,
            };
            self.candidate_repo.put(candidate)?;
            captured_domains.insert(domain.as_str().to_owned());
            captured_count += 1;
        }

        // Step 5.
        let coverage = CoverageReport {
            score: captured_domains.len() as f64 / truth_core::ALLOWED_DOMAINS.len() as f64,
            complete: captured_domains.len() == truth_core::ALLOWED_DOMAINS.len(),
        };
        self.audit_repo.append(AuditEvent {
            action: "COVERAGE_REPORT_RECORDED".to_owned(),
            entity_type: "evidence".to_owned(),
            entity_id: evidence_id.as_str().to_owned(),
            performed_by: None,
            metadata: serde_json::json!({"score": coverage.score, "complete": coverage.complete}),
            performed_at: OffsetDateTime::now_utc(),
        })?;

        Ok(Outcome::new(OutcomeStatus::SuccessApplied, captured_count, None))
    }

    /// Persists a rejected extraction to the dead-letter collection (§4.3
    /// step 4: "Persist the rejection... and continue").
    fn reject(
        &self,
        evidence_id: &EvidenceId,
        reason: RejectionReason,
        extraction: &RawExtraction,
    ) -> Result<(), ExtractorError> {
        self.candidate_repo.record_rejection(RejectedExtraction {
            evidence_id: evidence_id.clone(),
            reason: reason.as_str().to_owned(),
            raw_output: serde_json::to_value(extraction).unwrap_or(serde_json::Value::Null),
            rejected_at: OffsetDateTime::now_utc(),
        })?;
        Ok(())
    }

    /// Mints a process-unique `CandidateFactId` scoped to `evidence_id`.
    fn next_candidate_id(&self, evidence_id: &EvidenceId) -> CandidateFactId {
        let sequence = self.candidate_id_counter.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        CandidateFactId::new(format!("cf_{}_{sequence:x}", evidence_id.as_str()))
    }

    /// Runs the batch sweep over Evidence rows with no linked CandidateFact,
    /// up to `limit` (§4.3: batch mode).
    ///
    /// # Errors
    ///
    /// Returns [`ExtractorError::Repo`] when listing Evidence or existing
    /// CandidateFact links fails; per-Evidence failures are captured in the
    /// returned [`BatchOutcome`] instead of aborting the sweep.
    pub fn run_batch(&self, limit: usize) -> Result<BatchOutcome, ExtractorError> {
        let all_evidence = self.evidence_repo.list_all()?;
        let linked = self.candidate_repo.evidence_ids_with_candidate_facts()?;
        let pending: Vec<EvidenceId> = all_evidence.into_iter().filter(|id| !linked.contains(id)).take(limit).collect();

        let mut result = BatchOutcome::default();
        for (index, evidence_id) in pending.iter().enumerate() {
            if index > 0 {
                self.sleeper.sleep_ms(BATCH_INTER_CALL_DELAY_MS);
            }
            let run_id = RunId::new(format!("run-extract-batch-{}", evidence_id.as_str()));
            let job_id = truth_queue::generate_job_id();
            match self.run(evidence_id, run_id, job_id) {
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
// SECTION: Deterministic Validators
// ============================================================================

/// Runs §4.3 step 4's deterministic validators, returning the first failing
/// classification.
fn validate_extraction(extraction: &RawExtraction, raw: &str, cleaned: &str) -> Result<(), RejectionReason> {
    if !normalized_contains(raw, &extraction.exact_quote) || !normalized_contains(cleaned, &extraction.exact_quote) {
        return Err(RejectionReason::NoQuoteMatch);
    }
    match extraction.value_type {
        ValueType::Percentage => {
            let value = extraction.extracted_value.as_f64().ok_or(RejectionReason::OutOfRange)?;
            if !(0.0..=100.0).contains(&value) {
                return Err(RejectionReason::OutOfRange);
            }
        }
        ValueType::Currency => {
            if !looks_like_currency(&extraction.exact_quote) {
                return Err(RejectionReason::InvalidCurrency);
            }
        }
        ValueType::Date => {
            if !looks_like_date(&extraction.extracted_value) {
                return Err(RejectionReason::InvalidDate);
            }
        }
        ValueType::Threshold | ValueType::Text => {}
    }
    Ok(())
}

/// Heuristic currency-shape check: an optional leading symbol/ISO code
/// followed by digits and conventional grouping/decimal separators.
fn looks_like_currency(quote: &str) -> bool {
    let trimmed = quote.trim();
    let body = trimmed.trim_start_matches(|c: char| c.is_alphabetic() || matches!(c, '$' | '\u{20AC}' | '\u{A3}' | ' '));
    let digits: String = body.chars().filter(char::is_ascii_digit).collect();
    !digits.is_empty() && body.chars().all(|c| c.is_ascii_digit() || matches!(c, '.' | ',' | ' ' | '%'))
}

/// Returns true when `value` parses as a valid calendar date, accepting
/// either an ISO-8601 string or separate `{year, month, day}` fields.
fn looks_like_date(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::String(s) => time::Date::parse(s, &Iso8601::DEFAULT).is_ok(),
        _ => false,
    }
}

// ============================================================================
// SECTION: JSON Quote Repair
// ============================================================================

/// Appends `note` to an existing extraction-notes string, or starts one.
fn append_note(existing: Option<&str>, note: &str) -> String {
    match existing {
        Some(text) if !text.is_empty() => format!("{text}; {note}"),
        _ => note.to_owned(),
    }
}

/// Recomputes `exact_quote` as a verbatim `"key": value` fragment of a JSON
/// source containing `extracted_value` (§4.3 step 4: "JSON-source quote
/// repair"), tolerant of thousand-separator grouping.
fn repair_json_quote(content: &str, extracted_value: &serde_json::Value) -> Option<String> {
    let value_str = match extracted_value {
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::String(s) => s.clone(),
        _ => return None,
    };
    for variant in numeric_variants(&value_str) {
        if let Some(pos) = content.find(variant.as_str()) {
            let before = &content[..pos];
            let Some(first_quote) = before.rfind('"') else { continue };
            let Some(key_start) = before[..first_quote].rfind('"') else { continue };
            let after = &content[pos + variant.len()..];
            let end_offset = after.find([',', '}', '\n']).unwrap_or(after.len());
            let fragment = &content[key_start..pos + variant.len() + end_offset];
            return Some(fragment.trim().to_owned());
        }
    }
    None
}

/// Returns `value_str` plus, for pure-integer strings longer than three
/// digits, a thousand-separator-grouped variant to search for as well.
fn numeric_variants(value_str: &str) -> Vec<String> {
    let mut variants = vec![value_str.to_owned()];
    if value_str.len() > 3 && value_str.chars().all(|c| c.is_ascii_digit()) {
        variants.push(group_thousands(value_str));
    }
    variants
}

/// Inserts `,` every three digits from the right (e.g. `40000` →
/// `40,000`).
fn group_thousands(digits: &str) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3);
    for (index, ch) in digits.chars().enumerate() {
        if index > 0 && (len - index) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn currency_quote_passes_with_symbol_and_grouping() {
        assert!(looks_like_currency("$40,000.00"));
        assert!(looks_like_currency("40000 kn"));
    }

    #[test]
    fn currency_quote_rejects_non_numeric_body() {
        assert!(!looks_like_currency("approximately a lot"));
    }

    #[test]
    fn percentage_out_of_range_is_rejected() {
        let extraction = sample_extraction(ValueType::Percentage, serde_json::json!(150), "The rate is 150%.");
        let result = validate_extraction(&extraction, "The rate is 150%.", "The rate is 150%.");
        assert_eq!(result, Err(RejectionReason::OutOfRange));
    }

    #[test]
    fn missing_quote_is_rejected_first() {
        let extraction = sample_extraction(ValueType::Percentage, serde_json::json!(25), "unrelated text");
        let result = validate_extraction(&extraction, "something else entirely", "something else entirely");
        assert_eq!(result, Err(RejectionReason::NoQuoteMatch));
    }

    #[test]
    fn valid_percentage_extraction_passes() {
        let extraction = sample_extraction(ValueType::Percentage, serde_json::json!(25), "The rate is 25%.");
        let result = validate_extraction(&extraction, "The rate is 25%.", "The rate is 25%.");
        assert!(result.is_ok());
    }

    #[test]
    fn date_extraction_requires_iso8601() {
        let extraction = sample_extraction(ValueType::Date, serde_json::json!("not-a-date"), "effective 2026");
        let result = validate_extraction(&extraction, "effective 2026", "effective 2026");
        assert_eq!(result, Err(RejectionReason::InvalidDate));
    }

    #[test]
    fn json_quote_repair_finds_grouped_value() {
        let content = r#"{"threshold": "40,000", "currency": "EUR"}"#;
        let repaired = repair_json_quote(content, &serde_json::json!(40000));
        assert_eq!(repaired, Some(r#""threshold": "40,000""#.to_string()));
    }

    #[test]
    fn json_quote_repair_returns_none_when_absent() {
        let content = r#"{"threshold": "9,999"}"#;
        assert_eq!(repair_json_quote(content, &serde_json::json!(40000)), None);
    }

    fn sample_extraction(value_type: ValueType, extracted_value: serde_json::Value, quote: &str) -> RawExtraction {
        RawExtraction {
            domain: "taxation".to_string(),
            value_type,
            extracted_value,
            exact_quote: quote.to_string(),
            context_before: None,
            context_after: None,
            confidence: 0.95,
            article_number: None,
            law_reference: None,
            extraction_notes: None,
        }
    }
}
