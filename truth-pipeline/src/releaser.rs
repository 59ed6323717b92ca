// truth-pipeline/src/releaser.rs
// ============================================================================
// Module: Releaser (C8)
// Description: Collects APPROVED rules, enforces the hard release gates,
//              derives the semver bump, cuts an immutable Release, publishes
//              its rules, and supports rollback of the most recent release
//              (§4.8).
// Purpose: Centralize the one place version numbers and content hashes are
//          computed — never trusted from the LLM — and make the six-gate
//          pre-flight a single ordered, short-circuiting sequence so a
//          caller gets back exactly the failing gate rather than a partial
//          write.
// Dependencies: serde_json, time, tracing, truth-core, truth-llm, truth-queue
// ============================================================================

//! ## Overview
//! [`Releaser::release`] runs the §4.8 pre-flight gates in order (existence
//! & status, critical approval, open conflicts, backing facts, evidence
//! strength, evidence chain integrity), derives the version and release
//! type, computes the deterministic content hash, persists the Release,
//! publishes every rule through [`truth_core::RuleRepository::transition`],
//! and fires the best-effort side effects (content-sync events, embedding
//! jobs) that must never fail the release itself. [`Releaser::rollback`]
//! reverses the most recent release under the explicit `bypass` parameter
//! §9 calls for in place of an ambient context flag.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering as AtomicOrdering;

use serde::Deserialize;
use serde::Serialize;
use time::OffsetDateTime;
use truth_core::AuditEvent;
use truth_core::AuditLogRepository;
use truth_core::CandidateFact;
use truth_core::CandidateFactRepository;
use truth_core::ConflictRepository;
use truth_core::Evidence;
use truth_core::EvidenceId;
use truth_core::EvidenceRepository;
use truth_core::JobId;
use truth_core::Release;
use truth_core::ReleaseId;
use truth_core::ReleaseRepository;
use truth_core::RepoError;
use truth_core::Rule;
use truth_core::RuleContentTuple;
use truth_core::RuleId;
use truth_core::RuleRepository;
use truth_core::RuleStatus;
use truth_core::RunId;
use truth_core::UserId;
use truth_core::model::AuditTrail;
use truth_core::model::ReleaseType;
use truth_core::model::Version;
use truth_core::normalize_quotes;
use truth_llm::AgentType;
use truth_llm::LlmRunner;
use truth_llm::RunRequest;
use truth_llm::SchemaValidator;
use truth_queue::Correlation;
use truth_queue::EnqueueOptions;
use truth_queue::Queue;

use crate::queues::QUEUE_RELEASE;

// ============================================================================
// SECTION: Quote Match Classification
// ============================================================================

/// How strongly a grounding quote was located in its Evidence's raw content
/// (§4.8 gate 6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum QuoteMatchKind {
    /// Byte-for-byte substring, modulo quote normalization (§4.5).
    Exact,
    /// Matches after collapsing runs of whitespace.
    WhitespaceCollapsed,
    /// Matches after collapsing whitespace and folding case.
    CaseInsensitive,
    /// Matches only after stripping punctuation as well (weakest tier).
    Fuzzy,
}

impl QuoteMatchKind {
    /// Returns true when this match kind suffices for `tier` (§4.8 gate 6:
    /// "strict tiers allow only exact/whitespace_collapsed; lower tiers
    /// tolerate case_insensitive; fuzzy never suffices for T0/T1").
    ///
    /// Decision recorded in `DESIGN.md`: T2/T3 additionally tolerate
    /// `fuzzy`, since the spec only pins down what T0/T1 reject.
    const fn acceptable_for(self, tier: truth_core::RiskTier) -> bool {
        use truth_core::RiskTier::{T0, T1, T2, T3};
        match self {
            Self::Exact | Self::WhitespaceCollapsed => true,
            Self::CaseInsensitive | Self::Fuzzy => matches!(tier, T2 | T3),
        }
    }
}

/// Collapses runs of whitespace to single spaces.
fn collapse_whitespace(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Drops everything but alphanumerics and whitespace.
fn strip_punctuation(input: &str) -> String {
    input.chars().filter(|ch| ch.is_alphanumeric() || ch.is_whitespace()).collect()
}

/// Classifies how `quote` was located inside `raw_content`, trying
/// successively weaker match rules, or returns `None` if it cannot be found
/// at all.
fn classify_quote_match(raw_content: &str, quote: &str) -> Option<QuoteMatchKind> {
    let normalized_raw = normalize_quotes(raw_content);
    let normalized_quote = normalize_quotes(quote);
    if normalized_raw.contains(&normalized_quote) {
        return Some(QuoteMatchKind::Exact);
    }

    let collapsed_raw = collapse_whitespace(&normalized_raw);
    let collapsed_quote = collapse_whitespace(&normalized_quote);
    if collapsed_raw.contains(&collapsed_quote) {
        return Some(QuoteMatchKind::WhitespaceCollapsed);
    }

    let lower_raw = collapsed_raw.to_lowercase();
    let lower_quote = collapsed_quote.to_lowercase();
    if lower_raw.contains(&lower_quote) {
        return Some(QuoteMatchKind::CaseInsensitive);
    }

    let fuzzy_raw = collapse_whitespace(&strip_punctuation(&lower_raw));
    let fuzzy_quote = collapse_whitespace(&strip_punctuation(&lower_quote));
    if !fuzzy_quote.is_empty() && fuzzy_raw.contains(&fuzzy_quote) {
        return Some(QuoteMatchKind::Fuzzy);
    }

    None
}

// ============================================================================
// SECTION: Gate Failures
// ============================================================================

/// One failing rule's identity, for building the "(and K more)" style
/// messages the gates surface (§8 scenario 3).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct FailingRule {
    concept_slug: String,
}

/// Joins up to three `concept_slug`s, suffixing `(and K more)` past that
/// (§8 scenario 3: "listing up to three failing rules by conceptSlug and
/// suffixing `(and K more)` when more exist").
fn format_failing_rules(rules: &BTreeSet<FailingRule>) -> String {
    let names: Vec<&str> = rules.iter().map(|r| r.concept_slug.as_str()).collect();
    let shown = names.iter().take(3).copied().collect::<Vec<_>>().join(", ");
    if names.len() > 3 {
        format!("{shown} (and {} more)", names.len() - 3)
    } else {
        shown
    }
}

/// A pre-flight gate failure (§4.8), carrying enough detail to reproduce the
/// spec's exact wording without the caller re-deriving it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateFailure {
    /// A named rule id does not resolve, or is not `Approved`.
    NotApproved(RuleId),
    /// One or more `{T0,T1}` rules lack `approved_by`.
    MissingApprover(BTreeSet<FailingRule>),
    /// One or more rules have an `Open` conflict.
    OpenConflict(BTreeSet<FailingRule>),
    /// One or more rules have no backing CandidateFact.
    NoBackingFacts(BTreeSet<FailingRule>),
    /// A single-source rule lacks `LAW` authority.
    InsufficientEvidenceStrength(BTreeSet<FailingRule>),
    /// The referenced Evidence does not exist.
    OrphanedPointer(BTreeSet<FailingRule>),
    /// Evidence `content_hash` no longer matches its `raw_bytes`.
    HashMismatch(BTreeSet<FailingRule>),
    /// A grounding quote could not be located in its Evidence at all.
    QuoteNotFound(BTreeSet<FailingRule>),
    /// A grounding quote matched, but only at a tier the rule's risk class
    /// does not accept.
    QuoteMatchUnacceptable(BTreeSet<FailingRule>),
}

impl std::fmt::Display for GateFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotApproved(id) => write!(f, "rule {id} is not Approved"),
            Self::MissingApprover(rules) => {
                write!(f, "Cannot release {} T0/T1 rules without approvedBy: {}", rules.len(), format_failing_rules(rules))
            },
            Self::OpenConflict(rules) => write!(f, "{} rules have an open conflict: {}", rules.len(), format_failing_rules(rules)),
            Self::NoBackingFacts(rules) => write!(f, "{} rules have no backing evidence: {}", rules.len(), format_failing_rules(rules)),
            Self::InsufficientEvidenceStrength(rules) => {
                write!(f, "{} single-source rules lack LAW authority: {}", rules.len(), format_failing_rules(rules))
            },
            Self::OrphanedPointer(rules) => write!(f, "orphaned_pointer for {} rules: {}", rules.len(), format_failing_rules(rules)),
            Self::HashMismatch(rules) => write!(f, "hash_mismatch for {} rules: {}", rules.len(), format_failing_rules(rules)),
            Self::QuoteNotFound(rules) => write!(f, "quote_not_found for {} rules: {}", rules.len(), format_failing_rules(rules)),
            Self::QuoteMatchUnacceptable(rules) => {
                write!(f, "quote_match_unacceptable for {} rules: {}", rules.len(), format_failing_rules(rules))
            },
        }
    }
}

/// Error surfaced by [`Releaser::release`]/[`Releaser::rollback`].
#[derive(Debug, thiserror::Error)]
pub enum ReleaserError {
    /// A pre-flight gate rejected the batch; no Release row was created
    /// (§7: "Release pre-flight gate failures return... without mutating
    /// state").
    #[error("release gate failed: {0}")]
    Gate(GateFailure),
    /// The target release is not eligible for rollback (§4.8: "only the
    /// most recent release").
    #[error("release {0} is not the latest release; rollback refused")]
    NotRollbackEligible(ReleaseId),
    /// A repository call failed.
    #[error("repository error: {0}")]
    Repo(#[from] RepoError),
}

// ============================================================================
// SECTION: Changelog LLM Output
// ============================================================================

/// Changelog agent output shape (§4.8 step 1: "changelogs (from C3)").
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ChangelogOutput {
    /// Human-readable changelog entry.
    changelog: String,
    /// Advisory only; logged on mismatch and never used (§8 scenario 6).
    #[serde(default)]
    suggested_release_type: Option<String>,
}

/// Accepts only output carrying a string `changelog` field.
#[derive(Debug, Clone, Copy, Default)]
struct ChangelogShapeValidator;

impl SchemaValidator for ChangelogShapeValidator {
    fn validate(&self, value: &serde_json::Value) -> Result<(), String> {
        if value.get("changelog").and_then(serde_json::Value::as_str).is_none() {
            return Err("expected a string `changelog` field".to_owned());
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Releaser
// ============================================================================

/// Drives the §4.8 release and rollback flows (C8).
pub struct Releaser {
    rule_repo: Arc<dyn RuleRepository + Send + Sync>,
    evidence_repo: Arc<dyn EvidenceRepository + Send + Sync>,
    candidate_repo: Arc<dyn CandidateFactRepository + Send + Sync>,
    conflict_repo: Arc<dyn ConflictRepository + Send + Sync>,
    release_repo: Arc<dyn ReleaseRepository + Send + Sync>,
    audit_repo: Arc<dyn AuditLogRepository + Send + Sync>,
    queue: Arc<dyn Queue>,
    llm: Arc<LlmRunner>,
    endpoint: String,
    api_key: Option<String>,
    model: String,
    provider_id: String,
    release_id_counter: AtomicU64,
}

impl Releaser {
    /// Builds a Releaser from its collaborators.
    #[must_use]
    #[allow(clippy::too_many_arguments, reason = "each argument is a distinct required collaborator")]
    pub fn new(
        rule_repo: Arc<dyn RuleRepository + Send + Sync>,
        evidence_repo: Arc<dyn EvidenceRepository + Send + Sync>,
        candidate_repo: Arc<dyn CandidateFactRepository + Send + Sync>,
        conflict_repo: Arc<dyn ConflictRepository + Send + Sync>,
        release_repo: Arc<dyn ReleaseRepository + Send + Sync>,
        audit_repo: Arc<dyn AuditLogRepository + Send + Sync>,
        queue: Arc<dyn Queue>,
        llm: Arc<LlmRunner>,
        endpoint: impl Into<String>,
        api_key: Option<String>,
        model: impl Into<String>,
        provider_id: impl Into<String>,
    ) -> Self {
        Self {
            rule_repo,
            evidence_repo,
            candidate_repo,
            conflict_repo,
            release_repo,
            audit_repo,
            queue,
            llm,
            endpoint: endpoint.into(),
            api_key,
            model: model.into(),
            provider_id: provider_id.into(),
            release_id_counter: AtomicU64::new(0),
        }
    }

    /// Runs the full §4.8 release flow over `rule_ids`.
    ///
    /// # Errors
    ///
    /// Returns [`ReleaserError::Gate`] when any pre-flight gate fails (no
    /// state is mutated), or [`ReleaserError::Repo`] on persistence failure.
    pub fn release(&self, rule_ids: &[RuleId], run_id: RunId, job_id: JobId) -> Result<Release, ReleaserError> {
        let rules = self.load_rules(rule_ids)?;

        self.gate_status(&rules)?;
        self.gate_critical_approval(&rules)?;
        self.gate_open_conflicts(&rules)?;
        self.gate_backing_facts(&rules)?;
        let candidates_by_rule = self.load_candidates(&rules)?;
        self.gate_evidence_strength(&rules, &candidates_by_rule)?;
        self.gate_evidence_chain(&rules, &candidates_by_rule)?;

        let previous = self.release_repo.latest()?;
        let prev_version = previous.as_ref().map_or(Version { major: 0, minor: 0, patch: 0 }, |release| release.version);
        let tiers: BTreeSet<_> = rules.iter().map(|rule| rule.risk_tier).collect();
        let release_type = derive_release_type(&tiers);
        let version = bump_version(prev_version, release_type);

        let mut tuples: Vec<(String, RuleContentTuple)> = rules
            .iter()
            .map(|rule| {
                (
                    rule.concept_slug.as_str().to_owned(),
                    RuleContentTuple {
                        concept_slug: rule.concept_slug.as_str().to_owned(),
                        applies_when: rule.applies_when.clone(),
                        value: rule.value.clone(),
                        value_type: serde_json::to_value(rule.value_type).unwrap_or(serde_json::Value::Null),
                        effective_from: normalize_date(rule.effective_from),
                        effective_until: rule.effective_until.map(normalize_date),
                    },
                )
            })
            .collect();
        tuples.sort_by(|a, b| a.0.cmp(&b.0));
        let sorted_tuples: Vec<_> = tuples.into_iter().map(|(_, tuple)| tuple).collect();
        let content_hash = Release::compute_content_hash(&sorted_tuples).map_err(|err| RepoError::Backend(err.to_string()))?;

        let changelog = self.generate_changelog(&rules, release_type, run_id.clone(), job_id.clone());

        let audit_trail = self.compute_audit_trail(&rules, &candidates_by_rule);
        let approved_by: Vec<UserId> = rules.iter().filter_map(|rule| rule.approved_by.clone()).collect::<BTreeSet<_>>().into_iter().collect();
        let effective_from = rules.iter().map(|rule| rule.effective_from).min().unwrap_or(time::Date::MIN);

        let release = Release {
            id: self.next_release_id(),
            version,
            release_type,
            released_at: OffsetDateTime::now_utc(),
            effective_from,
            content_hash,
            changelog,
            approved_by,
            audit_trail,
            rule_ids: rules.iter().map(|rule| rule.id.clone()).collect(),
            is_latest: true,
        };
        let release = self.release_repo.put(release)?;

        self.audit_repo.append(AuditEvent {
            action: "RELEASE_PUBLISHED".to_owned(),
            entity_type: "release".to_owned(),
            entity_id: release.id.as_str().to_owned(),
            performed_by: None,
            metadata: serde_json::json!({"version": release.version.to_string(), "rule_count": release.rule_ids.len()}),
            performed_at: OffsetDateTime::now_utc(),
        })?;

        for rule in &rules {
            self.rule_repo.transition(&rule.id, RuleStatus::Published, false)?;
            self.audit_repo.append(AuditEvent {
                action: "RULE_PUBLISHED".to_owned(),
                entity_type: "rule".to_owned(),
                entity_id: rule.id.as_str().to_owned(),
                performed_by: None,
                metadata: serde_json::json!({"release_id": release.id.as_str()}),
                performed_at: OffsetDateTime::now_utc(),
            })?;
        }

        self.emit_best_effort_side_effects(&rules, &release, &candidates_by_rule);

        Ok(release)
    }

    /// Rolls back the most recent Release under an explicit bypass
    /// parameter (§4.8, §9: no ambient context flag).
    ///
    /// # Errors
    ///
    /// Returns [`ReleaserError::NotRollbackEligible`] when `release_id` is
    /// not the current latest release, or [`ReleaserError::Repo`] on
    /// persistence failure.
    pub fn rollback(&self, release_id: &ReleaseId) -> Result<Release, ReleaserError> {
        let target = self.release_repo.get(release_id)?;
        let latest = self.release_repo.latest()?;
        if latest.as_ref().map(|release| &release.id) != Some(&target.id) {
            return Err(ReleaserError::NotRollbackEligible(release_id.clone()));
        }

        let previous = self.release_repo.previous()?;
        let rolled_back = self.release_repo.rollback(release_id)?;

        for rule_id in &target.rule_ids {
            let still_published = previous.as_ref().is_some_and(|prev| prev.rule_ids.contains(rule_id));
            if still_published {
                continue;
            }
            self.rule_repo.transition(rule_id, RuleStatus::Approved, true)?;
            self.audit_repo.append(AuditEvent {
                action: "RULE_ROLLBACK".to_owned(),
                entity_type: "rule".to_owned(),
                entity_id: rule_id.as_str().to_owned(),
                performed_by: None,
                metadata: serde_json::json!({"release_id": release_id.as_str()}),
                performed_at: OffsetDateTime::now_utc(),
            })?;
        }

        self.audit_repo.append(AuditEvent {
            action: "RELEASE_ROLLED_BACK".to_owned(),
            entity_type: "release".to_owned(),
            entity_id: release_id.as_str().to_owned(),
            performed_by: None,
            metadata: serde_json::json!({"version": target.version.to_string()}),
            performed_at: OffsetDateTime::now_utc(),
        })?;

        Ok(rolled_back)
    }

    // ------------------------------------------------------------------
    // Gates
    // ------------------------------------------------------------------

    fn load_rules(&self, rule_ids: &[RuleId]) -> Result<Vec<Rule>, ReleaserError> {
        rule_ids.iter().map(|id| Ok(self.rule_repo.get(id)?)).collect()
    }

    /// Gate 1: existence (already satisfied by `load_rules`) and status.
    fn gate_status(&self, rules: &[Rule]) -> Result<(), ReleaserError> {
        for rule in rules {
            if rule.status != RuleStatus::Approved {
                return Err(ReleaserError::Gate(GateFailure::NotApproved(rule.id.clone())));
            }
        }
        Ok(())
    }

    /// Gate 2: every `{T0,T1}` rule has a human approver.
    fn gate_critical_approval(&self, rules: &[Rule]) -> Result<(), ReleaserError> {
        let failing: BTreeSet<_> = rules
            .iter()
            .filter(|rule| rule.risk_tier.always_requires_human_approval() && rule.approved_by.is_none())
            .map(|rule| FailingRule { concept_slug: rule.concept_slug.as_str().to_owned() })
            .collect();
        if failing.is_empty() { Ok(()) } else { Err(ReleaserError::Gate(GateFailure::MissingApprover(failing))) }
    }

    /// Gate 3: no rule may have an `Open` conflict.
    fn gate_open_conflicts(&self, rules: &[Rule]) -> Result<(), ReleaserError> {
        let mut failing = BTreeSet::new();
        for rule in rules {
            if self.conflict_repo.has_open_conflict_for_rule(&rule.id)? {
                failing.insert(FailingRule { concept_slug: rule.concept_slug.as_str().to_owned() });
            }
        }
        if failing.is_empty() { Ok(()) } else { Err(ReleaserError::Gate(GateFailure::OpenConflict(failing))) }
    }

    /// Gate 4: every rule has at least one backing CandidateFact.
    fn gate_backing_facts(&self, rules: &[Rule]) -> Result<(), ReleaserError> {
        let failing: BTreeSet<_> = rules
            .iter()
            .filter(|rule| !rule.has_backing_evidence())
            .map(|rule| FailingRule { concept_slug: rule.concept_slug.as_str().to_owned() })
            .collect();
        if failing.is_empty() { Ok(()) } else { Err(ReleaserError::Gate(GateFailure::NoBackingFacts(failing))) }
    }

    fn load_candidates(&self, rules: &[Rule]) -> Result<BTreeMap<RuleId, Vec<CandidateFact>>, ReleaserError> {
        let mut map = BTreeMap::new();
        for rule in rules {
            let mut candidates = Vec::with_capacity(rule.backing_candidate_fact_ids.len());
            for candidate_id in &rule.backing_candidate_fact_ids {
                candidates.push(self.candidate_repo.get(candidate_id)?);
            }
            map.insert(rule.id.clone(), candidates);
        }
        Ok(map)
    }

    /// Gate 5: single-source rules require `LAW` authority.
    ///
    /// "Single-source" counts distinct `Evidence.source_id`s behind a rule's
    /// backing CandidateFacts, not the number of CandidateFacts itself — two
    /// candidates grounded in the same registered source are still one
    /// source (§4.8 step 5).
    ///
    /// # Errors
    ///
    /// Returns [`ReleaserError::Repo`] if an evidence lookup fails.
    fn gate_evidence_strength(
        &self,
        rules: &[Rule],
        candidates: &BTreeMap<RuleId, Vec<CandidateFact>>,
    ) -> Result<(), ReleaserError> {
        let mut failing = BTreeSet::new();
        for rule in rules {
            let Some(candidate_list) = candidates.get(&rule.id) else { continue };
            let mut source_ids = BTreeSet::new();
            for candidate in candidate_list {
                for quote in &candidate.grounding_quotes {
                    let evidence = self.evidence_repo.get(&quote.evidence_id)?;
                    source_ids.insert(evidence.source_id);
                }
            }
            if source_ids.len() == 1 && !rule.authority_level.is_law_tier() {
                failing.insert(FailingRule { concept_slug: rule.concept_slug.as_str().to_owned() });
            }
        }
        if failing.is_empty() { Ok(()) } else { Err(ReleaserError::Gate(GateFailure::InsufficientEvidenceStrength(failing))) }
    }

    /// Gate 6: evidence chain integrity, the strongest gate.
    fn gate_evidence_chain(&self, rules: &[Rule], candidates: &BTreeMap<RuleId, Vec<CandidateFact>>) -> Result<(), ReleaserError> {
        let mut orphaned = BTreeSet::new();
        let mut hash_mismatch = BTreeSet::new();
        let mut quote_not_found = BTreeSet::new();
        let mut quote_unacceptable = BTreeSet::new();
        let mut evidence_cache: BTreeMap<EvidenceId, Option<Evidence>> = BTreeMap::new();

        for rule in rules {
            let failing_rule = || FailingRule { concept_slug: rule.concept_slug.as_str().to_owned() };
            let Some(candidate_list) = candidates.get(&rule.id) else { continue };
            for candidate in candidate_list {
                for quote in &candidate.grounding_quotes {
                    let evidence = evidence_cache
                        .entry(quote.evidence_id.clone())
                        .or_insert_with(|| self.evidence_repo.get(&quote.evidence_id).ok())
                        .clone();
                    let Some(evidence) = evidence else {
                        orphaned.insert(failing_rule());
                        continue;
                    };
                    if !evidence.hash_is_valid() {
                        hash_mismatch.insert(failing_rule());
                        continue;
                    }
                    let raw_text = String::from_utf8_lossy(&evidence.raw_bytes);
                    match classify_quote_match(&raw_text, &quote.text) {
                        None => {
                            quote_not_found.insert(failing_rule());
                        },
                        Some(kind) if !kind.acceptable_for(rule.risk_tier) => {
                            quote_unacceptable.insert(failing_rule());
                        },
                        Some(_) => {},
                    }
                }
            }
        }

        if !orphaned.is_empty() {
            return Err(ReleaserError::Gate(GateFailure::OrphanedPointer(orphaned)));
        }
        if !hash_mismatch.is_empty() {
            return Err(ReleaserError::Gate(GateFailure::HashMismatch(hash_mismatch)));
        }
        if !quote_not_found.is_empty() {
            return Err(ReleaserError::Gate(GateFailure::QuoteNotFound(quote_not_found)));
        }
        if !quote_unacceptable.is_empty() {
            return Err(ReleaserError::Gate(GateFailure::QuoteMatchUnacceptable(quote_unacceptable)));
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Supporting computations
    // ------------------------------------------------------------------

    fn compute_audit_trail(&self, rules: &[Rule], candidates: &BTreeMap<RuleId, Vec<CandidateFact>>) -> AuditTrail {
        let mut evidence_ids = BTreeSet::new();
        let mut candidate_ids = BTreeSet::new();
        for rule in rules {
            if let Some(list) = candidates.get(&rule.id) {
                for candidate in list {
                    candidate_ids.insert(candidate.id.clone());
                    for quote in &candidate.grounding_quotes {
                        evidence_ids.insert(quote.evidence_id.clone());
                    }
                }
            }
        }
        let human_approvals = rules.iter().filter(|rule| rule.approved_by.is_some()).count();
        AuditTrail {
            source_evidence_count: u64::try_from(evidence_ids.len()).unwrap_or(u64::MAX),
            source_pointer_count: u64::try_from(candidate_ids.len()).unwrap_or(u64::MAX),
            // No dedicated ReviewRun entity is modeled (§9 open question); one
            // review pass per released rule is the closest available proxy.
            review_count: u64::try_from(rules.len()).unwrap_or(u64::MAX),
            human_approvals: u64::try_from(human_approvals).unwrap_or(u64::MAX),
        }
    }

    fn generate_changelog(&self, rules: &[Rule], release_type: ReleaseType, run_id: RunId, job_id: JobId) -> String {
        let input = serde_json::json!({
            "ruleCount": rules.len(),
            "releaseType": release_type,
            "concepts": rules.iter().map(|r| r.concept_slug.as_str()).collect::<Vec<_>>(),
        });
        let validator = ChangelogShapeValidator;
        let request = RunRequest {
            agent_type: AgentType::Releaser,
            input,
            input_validator: &validator,
            output_validator: &validator,
            temperature: 0.1,
            max_retries: 3,
            run_id,
            job_id,
            queue_name: QUEUE_RELEASE.to_owned(),
            provider_id: self.provider_id.clone(),
        };
        let outcome = self.llm.run(&request, &self.endpoint, self.api_key.as_deref(), &self.model);
        let Ok(outcome) = outcome else {
            return default_changelog(rules);
        };
        let Some(output) = outcome.output.filter(|_| outcome.success) else {
            return default_changelog(rules);
        };
        let Ok(parsed) = serde_json::from_value::<ChangelogOutput>(output) else {
            return default_changelog(rules);
        };
        if let Some(suggested) = &parsed.suggested_release_type {
            if !suggested.eq_ignore_ascii_case(release_type_str(release_type)) {
                tracing::warn!(suggested, derived = release_type_str(release_type), "releaser LLM suggested a release type that was ignored");
            }
        }
        parsed.changelog
    }

    /// Emits the best-effort `content-sync`/`embeddings` queue jobs for each
    /// newly released rule (§4.8 step 4), tagging every content-sync event
    /// with the rule's previous value (if it supersedes one), change type,
    /// risk tier, confidence, and primary source URL.
    fn emit_best_effort_side_effects(
        &self,
        rules: &[Rule],
        release: &Release,
        candidates_by_rule: &BTreeMap<RuleId, Vec<CandidateFact>>,
    ) {
        for rule in rules {
            let change_type = if rule.supersedes_id.is_some() { "update" } else { "create" };
            let previous_value = rule
                .supersedes_id
                .as_ref()
                .and_then(|id| self.rule_repo.get(id).ok())
                .map_or(serde_json::Value::Null, |previous_rule| previous_rule.value);
            let source_url = candidates_by_rule
                .get(&rule.id)
                .into_iter()
                .flatten()
                .flat_map(|candidate| &candidate.grounding_quotes)
                .find_map(|quote| self.evidence_repo.get(&quote.evidence_id).ok().map(|evidence| evidence.url));
            let body = serde_json::json!({
                "ruleId": rule.id.as_str(),
                "releaseId": release.id.as_str(),
                "changeType": change_type,
                "riskTier": rule.risk_tier,
                "confidence": rule.confidence.value(),
                "previousValue": previous_value,
                "sourceUrl": source_url,
            });
            if let Err(err) = self.queue.enqueue("content-sync", body, EnqueueOptions::default()) {
                tracing::warn!(rule_id = %rule.id, error = %err, "best-effort content-sync emission failed");
            }
            let embed_body = serde_json::json!({"ruleId": rule.id.as_str()});
            if let Err(err) = self.queue.enqueue(
                "embeddings",
                embed_body,
                EnqueueOptions { correlation: Correlation { source_slug: None, ..Correlation::default() }, ..EnqueueOptions::default() },
            ) {
                tracing::warn!(rule_id = %rule.id, error = %err, "best-effort embedding enqueue failed");
            }
        }
    }

    fn next_release_id(&self) -> ReleaseId {
        let sequence = self.release_id_counter.fetch_add(1, AtomicOrdering::Relaxed);
        ReleaseId::new(format!("release_{sequence:x}"))
    }
}

fn default_changelog(rules: &[Rule]) -> String {
    format!("Released {} rule(s): {}", rules.len(), rules.iter().map(|r| r.concept_slug.as_str()).collect::<Vec<_>>().join(", "))
}

const fn release_type_str(release_type: ReleaseType) -> &'static str {
    match release_type {
        ReleaseType::Major => "major",
        ReleaseType::Minor => "minor",
        ReleaseType::Patch => "patch",
    }
}

/// Derives the release type from the set of risk tiers in the batch (§4.8:
/// "always authoritative, never trusted from the LLM").
fn derive_release_type(tiers: &BTreeSet<truth_core::RiskTier>) -> ReleaseType {
    use truth_core::RiskTier::{T0, T1};
    if tiers.contains(&T0) {
        ReleaseType::Major
    } else if tiers.contains(&T1) {
        ReleaseType::Minor
    } else {
        ReleaseType::Patch
    }
}

/// Bumps `prev` by `release_type`, per §4.8's version derivation table.
fn bump_version(prev: Version, release_type: ReleaseType) -> Version {
    match release_type {
        ReleaseType::Major => Version { major: prev.major + 1, minor: 0, patch: 0 },
        ReleaseType::Minor => Version { major: prev.major, minor: prev.minor + 1, patch: 0 },
        ReleaseType::Patch => Version { major: prev.major, minor: prev.minor, patch: prev.patch + 1 },
    }
}

/// Normalizes a date to ISO 8601 for the content-hash projection (§3).
fn normalize_date(date: time::Date) -> String {
    date.format(&time::format_description::well_known::Iso8601::DEFAULT).unwrap_or_else(|_| date.to_string())
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derive_release_type_prefers_highest_tier() {
        use truth_core::RiskTier::{T0, T1, T2, T3};
        assert_eq!(derive_release_type(&BTreeSet::from([T2, T3])), ReleaseType::Patch);
        assert_eq!(derive_release_type(&BTreeSet::from([T1, T3])), ReleaseType::Minor);
        assert_eq!(derive_release_type(&BTreeSet::from([T0, T1])), ReleaseType::Major);
    }

    #[test]
    fn bump_version_resets_lower_components() {
        let prev = Version { major: 1, minor: 2, patch: 3 };
        assert_eq!(bump_version(prev, ReleaseType::Major), Version { major: 2, minor: 0, patch: 0 });
        assert_eq!(bump_version(prev, ReleaseType::Minor), Version { major: 1, minor: 3, patch: 0 });
        assert_eq!(bump_version(prev, ReleaseType::Patch), Version { major: 1, minor: 2, patch: 4 });
    }

    #[test]
    fn first_release_bumps_from_zero() {
        let zero = Version { major: 0, minor: 0, patch: 0 };
        assert_eq!(bump_version(zero, ReleaseType::Patch), Version { major: 0, minor: 0, patch: 1 });
    }

    #[test]
    fn classify_quote_match_prefers_exact() {
        assert_eq!(classify_quote_match("The rate is 25%.", "rate is 25%"), Some(QuoteMatchKind::Exact));
    }

    #[test]
    fn classify_quote_match_falls_back_to_whitespace_collapsed() {
        let raw = "The   rate\nis 25%.";
        assert_eq!(classify_quote_match(raw, "The rate is 25%."), Some(QuoteMatchKind::WhitespaceCollapsed));
    }

    #[test]
    fn classify_quote_match_falls_back_to_case_insensitive() {
        assert_eq!(classify_quote_match("THE RATE IS 25%.", "the rate is 25%."), Some(QuoteMatchKind::CaseInsensitive));
    }

    #[test]
    fn classify_quote_match_falls_back_to_fuzzy() {
        assert_eq!(classify_quote_match("the, rate: is 25%!", "the rate is 25%"), Some(QuoteMatchKind::Fuzzy));
    }

    #[test]
    fn classify_quote_match_none_when_absent() {
        assert_eq!(classify_quote_match("Completely unrelated text.", "the rate is 25%"), None);
    }

    #[test]
    fn fuzzy_never_suffices_for_critical_tiers() {
        assert!(!QuoteMatchKind::Fuzzy.acceptable_for(truth_core::RiskTier::T0));
        assert!(!QuoteMatchKind::Fuzzy.acceptable_for(truth_core::RiskTier::T1));
        assert!(QuoteMatchKind::Fuzzy.acceptable_for(truth_core::RiskTier::T2));
    }

    #[test]
    fn format_failing_rules_suffixes_extra_count() {
        let rules: BTreeSet<_> = ["a", "b", "c", "d", "e"].iter().map(|s| FailingRule { concept_slug: (*s).to_owned() }).collect();
        assert_eq!(format_failing_rules(&rules), "a, b, c (and 2 more)");
    }

    #[test]
    fn format_failing_rules_no_suffix_under_threshold() {
        let rules: BTreeSet<_> = ["a", "b"].iter().map(|s| FailingRule { concept_slug: (*s).to_owned() }).collect();
        assert_eq!(format_failing_rules(&rules), "a, b");
    }
}
