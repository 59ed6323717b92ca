// truth-core/src/lib.rs
// ============================================================================
// Module: Truth Pipeline Core Library
// Description: Public API surface for the regulatory-truth pipeline core.
// Purpose: Expose identifiers, domain models, the Applies-When DSL, and the
//          repository boundary shared by every pipeline stage.
// Dependencies: crate::{applies_when, authority, content_clean, error,
//              hashing, identifiers, model, quote_normalize, repo}
// ============================================================================

//! ## Overview
//! `truth-core` has no network, storage, or process dependencies of its own —
//! it is the shared vocabulary every other crate in the pipeline (queue,
//! providers, LLM runner, pipeline stages, store, watchdog, capability
//! executor) builds on: identifiers, the §3 entity models and their
//! invariants, canonical hashing, the Applies-When DSL, and the repository
//! trait boundary.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod applies_when;
pub mod authority;
pub mod content_clean;
pub mod error;
pub mod hashing;
pub mod identifiers;
pub mod model;
pub mod quote_normalize;
pub mod repo;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use applies_when::AppliesWhenError;
pub use applies_when::EvalContext;
pub use applies_when::Predicate;
pub use applies_when::evaluate as evaluate_applies_when;
pub use applies_when::parse_applies_when;
pub use applies_when::parse_or_trivial_accept;
pub use applies_when::trivial_accept;
pub use authority::AuthorityLevel;
pub use content_clean::CleaningStats;
pub use content_clean::ContentCleaner;
pub use content_clean::DefaultContentCleaner;
pub use content_clean::clean;
pub use error::ErrorCode;
pub use error::PipelineError;
pub use hashing::DEFAULT_HASH_ALGORITHM;
pub use hashing::HashAlgorithm;
pub use hashing::HashDigest;
pub use hashing::HashError;
pub use hashing::canonical_json_bytes;
pub use hashing::hash_bytes;
pub use hashing::hash_canonical_json;
pub use hashing::hash_evidence_bytes;
pub use identifiers::ActionId;
pub use identifiers::AgentRunId;
pub use identifiers::CandidateFactId;
pub use identifiers::CapabilityId;
pub use identifiers::CompanyId;
pub use identifiers::ConceptSlug;
pub use identifiers::ConflictId;
pub use identifiers::EvidenceId;
pub use identifiers::JobId;
pub use identifiers::ProviderId;
pub use identifiers::ReleaseId;
pub use identifiers::RuleId;
pub use identifiers::RunId;
pub use identifiers::SourceId;
pub use identifiers::UserId;
pub use model::ALLOWED_DOMAINS;
pub use model::AgentRun;
pub use model::AgentRunStatus;
pub use model::AuditTrail;
pub use model::CandidateFact;
pub use model::CandidateFactStatus;
pub use model::Confidence;
pub use model::ConfidenceRangeError;
pub use model::Conflict;
pub use model::ConflictKind;
pub use model::ConflictResolution;
pub use model::ContentClass;
pub use model::ContentType;
pub use model::Domain;
pub use model::Evidence;
pub use model::EvidenceArtifact;
pub use model::GroundingQuote;
pub use model::Outcome;
pub use model::OutcomeStatus;
pub use model::Release;
pub use model::ReleaseType;
pub use model::RiskTier;
pub use model::Rule;
pub use model::RuleContentTuple;
pub use model::RuleStatus;
pub use model::UnknownDomainError;
pub use model::ValueType;
pub use model::Version;
pub use quote_normalize::normalize_quotes;
pub use quote_normalize::normalized_contains;
pub use repo::AgentRunRepository;
pub use repo::Alert;
pub use repo::AlertRepository;
pub use repo::AlertSeverity;
pub use repo::AuditEvent;
pub use repo::AuditLogRepository;
pub use repo::CandidateFactRepository;
pub use repo::ConflictRepository;
pub use repo::EvidenceRepository;
pub use repo::RejectedExtraction;
pub use repo::ReleaseRepository;
pub use repo::RepoError;
pub use repo::RepoResult;
pub use repo::RuleRepository;
