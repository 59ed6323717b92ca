// truth-pipeline/src/lib.rs
// ============================================================================
// Module: Truth Pipeline Library
// Description: Public API surface for the staged job pipeline — Extractor
//              (C5), Composer (C6), Reviewer + Arbiter + auto-approval (C7),
//              and Releaser (C8).
// Purpose: Expose each stage's worker type and error enum, plus the shared
//          queue-name constants and the source-authority resolution seam
//          the Composer and Arbiter both depend on.
// Dependencies: crate::{arbiter, composer, extractor, queues, releaser,
//              reviewer, source_authority}
// ============================================================================

//! ## Overview
//! `truth-pipeline` implements the four LLM-backed stages of the regulatory
//! pipeline described in §4: [`extractor::Extractor`] turns cleaned Evidence
//! into grounded CandidateFacts, [`composer::Composer`] groups CandidateFacts
//! into draft Rules (or flags them as conflicting), [`reviewer::Reviewer`]
//! and [`arbiter::Arbiter`] score and resolve them, and [`releaser::Releaser`]
//! gates, versions, and publishes the resulting Rules as an immutable
//! Release. Each stage is a plain struct built from `Arc`-shared repository
//! trait objects and a [`truth_llm::LlmRunner`]; none of them own a worker
//! loop — that belongs to the binary that polls [`truth_queue::Queue`] and
//! calls `run`/`run_batch`/`score`/`resolve`/`release` per job.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod arbiter;
pub mod composer;
pub mod extractor;
pub mod queues;
pub mod releaser;
pub mod reviewer;
pub mod source_authority;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use arbiter::Arbiter;
pub use arbiter::ArbiterError;
pub use composer::BatchOutcome as ComposerBatchOutcome;
pub use composer::Composer;
pub use composer::ComposerError;
pub use composer::ConflictingPair;
pub use composer::DraftRule;
pub use extractor::BatchOutcome as ExtractorBatchOutcome;
pub use extractor::CoverageReport;
pub use extractor::Extractor;
pub use extractor::ExtractorError;
pub use extractor::RawExtraction;
pub use extractor::RejectionReason;
pub use queues::BLOCKED_TEST_DOMAINS;
pub use queues::QUEUE_COMPOSE;
pub use queues::QUEUE_EXTRACT;
pub use queues::QUEUE_RELEASE;
pub use queues::QUEUE_REVIEW;
pub use queues::is_blocked_host;
pub use releaser::GateFailure;
pub use releaser::Releaser;
pub use releaser::ReleaserError;
pub use reviewer::AUTO_APPROVAL_SCORE_THRESHOLD;
pub use reviewer::ReviewScore;
pub use reviewer::Reviewer;
pub use source_authority::SourceAuthorityResolver;
pub use source_authority::StaticSourceAuthorityResolver;
