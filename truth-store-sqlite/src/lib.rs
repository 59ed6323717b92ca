// truth-store-sqlite/src/lib.rs
// ============================================================================
// Module: Truth Store SQLite
// Description: SQLite-backed implementation of every truth-core repository
//              trait (C1), plus the truth-llm circuit-breaker store.
// Purpose: The only crate in the workspace that speaks SQL; every other
//          component depends on the trait boundaries in `truth-core`/
//          `truth-llm` instead.
// Dependencies: rusqlite, truth-core, truth-llm
// ============================================================================

//! ## Overview
//! [`TruthStore`] is a single `SQLite` connection, guarded by a mutex, that
//! implements `truth_core::EvidenceRepository`, `CandidateFactRepository`,
//! `RuleRepository`, `ConflictRepository`, `ReleaseRepository`,
//! `AgentRunRepository`, `AuditLogRepository`, `AlertRepository`, and
//! `truth_llm::circuit_breaker::CircuitBreakerStore`. Each trait's impl lives
//! in its own module, one concern per file.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod agent_run;
pub mod alert;
pub mod audit;
pub mod candidate_fact;
pub mod circuit_breaker;
pub mod codec;
pub mod conflict;
pub mod connection;
pub mod error;
pub mod evidence;
pub mod release;
pub mod rule;
pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use connection::SCHEMA_VERSION;
pub use connection::SqliteStoreConfig;
pub use connection::SqliteStoreMode;
pub use connection::SqliteSyncMode;
pub use error::MAX_JSON_COLUMN_BYTES;
pub use error::SqliteStoreError;
pub use store::TruthStore;
