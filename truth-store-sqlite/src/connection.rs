// truth-store-sqlite/src/connection.rs
// ============================================================================
// Module: Connection Setup
// Description: Path validation, pragma application, and schema versioning
//              for the single shared SQLite connection, covering the full §3
//              entity schema.
// Purpose: Keep connection bring-up — the part every caller needs identical
//          — isolated from the per-entity repository implementations.
// Dependencies: rusqlite
// ============================================================================

//! ## Overview
//! Validates the connection setup before opening: path
//! length/component limits checked before `SQLite` ever sees the path,
//! `OpenFlags::SQLITE_OPEN_READ_WRITE | CREATE | FULL_MUTEX`, WAL journal
//! mode plus a configurable sync mode and busy timeout, and a `store_meta`
//! table carrying a single schema-version row that [`initialize_schema`]
//! checks on every open.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::path::PathBuf;

use rusqlite::Connection;
use rusqlite::OpenFlags;
use serde::Deserialize;

use crate::error::SqliteStoreError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Schema version written to `store_meta` by [`initialize_schema`].
pub const SCHEMA_VERSION: i64 = 1;
/// Default busy timeout, in milliseconds.
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;

// ============================================================================
// SECTION: Config
// ============================================================================

/// `SQLite` journal mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteStoreMode {
    /// WAL journal mode (recommended; concurrent readers, one writer).
    #[default]
    Wal,
    /// Legacy rollback-journal mode.
    Delete,
}

impl SqliteStoreMode {
    /// Returns the `SQLite` pragma value for this mode.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Wal => "wal",
            Self::Delete => "delete",
        }
    }
}

/// `SQLite` synchronous mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteSyncMode {
    /// Full fsync on every commit (safest).
    #[default]
    Full,
    /// Reduced fsync frequency; safe under WAL, faster.
    Normal,
}

impl SqliteSyncMode {
    /// Returns the `SQLite` pragma value for this mode.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Normal => "normal",
        }
    }
}

/// Configuration for [`crate::TruthStore::open`].
#[derive(Debug, Clone, Deserialize)]
pub struct SqliteStoreConfig {
    /// Path to the `SQLite` database file.
    pub path: PathBuf,
    /// Busy timeout in milliseconds, applied via `PRAGMA busy_timeout`.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// Journal mode.
    #[serde(default)]
    pub journal_mode: SqliteStoreMode,
    /// Synchronous mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
}

const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

impl SqliteStoreConfig {
    /// Builds a config pointing at `path` with the default busy timeout,
    /// WAL journaling, and full synchronous mode.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            journal_mode: SqliteStoreMode::Wal,
            sync_mode: SqliteSyncMode::Full,
        }
    }
}

// ============================================================================
// SECTION: Path Validation
// ============================================================================

/// Rejects paths whose total length or any component exceeds the configured
/// limits, before `SQLite` (or the filesystem) ever sees them.
///
/// # Errors
///
/// Returns [`SqliteStoreError::Invalid`] when a limit is exceeded.
pub fn validate_store_path(path: &Path) -> Result<(), SqliteStoreError> {
    let total_len = path.as_os_str().len();
    if total_len > MAX_TOTAL_PATH_LENGTH {
        return Err(SqliteStoreError::Invalid(format!(
            "store path exceeds {MAX_TOTAL_PATH_LENGTH} bytes: {total_len} bytes"
        )));
    }
    for component in path.components() {
        let component_len = component.as_os_str().len();
        if component_len > MAX_PATH_COMPONENT_LENGTH {
            return Err(SqliteStoreError::Invalid(format!(
                "store path component exceeds {MAX_PATH_COMPONENT_LENGTH} bytes: {component_len} bytes"
            )));
        }
    }
    Ok(())
}

/// Creates the parent directory of `path`, if it does not already exist.
///
/// # Errors
///
/// Returns [`SqliteStoreError::Io`] when directory creation fails.
pub fn ensure_parent_dir(path: &Path) -> Result<(), SqliteStoreError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

// ============================================================================
// SECTION: Connection Open / Pragmas
// ============================================================================

/// Opens the `SQLite` connection and applies pragmas.
///
/// # Errors
///
/// Returns [`SqliteStoreError::Db`] when the connection cannot be opened or
/// a pragma fails.
pub fn open_connection(config: &SqliteStoreConfig) -> Result<Connection, SqliteStoreError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
    let connection = Connection::open_with_flags(&config.path, flags)?;
    apply_pragmas(&connection, config)?;
    Ok(connection)
}

/// Applies the store's WAL/sync/busy-timeout/foreign-key pragmas.
///
/// # Errors
///
/// Returns [`SqliteStoreError::Db`] when any pragma fails.
pub fn apply_pragmas(connection: &Connection, config: &SqliteStoreConfig) -> Result<(), SqliteStoreError> {
    connection.pragma_update(None, "foreign_keys", "ON")?;
    connection.pragma_update(None, "journal_mode", config.journal_mode.pragma_value())?;
    connection.pragma_update(None, "synchronous", config.sync_mode.pragma_value())?;
    connection.pragma_update(None, "busy_timeout", config.busy_timeout_ms)?;
    Ok(())
}

// ============================================================================
// SECTION: Schema
// ============================================================================

/// Creates every table this store owns, if absent, and checks `store_meta`'s
/// schema version against [`SCHEMA_VERSION`].
///
/// # Errors
///
/// Returns [`SqliteStoreError::VersionMismatch`] when an existing database
/// carries a newer schema version than this build supports, or
/// [`SqliteStoreError::Db`] when any DDL statement fails.
pub fn initialize_schema(connection: &mut Connection) -> Result<(), SqliteStoreError> {
    let tx = connection.transaction()?;

    tx.execute_batch(
        r"
        CREATE TABLE IF NOT EXISTS store_meta (
            version INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS evidence (
            id                    TEXT PRIMARY KEY,
            source_id             TEXT NOT NULL,
            url                   TEXT NOT NULL,
            content_type          TEXT NOT NULL,
            content_class         TEXT NOT NULL,
            raw_bytes             BLOB NOT NULL,
            cleaned_text          TEXT,
            content_hash_algo     TEXT NOT NULL,
            content_hash_value    TEXT NOT NULL,
            fetched_at            TEXT NOT NULL,
            has_changed           INTEGER NOT NULL,
            artifacts_json        TEXT NOT NULL,
            UNIQUE (source_id, url, content_hash_value)
        );
        CREATE INDEX IF NOT EXISTS idx_evidence_source ON evidence (source_id, fetched_at DESC);

        CREATE TABLE IF NOT EXISTS rejected_extractions (
            evidence_id  TEXT NOT NULL,
            reason       TEXT NOT NULL,
            raw_output   TEXT NOT NULL,
            rejected_at  TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS candidate_facts (
            id                   TEXT PRIMARY KEY,
            domain               TEXT NOT NULL,
            value_type           TEXT NOT NULL,
            extracted_value      TEXT NOT NULL,
            grounding_quotes     TEXT NOT NULL,
            value_confidence     REAL NOT NULL,
            overall_confidence   REAL NOT NULL,
            status               TEXT NOT NULL,
            promotion_candidate  INTEGER NOT NULL,
            created_at           TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_candidate_facts_domain_status ON candidate_facts (domain, status);

        CREATE TABLE IF NOT EXISTS candidate_fact_evidence (
            candidate_fact_id  TEXT NOT NULL,
            evidence_id        TEXT NOT NULL,
            PRIMARY KEY (candidate_fact_id, evidence_id)
        );

        CREATE TABLE IF NOT EXISTS rule_candidate_facts (
            rule_id            TEXT NOT NULL,
            candidate_fact_id  TEXT NOT NULL,
            PRIMARY KEY (rule_id, candidate_fact_id)
        );
        CREATE INDEX IF NOT EXISTS idx_rule_candidate_facts_by_fact ON rule_candidate_facts (candidate_fact_id);

        CREATE TABLE IF NOT EXISTS rules (
            id                 TEXT PRIMARY KEY,
            concept_slug       TEXT NOT NULL,
            title_hr           TEXT NOT NULL,
            title_en           TEXT NOT NULL,
            risk_tier          TEXT NOT NULL,
            authority_level    TEXT NOT NULL,
            applies_when       TEXT NOT NULL,
            value              TEXT NOT NULL,
            value_type         TEXT NOT NULL,
            effective_from     TEXT NOT NULL,
            effective_until    TEXT,
            supersedes_id      TEXT,
            status             TEXT NOT NULL,
            confidence         REAL NOT NULL,
            approved_by        TEXT,
            status_changed_at  TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_rules_status ON rules (status);

        CREATE TABLE IF NOT EXISTS concept_rules (
            concept_slug  TEXT NOT NULL,
            rule_id       TEXT NOT NULL,
            PRIMARY KEY (concept_slug, rule_id)
        );

        CREATE TABLE IF NOT EXISTS rule_amends (
            rule_id        TEXT NOT NULL,
            supersedes_id  TEXT NOT NULL,
            PRIMARY KEY (rule_id, supersedes_id)
        );

        CREATE TABLE IF NOT EXISTS conflicts (
            id             TEXT PRIMARY KEY,
            conflict_type  TEXT NOT NULL,
            item_a_id      TEXT,
            item_b_id      TEXT,
            status         TEXT NOT NULL,
            description    TEXT NOT NULL,
            metadata       TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_conflicts_status ON conflicts (status);

        CREATE TABLE IF NOT EXISTS releases (
            id                   TEXT PRIMARY KEY,
            major                INTEGER NOT NULL,
            minor                INTEGER NOT NULL,
            patch                INTEGER NOT NULL,
            release_type         TEXT NOT NULL,
            released_at          TEXT NOT NULL,
            effective_from       TEXT NOT NULL,
            content_hash_algo    TEXT NOT NULL,
            content_hash_value   TEXT NOT NULL,
            changelog            TEXT NOT NULL,
            approved_by_json     TEXT NOT NULL,
            audit_trail_json     TEXT NOT NULL,
            is_latest            INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_releases_version ON releases (major DESC, minor DESC, patch DESC);

        CREATE TABLE IF NOT EXISTS release_rules (
            release_id  TEXT NOT NULL,
            rule_id     TEXT NOT NULL,
            PRIMARY KEY (release_id, rule_id)
        );

        CREATE TABLE IF NOT EXISTS agent_runs (
            id              TEXT PRIMARY KEY,
            agent_type      TEXT NOT NULL,
            status          TEXT NOT NULL,
            input_json      TEXT NOT NULL,
            output_json     TEXT,
            duration_ms     INTEGER NOT NULL,
            confidence      REAL,
            error           TEXT,
            run_id          TEXT NOT NULL,
            job_id          TEXT NOT NULL,
            parent_job_id   TEXT,
            source_slug     TEXT,
            queue_name      TEXT NOT NULL,
            recorded_at     TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_agent_runs_type_time ON agent_runs (agent_type, recorded_at);

        CREATE TABLE IF NOT EXISTS audit_log (
            id            INTEGER PRIMARY KEY AUTOINCREMENT,
            action        TEXT NOT NULL,
            entity_type   TEXT NOT NULL,
            entity_id     TEXT NOT NULL,
            performed_by  TEXT,
            metadata      TEXT NOT NULL,
            performed_at  TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_audit_log_entity ON audit_log (entity_type, entity_id, performed_at);

        CREATE TABLE IF NOT EXISTS circuit_breaker_state (
            provider_id            TEXT PRIMARY KEY,
            state                  TEXT NOT NULL,
            consecutive_failures   INTEGER NOT NULL,
            last_failure_at        TEXT,
            last_success_at        TEXT,
            opened_at              TEXT,
            last_error             TEXT,
            persisted_at           TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS alerts (
            alert_type                 TEXT NOT NULL,
            entity_id                  TEXT NOT NULL,
            severity                   TEXT NOT NULL,
            message                    TEXT NOT NULL,
            occurrence_count           INTEGER NOT NULL,
            first_seen_at              TEXT NOT NULL,
            last_seen_at               TEXT NOT NULL,
            dedup_window_expires_at    TEXT NOT NULL,
            PRIMARY KEY (alert_type, entity_id)
        );
        ",
    )?;

    let stored_version: Option<i64> = tx.query_row("SELECT version FROM store_meta LIMIT 1", [], |row| row.get(0)).ok();
    match stored_version {
        None => {
            tx.execute("INSERT INTO store_meta (version) VALUES (?1)", [SCHEMA_VERSION])?;
        },
        Some(version) if version == SCHEMA_VERSION => {},
        Some(version) if version > SCHEMA_VERSION => {
            return Err(SqliteStoreError::VersionMismatch(format!(
                "database schema version {version} is newer than supported version {SCHEMA_VERSION}"
            )));
        },
        Some(version) => {
            return Err(SqliteStoreError::VersionMismatch(format!(
                "database schema version {version} predates migrations this build knows how to apply (expected {SCHEMA_VERSION})"
            )));
        },
    }

    tx.commit()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_store_path_accepts_short_path() {
        assert!(validate_store_path(Path::new("/tmp/truth/store.db")).is_ok());
    }

    #[test]
    fn validate_store_path_rejects_long_component() {
        let long_component = "a".repeat(MAX_PATH_COMPONENT_LENGTH + 1);
        let path = PathBuf::from(format!("/tmp/{long_component}/store.db"));
        assert!(validate_store_path(&path).is_err());
    }

    #[test]
    fn open_connection_then_initialize_schema_is_idempotent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = SqliteStoreConfig::new(dir.path().join("store.db"));
        ensure_parent_dir(&config.path).expect("parent dir");
        let mut connection = open_connection(&config).expect("open");
        initialize_schema(&mut connection).expect("first init");
        initialize_schema(&mut connection).expect("second init is a no-op");
    }
}
