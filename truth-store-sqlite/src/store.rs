// truth-store-sqlite/src/store.rs
// ============================================================================
// Module: Truth Store
// Description: The shared connection handle every repository impl locks.
// Purpose: Own the single `Arc<Mutex<Connection>>` (teacher's concurrency
//          model: one writer at a time, blocking rather than async, since
//          §5 treats persistence round-trips as ordinary suspension points).
// Dependencies: rusqlite, std::sync
// ============================================================================

//! ## Overview
//! [`TruthStore`] is the one concrete type this crate exports that callers
//! construct directly; every `truth_core`/`truth_llm` trait implementation
//! lives in a sibling module (`evidence`, `candidate_fact`, `rule`,
//! `conflict`, `release`, `agent_run`, `audit`, `alert`,
//! `circuit_breaker`) as an `impl ... for TruthStore` block that locks
//! [`TruthStore::connection`] for the duration of one statement or
//! transaction.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::Mutex;

use rusqlite::Connection;

use crate::connection::SqliteStoreConfig;
use crate::connection::ensure_parent_dir;
use crate::connection::initialize_schema;
use crate::connection::open_connection;
use crate::connection::validate_store_path;
use crate::error::SqliteStoreError;

// ============================================================================
// SECTION: Store
// ============================================================================

/// `SQLite`-backed implementation of every `truth-core` repository trait.
#[derive(Clone)]
pub struct TruthStore {
    /// Shared connection, guarded by a mutex (one writer at a time).
    pub(crate) connection: Arc<Mutex<Connection>>,
}

impl TruthStore {
    /// Opens (creating if absent) a `TruthStore` at `config.path`, validating
    /// the path, applying pragmas, and initializing the schema.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the path is invalid, the parent
    /// directory cannot be created, the connection cannot be opened, or
    /// schema initialization fails.
    pub fn open(config: SqliteStoreConfig) -> Result<Self, SqliteStoreError> {
        validate_store_path(&config.path)?;
        ensure_parent_dir(&config.path)?;
        let mut connection = open_connection(&config)?;
        initialize_schema(&mut connection)?;
        Ok(Self { connection: Arc::new(Mutex::new(connection)) })
    }

    /// Opens an in-memory store, useful for tests.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the in-memory connection cannot be
    /// opened or schema initialization fails.
    pub fn open_in_memory() -> Result<Self, SqliteStoreError> {
        let mut connection = Connection::open_in_memory()?;
        connection.pragma_update(None, "foreign_keys", "ON")?;
        initialize_schema(&mut connection)?;
        Ok(Self { connection: Arc::new(Mutex::new(connection)) })
    }

    /// Locks the shared connection, mapping a poisoned lock onto
    /// [`SqliteStoreError::Db`] rather than panicking (a prior panic while
    /// holding the lock is an internal-error condition, not a cue to unwind
    /// the caller too).
    pub(crate) fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, SqliteStoreError> {
        self.connection.lock().map_err(|_poisoned| SqliteStoreError::Db("store connection lock poisoned".to_string()))
    }
}
