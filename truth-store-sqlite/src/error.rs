// truth-store-sqlite/src/error.rs
// ============================================================================
// Module: Store Errors
// Description: SQLite-store-specific error enum and its mapping onto
//              truth-core's repository error taxonomy.
// Purpose: Keep rusqlite/serde_json error detail local to this crate; every
//          public repository method still returns truth_core::RepoError.
// Dependencies: rusqlite, thiserror, truth-core
// ============================================================================

//! ## Overview
//! `SqliteStoreError` classifies storage detail (`Io`/`Db`/`Corrupt`/
//! `VersionMismatch`/`Invalid`/`TooLarge`) here, then collapses it onto
//! [`truth_core::RepoError`] at the trait boundary so callers outside this
//! crate never see `rusqlite` types.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;
use truth_core::RepoError;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Maximum size accepted for a single JSON-encoded column value.
pub const MAX_JSON_COLUMN_BYTES: usize = 4 * 1024 * 1024;

/// Store-internal error, classified more finely than [`RepoError`].
#[derive(Debug, Error)]
pub enum SqliteStoreError {
    /// Filesystem I/O failure opening or preparing the database file.
    #[error("sqlite store io error: {0}")]
    Io(String),
    /// The underlying `SQLite` engine reported an error.
    #[error("sqlite store db error: {0}")]
    Db(String),
    /// A stored row failed a content-hash or schema-shape integrity check.
    #[error("sqlite store corruption: {0}")]
    Corrupt(String),
    /// The on-disk schema version does not match what this build expects.
    #[error("sqlite store version mismatch: {0}")]
    VersionMismatch(String),
    /// A supplied path or value failed validation before reaching `SQLite`.
    #[error("sqlite store invalid input: {0}")]
    Invalid(String),
    /// A JSON column payload exceeded [`MAX_JSON_COLUMN_BYTES`].
    #[error("sqlite store payload too large: {actual_bytes} bytes (max {max_bytes})")]
    TooLarge {
        /// Configured maximum.
        max_bytes: usize,
        /// Actual payload size.
        actual_bytes: usize,
    },
    /// The requested row does not exist.
    #[error("sqlite store row not found: {0}")]
    NotFound(String),
    /// The caller requested an illegal status transition or violated an
    /// entity invariant.
    #[error("sqlite store invariant violation: {0}")]
    InvariantViolation(String),
}

impl From<rusqlite::Error> for SqliteStoreError {
    fn from(error: rusqlite::Error) -> Self {
        Self::Db(error.to_string())
    }
}

impl From<std::io::Error> for SqliteStoreError {
    fn from(error: std::io::Error) -> Self {
        Self::Io(error.to_string())
    }
}

impl From<SqliteStoreError> for RepoError {
    fn from(error: SqliteStoreError) -> Self {
        match error {
            SqliteStoreError::NotFound(message) => Self::NotFound(message),
            SqliteStoreError::InvariantViolation(message) => Self::InvariantViolation(message),
            SqliteStoreError::Io(message)
            | SqliteStoreError::Db(message)
            | SqliteStoreError::Corrupt(message)
            | SqliteStoreError::VersionMismatch(message)
            | SqliteStoreError::Invalid(message) => Self::Backend(message),
            SqliteStoreError::TooLarge { max_bytes, actual_bytes } => {
                Self::Backend(format!("payload too large: {actual_bytes} bytes (max {max_bytes})"))
            },
        }
    }
}
