// truth-store-sqlite/src/codec.rs
// ============================================================================
// Module: Column Codecs
// Description: Serialization helpers shared by every repository impl.
// Purpose: Centralize the TEXT-column encodings (RFC 3339 timestamps, ISO
//          dates, JSON blobs) so each repository file only deals with typed
//          values, never raw strings.
// Dependencies: serde, serde_json, time
// ============================================================================

//! ## Overview
//! Every row column that is not a plain integer/text scalar goes through one
//! of these helpers: `time::OffsetDateTime` as RFC 3339, `time::Date` as
//! `YYYY-MM-DD`, and any structured value as canonical-adjacent JSON (plain
//! `serde_json::to_string`, not RFC 8785 — only [`truth_core::Release`]
//! content hashing needs JCS, and that happens before rows ever reach this
//! crate).

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Serialize;
use serde::de::DeserializeOwned;
use time::Date;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;

use crate::error::MAX_JSON_COLUMN_BYTES;
use crate::error::SqliteStoreError;

// ============================================================================
// SECTION: Timestamps
// ============================================================================

/// Encodes a timestamp as RFC 3339 text.
#[must_use]
pub fn encode_timestamp(value: OffsetDateTime) -> String {
    value.format(&Rfc3339).unwrap_or_else(|_| value.unix_timestamp().to_string())
}

/// Decodes an RFC 3339 timestamp column.
///
/// # Errors
///
/// Returns [`SqliteStoreError::Corrupt`] when `text` is not valid RFC 3339.
pub fn decode_timestamp(text: &str) -> Result<OffsetDateTime, SqliteStoreError> {
    OffsetDateTime::parse(text, &Rfc3339)
        .map_err(|err| SqliteStoreError::Corrupt(format!("invalid timestamp {text:?}: {err}")))
}

// ============================================================================
// SECTION: Dates
// ============================================================================

const DATE_FORMAT: &[time::format_description::FormatItem<'_>] = format_description!("[year]-[month]-[day]");

/// Encodes a calendar date as `YYYY-MM-DD`.
#[must_use]
pub fn encode_date(value: Date) -> String {
    value.format(DATE_FORMAT).unwrap_or_else(|_| value.to_string())
}

/// Decodes a `YYYY-MM-DD` date column.
///
/// # Errors
///
/// Returns [`SqliteStoreError::Corrupt`] when `text` is not a valid date.
pub fn decode_date(text: &str) -> Result<Date, SqliteStoreError> {
    Date::parse(text, DATE_FORMAT).map_err(|err| SqliteStoreError::Corrupt(format!("invalid date {text:?}: {err}")))
}

// ============================================================================
// SECTION: JSON
// ============================================================================

/// Encodes a value as a JSON text column, rejecting oversized payloads.
///
/// # Errors
///
/// Returns [`SqliteStoreError::Invalid`] when serialization fails, or
/// [`SqliteStoreError::TooLarge`] when the encoded text exceeds
/// [`MAX_JSON_COLUMN_BYTES`].
pub fn encode_json<T: Serialize + ?Sized>(value: &T) -> Result<String, SqliteStoreError> {
    let text = serde_json::to_string(value).map_err(|err| SqliteStoreError::Invalid(err.to_string()))?;
    if text.len() > MAX_JSON_COLUMN_BYTES {
        return Err(SqliteStoreError::TooLarge { max_bytes: MAX_JSON_COLUMN_BYTES, actual_bytes: text.len() });
    }
    Ok(text)
}

/// Decodes a JSON text column.
///
/// # Errors
///
/// Returns [`SqliteStoreError::Corrupt`] when `text` does not deserialize.
pub fn decode_json<T: DeserializeOwned>(text: &str) -> Result<T, SqliteStoreError> {
    serde_json::from_str(text).map_err(|err| SqliteStoreError::Corrupt(format!("invalid json column: {err}")))
}
