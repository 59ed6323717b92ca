// truth-store-sqlite/src/circuit_breaker.rs
// ============================================================================
// Module: Circuit Breaker Store
// Description: SQLite-backed truth_llm::circuit_breaker::CircuitBreakerStore.
// Purpose: Persist one row per provider in `circuit_breaker_state`, the
//          shared-KV-with-TTL store §4.7 calls for.
// Dependencies: rusqlite, truth-llm
// ============================================================================

// ============================================================================
// SECTION: Imports
// ============================================================================

use rusqlite::OptionalExtension;
use rusqlite::params;
use time::OffsetDateTime;
use truth_llm::circuit_breaker::CircuitBreakerRecord;
use truth_llm::circuit_breaker::CircuitBreakerStore;
use truth_llm::circuit_breaker::CircuitBreakerStoreError;
use truth_llm::circuit_breaker::CircuitState;

use crate::codec::decode_timestamp;
use crate::codec::encode_timestamp;
use crate::store::TruthStore;

// ============================================================================
// SECTION: State Codec
// ============================================================================

const fn state_tag(state: CircuitState) -> &'static str {
    match state {
        CircuitState::Closed => "closed",
        CircuitState::Open => "open",
        CircuitState::HalfOpen => "half_open",
    }
}

fn parse_state(tag: &str) -> Result<CircuitState, CircuitBreakerStoreError> {
    match tag {
        "closed" => Ok(CircuitState::Closed),
        "open" => Ok(CircuitState::Open),
        "half_open" => Ok(CircuitState::HalfOpen),
        other => Err(CircuitBreakerStoreError(format!("unrecognized circuit breaker state: {other}"))),
    }
}

fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<(CircuitBreakerRecord, OffsetDateTime)> {
    let state_tag_text: String = row.get("state")?;
    let last_failure_at_text: Option<String> = row.get("last_failure_at")?;
    let last_success_at_text: Option<String> = row.get("last_success_at")?;
    let opened_at_text: Option<String> = row.get("opened_at")?;
    let persisted_at_text: String = row.get("persisted_at")?;

    let record = CircuitBreakerRecord {
        provider_id: row.get("provider_id")?,
        state: parse_state(&state_tag_text).map_err(to_rusqlite_error)?,
        consecutive_failures: row.get::<_, i64>("consecutive_failures")?.try_into().unwrap_or_default(),
        last_failure_at: last_failure_at_text.map(|text| decode_timestamp(&text)).transpose().map_err(to_rusqlite_error)?,
        last_success_at: last_success_at_text.map(|text| decode_timestamp(&text)).transpose().map_err(to_rusqlite_error)?,
        opened_at: opened_at_text.map(|text| decode_timestamp(&text)).transpose().map_err(to_rusqlite_error)?,
        last_error: row.get("last_error")?,
    };
    let persisted_at = decode_timestamp(&persisted_at_text).map_err(to_rusqlite_error)?;
    Ok((record, persisted_at))
}

fn to_rusqlite_error(error: crate::error::SqliteStoreError) -> rusqlite::Error {
    rusqlite::Error::ToSqlConversionFailure(Box::new(error))
}

fn to_store_error(error: rusqlite::Error) -> CircuitBreakerStoreError {
    CircuitBreakerStoreError(error.to_string())
}

// ============================================================================
// SECTION: CircuitBreakerStore
// ============================================================================

impl CircuitBreakerStore for TruthStore {
    fn load(&self, provider_id: &str) -> Result<Option<(CircuitBreakerRecord, OffsetDateTime)>, CircuitBreakerStoreError> {
        let connection = self.lock().map_err(|err| CircuitBreakerStoreError(err.to_string()))?;
        connection
            .query_row(
                "SELECT * FROM circuit_breaker_state WHERE provider_id = ?1",
                params![provider_id],
                row_to_record,
            )
            .optional()
            .map_err(to_store_error)
    }

    fn save(&self, record: &CircuitBreakerRecord, now: OffsetDateTime) -> Result<(), CircuitBreakerStoreError> {
        let connection = self.lock().map_err(|err| CircuitBreakerStoreError(err.to_string()))?;
        connection
            .execute(
                "INSERT INTO circuit_breaker_state (
                    provider_id, state, consecutive_failures, last_failure_at, last_success_at,
                    opened_at, last_error, persisted_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                ON CONFLICT (provider_id) DO UPDATE SET
                    state = excluded.state,
                    consecutive_failures = excluded.consecutive_failures,
                    last_failure_at = excluded.last_failure_at,
                    last_success_at = excluded.last_success_at,
                    opened_at = excluded.opened_at,
                    last_error = excluded.last_error,
                    persisted_at = excluded.persisted_at",
                params![
                    record.provider_id,
                    state_tag(record.state),
                    i64::from(record.consecutive_failures),
                    record.last_failure_at.map(encode_timestamp),
                    record.last_success_at.map(encode_timestamp),
                    record.opened_at.map(encode_timestamp),
                    record.last_error,
                    encode_timestamp(now),
                ],
            )
            .map_err(to_store_error)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_on_empty_store_returns_none() {
        let store = TruthStore::open_in_memory().expect("open");
        assert!(store.load("ollama").expect("load").is_none());
    }

    #[test]
    fn save_then_load_round_trips() {
        let store = TruthStore::open_in_memory().expect("open");
        let record = CircuitBreakerRecord::closed("ollama").record_failure(OffsetDateTime::UNIX_EPOCH, "timeout");
        store.save(&record, OffsetDateTime::UNIX_EPOCH).expect("save");
        let (loaded, persisted_at) = store.load("ollama").expect("load").expect("some");
        assert_eq!(loaded, record);
        assert_eq!(persisted_at, OffsetDateTime::UNIX_EPOCH);
    }

    #[test]
    fn save_overwrites_existing_row_for_provider() {
        let store = TruthStore::open_in_memory().expect("open");
        let first = CircuitBreakerRecord::closed("ollama").record_failure(OffsetDateTime::UNIX_EPOCH, "timeout");
        store.save(&first, OffsetDateTime::UNIX_EPOCH).expect("save first");
        let second = first.record_success(OffsetDateTime::UNIX_EPOCH + time::Duration::seconds(5));
        store.save(&second, OffsetDateTime::UNIX_EPOCH + time::Duration::seconds(5)).expect("save second");
        let (loaded, _) = store.load("ollama").expect("load").expect("some");
        assert_eq!(loaded, second);
    }
}
