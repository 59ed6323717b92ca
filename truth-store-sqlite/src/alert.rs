// truth-store-sqlite/src/alert.rs
// ============================================================================
// Module: Alert Repository
// Description: SQLite-backed truth_core::AlertRepository impl.
// Purpose: Dedup watchdog alerts by (alert_type, entity_id) within a
//          sliding window, so a flapping check does not spam notifiers.
// Dependencies: rusqlite, truth-core
// ============================================================================

// ============================================================================
// SECTION: Imports
// ============================================================================

use rusqlite::OptionalExtension;
use rusqlite::params;
use time::Duration;
use time::OffsetDateTime;
use truth_core::Alert;
use truth_core::AlertRepository;
use truth_core::AlertSeverity;
use truth_core::RepoError;
use truth_core::RepoResult;

use crate::codec::decode_json;
use crate::codec::decode_timestamp;
use crate::codec::encode_json;
use crate::codec::encode_timestamp;
use crate::store::TruthStore;

// ============================================================================
// SECTION: Row Mapping
// ============================================================================

fn row_to_alert(row: &rusqlite::Row<'_>) -> rusqlite::Result<Alert> {
    let severity_json: String = row.get("severity")?;
    let first_seen_at_text: String = row.get("first_seen_at")?;
    let last_seen_at_text: String = row.get("last_seen_at")?;
    let dedup_window_expires_at_text: String = row.get("dedup_window_expires_at")?;
    let occurrence_count: i64 = row.get("occurrence_count")?;

    Ok(Alert {
        alert_type: row.get("alert_type")?,
        entity_id: row.get("entity_id")?,
        severity: decode_json::<AlertSeverity>(&severity_json).map_err(to_rusqlite_error)?,
        message: row.get("message")?,
        occurrence_count: occurrence_count.try_into().unwrap_or_default(),
        first_seen_at: decode_timestamp(&first_seen_at_text).map_err(to_rusqlite_error)?,
        last_seen_at: decode_timestamp(&last_seen_at_text).map_err(to_rusqlite_error)?,
        dedup_window_expires_at: decode_timestamp(&dedup_window_expires_at_text).map_err(to_rusqlite_error)?,
    })
}

fn to_rusqlite_error(error: crate::error::SqliteStoreError) -> rusqlite::Error {
    rusqlite::Error::ToSqlConversionFailure(Box::new(error))
}

fn backend(error: crate::error::SqliteStoreError) -> RepoError {
    RepoError::from(error)
}

// ============================================================================
// SECTION: AlertRepository
// ============================================================================

impl AlertRepository for TruthStore {
    fn record_occurrence(
        &self,
        alert_type: &str,
        entity_id: &str,
        severity: AlertSeverity,
        message: &str,
        now: OffsetDateTime,
        dedup_window: Duration,
    ) -> RepoResult<(Alert, bool)> {
        let severity_json = encode_json(&severity).map_err(backend)?;
        let mut connection = self.lock().map_err(backend)?;
        let tx = connection.transaction().map_err(|err| backend(err.into()))?;

        let existing = tx
            .query_row(
                "SELECT * FROM alerts WHERE alert_type = ?1 AND entity_id = ?2",
                params![alert_type, entity_id],
                row_to_alert,
            )
            .optional()
            .map_err(|err| backend(err.into()))?;

        let is_new_window = !existing.as_ref().is_some_and(|alert| alert.dedup_window_expires_at > now);

        let stored = if is_new_window {
            let alert = Alert {
                alert_type: alert_type.to_string(),
                entity_id: entity_id.to_string(),
                severity,
                message: message.to_string(),
                occurrence_count: 1,
                first_seen_at: now,
                last_seen_at: now,
                dedup_window_expires_at: now + dedup_window,
            };
            tx.execute(
                "INSERT INTO alerts (
                    alert_type, entity_id, severity, message, occurrence_count,
                    first_seen_at, last_seen_at, dedup_window_expires_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                ON CONFLICT (alert_type, entity_id) DO UPDATE SET
                    severity = excluded.severity,
                    message = excluded.message,
                    occurrence_count = excluded.occurrence_count,
                    first_seen_at = excluded.first_seen_at,
                    last_seen_at = excluded.last_seen_at,
                    dedup_window_expires_at = excluded.dedup_window_expires_at",
                params![
                    alert.alert_type,
                    alert.entity_id,
                    severity_json,
                    alert.message,
                    1_i64,
                    encode_timestamp(alert.first_seen_at),
                    encode_timestamp(alert.last_seen_at),
                    encode_timestamp(alert.dedup_window_expires_at),
                ],
            )
            .map_err(|err| backend(err.into()))?;
            alert
        } else {
            let existing = existing.expect("checked above");
            let alert = Alert {
                severity,
                message: message.to_string(),
                occurrence_count: existing.occurrence_count + 1,
                last_seen_at: now,
                dedup_window_expires_at: now + dedup_window,
                ..existing
            };
            tx.execute(
                "UPDATE alerts SET
                    severity = ?1, message = ?2, occurrence_count = ?3,
                    last_seen_at = ?4, dedup_window_expires_at = ?5
                 WHERE alert_type = ?6 AND entity_id = ?7",
                params![
                    severity_json,
                    alert.message,
                    i64::try_from(alert.occurrence_count).unwrap_or(i64::MAX),
                    encode_timestamp(alert.last_seen_at),
                    encode_timestamp(alert.dedup_window_expires_at),
                    alert_type,
                    entity_id,
                ],
            )
            .map_err(|err| backend(err.into()))?;
            alert
        };

        tx.commit().map_err(|err| backend(err.into()))?;
        Ok((stored, is_new_window))
    }

    fn list_all(&self) -> RepoResult<Vec<Alert>> {
        let connection = self.lock().map_err(backend)?;
        let mut statement = connection
            .prepare("SELECT * FROM alerts ORDER BY alert_type ASC, entity_id ASC")
            .map_err(|err| backend(err.into()))?;
        statement
            .query_map([], row_to_alert)
            .map_err(|err| backend(err.into()))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| backend(err.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_occurrence_starts_a_new_window() {
        let store = TruthStore::open_in_memory().expect("open");
        let (alert, is_new) = store
            .record_occurrence("stale_source", "src-1", AlertSeverity::Warning, "7 days stale", OffsetDateTime::UNIX_EPOCH, Duration::minutes(30))
            .expect("record");
        assert!(is_new);
        assert_eq!(alert.occurrence_count, 1);
    }

    #[test]
    fn second_occurrence_within_window_folds_into_same_row() {
        let store = TruthStore::open_in_memory().expect("open");
        store
            .record_occurrence("stale_source", "src-1", AlertSeverity::Warning, "7 days stale", OffsetDateTime::UNIX_EPOCH, Duration::minutes(30))
            .expect("first");
        let (alert, is_new) = store
            .record_occurrence(
                "stale_source",
                "src-1",
                AlertSeverity::Critical,
                "14 days stale",
                OffsetDateTime::UNIX_EPOCH + Duration::minutes(10),
                Duration::minutes(30),
            )
            .expect("second");
        assert!(!is_new);
        assert_eq!(alert.occurrence_count, 2);
        assert_eq!(alert.severity, AlertSeverity::Critical);
    }

    #[test]
    fn occurrence_after_window_expiry_starts_fresh_row() {
        let store = TruthStore::open_in_memory().expect("open");
        store
            .record_occurrence("stale_source", "src-1", AlertSeverity::Warning, "7 days stale", OffsetDateTime::UNIX_EPOCH, Duration::minutes(30))
            .expect("first");
        let (alert, is_new) = store
            .record_occurrence(
                "stale_source",
                "src-1",
                AlertSeverity::Warning,
                "still stale",
                OffsetDateTime::UNIX_EPOCH + Duration::hours(2),
                Duration::minutes(30),
            )
            .expect("second");
        assert!(is_new);
        assert_eq!(alert.occurrence_count, 1);
    }

    #[test]
    fn list_all_returns_every_row() {
        let store = TruthStore::open_in_memory().expect("open");
        store
            .record_occurrence("stale_source", "src-1", AlertSeverity::Warning, "msg", OffsetDateTime::UNIX_EPOCH, Duration::minutes(30))
            .expect("record");
        assert_eq!(store.list_all().expect("list").len(), 1);
    }
}
