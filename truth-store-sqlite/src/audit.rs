// truth-store-sqlite/src/audit.rs
// ============================================================================
// Module: Audit Log Repository
// Description: SQLite-backed truth_core::AuditLogRepository impl.
// Purpose: Append-only state-change log (§6), queryable per entity.
// Dependencies: rusqlite, truth-core
// ============================================================================

// ============================================================================
// SECTION: Imports
// ============================================================================

use rusqlite::params;
use truth_core::AuditEvent;
use truth_core::AuditLogRepository;
use truth_core::RepoError;
use truth_core::RepoResult;
use truth_core::identifiers::UserId;

use crate::codec::decode_json;
use crate::codec::decode_timestamp;
use crate::codec::encode_json;
use crate::codec::encode_timestamp;
use crate::store::TruthStore;

// ============================================================================
// SECTION: Row Mapping
// ============================================================================

fn row_to_event(row: &rusqlite::Row<'_>) -> rusqlite::Result<AuditEvent> {
    let metadata_json: String = row.get("metadata")?;
    let performed_by: Option<String> = row.get("performed_by")?;
    let performed_at_text: String = row.get("performed_at")?;

    Ok(AuditEvent {
        action: row.get("action")?,
        entity_type: row.get("entity_type")?,
        entity_id: row.get("entity_id")?,
        performed_by: performed_by.map(Into::into),
        metadata: decode_json(&metadata_json).map_err(to_rusqlite_error)?,
        performed_at: decode_timestamp(&performed_at_text).map_err(to_rusqlite_error)?,
    })
}

fn to_rusqlite_error(error: crate::error::SqliteStoreError) -> rusqlite::Error {
    rusqlite::Error::ToSqlConversionFailure(Box::new(error))
}

fn backend(error: crate::error::SqliteStoreError) -> RepoError {
    RepoError::from(error)
}

// ============================================================================
// SECTION: AuditLogRepository
// ============================================================================

impl AuditLogRepository for TruthStore {
    fn append(&self, event: AuditEvent) -> RepoResult<()> {
        let metadata_json = encode_json(&event.metadata).map_err(backend)?;
        let connection = self.lock().map_err(backend)?;
        connection
            .execute(
                "INSERT INTO audit_log (action, entity_type, entity_id, performed_by, metadata, performed_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    event.action,
                    event.entity_type,
                    event.entity_id,
                    event.performed_by.as_ref().map(UserId::as_str),
                    metadata_json,
                    encode_timestamp(event.performed_at),
                ],
            )
            .map_err(|err| backend(err.into()))?;
        Ok(())
    }

    fn list_for_entity(&self, entity_type: &str, entity_id: &str) -> RepoResult<Vec<AuditEvent>> {
        let connection = self.lock().map_err(backend)?;
        let mut statement = connection
            .prepare(
                "SELECT * FROM audit_log WHERE entity_type = ?1 AND entity_id = ?2 ORDER BY performed_at ASC, id ASC",
            )
            .map_err(|err| backend(err.into()))?;
        statement
            .query_map(params![entity_type, entity_id], row_to_event)
            .map_err(|err| backend(err.into()))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| backend(err.into()))
    }
}

#[cfg(test)]
mod tests {
    use time::OffsetDateTime;

    use super::*;

    fn event() -> AuditEvent {
        AuditEvent {
            action: "RULE_CREATED".to_string(),
            entity_type: "rule".to_string(),
            entity_id: "rule-1".to_string(),
            performed_by: Some(UserId::new("user-1")),
            metadata: serde_json::json!({"risk_tier": "T1"}),
            performed_at: OffsetDateTime::UNIX_EPOCH,
        }
    }

    #[test]
    fn append_then_list_for_entity_returns_oldest_first() {
        let store = TruthStore::open_in_memory().expect("open");
        store.append(event()).expect("append first");
        let mut second = event();
        second.action = "RULE_APPROVED".to_string();
        second.performed_at = OffsetDateTime::UNIX_EPOCH + time::Duration::seconds(10);
        store.append(second).expect("append second");

        let events = store.list_for_entity("rule", "rule-1").expect("list");
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].action, "RULE_CREATED");
        assert_eq!(events[1].action, "RULE_APPROVED");
    }

    #[test]
    fn list_for_entity_filters_by_type_and_id() {
        let store = TruthStore::open_in_memory().expect("open");
        store.append(event()).expect("append");
        assert!(store.list_for_entity("rule", "rule-2").expect("list").is_empty());
        assert!(store.list_for_entity("release", "rule-1").expect("list").is_empty());
    }
}
