// truth-store-sqlite/src/conflict.rs
// ============================================================================
// Module: Conflict Repository
// Description: SQLite-backed truth_core::ConflictRepository impl.
// Purpose: Persist Conflict rows and answer the release-gate "any open
//          conflict referencing this rule" query.
// Dependencies: rusqlite, truth-core
// ============================================================================

// ============================================================================
// SECTION: Imports
// ============================================================================

use rusqlite::OptionalExtension;
use rusqlite::params;
use truth_core::ConflictRepository;
use truth_core::RepoError;
use truth_core::RepoResult;
use truth_core::identifiers::ConflictId;
use truth_core::identifiers::RuleId;
use truth_core::model::Conflict;
use truth_core::model::ConflictKind;
use truth_core::model::ConflictResolution;

use crate::codec::decode_json;
use crate::codec::encode_json;
use crate::store::TruthStore;

// ============================================================================
// SECTION: Row Mapping
// ============================================================================

fn row_to_conflict(row: &rusqlite::Row<'_>) -> rusqlite::Result<Conflict> {
    let conflict_type_json: String = row.get("conflict_type")?;
    let status_json: String = row.get("status")?;
    let metadata_json: String = row.get("metadata")?;
    let item_a_id: Option<String> = row.get("item_a_id")?;
    let item_b_id: Option<String> = row.get("item_b_id")?;

    Ok(Conflict {
        id: row.get::<_, String>("id")?.into(),
        conflict_type: decode_json::<ConflictKind>(&conflict_type_json).map_err(to_rusqlite_error)?,
        item_a_id: item_a_id.map(Into::into),
        item_b_id: item_b_id.map(Into::into),
        status: decode_json::<ConflictResolution>(&status_json).map_err(to_rusqlite_error)?,
        description: row.get("description")?,
        metadata: decode_json(&metadata_json).map_err(to_rusqlite_error)?,
    })
}

fn to_rusqlite_error(error: crate::error::SqliteStoreError) -> rusqlite::Error {
    rusqlite::Error::ToSqlConversionFailure(Box::new(error))
}

fn backend(error: crate::error::SqliteStoreError) -> RepoError {
    RepoError::from(error)
}

// ============================================================================
// SECTION: ConflictRepository
// ============================================================================

impl ConflictRepository for TruthStore {
    fn put(&self, conflict: Conflict) -> RepoResult<Conflict> {
        let conflict_type_json = encode_json(&conflict.conflict_type).map_err(backend)?;
        let status_json = encode_json(&conflict.status).map_err(backend)?;
        let metadata_json = encode_json(&conflict.metadata).map_err(backend)?;
        let connection = self.lock().map_err(backend)?;
        connection
            .execute(
                "INSERT INTO conflicts (id, conflict_type, item_a_id, item_b_id, status, description, metadata)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    conflict.id.as_str(),
                    conflict_type_json,
                    conflict.item_a_id.as_ref().map(RuleId::as_str),
                    conflict.item_b_id.as_ref().map(RuleId::as_str),
                    status_json,
                    conflict.description,
                    metadata_json,
                ],
            )
            .map_err(|err| backend(err.into()))?;
        Ok(conflict)
    }

    fn get(&self, id: &ConflictId) -> RepoResult<Conflict> {
        let connection = self.lock().map_err(backend)?;
        connection
            .query_row("SELECT * FROM conflicts WHERE id = ?1", params![id.as_str()], row_to_conflict)
            .optional()
            .map_err(|err| backend(err.into()))?
            .ok_or_else(|| RepoError::NotFound(format!("conflict {id}")))
    }

    fn resolve(&self, id: &ConflictId, status: ConflictResolution, metadata: serde_json::Value) -> RepoResult<Conflict> {
        let current = self.get(id)?;
        let status_json = encode_json(&status).map_err(backend)?;
        let metadata_json = encode_json(&metadata).map_err(backend)?;
        let connection = self.lock().map_err(backend)?;
        connection
            .execute(
                "UPDATE conflicts SET status = ?1, metadata = ?2 WHERE id = ?3",
                params![status_json, metadata_json, id.as_str()],
            )
            .map_err(|err| backend(err.into()))?;
        Ok(Conflict { status, metadata, ..current })
    }

    fn has_open_conflict_for_rule(&self, rule_id: &RuleId) -> RepoResult<bool> {
        let status_json = encode_json(&ConflictResolution::Open).map_err(backend)?;
        let connection = self.lock().map_err(backend)?;
        let count: i64 = connection
            .query_row(
                "SELECT COUNT(*) FROM conflicts
                 WHERE status = ?1 AND (item_a_id = ?2 OR item_b_id = ?2)",
                params![status_json, rule_id.as_str()],
                |row| row.get(0),
            )
            .map_err(|err| backend(err.into()))?;
        Ok(count > 0)
    }

    fn list_open(&self) -> RepoResult<Vec<ConflictId>> {
        let status_json = encode_json(&ConflictResolution::Open).map_err(backend)?;
        let connection = self.lock().map_err(backend)?;
        let mut statement =
            connection.prepare("SELECT id FROM conflicts WHERE status = ?1").map_err(|err| backend(err.into()))?;
        let ids = statement
            .query_map(params![status_json], |row| row.get::<_, String>(0))
            .map_err(|err| backend(err.into()))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| backend(err.into()))?;
        Ok(ids.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_rule_conflict() -> Conflict {
        Conflict {
            id: ConflictId::new("conf-1"),
            conflict_type: ConflictKind::RuleConflict,
            item_a_id: Some(RuleId::new("rule-1")),
            item_b_id: Some(RuleId::new("rule-2")),
            status: ConflictResolution::Open,
            description: "rules disagree".to_string(),
            metadata: serde_json::Value::Null,
        }
    }

    #[test]
    fn put_then_get_round_trips() {
        let store = TruthStore::open_in_memory().expect("open");
        let stored = store.put(open_rule_conflict()).expect("put");
        let loaded = store.get(&stored.id).expect("get");
        assert_eq!(loaded, stored);
    }

    #[test]
    fn has_open_conflict_for_rule_true_until_resolved() {
        let store = TruthStore::open_in_memory().expect("open");
        let stored = store.put(open_rule_conflict()).expect("put");
        assert!(store.has_open_conflict_for_rule(&RuleId::new("rule-1")).expect("check"));
        store.resolve(&stored.id, ConflictResolution::Resolved, serde_json::json!({"winner_id": "rule-1"})).expect("resolve");
        assert!(!store.has_open_conflict_for_rule(&RuleId::new("rule-1")).expect("check"));
    }

    #[test]
    fn list_open_excludes_resolved() {
        let store = TruthStore::open_in_memory().expect("open");
        let stored = store.put(open_rule_conflict()).expect("put");
        assert_eq!(store.list_open().expect("list"), vec![stored.id.clone()]);
        store.resolve(&stored.id, ConflictResolution::Dismissed, serde_json::Value::Null).expect("resolve");
        assert!(store.list_open().expect("list").is_empty());
    }
}
