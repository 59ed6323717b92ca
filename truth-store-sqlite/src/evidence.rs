// truth-store-sqlite/src/evidence.rs
// ============================================================================
// Module: Evidence Repository
// Description: SQLite-backed truth_core::EvidenceRepository implementation.
// Purpose: Persist Evidence rows, enforcing the content-hash-idempotent
//          `put` invariant via a UNIQUE(source_id, url, content_hash_value)
//          constraint checked up front rather than relied on as the only
//          guard.
// Dependencies: rusqlite, truth-core
// ============================================================================

// ============================================================================
// SECTION: Imports
// ============================================================================

use rusqlite::OptionalExtension;
use rusqlite::params;
use time::OffsetDateTime;
use truth_core::EvidenceArtifact;
use truth_core::EvidenceRepository;
use truth_core::HashAlgorithm;
use truth_core::HashDigest;
use truth_core::RepoError;
use truth_core::RepoResult;
use truth_core::model::Evidence;
use truth_core::model::{ContentClass, ContentType};

use crate::codec::decode_json;
use crate::codec::decode_timestamp;
use crate::codec::encode_json;
use crate::codec::encode_timestamp;
use crate::store::TruthStore;

// ============================================================================
// SECTION: Row Mapping
// ============================================================================

fn row_to_evidence(row: &rusqlite::Row<'_>) -> rusqlite::Result<Evidence> {
    let content_type_json: String = row.get("content_type")?;
    let content_class_json: String = row.get("content_class")?;
    let content_hash_algo_json: String = row.get("content_hash_algo")?;
    let artifacts_json: String = row.get("artifacts_json")?;
    let fetched_at_text: String = row.get("fetched_at")?;

    let content_type: ContentType = decode_json(&content_type_json).map_err(to_rusqlite_error)?;
    let content_class: ContentClass = decode_json(&content_class_json).map_err(to_rusqlite_error)?;
    let algorithm: HashAlgorithm = decode_json(&content_hash_algo_json).map_err(to_rusqlite_error)?;
    let artifacts: Vec<EvidenceArtifact> = decode_json(&artifacts_json).map_err(to_rusqlite_error)?;
    let fetched_at = decode_timestamp(&fetched_at_text).map_err(to_rusqlite_error)?;

    Ok(Evidence {
        id: row.get::<_, String>("id")?.into(),
        source_id: row.get::<_, String>("source_id")?.into(),
        url: row.get("url")?,
        content_type,
        content_class,
        raw_bytes: row.get("raw_bytes")?,
        cleaned_text: row.get("cleaned_text")?,
        content_hash: HashDigest { algorithm, value: row.get("content_hash_value")? },
        fetched_at,
        has_changed: row.get("has_changed")?,
        artifacts,
    })
}

fn to_rusqlite_error(error: crate::error::SqliteStoreError) -> rusqlite::Error {
    rusqlite::Error::ToSqlConversionFailure(Box::new(error))
}

fn backend(error: crate::error::SqliteStoreError) -> RepoError {
    RepoError::from(error)
}

// ============================================================================
// SECTION: EvidenceRepository
// ============================================================================

impl EvidenceRepository for TruthStore {
    fn put(&self, evidence: Evidence) -> RepoResult<Evidence> {
        let connection = self.lock().map_err(backend)?;

        let existing: Option<String> = connection
            .query_row(
                "SELECT id FROM evidence WHERE source_id = ?1 AND url = ?2 AND content_hash_value = ?3",
                params![evidence.source_id.as_str(), evidence.url, evidence.content_hash.value],
                |row| row.get(0),
            )
            .optional()
            .map_err(|err| backend(err.into()))?;

        if let Some(existing_id) = existing {
            return self.get(&existing_id.into());
        }

        let content_type_json = encode_json(&evidence.content_type).map_err(backend)?;
        let content_class_json = encode_json(&evidence.content_class).map_err(backend)?;
        let content_hash_algo_json = encode_json(&evidence.content_hash.algorithm).map_err(backend)?;
        let artifacts_json = encode_json(&evidence.artifacts).map_err(backend)?;

        connection
            .execute(
                "INSERT INTO evidence (
                    id, source_id, url, content_type, content_class, raw_bytes, cleaned_text,
                    content_hash_algo, content_hash_value, fetched_at, has_changed, artifacts_json
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                params![
                    evidence.id.as_str(),
                    evidence.source_id.as_str(),
                    evidence.url,
                    content_type_json,
                    content_class_json,
                    evidence.raw_bytes,
                    evidence.cleaned_text,
                    content_hash_algo_json,
                    evidence.content_hash.value,
                    encode_timestamp(evidence.fetched_at),
                    evidence.has_changed,
                    artifacts_json,
                ],
            )
            .map_err(|err| backend(err.into()))?;

        Ok(evidence)
    }

    fn get(&self, id: &truth_core::identifiers::EvidenceId) -> RepoResult<Evidence> {
        let connection = self.lock().map_err(backend)?;
        connection
            .query_row("SELECT * FROM evidence WHERE id = ?1", params![id.as_str()], row_to_evidence)
            .optional()
            .map_err(|err| backend(err.into()))?
            .ok_or_else(|| RepoError::NotFound(format!("evidence {id}")))
    }

    fn append_artifact(
        &self,
        id: &truth_core::identifiers::EvidenceId,
        artifact: EvidenceArtifact,
    ) -> RepoResult<Evidence> {
        let updated = {
            let mut existing = self.get(id)?;
            existing.artifacts.push(artifact);
            existing
        };
        let artifacts_json = encode_json(&updated.artifacts).map_err(backend)?;
        let connection = self.lock().map_err(backend)?;
        connection
            .execute("UPDATE evidence SET artifacts_json = ?1 WHERE id = ?2", params![artifacts_json, id.as_str()])
            .map_err(|err| backend(err.into()))?;
        Ok(updated)
    }

    fn list_by_source(&self, source_id: &truth_core::identifiers::SourceId) -> RepoResult<Vec<truth_core::identifiers::EvidenceId>> {
        let connection = self.lock().map_err(backend)?;
        let mut statement = connection
            .prepare("SELECT id FROM evidence WHERE source_id = ?1 ORDER BY fetched_at DESC")
            .map_err(|err| backend(err.into()))?;
        let ids = statement
            .query_map(params![source_id.as_str()], |row| row.get::<_, String>(0))
            .map_err(|err| backend(err.into()))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| backend(err.into()))?;
        Ok(ids.into_iter().map(Into::into).collect())
    }

    fn last_fetched_at(&self, source_id: &truth_core::identifiers::SourceId) -> RepoResult<Option<OffsetDateTime>> {
        let connection = self.lock().map_err(backend)?;
        let text: Option<String> = connection
            .query_row(
                "SELECT fetched_at FROM evidence WHERE source_id = ?1 ORDER BY fetched_at DESC LIMIT 1",
                params![source_id.as_str()],
                |row| row.get(0),
            )
            .optional()
            .map_err(|err| backend(err.into()))?;
        text.map(|text| decode_timestamp(&text).map_err(backend)).transpose()
    }

    fn list_all(&self) -> RepoResult<Vec<truth_core::identifiers::EvidenceId>> {
        let connection = self.lock().map_err(backend)?;
        let mut statement =
            connection.prepare("SELECT id FROM evidence ORDER BY rowid ASC").map_err(|err| backend(err.into()))?;
        let ids = statement
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(|err| backend(err.into()))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| backend(err.into()))?;
        Ok(ids.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
mod tests {
    use truth_core::identifiers::EvidenceId;
    use truth_core::identifiers::SourceId;

    use super::*;

    fn sample(id: &str) -> Evidence {
        Evidence::capture(
            EvidenceId::new(id),
            SourceId::new("src-1"),
            "https://example.test/law",
            ContentType::Html,
            ContentClass::Html,
            b"<p>Clanak 1.</p>".to_vec(),
            OffsetDateTime::UNIX_EPOCH,
            true,
        )
    }

    #[test]
    fn put_then_get_round_trips() {
        let store = TruthStore::open_in_memory().expect("open");
        let stored = store.put(sample("ev-1")).expect("put");
        let loaded = store.get(&stored.id).expect("get");
        assert_eq!(loaded, stored);
    }

    #[test]
    fn put_is_idempotent_by_content_hash() {
        let store = TruthStore::open_in_memory().expect("open");
        let first = store.put(sample("ev-1")).expect("first put");
        let second = store.put(sample("ev-2")).expect("second put");
        assert_eq!(first.id, second.id);
    }

    #[test]
    fn append_artifact_does_not_touch_raw_bytes() {
        let store = TruthStore::open_in_memory().expect("open");
        let stored = store.put(sample("ev-1")).expect("put");
        let updated = store
            .append_artifact(
                &stored.id,
                EvidenceArtifact {
                    kind: "ocr_text".to_string(),
                    content_hash: HashDigest::new(HashAlgorithm::Sha256, b"ocr"),
                    bytes: b"ocr".to_vec(),
                },
            )
            .expect("append");
        assert_eq!(updated.raw_bytes, stored.raw_bytes);
        assert_eq!(updated.artifacts.len(), 1);
    }

    #[test]
    fn list_by_source_orders_most_recent_first() {
        let store = TruthStore::open_in_memory().expect("open");
        let mut older = sample("ev-1");
        older.fetched_at = OffsetDateTime::UNIX_EPOCH;
        let mut newer = sample("ev-2");
        newer.fetched_at = OffsetDateTime::UNIX_EPOCH + time::Duration::seconds(1000);
        newer.content_hash = HashDigest::new(HashAlgorithm::Sha256, b"different");
        store.put(older).expect("put older");
        store.put(newer).expect("put newer");
        let ids = store.list_by_source(&SourceId::new("src-1")).expect("list");
        assert_eq!(ids, vec![EvidenceId::new("ev-2"), EvidenceId::new("ev-1")]);
    }
}
