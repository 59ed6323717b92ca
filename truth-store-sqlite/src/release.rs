// truth-store-sqlite/src/release.rs
// ============================================================================
// Module: Release Repository
// Description: SQLite-backed truth_core::ReleaseRepository impl.
// Purpose: Enforce strict version ordering on `put`, maintain the single
//          `is_latest` row, and support the Releaser's rollback operation.
// Dependencies: rusqlite, truth-core
// ============================================================================

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use rusqlite::OptionalExtension;
use rusqlite::params;
use time::Date;
use time::OffsetDateTime;
use truth_core::HashAlgorithm;
use truth_core::HashDigest;
use truth_core::RepoError;
use truth_core::RepoResult;
use truth_core::ReleaseRepository;
use truth_core::identifiers::ReleaseId;
use truth_core::identifiers::RuleId;
use truth_core::identifiers::UserId;
use truth_core::model::AuditTrail;
use truth_core::model::Release;
use truth_core::model::ReleaseType;
use truth_core::model::Version;

use crate::codec::decode_date;
use crate::codec::decode_json;
use crate::codec::decode_timestamp;
use crate::codec::encode_date;
use crate::codec::encode_json;
use crate::codec::encode_timestamp;
use crate::store::TruthStore;

// ============================================================================
// SECTION: Row Mapping
// ============================================================================

fn row_to_release(row: &rusqlite::Row<'_>, rule_ids: BTreeSet<RuleId>) -> rusqlite::Result<Release> {
    let release_type_json: String = row.get("release_type")?;
    let content_hash_algo_json: String = row.get("content_hash_algo")?;
    let approved_by_json: String = row.get("approved_by_json")?;
    let audit_trail_json: String = row.get("audit_trail_json")?;
    let released_at_text: String = row.get("released_at")?;
    let effective_from_text: String = row.get("effective_from")?;

    Ok(Release {
        id: row.get::<_, String>("id")?.into(),
        version: Version { major: row.get("major")?, minor: row.get("minor")?, patch: row.get("patch")? },
        release_type: decode_json::<ReleaseType>(&release_type_json).map_err(to_rusqlite_error)?,
        released_at: decode_timestamp(&released_at_text).map_err(to_rusqlite_error)?,
        effective_from: decode_date(&effective_from_text).map_err(to_rusqlite_error)?,
        content_hash: HashDigest {
            algorithm: decode_json::<HashAlgorithm>(&content_hash_algo_json).map_err(to_rusqlite_error)?,
            value: row.get("content_hash_value")?,
        },
        changelog: row.get("changelog")?,
        approved_by: decode_json(&approved_by_json).map_err(to_rusqlite_error)?,
        audit_trail: decode_json::<AuditTrail>(&audit_trail_json).map_err(to_rusqlite_error)?,
        rule_ids,
        is_latest: row.get("is_latest")?,
    })
}

fn to_rusqlite_error(error: crate::error::SqliteStoreError) -> rusqlite::Error {
    rusqlite::Error::ToSqlConversionFailure(Box::new(error))
}

fn backend(error: crate::error::SqliteStoreError) -> RepoError {
    RepoError::from(error)
}

// ============================================================================
// SECTION: ReleaseRepository
// ============================================================================

impl TruthStore {
    fn rule_ids_for(&self, release_id: &ReleaseId) -> RepoResult<BTreeSet<RuleId>> {
        let connection = self.lock().map_err(backend)?;
        let mut statement = connection
            .prepare("SELECT rule_id FROM release_rules WHERE release_id = ?1")
            .map_err(|err| backend(err.into()))?;
        let ids = statement
            .query_map(params![release_id.as_str()], |row| row.get::<_, String>(0))
            .map_err(|err| backend(err.into()))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| backend(err.into()))?;
        Ok(ids.into_iter().map(Into::into).collect())
    }

    fn load_latest_version(&self) -> RepoResult<Option<Version>> {
        let connection = self.lock().map_err(backend)?;
        connection
            .query_row(
                "SELECT major, minor, patch FROM releases WHERE is_latest = 1",
                [],
                |row| Ok(Version { major: row.get(0)?, minor: row.get(1)?, patch: row.get(2)? }),
            )
            .optional()
            .map_err(|err| backend(err.into()))
    }
}

impl ReleaseRepository for TruthStore {
    fn put(&self, release: Release) -> RepoResult<Release> {
        if let Some(latest_version) = self.load_latest_version()? {
            if latest_version.delta_type(release.version).is_none() {
                return Err(RepoError::InvariantViolation(format!(
                    "release version {} does not strictly increase over current latest {latest_version}",
                    release.version
                )));
            }
        }

        let release_type_json = encode_json(&release.release_type).map_err(backend)?;
        let content_hash_algo_json = encode_json(&release.content_hash.algorithm).map_err(backend)?;
        let approved_by_json = encode_json(&release.approved_by).map_err(backend)?;
        let audit_trail_json = encode_json(&release.audit_trail).map_err(backend)?;

        let mut connection = self.lock().map_err(backend)?;
        let tx = connection.transaction().map_err(|err| backend(err.into()))?;
        tx.execute("UPDATE releases SET is_latest = 0 WHERE is_latest = 1", [])
            .map_err(|err| backend(err.into()))?;
        tx.execute(
            "INSERT INTO releases (
                id, major, minor, patch, release_type, released_at, effective_from,
                content_hash_algo, content_hash_value, changelog, approved_by_json,
                audit_trail_json, is_latest
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, 1)",
            params![
                release.id.as_str(),
                release.version.major,
                release.version.minor,
                release.version.patch,
                release_type_json,
                encode_timestamp(release.released_at),
                encode_date(release.effective_from),
                content_hash_algo_json,
                release.content_hash.value,
                release.changelog,
                approved_by_json,
                audit_trail_json,
            ],
        )
        .map_err(|err| backend(err.into()))?;
        for rule_id in &release.rule_ids {
            tx.execute(
                "INSERT OR IGNORE INTO release_rules (release_id, rule_id) VALUES (?1, ?2)",
                params![release.id.as_str(), rule_id.as_str()],
            )
            .map_err(|err| backend(err.into()))?;
        }
        tx.commit().map_err(|err| backend(err.into()))?;

        Ok(Release { is_latest: true, ..release })
    }

    fn get(&self, id: &ReleaseId) -> RepoResult<Release> {
        let rule_ids = self.rule_ids_for(id)?;
        let connection = self.lock().map_err(backend)?;
        connection
            .query_row("SELECT * FROM releases WHERE id = ?1", params![id.as_str()], |row| row_to_release(row, rule_ids))
            .optional()
            .map_err(|err| backend(err.into()))?
            .ok_or_else(|| RepoError::NotFound(format!("release {id}")))
    }

    fn latest(&self) -> RepoResult<Option<Release>> {
        let id: Option<String> = {
            let connection = self.lock().map_err(backend)?;
            connection
                .query_row("SELECT id FROM releases WHERE is_latest = 1", [], |row| row.get(0))
                .optional()
                .map_err(|err| backend(err.into()))?
        };
        id.map(|id| self.get(&id.into())).transpose()
    }

    fn previous(&self) -> RepoResult<Option<Release>> {
        let Some(latest_version) = self.load_latest_version()? else {
            return Ok(None);
        };
        let id: Option<String> = {
            let connection = self.lock().map_err(backend)?;
            connection
                .query_row(
                    "SELECT id FROM releases
                     WHERE (major, minor, patch) < (?1, ?2, ?3)
                     ORDER BY major DESC, minor DESC, patch DESC LIMIT 1",
                    params![latest_version.major, latest_version.minor, latest_version.patch],
                    |row| row.get(0),
                )
                .optional()
                .map_err(|err| backend(err.into()))?
        };
        id.map(|id| self.get(&id.into())).transpose()
    }

    fn rollback(&self, id: &ReleaseId) -> RepoResult<Release> {
        let rolled_back = self.get(id)?;
        let previous = self.previous()?;

        let mut connection = self.lock().map_err(backend)?;
        let tx = connection.transaction().map_err(|err| backend(err.into()))?;
        tx.execute("DELETE FROM release_rules WHERE release_id = ?1", params![id.as_str()])
            .map_err(|err| backend(err.into()))?;
        tx.execute("UPDATE releases SET is_latest = 0 WHERE id = ?1", params![id.as_str()])
            .map_err(|err| backend(err.into()))?;
        if let Some(previous) = &previous {
            tx.execute("UPDATE releases SET is_latest = 1 WHERE id = ?1", params![previous.id.as_str()])
                .map_err(|err| backend(err.into()))?;
        }
        tx.commit().map_err(|err| backend(err.into()))?;

        Ok(Release { is_latest: false, rule_ids: BTreeSet::new(), ..rolled_back })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn release(version: Version, rule_ids: BTreeSet<RuleId>) -> Release {
        Release {
            id: ReleaseId::new(format!("rel-{version}")),
            version,
            release_type: ReleaseType::Minor,
            released_at: OffsetDateTime::UNIX_EPOCH,
            effective_from: Date::from_calendar_date(2026, time::Month::January, 1).expect("date"),
            content_hash: HashDigest::new(HashAlgorithm::Sha256, b"release"),
            changelog: "initial".to_string(),
            approved_by: vec![UserId::new("user-1")],
            audit_trail: AuditTrail::default(),
            rule_ids,
            is_latest: false,
        }
    }

    #[test]
    fn put_marks_release_latest_and_clears_previous() {
        let store = TruthStore::open_in_memory().expect("open");
        let first = store.put(release(Version { major: 0, minor: 1, patch: 0 }, BTreeSet::from([RuleId::new("rule-1")]))).expect("put first");
        assert!(first.is_latest);
        let second = store.put(release(Version { major: 0, minor: 2, patch: 0 }, BTreeSet::from([RuleId::new("rule-1"), RuleId::new("rule-2")]))).expect("put second");
        assert!(second.is_latest);
        assert!(!store.get(&first.id).expect("get first").is_latest);
        assert_eq!(store.latest().expect("latest").expect("some").id, second.id);
    }

    #[test]
    fn put_rejects_non_increasing_version() {
        let store = TruthStore::open_in_memory().expect("open");
        store.put(release(Version { major: 0, minor: 2, patch: 0 }, BTreeSet::new())).expect("put first");
        let err = store.put(release(Version { major: 0, minor: 1, patch: 0 }, BTreeSet::new()));
        assert!(err.is_err());
    }

    #[test]
    fn rollback_restores_previous_as_latest() {
        let store = TruthStore::open_in_memory().expect("open");
        let first = store.put(release(Version { major: 0, minor: 1, patch: 0 }, BTreeSet::from([RuleId::new("rule-1")]))).expect("put first");
        let second = store.put(release(Version { major: 0, minor: 2, patch: 0 }, BTreeSet::from([RuleId::new("rule-2")]))).expect("put second");
        store.rollback(&second.id).expect("rollback");
        assert!(store.get(&first.id).expect("get first").is_latest);
        assert!(!store.get(&second.id).expect("get second").is_latest);
    }
}
