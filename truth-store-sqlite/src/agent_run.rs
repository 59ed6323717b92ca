// truth-store-sqlite/src/agent_run.rs
// ============================================================================
// Module: AgentRun Repository
// Description: SQLite-backed truth_core::AgentRunRepository impl.
// Purpose: Persist AgentRun rows (a `put` of the same id replaces the
//          in-flight row with its terminal successor, matching
//          `AgentRun::complete`/`fail`'s consuming-builder shape) and answer
//          the watchdog's quality-degradation mean-confidence query.
// Dependencies: rusqlite, truth-core
// ============================================================================

// ============================================================================
// SECTION: Imports
// ============================================================================

use rusqlite::OptionalExtension;
use rusqlite::params;
use time::OffsetDateTime;
use truth_core::AgentRunRepository;
use truth_core::RepoError;
use truth_core::RepoResult;
use truth_core::identifiers::AgentRunId;
use truth_core::identifiers::JobId;
use truth_core::identifiers::RunId;
use truth_core::model::AgentRun;
use truth_core::model::AgentRunStatus;
use truth_core::model::value::Confidence;

use crate::codec::decode_json;
use crate::codec::decode_timestamp;
use crate::codec::encode_json;
use crate::codec::encode_timestamp;
use crate::store::TruthStore;

// ============================================================================
// SECTION: Row Mapping
// ============================================================================

fn row_to_agent_run(row: &rusqlite::Row<'_>) -> rusqlite::Result<AgentRun> {
    let status_json: String = row.get("status")?;
    let input_json: String = row.get("input_json")?;
    let output_json: Option<String> = row.get("output_json")?;
    let confidence: Option<f64> = row.get("confidence")?;
    let parent_job_id: Option<String> = row.get("parent_job_id")?;
    let source_slug: Option<String> = row.get("source_slug")?;

    Ok(AgentRun {
        id: row.get::<_, String>("id")?.into(),
        agent_type: row.get("agent_type")?,
        status: decode_json::<AgentRunStatus>(&status_json).map_err(to_rusqlite_error)?,
        input: decode_json(&input_json).map_err(to_rusqlite_error)?,
        output: output_json.map(|text| decode_json(&text)).transpose().map_err(to_rusqlite_error)?,
        duration_ms: row.get::<_, i64>("duration_ms")?.try_into().unwrap_or_default(),
        confidence: confidence
            .map(Confidence::new)
            .transpose()
            .map_err(|err| to_rusqlite_error(crate::error::SqliteStoreError::Corrupt(err.to_string())))?,
        error: row.get("error")?,
        run_id: row.get::<_, String>("run_id")?.into(),
        job_id: row.get::<_, String>("job_id")?.into(),
        parent_job_id: parent_job_id.map(Into::into),
        source_slug,
        queue_name: row.get("queue_name")?,
    })
}

fn to_rusqlite_error(error: crate::error::SqliteStoreError) -> rusqlite::Error {
    rusqlite::Error::ToSqlConversionFailure(Box::new(error))
}

fn backend(error: crate::error::SqliteStoreError) -> RepoError {
    RepoError::from(error)
}

// ============================================================================
// SECTION: AgentRunRepository
// ============================================================================

impl AgentRunRepository for TruthStore {
    fn put(&self, run: AgentRun) -> RepoResult<AgentRun> {
        let status_json = encode_json(&run.status).map_err(backend)?;
        let input_json = encode_json(&run.input).map_err(backend)?;
        let output_json = run.output.as_ref().map(encode_json).transpose().map_err(backend)?;
        let confidence = run.confidence.map(|confidence| confidence.value());
        let now = encode_timestamp(OffsetDateTime::now_utc());

        let connection = self.lock().map_err(backend)?;
        connection
            .execute(
                "INSERT INTO agent_runs (
                    id, agent_type, status, input_json, output_json, duration_ms, confidence,
                    error, run_id, job_id, parent_job_id, source_slug, queue_name, recorded_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
                ON CONFLICT (id) DO UPDATE SET
                    status = excluded.status,
                    output_json = excluded.output_json,
                    duration_ms = excluded.duration_ms,
                    confidence = excluded.confidence,
                    error = excluded.error,
                    recorded_at = excluded.recorded_at",
                params![
                    run.id.as_str(),
                    run.agent_type,
                    status_json,
                    input_json,
                    output_json,
                    i64::try_from(run.duration_ms).unwrap_or(i64::MAX),
                    confidence,
                    run.error,
                    run.run_id.as_str(),
                    run.job_id.as_str(),
                    run.parent_job_id.as_ref().map(JobId::as_str),
                    run.source_slug,
                    run.queue_name,
                    now,
                ],
            )
            .map_err(|err| backend(err.into()))?;
        Ok(run)
    }

    fn get(&self, id: &AgentRunId) -> RepoResult<AgentRun> {
        let connection = self.lock().map_err(backend)?;
        connection
            .query_row("SELECT * FROM agent_runs WHERE id = ?1", params![id.as_str()], row_to_agent_run)
            .optional()
            .map_err(|err| backend(err.into()))?
            .ok_or_else(|| RepoError::NotFound(format!("agent run {id}")))
    }

    fn mean_confidence_since(&self, agent_type: &str, since: OffsetDateTime) -> RepoResult<Option<f64>> {
        let status_json = encode_json(&AgentRunStatus::Completed).map_err(backend)?;
        let connection = self.lock().map_err(backend)?;
        connection
            .query_row(
                "SELECT AVG(confidence) FROM agent_runs
                 WHERE agent_type = ?1 AND status = ?2 AND recorded_at >= ?3 AND confidence IS NOT NULL",
                params![agent_type, status_json, encode_timestamp(since)],
                |row| row.get(0),
            )
            .map_err(|err| backend(err.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn running() -> AgentRun {
        AgentRun::start(
            AgentRunId::new("run-1"),
            "extractor",
            serde_json::json!({"evidence_id": "ev-1"}),
            RunId::new("corr-1"),
            JobId::new("job-1"),
            "extract",
        )
    }

    #[test]
    fn put_then_get_round_trips() {
        let store = TruthStore::open_in_memory().expect("open");
        let stored = store.put(running()).expect("put");
        let loaded = store.get(&stored.id).expect("get");
        assert_eq!(loaded, stored);
    }

    #[test]
    fn completing_a_run_replaces_the_in_flight_row() {
        let store = TruthStore::open_in_memory().expect("open");
        store.put(running()).expect("put running");
        let completed = running().complete(serde_json::json!({"facts": []}), 120, Some(Confidence::new(0.9).expect("confidence")));
        store.put(completed.clone()).expect("put completed");
        let loaded = store.get(&completed.id).expect("get");
        assert_eq!(loaded.status, AgentRunStatus::Completed);
    }

    #[test]
    fn mean_confidence_since_averages_completed_runs() {
        let store = TruthStore::open_in_memory().expect("open");
        let run_a = running().complete(serde_json::json!({}), 10, Some(Confidence::new(0.8).expect("confidence")));
        let mut run_b = AgentRun::start(
            AgentRunId::new("run-2"),
            "extractor",
            serde_json::json!({}),
            RunId::new("corr-2"),
            JobId::new("job-2"),
            "extract",
        );
        run_b = run_b.complete(serde_json::json!({}), 10, Some(Confidence::new(1.0).expect("confidence")));
        store.put(run_a).expect("put a");
        store.put(run_b).expect("put b");
        let mean = store.mean_confidence_since("extractor", OffsetDateTime::UNIX_EPOCH).expect("mean");
        assert_eq!(mean, Some(0.9));
    }
}
