// truth-store-sqlite/src/candidate_fact.rs
// ============================================================================
// Module: CandidateFact Repository
// Description: SQLite-backed truth_core::CandidateFactRepository impl.
// Purpose: Persist CandidateFact rows plus the rejected-extraction
//          dead-letter collection, and answer the Composer/watchdog
//          grouping and progress-gate queries.
// Dependencies: rusqlite, truth-core
// ============================================================================

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use rusqlite::OptionalExtension;
use rusqlite::params;
use time::OffsetDateTime;
use truth_core::CandidateFactRepository;
use truth_core::RejectedExtraction;
use truth_core::RepoError;
use truth_core::RepoResult;
use truth_core::identifiers::CandidateFactId;
use truth_core::identifiers::EvidenceId;
use truth_core::model::CandidateFact;
use truth_core::model::CandidateFactStatus;
use truth_core::model::value::Confidence;
use truth_core::model::value::Domain;
use truth_core::model::value::ValueType;

use crate::codec::decode_json;
use crate::codec::decode_timestamp;
use crate::codec::encode_json;
use crate::codec::encode_timestamp;
use crate::store::TruthStore;

// ============================================================================
// SECTION: Row Mapping
// ============================================================================

fn row_to_candidate(row: &rusqlite::Row<'_>) -> rusqlite::Result<CandidateFact> {
    let domain_json: String = row.get("domain")?;
    let value_type_json: String = row.get("value_type")?;
    let extracted_value_json: String = row.get("extracted_value")?;
    let grounding_quotes_json: String = row.get("grounding_quotes")?;
    let status_json: String = row.get("status")?;
    let value_confidence: f64 = row.get("value_confidence")?;
    let overall_confidence: f64 = row.get("overall_confidence")?;

    Ok(CandidateFact {
        id: row.get::<_, String>("id")?.into(),
        domain: decode_json::<Domain>(&domain_json).map_err(to_rusqlite_error)?,
        value_type: decode_json::<ValueType>(&value_type_json).map_err(to_rusqlite_error)?,
        extracted_value: decode_json(&extracted_value_json).map_err(to_rusqlite_error)?,
        grounding_quotes: decode_json(&grounding_quotes_json).map_err(to_rusqlite_error)?,
        value_confidence: Confidence::new(value_confidence).map_err(|err| to_rusqlite_error(crate::error::SqliteStoreError::Corrupt(err.to_string())))?,
        overall_confidence: Confidence::new(overall_confidence).map_err(|err| to_rusqlite_error(crate::error::SqliteStoreError::Corrupt(err.to_string())))?,
        status: decode_json::<CandidateFactStatus>(&status_json).map_err(to_rusqlite_error)?,
        promotion_candidate: row.get("promotion_candidate")?,
    })
}

fn to_rusqlite_error(error: crate::error::SqliteStoreError) -> rusqlite::Error {
    rusqlite::Error::ToSqlConversionFailure(Box::new(error))
}

fn backend(error: crate::error::SqliteStoreError) -> RepoError {
    RepoError::from(error)
}

// ============================================================================
// SECTION: CandidateFactRepository
// ============================================================================

impl CandidateFactRepository for TruthStore {
    fn put(&self, candidate: CandidateFact) -> RepoResult<CandidateFact> {
        let domain_json = encode_json(&candidate.domain).map_err(backend)?;
        let value_type_json = encode_json(&candidate.value_type).map_err(backend)?;
        let extracted_value_json = encode_json(&candidate.extracted_value).map_err(backend)?;
        let grounding_quotes_json = encode_json(&candidate.grounding_quotes).map_err(backend)?;
        let status_json = encode_json(&candidate.status).map_err(backend)?;
        let now = encode_timestamp(OffsetDateTime::now_utc());

        let connection = self.lock().map_err(backend)?;
        connection
            .execute(
                "INSERT INTO candidate_facts (
                    id, domain, value_type, extracted_value, grounding_quotes,
                    value_confidence, overall_confidence, status, promotion_candidate, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    candidate.id.as_str(),
                    domain_json,
                    value_type_json,
                    extracted_value_json,
                    grounding_quotes_json,
                    candidate.value_confidence.value(),
                    candidate.overall_confidence.value(),
                    status_json,
                    candidate.promotion_candidate,
                    now,
                ],
            )
            .map_err(|err| backend(err.into()))?;

        let evidence_ids: BTreeSet<&EvidenceId> = candidate.grounding_quotes.iter().map(|quote| &quote.evidence_id).collect();
        for evidence_id in evidence_ids {
            connection
                .execute(
                    "INSERT OR IGNORE INTO candidate_fact_evidence (candidate_fact_id, evidence_id) VALUES (?1, ?2)",
                    params![candidate.id.as_str(), evidence_id.as_str()],
                )
                .map_err(|err| backend(err.into()))?;
        }

        Ok(candidate)
    }

    fn get(&self, id: &CandidateFactId) -> RepoResult<CandidateFact> {
        let connection = self.lock().map_err(backend)?;
        connection
            .query_row("SELECT * FROM candidate_facts WHERE id = ?1", params![id.as_str()], row_to_candidate)
            .optional()
            .map_err(|err| backend(err.into()))?
            .ok_or_else(|| RepoError::NotFound(format!("candidate fact {id}")))
    }

    fn transition(&self, id: &CandidateFactId, to: CandidateFactStatus) -> RepoResult<CandidateFact> {
        let current = self.get(id)?;
        if !CandidateFact::can_transition(current.status, to) {
            return Err(RepoError::IllegalTransition(format!("candidate fact {id}: {:?} -> {to:?}", current.status)));
        }
        let status_json = encode_json(&to).map_err(backend)?;
        let connection = self.lock().map_err(backend)?;
        connection
            .execute("UPDATE candidate_facts SET status = ?1 WHERE id = ?2", params![status_json, id.as_str()])
            .map_err(|err| backend(err.into()))?;
        Ok(CandidateFact { status: to, ..current })
    }

    fn record_rejection(&self, rejection: RejectedExtraction) -> RepoResult<()> {
        let raw_output_json = encode_json(&rejection.raw_output).map_err(backend)?;
        let connection = self.lock().map_err(backend)?;
        connection
            .execute(
                "INSERT INTO rejected_extractions (evidence_id, reason, raw_output, rejected_at) VALUES (?1, ?2, ?3, ?4)",
                params![
                    rejection.evidence_id.as_str(),
                    rejection.reason,
                    raw_output_json,
                    encode_timestamp(rejection.rejected_at),
                ],
            )
            .map_err(|err| backend(err.into()))?;
        Ok(())
    }

    fn list_ungrouped_by_domain(&self) -> RepoResult<BTreeMap<String, Vec<CandidateFactId>>> {
        let connection = self.lock().map_err(backend)?;
        let mut statement = connection
            .prepare(
                "SELECT id, domain FROM candidate_facts
                 WHERE id NOT IN (SELECT candidate_fact_id FROM rule_candidate_facts)
                 ORDER BY created_at ASC",
            )
            .map_err(|err| backend(err.into()))?;
        let rows = statement
            .query_map([], |row| {
                let id: String = row.get(0)?;
                let domain_json: String = row.get(1)?;
                Ok((id, domain_json))
            })
            .map_err(|err| backend(err.into()))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| backend(err.into()))?;

        let mut grouped: BTreeMap<String, Vec<CandidateFactId>> = BTreeMap::new();
        for (id, domain_json) in rows {
            let domain: Domain = decode_json(&domain_json).map_err(backend)?;
            grouped.entry(domain.as_str().to_string()).or_default().push(id.into());
        }
        Ok(grouped)
    }

    fn evidence_ids_with_candidate_facts(&self) -> RepoResult<BTreeSet<EvidenceId>> {
        let connection = self.lock().map_err(backend)?;
        let mut statement = connection
            .prepare("SELECT DISTINCT evidence_id FROM candidate_fact_evidence")
            .map_err(|err| backend(err.into()))?;
        let ids = statement
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(|err| backend(err.into()))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| backend(err.into()))?;
        Ok(ids.into_iter().map(Into::into).collect())
    }

    fn candidate_facts_without_rule(&self) -> RepoResult<Vec<(CandidateFactId, OffsetDateTime)>> {
        let connection = self.lock().map_err(backend)?;
        let mut statement = connection
            .prepare(
                "SELECT id, created_at FROM candidate_facts
                 WHERE id NOT IN (SELECT candidate_fact_id FROM rule_candidate_facts)
                 ORDER BY created_at ASC",
            )
            .map_err(|err| backend(err.into()))?;
        let rows = statement
            .query_map([], |row| {
                let id: String = row.get(0)?;
                let created_at: String = row.get(1)?;
                Ok((id, created_at))
            })
            .map_err(|err| backend(err.into()))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| backend(err.into()))?;

        rows.into_iter()
            .map(|(id, created_at)| decode_timestamp(&created_at).map(|timestamp| (id.into(), timestamp)).map_err(backend))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use truth_core::model::GroundingQuote;

    use super::*;

    fn sample() -> CandidateFact {
        CandidateFact {
            id: CandidateFactId::new("cf-1"),
            domain: Domain::parse("taxation").expect("domain"),
            value_type: ValueType::Percentage,
            extracted_value: serde_json::json!(25),
            grounding_quotes: vec![GroundingQuote {
                text: "The rate is 25%.".to_string(),
                context_before: None,
                context_after: None,
                evidence_id: EvidenceId::new("ev-1"),
                article_number: None,
                law_reference: None,
            }],
            value_confidence: Confidence::new(0.9).expect("confidence"),
            overall_confidence: Confidence::new(0.9).expect("confidence"),
            status: CandidateFactStatus::Captured,
            promotion_candidate: true,
        }
    }

    #[test]
    fn put_then_get_round_trips() {
        let store = TruthStore::open_in_memory().expect("open");
        let stored = store.put(sample()).expect("put");
        let loaded = store.get(&stored.id).expect("get");
        assert_eq!(loaded, stored);
    }

    #[test]
    fn illegal_transition_is_rejected() {
        let store = TruthStore::open_in_memory().expect("open");
        let stored = store.put(sample()).expect("put");
        assert!(store.transition(&stored.id, CandidateFactStatus::Promoted).is_err());
    }

    #[test]
    fn list_ungrouped_by_domain_includes_fresh_candidate() {
        let store = TruthStore::open_in_memory().expect("open");
        let stored = store.put(sample()).expect("put");
        let grouped = store.list_ungrouped_by_domain().expect("list");
        assert_eq!(grouped.get("taxation"), Some(&vec![stored.id]));
    }

    #[test]
    fn evidence_ids_with_candidate_facts_tracks_grounding() {
        let store = TruthStore::open_in_memory().expect("open");
        store.put(sample()).expect("put");
        let ids = store.evidence_ids_with_candidate_facts().expect("list");
        assert!(ids.contains(&EvidenceId::new("ev-1")));
    }
}
