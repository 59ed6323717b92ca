// truth-store-sqlite/src/rule.rs
// ============================================================================
// Module: Rule Repository
// Description: SQLite-backed truth_core::RuleRepository impl.
// Purpose: Persist Rule rows, the concept-link and AMENDS-edge side tables,
//          and the backing-candidate-fact join used by the Composer/watchdog
//          progress gate.
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
use truth_core::AuthorityLevel;
use truth_core::RepoError;
use truth_core::RepoResult;
use truth_core::RuleRepository;
use truth_core::identifiers::CandidateFactId;
use truth_core::identifiers::ConceptSlug;
use truth_core::identifiers::RuleId;
use truth_core::identifiers::UserId;
use truth_core::model::Rule;
use truth_core::model::RiskTier;
use truth_core::model::RuleStatus;
use truth_core::model::value::Confidence;
use truth_core::model::value::ValueType;

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

fn row_to_rule(row: &rusqlite::Row<'_>, backing: BTreeSet<CandidateFactId>) -> rusqlite::Result<Rule> {
    let risk_tier_json: String = row.get("risk_tier")?;
    let authority_level_json: String = row.get("authority_level")?;
    let applies_when_json: String = row.get("applies_when")?;
    let value_json: String = row.get("value")?;
    let value_type_json: String = row.get("value_type")?;
    let status_json: String = row.get("status")?;
    let effective_from_text: String = row.get("effective_from")?;
    let effective_until_text: Option<String> = row.get("effective_until")?;
    let supersedes_id: Option<String> = row.get("supersedes_id")?;
    let approved_by: Option<String> = row.get("approved_by")?;
    let confidence: f64 = row.get("confidence")?;

    Ok(Rule {
        id: row.get::<_, String>("id")?.into(),
        concept_slug: row.get::<_, String>("concept_slug")?.into(),
        title_hr: row.get("title_hr")?,
        title_en: row.get("title_en")?,
        risk_tier: decode_json::<RiskTier>(&risk_tier_json).map_err(to_rusqlite_error)?,
        authority_level: decode_json::<AuthorityLevel>(&authority_level_json).map_err(to_rusqlite_error)?,
        applies_when: decode_json(&applies_when_json).map_err(to_rusqlite_error)?,
        value: decode_json(&value_json).map_err(to_rusqlite_error)?,
        value_type: decode_json::<ValueType>(&value_type_json).map_err(to_rusqlite_error)?,
        effective_from: decode_date(&effective_from_text).map_err(to_rusqlite_error)?,
        effective_until: effective_until_text.map(|text| decode_date(&text)).transpose().map_err(to_rusqlite_error)?,
        supersedes_id: supersedes_id.map(Into::into),
        status: decode_json::<RuleStatus>(&status_json).map_err(to_rusqlite_error)?,
        confidence: Confidence::new(confidence)
            .map_err(|err| to_rusqlite_error(crate::error::SqliteStoreError::Corrupt(err.to_string())))?,
        approved_by: approved_by.map(Into::into),
        backing_candidate_fact_ids: backing,
    })
}

fn to_rusqlite_error(error: crate::error::SqliteStoreError) -> rusqlite::Error {
    rusqlite::Error::ToSqlConversionFailure(Box::new(error))
}

fn backend(error: crate::error::SqliteStoreError) -> RepoError {
    RepoError::from(error)
}

fn effective_until_column(date: Option<Date>) -> Option<String> {
    date.map(encode_date)
}

// ============================================================================
// SECTION: RuleRepository
// ============================================================================

impl TruthStore {
    fn backing_candidate_fact_ids(&self, rule_id: &RuleId) -> RepoResult<BTreeSet<CandidateFactId>> {
        let connection = self.lock().map_err(backend)?;
        let mut statement = connection
            .prepare("SELECT candidate_fact_id FROM rule_candidate_facts WHERE rule_id = ?1")
            .map_err(|err| backend(err.into()))?;
        let ids = statement
            .query_map(params![rule_id.as_str()], |row| row.get::<_, String>(0))
            .map_err(|err| backend(err.into()))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| backend(err.into()))?;
        Ok(ids.into_iter().map(Into::into).collect())
    }
}

impl RuleRepository for TruthStore {
    fn put(&self, rule: Rule) -> RepoResult<Rule> {
        let risk_tier_json = encode_json(&rule.risk_tier).map_err(backend)?;
        let authority_level_json = encode_json(&rule.authority_level).map_err(backend)?;
        let applies_when_json = encode_json(&rule.applies_when).map_err(backend)?;
        let value_json = encode_json(&rule.value).map_err(backend)?;
        let value_type_json = encode_json(&rule.value_type).map_err(backend)?;
        let status_json = encode_json(&rule.status).map_err(backend)?;
        let now = encode_timestamp(OffsetDateTime::now_utc());

        let connection = self.lock().map_err(backend)?;
        connection
            .execute(
                "INSERT INTO rules (
                    id, concept_slug, title_hr, title_en, risk_tier, authority_level, applies_when,
                    value, value_type, effective_from, effective_until, supersedes_id, status,
                    confidence, approved_by, status_changed_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
                params![
                    rule.id.as_str(),
                    rule.concept_slug.as_str(),
                    rule.title_hr,
                    rule.title_en,
                    risk_tier_json,
                    authority_level_json,
                    applies_when_json,
                    value_json,
                    value_type_json,
                    encode_date(rule.effective_from),
                    effective_until_column(rule.effective_until),
                    rule.supersedes_id.as_ref().map(truth_core::identifiers::RuleId::as_str),
                    status_json,
                    rule.confidence.value(),
                    rule.approved_by.as_ref().map(UserId::as_str),
                    now,
                ],
            )
            .map_err(|err| backend(err.into()))?;

        for candidate_fact_id in &rule.backing_candidate_fact_ids {
            connection
                .execute(
                    "INSERT OR IGNORE INTO rule_candidate_facts (rule_id, candidate_fact_id) VALUES (?1, ?2)",
                    params![rule.id.as_str(), candidate_fact_id.as_str()],
                )
                .map_err(|err| backend(err.into()))?;
        }

        Ok(rule)
    }

    fn get(&self, id: &RuleId) -> RepoResult<Rule> {
        let backing = self.backing_candidate_fact_ids(id)?;
        let connection = self.lock().map_err(backend)?;
        connection
            .query_row("SELECT * FROM rules WHERE id = ?1", params![id.as_str()], |row| row_to_rule(row, backing))
            .optional()
            .map_err(|err| backend(err.into()))?
            .ok_or_else(|| RepoError::NotFound(format!("rule {id}")))
    }

    fn transition(&self, id: &RuleId, to: RuleStatus, bypass: bool) -> RepoResult<Rule> {
        let current = self.get(id)?;
        if !bypass && !current.status.can_transition(to) {
            return Err(RepoError::IllegalTransition(format!("rule {id}: {:?} -> {to:?}", current.status)));
        }
        let status_json = encode_json(&to).map_err(backend)?;
        let now = encode_timestamp(OffsetDateTime::now_utc());
        let connection = self.lock().map_err(backend)?;
        connection
            .execute(
                "UPDATE rules SET status = ?1, status_changed_at = ?2 WHERE id = ?3",
                params![status_json, now, id.as_str()],
            )
            .map_err(|err| backend(err.into()))?;
        Ok(Rule { status: to, ..current })
    }

    fn set_approved_by(&self, id: &RuleId, approved_by: Option<UserId>) -> RepoResult<Rule> {
        let current = self.get(id)?;
        let connection = self.lock().map_err(backend)?;
        connection
            .execute(
                "UPDATE rules SET approved_by = ?1 WHERE id = ?2",
                params![approved_by.as_ref().map(UserId::as_str), id.as_str()],
            )
            .map_err(|err| backend(err.into()))?;
        Ok(Rule { approved_by, ..current })
    }

    fn upsert_concept_link(&self, concept_slug: &ConceptSlug, rule_id: &RuleId) -> RepoResult<()> {
        let connection = self.lock().map_err(backend)?;
        connection
            .execute(
                "INSERT OR IGNORE INTO concept_rules (concept_slug, rule_id) VALUES (?1, ?2)",
                params![concept_slug.as_str(), rule_id.as_str()],
            )
            .map_err(|err| backend(err.into()))?;
        Ok(())
    }

    fn record_amends_edge(&self, rule_id: &RuleId, supersedes_id: &RuleId) -> RepoResult<()> {
        let connection = self.lock().map_err(backend)?;
        connection
            .execute(
                "INSERT OR IGNORE INTO rule_amends (rule_id, supersedes_id) VALUES (?1, ?2)",
                params![rule_id.as_str(), supersedes_id.as_str()],
            )
            .map_err(|err| backend(err.into()))?;
        Ok(())
    }

    fn list_by_status(&self, status: RuleStatus) -> RepoResult<Vec<RuleId>> {
        let status_json = encode_json(&status).map_err(backend)?;
        let connection = self.lock().map_err(backend)?;
        let mut statement =
            connection.prepare("SELECT id FROM rules WHERE status = ?1").map_err(|err| backend(err.into()))?;
        let ids = statement
            .query_map(params![status_json], |row| row.get::<_, String>(0))
            .map_err(|err| backend(err.into()))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| backend(err.into()))?;
        Ok(ids.into_iter().map(Into::into).collect())
    }

    fn approved_since(&self) -> RepoResult<Vec<(RuleId, OffsetDateTime)>> {
        let status_json = encode_json(&RuleStatus::Approved).map_err(backend)?;
        let connection = self.lock().map_err(backend)?;
        let mut statement = connection
            .prepare("SELECT id, status_changed_at FROM rules WHERE status = ?1 ORDER BY status_changed_at ASC")
            .map_err(|err| backend(err.into()))?;
        let rows = statement
            .query_map(params![status_json], |row| {
                let id: String = row.get(0)?;
                let transitioned_at: String = row.get(1)?;
                Ok((id, transitioned_at))
            })
            .map_err(|err| backend(err.into()))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| backend(err.into()))?;

        rows.into_iter()
            .map(|(id, transitioned_at)| decode_timestamp(&transitioned_at).map(|timestamp| (id.into(), timestamp)).map_err(backend))
            .collect()
    }

    fn rejected_since(&self) -> RepoResult<Vec<(RuleId, OffsetDateTime)>> {
        let status_json = encode_json(&RuleStatus::Rejected).map_err(backend)?;
        let connection = self.lock().map_err(backend)?;
        let mut statement = connection
            .prepare("SELECT id, status_changed_at FROM rules WHERE status = ?1 ORDER BY status_changed_at ASC")
            .map_err(|err| backend(err.into()))?;
        let rows = statement
            .query_map(params![status_json], |row| {
                let id: String = row.get(0)?;
                let transitioned_at: String = row.get(1)?;
                Ok((id, transitioned_at))
            })
            .map_err(|err| backend(err.into()))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| backend(err.into()))?;

        rows.into_iter()
            .map(|(id, transitioned_at)| decode_timestamp(&transitioned_at).map(|timestamp| (id.into(), timestamp)).map_err(backend))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use time::Month;
    use truth_core::authority::AuthorityLevel;

    use super::*;

    fn draft() -> Rule {
        Rule {
            id: RuleId::new("rule-1"),
            concept_slug: ConceptSlug::new("vat-threshold"),
            title_hr: "Prag PDV-a".to_string(),
            title_en: "VAT threshold".to_string(),
            risk_tier: RiskTier::T1,
            authority_level: AuthorityLevel::Law,
            applies_when: serde_json::json!({"op": "true"}),
            value: serde_json::json!(40000),
            value_type: ValueType::Currency,
            effective_from: Date::from_calendar_date(2026, Month::January, 1).expect("date"),
            effective_until: None,
            supersedes_id: None,
            status: RuleStatus::Draft,
            confidence: Confidence::new(0.95).expect("confidence"),
            approved_by: None,
            backing_candidate_fact_ids: BTreeSet::from([CandidateFactId::new("cf-1")]),
        }
    }

    #[test]
    fn put_then_get_round_trips_backing_ids() {
        let store = TruthStore::open_in_memory().expect("open");
        let stored = store.put(draft()).expect("put");
        let loaded = store.get(&stored.id).expect("get");
        assert_eq!(loaded, stored);
    }

    #[test]
    fn transition_to_approved_is_legal() {
        let store = TruthStore::open_in_memory().expect("open");
        let stored = store.put(draft()).expect("put");
        let approved = store.transition(&stored.id, RuleStatus::Approved, false).expect("transition");
        assert_eq!(approved.status, RuleStatus::Approved);
    }

    #[test]
    fn illegal_transition_without_bypass_is_rejected() {
        let store = TruthStore::open_in_memory().expect("open");
        let stored = store.put(draft()).expect("put");
        assert!(store.transition(&stored.id, RuleStatus::Deprecated, false).is_err());
        assert!(store.transition(&stored.id, RuleStatus::Deprecated, true).is_ok());
    }

    #[test]
    fn approved_since_lists_rules_currently_approved() {
        let store = TruthStore::open_in_memory().expect("open");
        let stored = store.put(draft()).expect("put");
        store.transition(&stored.id, RuleStatus::Approved, false).expect("transition");
        let approved = store.approved_since().expect("approved_since");
        assert_eq!(approved.len(), 1);
        assert_eq!(approved[0].0, stored.id);
    }

    #[test]
    fn rejected_since_lists_rules_currently_rejected() {
        let store = TruthStore::open_in_memory().expect("open");
        let stored = store.put(draft()).expect("put");
        store.transition(&stored.id, RuleStatus::Rejected, true).expect("transition");
        let rejected = store.rejected_since().expect("rejected_since");
        assert_eq!(rejected.len(), 1);
        assert_eq!(rejected[0].0, stored.id);
    }
}
