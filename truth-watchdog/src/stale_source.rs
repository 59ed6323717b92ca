// truth-watchdog/src/stale_source.rs
// ============================================================================
// Module: Stale Source Check
// Description: Days since each monitored source's last Evidence (§4.10).
// Purpose: Catch sources whose scrape has silently stopped producing
//          Evidence rather than erroring loudly.
// Dependencies: time, truth-core
// ============================================================================

use time::OffsetDateTime;
use truth_core::EvidenceRepository;
use truth_core::RepoResult;
use truth_core::SourceId;

use crate::report::CheckResult;
use crate::report::CheckStatus;
use crate::thresholds::WatchdogThresholds;

/// Check identifier used as `Alert::alert_type`.
pub const ALERT_TYPE: &str = "STALE_SOURCE";

/// Evaluates the stale-source check for every id in `sources` (§4.10: "WARN
/// at 7 days since last Evidence, CRITICAL at 14 days").
///
/// # Errors
///
/// Returns [`truth_core::RepoError`] on storage failure.
pub fn check(
    evidence_repo: &dyn EvidenceRepository,
    sources: &[SourceId],
    now: OffsetDateTime,
    thresholds: &WatchdogThresholds,
) -> RepoResult<Vec<CheckResult>> {
    let mut results = Vec::with_capacity(sources.len());
    for source_id in sources {
        let last_fetched_at = evidence_repo.last_fetched_at(source_id)?;
        let result = match last_fetched_at {
            None => CheckResult::new(ALERT_TYPE, source_id.as_str(), CheckStatus::Warning, "no Evidence has ever been captured for this source"),
            Some(last_fetched_at) => {
                let days_stale = (now - last_fetched_at).whole_days();
                let status = CheckStatus::from_thresholds(
                    days_stale as f64,
                    thresholds.stale_source_warn_days as f64,
                    thresholds.stale_source_critical_days as f64,
                    true,
                );
                CheckResult::new(ALERT_TYPE, source_id.as_str(), status, format!("{days_stale} days since last Evidence"))
            }
        };
        results.push(result);
    }
    Ok(results)
}

#[cfg(test)]
mod tests {
    use truth_core::model::ContentClass;
    use truth_core::model::ContentType;
    use truth_core::model::Evidence;
    use truth_core::repo::RepoError;
    use truth_core::EvidenceId;

    use super::*;

    struct StubEvidenceRepo {
        last_fetched_at: Option<OffsetDateTime>,
    }

    impl EvidenceRepository for StubEvidenceRepo {
        fn put(&self, evidence: Evidence) -> RepoResult<Evidence> {
            Ok(evidence)
        }
        fn get(&self, id: &EvidenceId) -> RepoResult<Evidence> {
            Err(RepoError::NotFound(id.to_string()))
        }
        fn append_artifact(&self, id: &EvidenceId, _artifact: truth_core::model::EvidenceArtifact) -> RepoResult<Evidence> {
            Err(RepoError::NotFound(id.to_string()))
        }
        fn list_by_source(&self, _source_id: &SourceId) -> RepoResult<Vec<EvidenceId>> {
            Ok(Vec::new())
        }
        fn last_fetched_at(&self, _source_id: &SourceId) -> RepoResult<Option<OffsetDateTime>> {
            Ok(self.last_fetched_at)
        }
        fn list_all(&self) -> RepoResult<Vec<EvidenceId>> {
            Ok(Vec::new())
        }
    }

    fn make_evidence(fetched_at: OffsetDateTime) -> Evidence {
        Evidence::capture(
            EvidenceId::new("ev-1"),
            SourceId::new("src-1"),
            "https://example.test/law",
            ContentType::Html,
            ContentClass::Html,
            b"<html></html>".to_vec(),
            fetched_at,
            true,
        )
    }

    #[test]
    fn fresh_source_is_healthy() {
        let now = OffsetDateTime::UNIX_EPOCH + time::Duration::days(30);
        let repo = StubEvidenceRepo {
            last_fetched_at: Some(now - time::Duration::days(1)),
        };
        let _ = make_evidence(now);
        let results = check(&repo, &[SourceId::new("src-1")], now, &WatchdogThresholds::default()).expect("check");
        assert_eq!(results[0].status, CheckStatus::Healthy);
    }

    #[test]
    fn seven_days_stale_is_warning() {
        let now = OffsetDateTime::UNIX_EPOCH + time::Duration::days(30);
        let repo = StubEvidenceRepo {
            last_fetched_at: Some(now - time::Duration::days(7)),
        };
        let results = check(&repo, &[SourceId::new("src-1")], now, &WatchdogThresholds::default()).expect("check");
        assert_eq!(results[0].status, CheckStatus::Warning);
    }

    #[test]
    fn fourteen_days_stale_is_critical() {
        let now = OffsetDateTime::UNIX_EPOCH + time::Duration::days(30);
        let repo = StubEvidenceRepo {
            last_fetched_at: Some(now - time::Duration::days(14)),
        };
        let results = check(&repo, &[SourceId::new("src-1")], now, &WatchdogThresholds::default()).expect("check");
        assert_eq!(results[0].status, CheckStatus::Critical);
    }

    #[test]
    fn missing_evidence_is_warning() {
        let now = OffsetDateTime::UNIX_EPOCH;
        let repo = StubEvidenceRepo { last_fetched_at: None };
        let results = check(&repo, &[SourceId::new("src-1")], now, &WatchdogThresholds::default()).expect("check");
        assert_eq!(results[0].status, CheckStatus::Warning);
    }
}
