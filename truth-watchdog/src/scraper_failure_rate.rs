// truth-watchdog/src/scraper_failure_rate.rs
// ============================================================================
// Module: Scraper Failure Rate Check
// Description: Empty-content fraction per source over a 24h window (§4.10).
// Purpose: Catch a source whose fetcher is still running but returning
//          empty bodies (a broken selector, a paywall, a redirect loop).
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
pub const ALERT_TYPE: &str = "SCRAPER_FAILURE_RATE";

/// Evaluates the scraper-failure-rate check for every id in `sources`
/// (§4.10: "empty-content fraction over a 24h window; WARN at 0.30,
/// CRITICAL at 0.50").
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
    let cutoff = now - thresholds.scraper_failure_rate_window;
    let mut results = Vec::with_capacity(sources.len());
    for source_id in sources {
        let ids = evidence_repo.list_by_source(source_id)?;
        let mut total_in_window = 0_u64;
        let mut empty_in_window = 0_u64;
        for id in ids {
            let evidence = evidence_repo.get(&id)?;
            if evidence.fetched_at < cutoff {
                continue;
            }
            total_in_window += 1;
            if evidence.raw_bytes.is_empty() {
                empty_in_window += 1;
            }
        }

        let result = if total_in_window == 0 {
            CheckResult::new(ALERT_TYPE, source_id.as_str(), CheckStatus::Healthy, "no fetches recorded in the trailing window")
        } else {
            let fraction = f64::from(u32::try_from(empty_in_window).unwrap_or(u32::MAX))
                / f64::from(u32::try_from(total_in_window).unwrap_or(u32::MAX).max(1));
            let status =
                CheckStatus::from_thresholds(fraction, thresholds.scraper_failure_rate_warn, thresholds.scraper_failure_rate_critical, true);
            CheckResult::new(
                ALERT_TYPE,
                source_id.as_str(),
                status,
                format!("{empty_in_window}/{total_in_window} fetches returned empty content in the trailing window"),
            )
        };
        results.push(result);
    }
    Ok(results)
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::BTreeMap;

    use truth_core::model::ContentClass;
    use truth_core::model::ContentType;
    use truth_core::model::Evidence;
    use truth_core::repo::RepoError;
    use truth_core::EvidenceId;

    use super::*;

    struct StubEvidenceRepo {
        rows: RefCell<BTreeMap<EvidenceId, Evidence>>,
    }

    impl EvidenceRepository for StubEvidenceRepo {
        fn put(&self, evidence: Evidence) -> RepoResult<Evidence> {
            self.rows.borrow_mut().insert(evidence.id.clone(), evidence.clone());
            Ok(evidence)
        }
        fn get(&self, id: &EvidenceId) -> RepoResult<Evidence> {
            self.rows.borrow().get(id).cloned().ok_or_else(|| RepoError::NotFound(id.to_string()))
        }
        fn append_artifact(&self, id: &EvidenceId, _artifact: truth_core::model::EvidenceArtifact) -> RepoResult<Evidence> {
            self.get(id)
        }
        fn list_by_source(&self, source_id: &SourceId) -> RepoResult<Vec<EvidenceId>> {
            Ok(self.rows.borrow().values().filter(|row| &row.source_id == source_id).map(|row| row.id.clone()).collect())
        }
        fn last_fetched_at(&self, _source_id: &SourceId) -> RepoResult<Option<OffsetDateTime>> {
            Ok(None)
        }
        fn list_all(&self) -> RepoResult<Vec<EvidenceId>> {
            Ok(self.rows.borrow().keys().cloned().collect())
        }
    }

    fn evidence(id: &str, fetched_at: OffsetDateTime, bytes: &[u8]) -> Evidence {
        Evidence::capture(
            EvidenceId::new(id),
            SourceId::new("src-1"),
            "https://example.test/law",
            ContentType::Html,
            ContentClass::Html,
            bytes.to_vec(),
            fetched_at,
            true,
        )
    }

    #[test]
    fn half_empty_in_window_is_critical() {
        let now = OffsetDateTime::UNIX_EPOCH + time::Duration::days(1);
        let repo = StubEvidenceRepo { rows: RefCell::new(BTreeMap::new()) };
        repo.put(evidence("ev-1", now, b"")).expect("put");
        repo.put(evidence("ev-2", now, b"<html>content</html>")).expect("put");
        let results = check(&repo, &[SourceId::new("src-1")], now, &WatchdogThresholds::default()).expect("check");
        assert_eq!(results[0].status, CheckStatus::Critical);
    }

    #[test]
    fn all_full_content_is_healthy() {
        let now = OffsetDateTime::UNIX_EPOCH + time::Duration::days(1);
        let repo = StubEvidenceRepo { rows: RefCell::new(BTreeMap::new()) };
        repo.put(evidence("ev-1", now, b"<html>content</html>")).expect("put");
        let results = check(&repo, &[SourceId::new("src-1")], now, &WatchdogThresholds::default()).expect("check");
        assert_eq!(results[0].status, CheckStatus::Healthy);
    }

    #[test]
    fn fetches_outside_window_are_ignored() {
        let now = OffsetDateTime::UNIX_EPOCH + time::Duration::days(10);
        let repo = StubEvidenceRepo { rows: RefCell::new(BTreeMap::new()) };
        repo.put(evidence("ev-1", OffsetDateTime::UNIX_EPOCH, b"")).expect("put");
        let results = check(&repo, &[SourceId::new("src-1")], now, &WatchdogThresholds::default()).expect("check");
        assert_eq!(results[0].status, CheckStatus::Healthy);
    }
}
