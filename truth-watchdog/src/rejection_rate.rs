// truth-watchdog/src/rejection_rate.rs
// ============================================================================
// Module: Rejection Rate Check
// Description: REJECTED / (APPROVED + REJECTED) over the trailing 7-day
//              window (§4.10).
// Purpose: Catch a reviewer/arbiter miscalibration before it silently
//          discards most of the Composer's output.
// Dependencies: time, truth-core
// ============================================================================

use time::OffsetDateTime;
use truth_core::RepoResult;
use truth_core::RuleRepository;

use crate::report::CheckResult;
use crate::report::CheckStatus;
use crate::thresholds::WatchdogThresholds;

/// Check identifier used as `Alert::alert_type`.
pub const ALERT_TYPE: &str = "REJECTION_RATE";

/// Entity id this check's single result is recorded under; there is one
/// rejection rate for the whole pipeline, not one per source or agent.
pub const ENTITY_ID: &str = "pipeline";

/// Evaluates the rejection-rate check (§4.10: "WARN at 0.40, CRITICAL at
/// 0.60").
///
/// # Errors
///
/// Returns [`truth_core::RepoError`] on storage failure.
pub fn check(rule_repo: &dyn RuleRepository, now: OffsetDateTime, thresholds: &WatchdogThresholds) -> RepoResult<CheckResult> {
    let since = now - thresholds.trailing_window;
    let approved_count = rule_repo.approved_since()?.into_iter().filter(|(_, transitioned_at)| *transitioned_at >= since).count();
    let rejected_count = rule_repo.rejected_since()?.into_iter().filter(|(_, transitioned_at)| *transitioned_at >= since).count();
    let total = approved_count + rejected_count;

    if total == 0 {
        return Ok(CheckResult::new(ALERT_TYPE, ENTITY_ID, CheckStatus::Healthy, "no rules approved or rejected in the trailing window"));
    }

    let fraction = f64::from(u32::try_from(rejected_count).unwrap_or(u32::MAX)) / f64::from(u32::try_from(total).unwrap_or(u32::MAX).max(1));
    let status = CheckStatus::from_thresholds(fraction, thresholds.rejection_rate_warn, thresholds.rejection_rate_critical, true);
    Ok(CheckResult::new(
        ALERT_TYPE,
        ENTITY_ID,
        status,
        format!("{rejected_count}/{total} rules rejected in the trailing window"),
    ))
}

#[cfg(test)]
mod tests {
    use truth_core::model::Rule;
    use truth_core::repo::RepoError;
    use truth_core::RuleId;
    use truth_core::model::RuleStatus;
    use truth_core::identifiers::ConceptSlug;

    use super::*;

    struct StubRuleRepo {
        approved: Vec<(RuleId, OffsetDateTime)>,
        rejected: Vec<(RuleId, OffsetDateTime)>,
    }

    impl RuleRepository for StubRuleRepo {
        fn put(&self, rule: Rule) -> RepoResult<Rule> {
            Ok(rule)
        }
        fn get(&self, id: &RuleId) -> RepoResult<Rule> {
            Err(RepoError::NotFound(id.to_string()))
        }
        fn transition(&self, id: &RuleId, _to: RuleStatus, _bypass: bool) -> RepoResult<Rule> {
            Err(RepoError::NotFound(id.to_string()))
        }
        fn set_approved_by(&self, id: &RuleId, _approved_by: Option<truth_core::identifiers::UserId>) -> RepoResult<Rule> {
            Err(RepoError::NotFound(id.to_string()))
        }
        fn upsert_concept_link(&self, _concept_slug: &ConceptSlug, _rule_id: &RuleId) -> RepoResult<()> {
            Ok(())
        }
        fn record_amends_edge(&self, _rule_id: &RuleId, _supersedes_id: &RuleId) -> RepoResult<()> {
            Ok(())
        }
        fn list_by_status(&self, _status: RuleStatus) -> RepoResult<Vec<RuleId>> {
            Ok(Vec::new())
        }
        fn approved_since(&self) -> RepoResult<Vec<(RuleId, OffsetDateTime)>> {
            Ok(self.approved.clone())
        }
        fn rejected_since(&self) -> RepoResult<Vec<(RuleId, OffsetDateTime)>> {
            Ok(self.rejected.clone())
        }
    }

    #[test]
    fn no_activity_is_healthy() {
        let repo = StubRuleRepo { approved: Vec::new(), rejected: Vec::new() };
        let result = check(&repo, OffsetDateTime::UNIX_EPOCH, &WatchdogThresholds::default()).expect("check");
        assert_eq!(result.status, CheckStatus::Healthy);
    }

    #[test]
    fn sixty_percent_rejected_is_critical() {
        let now = OffsetDateTime::UNIX_EPOCH;
        let repo = StubRuleRepo {
            approved: vec![(RuleId::new("r-1"), now), (RuleId::new("r-2"), now)],
            rejected: vec![
                (RuleId::new("r-3"), now),
                (RuleId::new("r-4"), now),
                (RuleId::new("r-5"), now),
            ],
        };
        let result = check(&repo, now, &WatchdogThresholds::default()).expect("check");
        assert_eq!(result.status, CheckStatus::Critical);
    }

    #[test]
    fn stale_activity_outside_window_is_ignored() {
        let now = OffsetDateTime::UNIX_EPOCH + time::Duration::days(30);
        let repo = StubRuleRepo {
            approved: Vec::new(),
            rejected: vec![(RuleId::new("r-1"), OffsetDateTime::UNIX_EPOCH)],
        };
        let result = check(&repo, now, &WatchdogThresholds::default()).expect("check");
        assert_eq!(result.status, CheckStatus::Healthy);
    }
}
