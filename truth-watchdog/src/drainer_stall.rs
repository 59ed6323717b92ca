// truth-watchdog/src/drainer_stall.rs
// ============================================================================
// Module: Drainer Stall Check
// Description: Idle minutes since each monitored worker's last heartbeat
//              (§4.10).
// Purpose: Catch a worker loop that is alive in the process table but has
//          stopped making progress.
// Dependencies: time, truth-queue
// ============================================================================

use time::OffsetDateTime;
use truth_queue::Queue;
use truth_queue::QueueResult;

use crate::report::CheckResult;
use crate::report::CheckStatus;
use crate::thresholds::WatchdogThresholds;

/// Check identifier used as `Alert::alert_type`.
pub const ALERT_TYPE: &str = "DRAINER_STALL";

/// Evaluates the drainer-stall check for every id in `worker_ids` (§4.10:
/// "heartbeat idle minutes; WARN at 15, CRITICAL at 30; a missing
/// heartbeat is a WARN").
///
/// # Errors
///
/// Returns [`truth_queue::QueueError`] on storage failure.
pub fn check(queue: &dyn Queue, worker_ids: &[String], now: OffsetDateTime, thresholds: &WatchdogThresholds) -> QueueResult<Vec<CheckResult>> {
    let mut results = Vec::with_capacity(worker_ids.len());
    for worker_id in worker_ids {
        let heartbeat = queue.last_heartbeat(worker_id)?;
        let result = match heartbeat {
            None => CheckResult::new(ALERT_TYPE, worker_id.clone(), CheckStatus::Warning, "no heartbeat has ever been recorded"),
            Some(heartbeat) => {
                let published_at = OffsetDateTime::from_unix_timestamp(heartbeat.published_at_unix)
                    .unwrap_or(OffsetDateTime::UNIX_EPOCH);
                let idle_minutes = (now - published_at).whole_minutes();
                let status = CheckStatus::from_thresholds(
                    idle_minutes as f64,
                    thresholds.drainer_stall_warn_minutes as f64,
                    thresholds.drainer_stall_critical_minutes as f64,
                    true,
                );
                CheckResult::new(
                    ALERT_TYPE,
                    worker_id.clone(),
                    status,
                    format!("idle for {idle_minutes} minutes, last cycle {}", heartbeat.cycle),
                )
            }
        };
        results.push(result);
    }
    Ok(results)
}

#[cfg(test)]
mod tests {
    use truth_queue::memory::InMemoryQueue;

    use super::*;

    #[test]
    fn fresh_heartbeat_is_healthy() {
        let queue = InMemoryQueue::new();
        queue.heartbeat("extractor-worker", 1, 10).expect("heartbeat");
        let now = OffsetDateTime::now_utc();
        let results = check(&queue, &["extractor-worker".to_string()], now, &WatchdogThresholds::default()).expect("check");
        assert_eq!(results[0].status, CheckStatus::Healthy);
    }

    #[test]
    fn missing_heartbeat_is_warning() {
        let queue = InMemoryQueue::new();
        let results =
            check(&queue, &["extractor-worker".to_string()], OffsetDateTime::UNIX_EPOCH, &WatchdogThresholds::default()).expect("check");
        assert_eq!(results[0].status, CheckStatus::Warning);
    }
}
