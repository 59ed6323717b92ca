// truth-watchdog/src/queue_backlog.rs
// ============================================================================
// Module: Queue Backlog / Dead-Letter Depth Check
// Description: Current depth of monitored queues and the shared dead-letter
//              queue (§4.10).
// Purpose: Catch a stage that has stopped draining a queue, or an uptick
//          in permanently-failed jobs.
// Dependencies: truth-queue
// ============================================================================

use truth_queue::DEAD_LETTER_QUEUE;
use truth_queue::Queue;
use truth_queue::QueueResult;

use crate::report::CheckResult;
use crate::report::CheckStatus;
use crate::thresholds::WatchdogThresholds;

/// Check identifier used as `Alert::alert_type` for an ordinary queue.
pub const QUEUE_BACKLOG_ALERT_TYPE: &str = "QUEUE_BACKLOG";
/// Check identifier used as `Alert::alert_type` for the dead-letter queue.
pub const DEAD_LETTER_ALERT_TYPE: &str = "DEAD_LETTER_DEPTH";

/// Evaluates the queue-backlog check for every name in `queue_names`, plus
/// the shared dead-letter queue (§4.10).
///
/// # Errors
///
/// Returns [`truth_queue::QueueError`] on storage failure.
pub fn check(queue: &dyn Queue, queue_names: &[String], thresholds: &WatchdogThresholds) -> QueueResult<Vec<CheckResult>> {
    let mut results = Vec::with_capacity(queue_names.len() + 1);
    for queue_name in queue_names {
        let depth = queue.depth(queue_name)?;
        let status =
            CheckStatus::from_thresholds(depth as f64, thresholds.queue_backlog_warn_depth as f64, thresholds.queue_backlog_critical_depth as f64, true);
        results.push(CheckResult::new(QUEUE_BACKLOG_ALERT_TYPE, queue_name.clone(), status, format!("{depth} jobs pending")));
    }

    let dead_letter_depth = queue.depth(DEAD_LETTER_QUEUE)?;
    let status = CheckStatus::from_thresholds(
        dead_letter_depth as f64,
        thresholds.dead_letter_warn_depth as f64,
        thresholds.dead_letter_critical_depth as f64,
        true,
    );
    results.push(CheckResult::new(
        DEAD_LETTER_ALERT_TYPE,
        DEAD_LETTER_QUEUE,
        status,
        format!("{dead_letter_depth} jobs in the dead-letter queue"),
    ));
    Ok(results)
}

#[cfg(test)]
mod tests {
    use truth_queue::memory::InMemoryQueue;
    use truth_queue::EnqueueOptions;

    use super::*;

    #[test]
    fn empty_queue_is_healthy() {
        let queue = InMemoryQueue::new();
        let results = check(&queue, &["extract".to_string()], &WatchdogThresholds::default()).expect("check");
        assert_eq!(results[0].status, CheckStatus::Healthy);
        assert_eq!(results[1].alert_type, DEAD_LETTER_ALERT_TYPE);
    }

    #[test]
    fn backlog_past_critical_depth_is_critical() {
        let queue = InMemoryQueue::new();
        for _ in 0..600 {
            queue.enqueue("extract", serde_json::json!({}), EnqueueOptions::default()).expect("enqueue");
        }
        let results = check(&queue, &["extract".to_string()], &WatchdogThresholds::default()).expect("check");
        assert_eq!(results[0].status, CheckStatus::Critical);
    }
}
