// truth-queue/tests/queue_lifecycle.rs
// Integration coverage for the `Queue` contract across the in-memory
// adapter and its singleton wrapper (§4.1).

use truth_queue::EnqueueOptions;
use truth_queue::FailureClass;
use truth_queue::InMemoryQueue;
use truth_queue::NackOptions;
use truth_queue::Queue;
use truth_queue::SingletonQueue;
use truth_queue::backoff_delay_ms;

#[test]
fn general_failures_back_off_from_one_second() {
    assert_eq!(backoff_delay_ms(FailureClass::General, 0), 1_000);
    assert_eq!(backoff_delay_ms(FailureClass::General, 1), 2_000);
    assert_eq!(backoff_delay_ms(FailureClass::General, 3), 8_000);
}

#[test]
fn rate_limited_failures_back_off_from_thirty_seconds() {
    assert_eq!(backoff_delay_ms(FailureClass::RateLimited, 0), 30_000);
    assert_eq!(backoff_delay_ms(FailureClass::RateLimited, 2), 120_000);
}

#[test]
fn reserved_job_is_not_reservable_again_until_lease_expires() {
    let queue = InMemoryQueue::new();
    queue
        .enqueue("extract", serde_json::json!({"evidence_id": "e1"}), EnqueueOptions::default())
        .expect("enqueue succeeds");

    let reserved = queue
        .reserve("extract", "worker-1", 60_000)
        .expect("reserve succeeds")
        .expect("job is eligible");

    let second = queue.reserve("extract", "worker-2", 60_000).expect("reserve succeeds");
    assert!(second.is_none(), "job is leased to worker-1 and should not be reservable again");

    queue.ack(&reserved.job_id).expect("ack succeeds");
}

#[test]
fn priority_orders_reservation() {
    let queue = InMemoryQueue::new();
    queue
        .enqueue(
            "compose",
            serde_json::json!({"fact": "low"}),
            EnqueueOptions {
                priority: Some(0),
                ..EnqueueOptions::default()
            },
        )
        .expect("enqueue succeeds");
    queue
        .enqueue(
            "compose",
            serde_json::json!({"fact": "high"}),
            EnqueueOptions {
                priority: Some(10),
                ..EnqueueOptions::default()
            },
        )
        .expect("enqueue succeeds");

    let first = queue
        .reserve("compose", "worker-1", 30_000)
        .expect("reserve succeeds")
        .expect("a job is eligible");
    assert_eq!(first.body["fact"], "high");
}

#[test]
fn dead_letter_preserves_original_job_id_and_reason() {
    let queue = InMemoryQueue::new();
    queue
        .enqueue("extract", serde_json::json!({"evidence_id": "e1"}), EnqueueOptions::default())
        .expect("enqueue succeeds");
    let reserved = queue
        .reserve("extract", "worker-1", 30_000)
        .expect("reserve succeeds")
        .expect("job is eligible");

    queue
        .dead_letter(&reserved.job_id, "schema validation failed after retries")
        .expect("dead-letter succeeds");

    let dead = queue
        .reserve(truth_queue::DEAD_LETTER_QUEUE, "dlq-worker", 30_000)
        .expect("reserve succeeds")
        .expect("dead-lettered job is present");
    assert_eq!(dead.body["original_job_id"], reserved.job_id.to_string());
    assert_eq!(dead.body["reason"], "schema validation failed after retries");
}

#[test]
fn nack_without_retry_flag_dead_letters_immediately() {
    let queue = InMemoryQueue::new();
    queue
        .enqueue("extract", serde_json::json!({}), EnqueueOptions::default())
        .expect("enqueue succeeds");
    let reserved = queue
        .reserve("extract", "worker-1", 30_000)
        .expect("reserve succeeds")
        .expect("job is eligible");

    queue
        .nack(
            &reserved.job_id,
            "unauthorized by upstream",
            FailureClass::General,
            5,
            NackOptions {
                retry: Some(false),
                retry_delay_ms: None,
            },
        )
        .expect("nack succeeds");

    assert_eq!(queue.depth("extract").expect("depth succeeds"), 0);
    assert_eq!(queue.depth(truth_queue::DEAD_LETTER_QUEUE).expect("depth succeeds"), 1);
}

#[test]
fn singleton_wrapper_serializes_release_worker_reservations() {
    let queue = SingletonQueue::new(InMemoryQueue::new(), "release");
    queue
        .enqueue("release", serde_json::json!({"rules": ["r1"]}), EnqueueOptions::default())
        .expect("enqueue succeeds");
    queue
        .enqueue("release", serde_json::json!({"rules": ["r2"]}), EnqueueOptions::default())
        .expect("enqueue succeeds");

    let first = queue
        .reserve("release", "releaser", 120_000)
        .expect("reserve succeeds")
        .expect("a job is eligible");
    assert!(
        queue
            .reserve("release", "releaser-retry", 120_000)
            .expect("reserve succeeds")
            .is_none()
    );

    queue.ack(&first.job_id).expect("ack succeeds");
    assert!(
        queue
            .reserve("release", "releaser", 120_000)
            .expect("reserve succeeds")
            .is_some()
    );
}

#[test]
fn heartbeats_report_the_latest_cycle() {
    let queue = InMemoryQueue::new();
    queue.heartbeat("watchdog", 1, 4).expect("heartbeat succeeds");
    queue.heartbeat("watchdog", 2, 9).expect("heartbeat succeeds");
    let latest = queue
        .last_heartbeat("watchdog")
        .expect("lookup succeeds")
        .expect("a heartbeat was recorded");
    assert_eq!(latest.cycle, 2);
    assert_eq!(latest.items_processed, 9);
}
