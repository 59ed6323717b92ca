// truth-broker/src/sink/log.rs
// ============================================================================
// Module: Content-Sync Log Sink
// Description: Log-only sink for audit-grade delivery records.
// Purpose: Persist delivery receipts without dispatching event bodies to an
//          external system.
// Dependencies: serde_json, std
// ============================================================================

//! ## Overview
//! [`LogSink`] writes a log record for each dispatch and returns the receipt.
//! It does not deliver event bodies to external systems; it is the fallback
//! sink used when no downstream content-sync consumer is configured.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::sync::Mutex;

use serde_json::json;

use crate::dispatcher::ContentSyncEvent;
use crate::sink::DispatchReceipt;
use crate::sink::DispatchTarget;
use crate::sink::ReceiptFactory;
use crate::sink::Sink;
use crate::sink::SinkError;

// ============================================================================
// SECTION: Log Sink
// ============================================================================

/// Log-only content-sync sink.
pub struct LogSink<W: Write + Send> {
    /// Output writer for log records.
    writer: Mutex<W>,
    /// Receipt factory for deterministic dispatch IDs.
    receipts: ReceiptFactory,
}

impl<W: Write + Send> LogSink<W> {
    /// Creates a log sink with the default dispatcher name.
    pub fn new(writer: W) -> Self {
        Self { writer: Mutex::new(writer), receipts: ReceiptFactory::new("log") }
    }

    /// Creates a log sink with a custom dispatcher name.
    pub fn with_dispatcher(writer: W, dispatcher: impl Into<String>) -> Self {
        Self { writer: Mutex::new(writer), receipts: ReceiptFactory::new(dispatcher) }
    }
}

impl<W: Write + Send> Sink for LogSink<W> {
    fn deliver(&self, target: &DispatchTarget, event: &ContentSyncEvent) -> Result<DispatchReceipt, SinkError> {
        let receipt = self.receipts.next(target, event);
        let record = json!({
            "dispatch_id": receipt.dispatch_id,
            "dispatcher": receipt.dispatcher,
            "target": receipt.target,
            "content_hash": event.content_hash,
            "body": event.body,
            "dispatched_at": receipt.dispatched_at,
        });
        let mut guard =
            self.writer.lock().map_err(|_| SinkError::LogWriteFailed("log writer mutex poisoned".to_string()))?;
        serde_json::to_writer(&mut *guard, &record).map_err(|err| SinkError::LogWriteFailed(err.to_string()))?;
        guard.write_all(b"\n").map_err(|err| SinkError::LogWriteFailed(err.to_string()))?;
        drop(guard);
        Ok(receipt)
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::LogSink;
    use crate::dispatcher::ContentSyncEvent;
    use crate::sink::DispatchTarget;
    use crate::sink::Sink;

    #[test]
    fn log_sink_writes_one_json_line_per_delivery() {
        let sink = LogSink::new(Vec::new());
        let target = DispatchTarget::new("audit-log");
        let event =
            ContentSyncEvent::new(json!({"ruleId": "rule-1"}), truth_core::DEFAULT_HASH_ALGORITHM).expect("hash");
        sink.deliver(&target, &event).expect("deliver");
        sink.deliver(&target, &event).expect("deliver");
    }
}
