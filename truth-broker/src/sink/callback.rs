// truth-broker/src/sink/callback.rs
// ============================================================================
// Module: Content-Sync Callback Sink
// Description: Callback-based sink for synchronous delivery.
// Purpose: Invoke a user-provided function with each content-sync event.
// Dependencies: std
// ============================================================================

//! ## Overview
//! [`CallbackSink`] delivers events by invoking a user-supplied function and
//! returning the receipt the function produces. Hosts embedding
//! `truth-broker` wire this to whatever transport moves content-sync events
//! to the downstream system (an HTTP client, a message bus producer, etc.).

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use crate::dispatcher::ContentSyncEvent;
use crate::sink::DispatchReceipt;
use crate::sink::DispatchTarget;
use crate::sink::Sink;
use crate::sink::SinkError;

// ============================================================================
// SECTION: Callback Sink
// ============================================================================

/// Callback-based content-sync sink.
#[derive(Clone)]
pub struct CallbackSink {
    /// Handler invoked with the target and event.
    handler: Arc<CallbackHandler>,
}

/// Callback handler signature used by the sink.
type CallbackHandler = dyn Fn(&DispatchTarget, &ContentSyncEvent) -> Result<DispatchReceipt, SinkError> + Send + Sync;

impl CallbackSink {
    /// Creates a callback sink from a handler function.
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(&DispatchTarget, &ContentSyncEvent) -> Result<DispatchReceipt, SinkError> + Send + Sync + 'static,
    {
        Self { handler: Arc::new(handler) }
    }
}

impl Sink for CallbackSink {
    fn deliver(&self, target: &DispatchTarget, event: &ContentSyncEvent) -> Result<DispatchReceipt, SinkError> {
        (self.handler)(target, event)
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::CallbackSink;
    use crate::dispatcher::ContentSyncEvent;
    use crate::sink::DispatchTarget;
    use crate::sink::ReceiptFactory;
    use crate::sink::Sink;
    use crate::sink::SinkError;

    #[test]
    fn callback_sink_invokes_handler() {
        let receipts = ReceiptFactory::new("callback-test");
        let sink = CallbackSink::new(move |target, event| Ok(receipts.next(target, event)));
        let target = DispatchTarget::new("downstream");
        let event =
            ContentSyncEvent::new(json!({"ruleId": "rule-1"}), truth_core::DEFAULT_HASH_ALGORITHM).expect("hash");
        let receipt = sink.deliver(&target, &event).expect("deliver");
        assert_eq!(receipt.target.name, "downstream");
    }

    #[test]
    fn callback_sink_propagates_handler_errors() {
        let sink = CallbackSink::new(|_, _| Err(SinkError::DeliveryFailed("refused".to_string())));
        let target = DispatchTarget::new("downstream");
        let event =
            ContentSyncEvent::new(json!({"ruleId": "rule-1"}), truth_core::DEFAULT_HASH_ALGORITHM).expect("hash");
        let err = sink.deliver(&target, &event).expect_err("delivery should fail");
        assert!(matches!(err, SinkError::DeliveryFailed(_)));
    }
}
