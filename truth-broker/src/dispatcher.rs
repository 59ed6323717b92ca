// truth-broker/src/dispatcher.rs
// ============================================================================
// Module: Content-Sync Dispatcher
// Description: Computes a content hash over a content-sync event body and
//              delivers it through a configured Sink.
// Purpose: Give the releaser's best-effort "content-sync" queue jobs
//          (C8 §4.8) a single place to gain a verifiable content hash and be
//          handed to a delivery sink.
// Dependencies: serde_json, truth-core (hashing)
// ============================================================================

//! ## Overview
//! A [`ContentSyncEvent`] wraps the JSON body enqueued by the releaser's
//! best-effort side-effect emission (`content-sync` queue jobs: rule id,
//! release id, change type, risk tier, confidence) together with a canonical
//! content hash computed over that body. [`ContentSyncDispatcher`] delivers
//! the event to one [`crate::sink::Sink`] and returns its receipt.
//!
//! ## Invariants
//! - The content hash is computed once, at construction, over the exact body
//!   that gets delivered; it is never recomputed after delivery.
//! - Delivery failures are never retried here; the best-effort nature of
//!   content-sync (per C8 §4.8) means callers decide whether to re-enqueue.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;
use truth_core::HashDigest;
use truth_core::hash_canonical_json;

use crate::sink::DispatchReceipt;
use crate::sink::DispatchTarget;
use crate::sink::Sink;
use crate::sink::SinkError;

// ============================================================================
// SECTION: Content-Sync Event
// ============================================================================

/// A content-sync event body paired with its canonical content hash.
#[derive(Debug, Clone)]
pub struct ContentSyncEvent {
    /// The JSON body enqueued by the releaser (rule id, release id, change
    /// type, risk tier, confidence).
    pub body: Value,
    /// Canonical-JSON hash of `body`, computed at construction time.
    pub content_hash: HashDigest,
}

impl ContentSyncEvent {
    /// Builds an event from a body, hashing it with `algorithm`.
    ///
    /// # Errors
    ///
    /// Returns [`DispatcherError::Hashing`] when `body` cannot be
    /// canonicalized (non-finite floats, non-string map keys after
    /// normalization).
    pub fn new(body: Value, algorithm: truth_core::HashAlgorithm) -> Result<Self, DispatcherError> {
        let content_hash =
            hash_canonical_json(algorithm, &body).map_err(|err| DispatcherError::Hashing(err.to_string()))?;
        Ok(Self { body, content_hash })
    }
}

// ============================================================================
// SECTION: Dispatcher
// ============================================================================

/// Errors produced while building or dispatching a content-sync event.
#[derive(Debug, Error)]
pub enum DispatcherError {
    /// The event body could not be hashed.
    #[error("failed to hash content-sync event body: {0}")]
    Hashing(String),
    /// The sink failed to deliver the event.
    #[error(transparent)]
    Sink(#[from] SinkError),
}

/// Delivers content-sync events to one destination through one [`Sink`].
pub struct ContentSyncDispatcher {
    /// Delivery mechanism.
    sink: Arc<dyn Sink>,
    /// Destination passed to the sink on every delivery.
    target: DispatchTarget,
}

impl ContentSyncDispatcher {
    /// Creates a dispatcher bound to one sink and target.
    #[must_use]
    pub fn new(sink: Arc<dyn Sink>, target: DispatchTarget) -> Self {
        Self { sink, target }
    }

    /// Hashes `body` and delivers it as a content-sync event.
    ///
    /// # Errors
    ///
    /// Returns [`DispatcherError::Hashing`] if `body` cannot be
    /// canonicalized, or [`DispatcherError::Sink`] if delivery fails.
    pub fn dispatch(&self, body: Value) -> Result<DispatchReceipt, DispatcherError> {
        let event = ContentSyncEvent::new(body, truth_core::DEFAULT_HASH_ALGORITHM)?;
        Ok(self.sink.deliver(&self.target, &event)?)
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::ContentSyncDispatcher;
    use super::ContentSyncEvent;
    use crate::sink::DispatchTarget;
    use crate::sink::LogSink;

    #[test]
    fn content_sync_event_hashes_body_deterministically() {
        let body = json!({"ruleId": "rule-1", "releaseId": "rel-1"});
        let first = ContentSyncEvent::new(body.clone(), truth_core::DEFAULT_HASH_ALGORITHM)
            .expect("hash first body");
        let second = ContentSyncEvent::new(body, truth_core::DEFAULT_HASH_ALGORITHM)
            .expect("hash second body");
        assert_eq!(first.content_hash, second.content_hash);
    }

    #[test]
    fn dispatcher_delivers_through_sink() {
        let sink = LogSink::new(Vec::new());
        let dispatcher = ContentSyncDispatcher::new(std::sync::Arc::new(sink), DispatchTarget::new("audit-log"));
        let receipt = dispatcher
            .dispatch(json!({"ruleId": "rule-2", "releaseId": "rel-2"}))
            .expect("dispatch succeeds");
        assert_eq!(receipt.target.name, "audit-log");
    }
}
