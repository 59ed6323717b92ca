// truth-broker/src/sink/mod.rs
// ============================================================================
// Module: Content-Sync Sinks
// Description: Sink trait and delivery receipt types for content-sync events.
// Purpose: Let a content-sync event be delivered to a configurable
//          destination (log, callback) behind a uniform interface.
// Dependencies: serde, time
// ============================================================================

//! ## Overview
//! A [`Sink`] delivers one [`crate::dispatcher::ContentSyncEvent`] to one
//! [`DispatchTarget`] and returns a [`DispatchReceipt`]. [`ReceiptFactory`]
//! mints receipts with a stable `dispatch_id` so repeated deliveries of the
//! same event to the same dispatcher are distinguishable in logs.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;
use time::OffsetDateTime;

use crate::dispatcher::ContentSyncEvent;

// ============================================================================
// SECTION: Implementations
// ============================================================================

pub mod callback;
pub mod log;

pub use callback::CallbackSink;
pub use log::LogSink;

// ============================================================================
// SECTION: Dispatch Target
// ============================================================================

/// Identifies the destination a content-sync event is delivered to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchTarget {
    /// Destination name (a downstream system identifier or endpoint label).
    pub name: String,
}

impl DispatchTarget {
    /// Creates a new dispatch target.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

// ============================================================================
// SECTION: Dispatch Receipt
// ============================================================================

/// Record of one successful delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchReceipt {
    /// Identifier unique to this delivery attempt.
    pub dispatch_id: String,
    /// Name of the dispatcher (sink) that produced this receipt.
    pub dispatcher: String,
    /// Destination the event was delivered to.
    pub target: DispatchTarget,
    /// Time the delivery was recorded.
    pub dispatched_at: OffsetDateTime,
}

/// Mints [`DispatchReceipt`]s with a stable, monotonically increasing
/// `dispatch_id` for one named dispatcher.
#[derive(Debug)]
pub struct ReceiptFactory {
    /// Name recorded on every minted receipt.
    dispatcher: String,
    /// Per-factory sequence counter.
    sequence: AtomicU64,
}

impl ReceiptFactory {
    /// Creates a receipt factory for the named dispatcher.
    #[must_use]
    pub fn new(dispatcher: impl Into<String>) -> Self {
        Self { dispatcher: dispatcher.into(), sequence: AtomicU64::new(0) }
    }

    /// Mints the next receipt for `target`/`event`.
    #[must_use]
    pub fn next(&self, target: &DispatchTarget, event: &ContentSyncEvent) -> DispatchReceipt {
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
        DispatchReceipt {
            dispatch_id: format!("{}-{}-{sequence:x}", self.dispatcher, event.content_hash.value),
            dispatcher: self.dispatcher.clone(),
            target: target.clone(),
            dispatched_at: OffsetDateTime::now_utc(),
        }
    }
}

// ============================================================================
// SECTION: Sink Errors
// ============================================================================

/// Errors returned by a [`Sink`].
#[derive(Debug, Error)]
pub enum SinkError {
    /// The sink could not deliver the event.
    #[error("sink delivery failed: {0}")]
    DeliveryFailed(String),
    /// The log sink could not write its delivery record.
    #[error("log sink write failed: {0}")]
    LogWriteFailed(String),
}

// ============================================================================
// SECTION: Sink Trait
// ============================================================================

/// Delivers a content-sync event to a destination.
pub trait Sink: Send + Sync {
    /// Delivers `event` to `target`.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError`] when delivery fails.
    fn deliver(&self, target: &DispatchTarget, event: &ContentSyncEvent) -> Result<DispatchReceipt, SinkError>;
}
