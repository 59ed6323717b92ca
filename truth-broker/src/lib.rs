// truth-broker/src/lib.rs
// ============================================================================
// Module: Truth Broker Library
// Description: Content-sync event type and delivery sinks for best-effort
//              downstream sync of cut releases.
// Purpose: Let the releaser's "content-sync" queue jobs be hashed and
//          delivered through a configurable sink.
// Dependencies: serde, serde_json, thiserror, time, truth-core
// ============================================================================

//! ## Overview
//! Truth Broker provides the delivery half of C8's best-effort content-sync
//! emission: [`dispatcher::ContentSyncEvent`] wraps a content-sync job body
//! with its canonical content hash, and [`dispatcher::ContentSyncDispatcher`]
//! delivers it through a [`sink::Sink`] ([`sink::LogSink`] or
//! [`sink::CallbackSink`]).

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod dispatcher;
pub mod sink;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use dispatcher::ContentSyncDispatcher;
pub use dispatcher::ContentSyncEvent;
pub use dispatcher::DispatcherError;
pub use sink::CallbackSink;
pub use sink::DispatchReceipt;
pub use sink::DispatchTarget;
pub use sink::LogSink;
pub use sink::ReceiptFactory;
pub use sink::Sink;
pub use sink::SinkError;
