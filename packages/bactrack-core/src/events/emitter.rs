//! Event emitter abstraction for decoupling translation from delivery.
//!
//! The translator depends on the [`EventEmitter`] trait rather than on the
//! concrete delivery queue, so tests can record what it produces.

use super::Event;

/// Trait for emitting canonical events without knowledge of transport.
///
/// Implementations must be callable from any thread: vendor SDKs invoke
/// their callbacks on threads of their own choosing.
pub trait EventEmitter: Send + Sync {
    /// Emits one canonical event.
    fn emit(&self, event: Event);
}

/// Logging emitter for debugging and development.
///
/// Logs every event at debug level. Installed as the delivery mirror when
/// `BridgeConfig::log_events` is set.
pub struct LoggingEventEmitter;

impl EventEmitter for LoggingEventEmitter {
    fn emit(&self, event: Event) {
        tracing::debug!(state = %event.state, message = ?event.message, "bactrack_event");
    }
}
