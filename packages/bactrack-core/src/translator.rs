//! Vendor callback translation.
//!
//! [`EventTranslator`] sits between the vendor SDK and the delivery queue.
//! Each native callback becomes exactly one [`Event`]; connection lifecycle
//! events also drive the session state before the event is queued, so a
//! subscriber that sees `connected` can rely on the bridge already being in
//! `Connected`.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::events::{Event, EventEmitter};
use crate::protocol_constants::BAC_FRACTION_DIGITS;
use crate::session::{SessionState, StateCell};
use crate::vendor::VendorCallback;

// ─────────────────────────────────────────────────────────────────────────────
// Number rendering
// ─────────────────────────────────────────────────────────────────────────────

/// Formats a BAC reading with exactly four fractional digits.
pub fn format_bac(value: f64) -> String {
    format!("{:.*}", BAC_FRACTION_DIGITS, value)
}

/// Shortest decimal form; whole numbers carry no fraction (`3.0` -> `"3"`).
pub fn decimal_string(value: f64) -> String {
    format!("{}", value)
}

/// Text of a single-precision float as the JVM prints it.
///
/// Magnitudes in `[1e-3, 1e7)` and zero use plain decimal with at least one
/// fractional digit (`1.0` -> `"1.0"`); everything else uses an `E` exponent
/// with the same mantissa rule (`1e-4` -> `"1.0E-4"`).
pub fn java_float_string(value: f32) -> String {
    if value.is_nan() {
        return "NaN".into();
    }
    if value.is_infinite() {
        return if value > 0.0 { "Infinity" } else { "-Infinity" }.into();
    }

    let magnitude = value.abs();
    if value == 0.0 || (1e-3..1e7).contains(&magnitude) {
        let text = format!("{}", value);
        return if text.contains('.') {
            text
        } else {
            format!("{}.0", text)
        };
    }

    let text = format!("{:e}", value);
    match text.split_once('e') {
        Some((mantissa, exponent)) if mantissa.contains('.') => {
            format!("{}E{}", mantissa, exponent)
        }
        Some((mantissa, exponent)) => format!("{}.0E{}", mantissa, exponent),
        None => text,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Translator
// ─────────────────────────────────────────────────────────────────────────────

/// Turns vendor callbacks into canonical events and queues them.
pub struct EventTranslator {
    state: StateCell,
    emitter: Arc<dyn EventEmitter>,
    /// Held across state update + enqueue so concurrent callbacks cannot
    /// interleave the two.
    order: Mutex<()>,
}

impl EventTranslator {
    pub fn new(state: StateCell, emitter: Arc<dyn EventEmitter>) -> Self {
        Self {
            state,
            emitter,
            order: Mutex::new(()),
        }
    }

    /// Translates one callback, applies its state transition and queues the
    /// resulting event. Returns the session state afterwards.
    pub fn on_callback(&self, callback: VendorCallback) -> SessionState {
        let event = Event::from(callback);
        let _guard = self.order.lock();
        let state = self.state.apply_vendor_event(event.state);
        log::trace!("[Translator] {} -> {:?}", event.state, state);
        self.emitter.emit(event);
        state
    }

    /// Queues an event produced by the bridge itself (categorized
    /// initialization failures). Does not touch the session state.
    pub fn emit_local(&self, event: Event) {
        let _guard = self.order.lock();
        self.emitter.emit(event);
    }
}

/// Cloneable entry point handed to the vendor SDK.
///
/// `send` may be called from any thread at any time, including after the
/// session that created it was torn down; those late events are dropped at
/// delivery if nobody is subscribed.
#[derive(Clone)]
pub struct CallbackHandle {
    translator: Arc<EventTranslator>,
}

impl CallbackHandle {
    pub fn new(translator: Arc<EventTranslator>) -> Self {
        Self { translator }
    }

    pub fn send(&self, callback: impl Into<VendorCallback>) {
        self.translator.on_callback(callback.into());
    }
}
