//! Fixed protocol constants that should NOT be changed.
//!
//! These values are part of the contract host applications already depend on
//! (channel names, message formats) and changing them breaks existing callers.

// ─────────────────────────────────────────────────────────────────────────────
// Host Channels
// ─────────────────────────────────────────────────────────────────────────────

/// Name of the request/acknowledgment channel.
pub const METHOD_CHANNEL: &str = "bactrack_flutter";

/// Name of the event stream channel.
pub const EVENT_CHANNEL: &str = "bactrack_flutter/events";

// ─────────────────────────────────────────────────────────────────────────────
// Event Message Formats
// ─────────────────────────────────────────────────────────────────────────────

/// Fractional digits in a `result` event message (`0.0821`).
pub const BAC_FRACTION_DIGITS: usize = 4;

/// Message used when a vendor unit code is not one we recognize.
pub const UNKNOWN_UNIT: &str = "unknown";

/// Message used when the vendor reports a failure without describing it.
pub const UNKNOWN_ERROR_MESSAGE: &str = "Unknown error";

/// Message for a countdown the vendor could not execute.
pub const COUNTDOWN_FAILURE_MESSAGE: &str = "Countdown execution failure";

// ─────────────────────────────────────────────────────────────────────────────
// Command Arguments
// ─────────────────────────────────────────────────────────────────────────────

/// Argument key carrying the API key for `initialize`.
pub const ARG_API_KEY: &str = "apiKey";

/// Argument key carrying the optional discovery timeout.
pub const ARG_TIMEOUT_MS: &str = "timeoutMs";
