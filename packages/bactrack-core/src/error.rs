//! Centralized error types for the bridge.
//!
//! Two failure channels exist and are deliberately kept apart:
//! - [`BridgeError`]: synchronous dispatch errors returned from a command call
//! - [`VendorInitError`]: categorized vendor failures, reported as events
//!
//! A failure is surfaced through exactly one of them, never both.

use serde::Serialize;
use thiserror::Error;

use crate::events::{Event, EventKind};
use crate::protocol_constants::UNKNOWN_ERROR_MESSAGE;

/// Trait for error types that provide machine-readable error codes.
pub trait ErrorCode {
    /// Returns a machine-readable error code.
    fn code(&self) -> &'static str;
}

/// Synchronous error returned from a command call.
///
/// Each variant carries a human-readable message and no structured payload.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BridgeError {
    /// A required argument is missing or malformed.
    #[error("{0}")]
    InvalidArguments(String),

    /// The command needs a vendor handle and none exists yet.
    #[error("SDK not initialized")]
    NotInitialized,

    /// The host-environment resource the vendor SDK needs is unavailable.
    #[error("Application context not available")]
    NoContext,

    /// The command name is not recognized.
    #[error("Unknown command: {0}")]
    UnknownCommand(String),
}

impl ErrorCode for BridgeError {
    fn code(&self) -> &'static str {
        match self {
            Self::InvalidArguments(_) => "INVALID_ARGS",
            Self::NotInitialized => "NOT_INITIALIZED",
            Self::NoContext => "NO_CONTEXT",
            Self::UnknownCommand(_) => "UNKNOWN_COMMAND",
        }
    }
}

/// Wire body for a synchronous error: `{ code, message }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
}

impl From<&BridgeError> for ErrorBody {
    fn from(err: &BridgeError) -> Self {
        Self {
            code: err.code(),
            message: err.to_string(),
        }
    }
}

/// Categorized failure raised while constructing the vendor handle.
///
/// These never fail the `initialize` call itself; the dispatcher turns them
/// into a single event via [`VendorInitError::to_event`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VendorInitError {
    /// The device radio does not support Bluetooth LE.
    #[error("Bluetooth LE not supported")]
    BluetoothLeNotSupported,

    /// Bluetooth is supported but switched off.
    #[error("Bluetooth is not enabled")]
    BluetoothNotEnabled,

    /// The platform requires location services for BLE scanning.
    #[error("Location services not enabled")]
    LocationServicesNotEnabled,

    /// Any other SDK-internal failure, with the SDK's message if it gave one.
    #[error("{}", .0.as_deref().unwrap_or(UNKNOWN_ERROR_MESSAGE))]
    Sdk(Option<String>),
}

impl VendorInitError {
    /// The event kind this failure is reported as.
    pub fn event_kind(&self) -> EventKind {
        match self {
            Self::BluetoothLeNotSupported => EventKind::BluetoothNotAvailable,
            Self::BluetoothNotEnabled => EventKind::BluetoothOff,
            Self::LocationServicesNotEnabled | Self::Sdk(_) => EventKind::Error,
        }
    }

    /// Builds the categorized event delivered in place of a call failure.
    pub fn to_event(&self) -> Event {
        Event::with_message(self.event_kind(), self.to_string())
    }
}

impl ErrorCode for VendorInitError {
    fn code(&self) -> &'static str {
        match self {
            Self::BluetoothLeNotSupported => "bluetooth_le_not_supported",
            Self::BluetoothNotEnabled => "bluetooth_not_enabled",
            Self::LocationServicesNotEnabled => "location_services_not_enabled",
            Self::Sdk(_) => "sdk_error",
        }
    }
}

/// Convenient Result alias for dispatch operations.
pub type BridgeResult<T> = Result<T, BridgeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bridge_errors_expose_wire_codes() {
        assert_eq!(
            BridgeError::InvalidArguments("x".into()).code(),
            "INVALID_ARGS"
        );
        assert_eq!(BridgeError::NotInitialized.code(), "NOT_INITIALIZED");
        assert_eq!(BridgeError::NoContext.code(), "NO_CONTEXT");
        assert_eq!(
            BridgeError::UnknownCommand("fly".into()).code(),
            "UNKNOWN_COMMAND"
        );
    }

    #[test]
    fn error_body_carries_message_only() {
        let body = ErrorBody::from(&BridgeError::NotInitialized);
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "code": "NOT_INITIALIZED", "message": "SDK not initialized" })
        );
    }

    #[test]
    fn radio_off_is_reported_as_bluetooth_off() {
        let event = VendorInitError::BluetoothNotEnabled.to_event();
        assert_eq!(event.state, EventKind::BluetoothOff);
        assert_eq!(event.message.as_deref(), Some("Bluetooth is not enabled"));
    }

    #[test]
    fn sdk_error_without_message_falls_back() {
        let event = VendorInitError::Sdk(None).to_event();
        assert_eq!(event.state, EventKind::Error);
        assert_eq!(event.message.as_deref(), Some("Unknown error"));

        let event = VendorInitError::LocationServicesNotEnabled.to_event();
        assert_eq!(event.state, EventKind::Error);
        assert_eq!(
            event.message.as_deref(),
            Some("Location services not enabled")
        );
    }
}
