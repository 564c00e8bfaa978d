//! Canonical event model and the delivery path to the subscriber.
//!
//! This module provides:
//! - [`Event`] / [`EventKind`]: the one schema both vendor vocabularies map into
//! - [`MeasurementUnit`] and [`DeviceDescriptor`]: values rendered into messages
//! - [`EventEmitter`]: the seam the translator writes into
//! - [`DeliveryQueue`]: the single-consumer executor that serializes delivery
//! - [`EventSink`]: the single-subscriber slot at the end of the path

mod delivery;
mod emitter;
mod sink;

pub use delivery::DeliveryQueue;
pub use emitter::{EventEmitter, LoggingEventEmitter};
pub use sink::{EventSink, EventSubscriber};

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::protocol_constants::UNKNOWN_UNIT;

/// Closed set of canonical event tags.
///
/// The richer vendor vocabulary emits strictly more of these than the poorer
/// one; both map only into this set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EventKind {
    ApiKeyDeclined,
    ApiKeyAuthorized,
    Connected,
    Disconnected,
    ConnectionTimeout,
    FoundBreathalyzer,
    Countdown,
    Start,
    Blow,
    Analyzing,
    Result,
    FirmwareVersion,
    SerialNumber,
    BatteryVoltage,
    BatteryLevel,
    UseCount,
    Units,
    Error,
    BluetoothNotAvailable,
    BluetoothOff,
}

impl EventKind {
    /// Wire name of the tag (`"apiKeyDeclined"`, `"result"`, ...).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ApiKeyDeclined => "apiKeyDeclined",
            Self::ApiKeyAuthorized => "apiKeyAuthorized",
            Self::Connected => "connected",
            Self::Disconnected => "disconnected",
            Self::ConnectionTimeout => "connectionTimeout",
            Self::FoundBreathalyzer => "foundBreathalyzer",
            Self::Countdown => "countdown",
            Self::Start => "start",
            Self::Blow => "blow",
            Self::Analyzing => "analyzing",
            Self::Result => "result",
            Self::FirmwareVersion => "firmwareVersion",
            Self::SerialNumber => "serialNumber",
            Self::BatteryVoltage => "batteryVoltage",
            Self::BatteryLevel => "batteryLevel",
            Self::UseCount => "useCount",
            Self::Units => "units",
            Self::Error => "error",
            Self::BluetoothNotAvailable => "bluetoothNotAvailable",
            Self::BluetoothOff => "bluetoothOff",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical notification record delivered to the subscriber.
///
/// Serializes as `{ "state": <kind>, "message"?: <string> }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub state: EventKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Event {
    /// An event with no message.
    pub fn new(state: EventKind) -> Self {
        Self {
            state,
            message: None,
        }
    }

    /// An event carrying a message.
    pub fn with_message(state: EventKind, message: impl Into<String>) -> Self {
        Self {
            state,
            message: Some(message.into()),
        }
    }

    /// An event whose message is present only if the vendor supplied one.
    pub fn with_optional(state: EventKind, message: Option<String>) -> Self {
        Self { state, message }
    }
}

/// Unit the breathalyzer reports its readings in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MeasurementUnit {
    BacPercent,
    Permille,
    MgPerL,
    MgPerDl,
}

impl MeasurementUnit {
    /// Message string used in a `units` event.
    pub fn as_message(self) -> &'static str {
        match self {
            Self::BacPercent => "BAC%",
            Self::Permille => "permille",
            Self::MgPerL => "mg/L",
            Self::MgPerDl => "mg/dL",
        }
    }

    /// Message for an optional unit; unrecognized codes become `"unknown"`.
    pub fn message_for(unit: Option<Self>) -> &'static str {
        unit.map_or(UNKNOWN_UNIT, Self::as_message)
    }
}

/// A breathalyzer as the vendor describes it during discovery and connect.
///
/// Not an entity in its own right: it only ever travels as the message of a
/// `connected` or `foundBreathalyzer` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceDescriptor {
    pub device_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
}

impl DeviceDescriptor {
    pub fn new(device_type: impl Into<String>) -> Self {
        Self {
            device_type: device_type.into(),
            identifier: None,
        }
    }

    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = Some(identifier.into());
        self
    }
}

impl fmt::Display for DeviceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.identifier {
            Some(id) => write!(f, "{} ({})", self.device_type, id),
            None => f.write_str(&self.device_type),
        }
    }
}
