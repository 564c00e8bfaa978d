//! Command dispatch.
//!
//! A request is `{ command, args }`. [`Command::parse`] validates the name and
//! arguments; [`CommandDispatcher::execute`] checks the session state and
//! forwards to the vendor handle. Every command returns as soon as the vendor
//! has accepted it. Vendor results arrive later on the event stream and are
//! never correlated with the request that caused them.

use std::sync::Arc;

use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

use crate::context::ContextSlot;
use crate::error::{BridgeError, BridgeResult, ErrorCode};
use crate::protocol_constants::{ARG_API_KEY, ARG_TIMEOUT_MS};
use crate::session::{Session, SessionState, StateCell};
use crate::state::BridgeConfig;
use crate::translator::{CallbackHandle, EventTranslator};
use crate::vendor::{Capability, VendorHandle, VendorSdk};

// ─────────────────────────────────────────────────────────────────────────────
// Wire types
// ─────────────────────────────────────────────────────────────────────────────

/// A command as received from the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandRequest {
    pub command: String,
    /// Argument mapping. Absent or `null` means no arguments.
    #[serde(default)]
    pub args: Value,
}

impl CommandRequest {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            args: Value::Null,
        }
    }

    pub fn with_args(command: impl Into<String>, args: Value) -> Self {
        Self {
            command: command.into(),
            args,
        }
    }
}

/// Immediate result of an accepted command.
///
/// On the wire `Accepted` and `Unsupported` are both `null`; they differ only
/// in that an `Unsupported` request is never followed by an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acknowledgment {
    /// Forwarded to the vendor; any result arrives as an event.
    Accepted,
    /// A boolean reported synchronously (`initialize`, `startCountdown`).
    Flag(bool),
    /// The platform SDK has no such capability.
    Unsupported,
}

impl Serialize for Acknowledgment {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Accepted | Self::Unsupported => serializer.serialize_none(),
            Self::Flag(flag) => serializer.serialize_bool(*flag),
        }
    }
}

impl From<Capability> for Acknowledgment {
    fn from(capability: Capability) -> Self {
        match capability {
            Capability::Requested => Self::Accepted,
            Capability::Unsupported => Self::Unsupported,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Commands
// ─────────────────────────────────────────────────────────────────────────────

/// A validated command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Initialize { api_key: String },
    ConnectToNearestDevice { timeout_ms: Option<u64> },
    Disconnect,
    StartCountdown,
    GetBatteryVoltage,
    GetSerialNumber,
    GetFirmwareVersion,
    GetUseCount,
}

impl Command {
    /// Validates a request.
    ///
    /// # Errors
    ///
    /// `UNKNOWN_COMMAND` for an unrecognized name, `INVALID_ARGS` for a
    /// missing/empty `apiKey` or a `timeoutMs` that is not a non-negative
    /// integer.
    pub fn parse(request: &CommandRequest, config: &BridgeConfig) -> BridgeResult<Self> {
        let args = &request.args;

        let command = match request.command.as_str() {
            "initialize" => {
                let api_key = args
                    .get(ARG_API_KEY)
                    .and_then(Value::as_str)
                    .filter(|key| !key.is_empty())
                    .ok_or_else(|| BridgeError::InvalidArguments("API key required".into()))?;
                Self::Initialize {
                    api_key: api_key.to_owned(),
                }
            }
            "connectToNearestDevice" => Self::ConnectToNearestDevice {
                timeout_ms: parse_timeout(args)?,
            },
            "connectToNearestBreathalyzer" if config.legacy_command_names => {
                Self::ConnectToNearestDevice {
                    timeout_ms: parse_timeout(args)?,
                }
            }
            "disconnect" => Self::Disconnect,
            "startCountdown" => Self::StartCountdown,
            "getBatteryVoltage" => Self::GetBatteryVoltage,
            "getSerialNumber" => Self::GetSerialNumber,
            "getFirmwareVersion" => Self::GetFirmwareVersion,
            "getUseCount" => Self::GetUseCount,
            other => return Err(BridgeError::UnknownCommand(other.to_owned())),
        };

        Ok(command)
    }

    /// Canonical command name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Initialize { .. } => "initialize",
            Self::ConnectToNearestDevice { .. } => "connectToNearestDevice",
            Self::Disconnect => "disconnect",
            Self::StartCountdown => "startCountdown",
            Self::GetBatteryVoltage => "getBatteryVoltage",
            Self::GetSerialNumber => "getSerialNumber",
            Self::GetFirmwareVersion => "getFirmwareVersion",
            Self::GetUseCount => "getUseCount",
        }
    }
}

fn parse_timeout(args: &Value) -> BridgeResult<Option<u64>> {
    match args.get(ARG_TIMEOUT_MS) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value.as_u64().map(Some).ok_or_else(|| {
            BridgeError::InvalidArguments("timeoutMs must be a non-negative integer".into())
        }),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Dispatcher
// ─────────────────────────────────────────────────────────────────────────────

/// Validates commands against the session and forwards them to the vendor.
///
/// Not thread-safe on its own; the bridge serializes access.
pub struct CommandDispatcher {
    session: Session,
    sdk: Arc<dyn VendorSdk>,
    translator: Arc<EventTranslator>,
    host: ContextSlot,
    config: BridgeConfig,
}

impl CommandDispatcher {
    /// `state` must be the cell `translator` updates.
    pub fn new(
        sdk: Arc<dyn VendorSdk>,
        translator: Arc<EventTranslator>,
        state: StateCell,
        host: ContextSlot,
        config: BridgeConfig,
    ) -> Self {
        Self {
            session: Session::new(state),
            sdk,
            translator,
            host,
            config,
        }
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.session.state()
    }

    /// Parses and executes a request.
    pub fn dispatch(&mut self, request: &CommandRequest) -> BridgeResult<Acknowledgment> {
        let result = Command::parse(request, &self.config).and_then(|cmd| self.execute(cmd));
        if let Err(e) = &result {
            log::warn!("[Dispatcher] {} rejected: {} ({})", request.command, e, e.code());
        }
        result
    }

    /// Executes a validated command.
    ///
    /// # Errors
    ///
    /// `NOT_INITIALIZED` when the command needs a handle and none exists,
    /// `NO_CONTEXT` when `initialize` runs without a host context.
    pub fn execute(&mut self, command: Command) -> BridgeResult<Acknowledgment> {
        log::debug!("[Dispatcher] {} in {:?}", command.name(), self.state());

        match command {
            Command::Initialize { api_key } => self.initialize(&api_key),
            Command::ConnectToNearestDevice { timeout_ms } => {
                self.vendor()?;
                self.session.begin_connect();
                self.vendor()?.connect_to_nearest(timeout_ms);
                Ok(Acknowledgment::Accepted)
            }
            Command::Disconnect => {
                self.session.disconnect();
                Ok(Acknowledgment::Accepted)
            }
            Command::StartCountdown => {
                let started = self.vendor()?.start_countdown();
                Ok(Acknowledgment::Flag(started))
            }
            Command::GetBatteryVoltage => Ok(self.vendor()?.request_battery_voltage().into()),
            Command::GetSerialNumber => Ok(self.vendor()?.request_serial_number().into()),
            Command::GetFirmwareVersion => Ok(self.vendor()?.request_firmware_version().into()),
            Command::GetUseCount => Ok(self.vendor()?.request_use_count().into()),
        }
    }

    /// Releases the handle and detaches the host context.
    ///
    /// A torn-down dispatcher rejects `initialize` with `NO_CONTEXT` until a
    /// context is attached again.
    pub fn teardown(&mut self) {
        self.session.teardown();
        if self.host.detach().is_some() {
            log::debug!("[Dispatcher] Host context detached");
        }
    }

    fn initialize(&mut self, api_key: &str) -> BridgeResult<Acknowledgment> {
        let host = self.host.get().ok_or(BridgeError::NoContext)?;

        if let Some(previous) = self.session.api_key() {
            let key = if previous == api_key { "same" } else { "new" };
            log::info!("[Dispatcher] Re-initializing with the {} API key", key);
        }

        // The current handle, if any, is only replaced once the new one exists.
        self.session.begin_initialize();
        let callbacks = CallbackHandle::new(Arc::clone(&self.translator));

        match self.sdk.create_handle(&host, api_key, callbacks) {
            Ok(handle) => {
                self.session.install(api_key, handle);
                log::info!("[Dispatcher] {} SDK initialized", self.sdk.platform());
                Ok(Acknowledgment::Flag(true))
            }
            Err(e) => {
                log::warn!("[Dispatcher] SDK initialization failed: {} ({})", e, e.code());
                self.session.abort_initialize();
                self.translator.emit_local(e.to_event());
                Ok(Acknowledgment::Flag(false))
            }
        }
    }

    fn vendor(&mut self) -> BridgeResult<&mut (dyn VendorHandle + 'static)> {
        self.session
            .handle_mut()
            .ok_or(BridgeError::NotInitialized)
    }
}
