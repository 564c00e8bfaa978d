//! BACtrack Core - platform-neutral bridge over the BACtrack breathalyzer SDKs.
//!
//! The vendor SDK exists separately for two host platforms with different
//! callback vocabularies. This crate puts one command/event interface in
//! front of either: callers issue named commands and receive a single stream
//! of canonical events, whichever SDK sits underneath.
//!
//! # Architecture
//!
//! - [`dispatcher`]: command validation and forwarding to the vendor handle
//! - [`session`]: the session state machine that decides which commands run
//! - [`translator`]: vendor callbacks to canonical [`Event`]s
//! - [`events`]: event model, serialized delivery and the subscriber slot
//! - [`vendor`]: the SDK seam, both callback vocabularies and a simulator
//! - [`bridge`]: the instance tying it all together
//! - [`runtime`]: where the delivery task runs
//! - [`error`]: dispatch errors and categorized vendor failures
//!
//! # Abstraction Traits
//!
//! - [`VendorSdk`](vendor::VendorSdk) / [`VendorHandle`](vendor::VendorHandle): the proprietary SDK
//! - [`TaskSpawner`](runtime::TaskSpawner): spawning the delivery consumer
//! - [`EventEmitter`](events::EventEmitter): the translator's output
//! - [`EventSubscriber`](events::EventSubscriber): the host's event handler

#![allow(missing_docs)]
#![warn(clippy::all)]

pub mod bridge;
pub mod context;
pub mod dispatcher;
pub mod error;
pub mod events;
pub mod protocol_constants;
pub mod runtime;
pub mod session;
pub mod state;
pub mod translator;
pub mod vendor;

// Re-export commonly used types at the crate root
pub use bridge::BactrackBridge;
pub use context::{ContextSlot, HostContext};
pub use dispatcher::{Acknowledgment, Command, CommandDispatcher, CommandRequest};
pub use error::{BridgeError, BridgeResult, ErrorBody, ErrorCode, VendorInitError};
pub use events::{
    DeliveryQueue, DeviceDescriptor, Event, EventEmitter, EventKind, EventSink, EventSubscriber,
    LoggingEventEmitter, MeasurementUnit,
};
pub use runtime::{DeliveryRuntime, TaskSpawner, TokioSpawner};
pub use session::{Session, SessionState, StateCell};
pub use state::BridgeConfig;
pub use translator::{CallbackHandle, EventTranslator};
pub use vendor::{
    AndroidCallback, AndroidUnit, Capability, IosBreathalyzer, IosCallback, Platform,
    VendorCallback, VendorHandle, VendorSdk,
};

// Re-export the simulator
pub use vendor::sim::{DeviceProfile, InitOutcome, SimCall, SimulatedDevice, SimulatedSdk};
