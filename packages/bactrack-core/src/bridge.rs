//! The bridge instance a host talks to.
//!
//! [`BactrackBridge`] owns one of everything: the dispatcher (and through it
//! the session), the translator, the delivery queue and the subscriber slot.
//! There is no process-global state; two bridges are fully independent.
//!
//! ```text
//! host ──CommandRequest──▶ CommandDispatcher ──▶ VendorHandle
//!                                                    │ (any thread)
//!                                                    ▼
//! subscriber ◀── EventSink ◀── DeliveryQueue ◀── EventTranslator
//! ```

use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;

use crate::context::{ContextSlot, HostContext};
use crate::dispatcher::{Acknowledgment, CommandDispatcher, CommandRequest};
use crate::error::BridgeResult;
use crate::events::{DeliveryQueue, EventEmitter, EventSink, EventSubscriber, LoggingEventEmitter};
use crate::runtime::TaskSpawner;
use crate::session::{SessionState, StateCell};
use crate::state::BridgeConfig;
use crate::translator::EventTranslator;
use crate::vendor::VendorSdk;

/// Command/event bridge over one vendor SDK.
pub struct BactrackBridge {
    dispatcher: Mutex<CommandDispatcher>,
    sink: EventSink,
    delivery: DeliveryQueue,
    host: ContextSlot,
}

impl BactrackBridge {
    /// Creates a bridge and starts its delivery consumer on `spawner`.
    ///
    /// `host` is the context `initialize` constructs the vendor handle
    /// against; without one, `initialize` fails with `NO_CONTEXT` until
    /// [`attach_context`](Self::attach_context) is called.
    pub fn new<S: TaskSpawner>(
        sdk: Arc<dyn VendorSdk>,
        host: Option<HostContext>,
        spawner: &S,
        config: BridgeConfig,
    ) -> Self {
        let sink = EventSink::new();
        let mut delivery = DeliveryQueue::start(spawner, sink.clone());
        if config.log_events {
            delivery = delivery.with_mirror(Arc::new(LoggingEventEmitter));
        }

        let host = host.map_or_else(ContextSlot::detached, ContextSlot::attached);
        let state = StateCell::new();
        let emitter: Arc<dyn EventEmitter> = Arc::new(delivery.clone());
        let translator = Arc::new(EventTranslator::new(state.clone(), emitter));

        log::info!("[Bridge] Created for {} SDK", sdk.platform());

        Self {
            dispatcher: Mutex::new(CommandDispatcher::new(
                sdk,
                translator,
                state,
                host.clone(),
                config,
            )),
            sink,
            delivery,
            host,
        }
    }

    /// Executes one request and returns its immediate acknowledgment.
    ///
    /// Requests are serialized; this never waits on the vendor.
    pub fn handle(&self, request: &CommandRequest) -> BridgeResult<Acknowledgment> {
        self.dispatcher.lock().dispatch(request)
    }

    /// Shorthand for [`handle`](Self::handle) with a command name and args.
    pub fn call(&self, command: &str, args: Value) -> BridgeResult<Acknowledgment> {
        self.handle(&CommandRequest::with_args(command, args))
    }

    /// Installs the event subscriber, replacing any previous one.
    pub fn subscribe<H>(&self, handler: H)
    where
        H: EventSubscriber + 'static,
    {
        self.sink.subscribe(Arc::new(handler));
    }

    /// Removes the subscriber; events are dropped until the next subscribe.
    pub fn unsubscribe(&self) {
        self.sink.unsubscribe();
    }

    pub fn is_subscribed(&self) -> bool {
        self.sink.is_subscribed()
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.dispatcher.lock().state()
    }

    /// Attaches (or replaces) the host context.
    pub fn attach_context(&self, context: HostContext) {
        self.host.attach(context);
    }

    /// Waits until every event queued so far has been delivered or dropped.
    pub async fn flush(&self) {
        self.delivery.flush().await;
    }

    /// Clears the subscriber, releases the vendor handle, resets the session
    /// and detaches the host context.
    pub fn teardown(&self) {
        self.sink.unsubscribe();
        self.dispatcher.lock().teardown();
        log::info!("[Bridge] Torn down");
    }
}
