//! Session and connection state machine.
//!
//! A [`Session`] owns the live vendor handle and the lifecycle state that
//! decides which commands the dispatcher accepts. The state itself lives in a
//! [`StateCell`] because vendor-driven transitions (connected, timeout,
//! disconnected) are observed on the callback path, not the command path.
//!
//! ```text
//! Uninitialized ──initialize──▶ Initializing ──ok──▶ Ready ──connect──▶ Connecting
//!       ▲                            │                 ▲  ▲                │   │
//!       │                          error               │  └──timeout───────┘   │
//!       │                            ▼                 │                       │
//!       └──────────────────── Uninitialized            └──disconnect── Connected
//! ```
//!
//! Teardown returns any state to `Uninitialized`.

use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;

use crate::events::EventKind;
use crate::vendor::VendorHandle;

/// Lifecycle state of a session.
///
/// Variants are ordered: `state >= SessionState::Ready` means a handle
/// exists and handle-requiring commands may proceed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionState {
    #[default]
    Uninitialized,
    /// The vendor handle is being constructed.
    Initializing,
    Ready,
    Connecting,
    Connected,
    /// The vendor dropped a connect attempt before it completed. Accepts the
    /// same commands as `Ready`.
    Disconnected,
}

impl SessionState {
    /// Whether a vendor handle exists in this state.
    pub fn has_handle(self) -> bool {
        self >= Self::Ready
    }

    /// State after the vendor reports `kind`.
    ///
    /// Only connection lifecycle events move the state; everything else
    /// (measurement, metadata, errors) leaves it unchanged. Events arriving
    /// before a handle exists never move it, and `connected` is only honoured
    /// while a connect attempt is outstanding.
    pub fn after_vendor_event(self, kind: EventKind) -> Self {
        if !self.has_handle() {
            return self;
        }
        match (self, kind) {
            (Self::Connecting | Self::Disconnected | Self::Connected, EventKind::Connected) => {
                Self::Connected
            }
            (Self::Connecting, EventKind::ConnectionTimeout) => Self::Ready,
            (Self::Connecting, EventKind::Disconnected) => Self::Disconnected,
            (Self::Connected, EventKind::Disconnected) => Self::Ready,
            (Self::Disconnected, EventKind::ConnectionTimeout) => Self::Ready,
            (state, _) => state,
        }
    }
}

/// Shared cell holding the current [`SessionState`].
///
/// Written by the dispatcher for command-driven transitions and by the
/// translator for vendor-driven ones.
#[derive(Clone, Default)]
pub struct StateCell {
    inner: Arc<RwLock<SessionState>>,
}

impl StateCell {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self) -> SessionState {
        *self.inner.read()
    }

    /// Sets the state, returning the previous one.
    pub fn set(&self, next: SessionState) -> SessionState {
        let mut state = self.inner.write();
        let previous = *state;
        *state = next;
        if previous != next {
            log::debug!("[Session] {:?} -> {:?}", previous, next);
        }
        previous
    }

    /// Applies the transition caused by a vendor event.
    pub fn apply_vendor_event(&self, kind: EventKind) -> SessionState {
        let mut state = self.inner.write();
        let next = state.after_vendor_event(kind);
        if *state != next {
            log::debug!("[Session] {:?} -> {:?} (vendor: {})", *state, next, kind);
            *state = next;
        }
        next
    }
}

/// The live vendor handle plus its lifecycle state.
///
/// Owned exclusively by the command dispatcher; the handle is never exposed
/// outside it.
pub struct Session {
    api_key: Option<String>,
    handle: Option<Box<dyn VendorHandle>>,
    state: StateCell,
}

impl Session {
    pub fn new(state: StateCell) -> Self {
        Self {
            api_key: None,
            handle: None,
            state,
        }
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state.get()
    }

    /// API key of the current handle, if one was constructed.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }

    pub fn handle_mut(&mut self) -> Option<&mut (dyn VendorHandle + 'static)> {
        self.handle.as_deref_mut()
    }

    /// Enters `Initializing` on a first initialization.
    ///
    /// A live handle stays installed, with its state, until its replacement
    /// has been constructed.
    pub fn begin_initialize(&mut self) {
        if self.handle.is_none() {
            self.state.set(SessionState::Initializing);
        }
    }

    /// Disconnects and releases any previous handle, installs `handle` and
    /// moves to `Ready`.
    pub fn install(&mut self, api_key: &str, handle: Box<dyn VendorHandle>) {
        self.release_handle();
        self.api_key = Some(api_key.to_owned());
        self.handle = Some(handle);
        self.state.set(SessionState::Ready);
    }

    /// Undoes [`begin_initialize`](Self::begin_initialize) after a failed
    /// construction. A session that already had a handle is left as it was.
    pub fn abort_initialize(&mut self) {
        if self.handle.is_none() {
            self.api_key = None;
            self.state.set(SessionState::Uninitialized);
        }
    }

    /// `Ready`/`Disconnected` move to `Connecting`; states already connecting
    /// or connected are left alone.
    pub fn begin_connect(&self) {
        let state = self.state.get();
        if matches!(state, SessionState::Ready | SessionState::Disconnected) {
            self.state.set(SessionState::Connecting);
        }
    }

    /// Tears down the vendor connection but keeps the handle.
    ///
    /// Without a handle this is a no-op.
    pub fn disconnect(&mut self) {
        let Some(handle) = self.handle.as_deref_mut() else {
            return;
        };
        handle.disconnect();
        if self.state.get() > SessionState::Ready {
            self.state.set(SessionState::Ready);
        }
    }

    /// Disconnects and releases the handle and returns to `Uninitialized`.
    pub fn teardown(&mut self) {
        self.release_handle();
        self.api_key = None;
        self.state.set(SessionState::Uninitialized);
    }

    fn release_handle(&mut self) {
        if let Some(mut handle) = self.handle.take() {
            handle.disconnect();
            log::debug!("[Session] Vendor handle released");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vendor::Capability;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingHandle {
        disconnects: Arc<AtomicUsize>,
    }

    impl VendorHandle for CountingHandle {
        fn connect_to_nearest(&mut self, _timeout_ms: Option<u64>) {}
        fn disconnect(&mut self) {
            self.disconnects.fetch_add(1, Ordering::SeqCst);
        }
        fn start_countdown(&mut self) -> bool {
            true
        }
        fn request_battery_voltage(&mut self) -> Capability {
            Capability::Requested
        }
        fn request_serial_number(&mut self) -> Capability {
            Capability::Requested
        }
        fn request_firmware_version(&mut self) -> Capability {
            Capability::Requested
        }
        fn request_use_count(&mut self) -> Capability {
            Capability::Requested
        }
    }

    #[test]
    fn vendor_transitions_follow_the_state_machine() {
        let cases = [
            (SessionState::Connecting, EventKind::Connected, SessionState::Connected),
            (SessionState::Connecting, EventKind::ConnectionTimeout, SessionState::Ready),
            (SessionState::Connected, EventKind::Disconnected, SessionState::Ready),
            (SessionState::Connecting, EventKind::Disconnected, SessionState::Disconnected),
            (SessionState::Disconnected, EventKind::Connected, SessionState::Connected),
            (SessionState::Connected, EventKind::Countdown, SessionState::Connected),
            (SessionState::Ready, EventKind::ApiKeyAuthorized, SessionState::Ready),
            (SessionState::Ready, EventKind::Connected, SessionState::Ready),
        ];

        for (from, kind, expected) in cases {
            assert_eq!(from.after_vendor_event(kind), expected, "{:?} + {}", from, kind);
        }
    }

    #[test]
    fn events_without_a_handle_do_not_move_state() {
        assert_eq!(
            SessionState::Uninitialized.after_vendor_event(EventKind::Connected),
            SessionState::Uninitialized
        );
        assert_eq!(
            SessionState::Initializing.after_vendor_event(EventKind::Connected),
            SessionState::Initializing
        );
    }

    #[test]
    fn disconnect_without_handle_is_noop() {
        let mut session = Session::new(StateCell::new());
        session.disconnect();
        assert_eq!(session.state(), SessionState::Uninitialized);
    }

    #[test]
    fn reinitialize_releases_previous_handle_on_install() {
        let disconnects = Arc::new(AtomicUsize::new(0));
        let mut session = Session::new(StateCell::new());

        session.begin_initialize();
        assert_eq!(session.state(), SessionState::Initializing);
        session.install(
            "key-1",
            Box::new(CountingHandle {
                disconnects: Arc::clone(&disconnects),
            }),
        );
        assert_eq!(session.state(), SessionState::Ready);

        session.begin_initialize();
        assert_eq!(disconnects.load(Ordering::SeqCst), 0);
        assert_eq!(session.state(), SessionState::Ready);
        assert!(session.handle_mut().is_some());

        session.install("key-2", Box::<CountingHandle>::default());
        assert_eq!(disconnects.load(Ordering::SeqCst), 1);
        assert_eq!(session.api_key(), Some("key-2"));
        assert_eq!(session.state(), SessionState::Ready);
    }

    #[test]
    fn failed_reinitialize_keeps_live_handle() {
        let disconnects = Arc::new(AtomicUsize::new(0));
        let cell = StateCell::new();
        let mut session = Session::new(cell.clone());
        session.begin_initialize();
        session.install(
            "key",
            Box::new(CountingHandle {
                disconnects: Arc::clone(&disconnects),
            }),
        );
        session.begin_connect();
        cell.apply_vendor_event(EventKind::Connected);

        session.begin_initialize();
        session.abort_initialize();

        assert_eq!(session.state(), SessionState::Connected);
        assert_eq!(session.api_key(), Some("key"));
        assert!(session.handle_mut().is_some());
        assert_eq!(disconnects.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn failed_first_initialize_returns_to_uninitialized() {
        let mut session = Session::new(StateCell::new());
        session.begin_initialize();
        session.abort_initialize();
        assert_eq!(session.state(), SessionState::Uninitialized);
        assert!(session.api_key().is_none());
    }

    #[test]
    fn disconnect_from_connected_returns_to_ready() {
        let cell = StateCell::new();
        let mut session = Session::new(cell.clone());
        session.begin_initialize();
        session.install("key", Box::<CountingHandle>::default());

        session.begin_connect();
        assert_eq!(cell.get(), SessionState::Connecting);
        cell.apply_vendor_event(EventKind::Connected);

        session.disconnect();
        assert_eq!(session.state(), SessionState::Ready);
        assert!(session.handle_mut().is_some());
    }

    #[test]
    fn teardown_returns_to_uninitialized() {
        let mut session = Session::new(StateCell::new());
        session.begin_initialize();
        session.install("key", Box::<CountingHandle>::default());

        session.teardown();
        assert_eq!(session.state(), SessionState::Uninitialized);
        assert!(session.api_key().is_none());
        assert!(session.handle_mut().is_none());
    }
}
