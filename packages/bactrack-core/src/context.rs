//! Host-environment context handed to the vendor SDK.
//!
//! Vendor SDKs need a resource from the embedding host before they can build
//! a handle (an application context on one platform, a registrar on the
//! other). The bridge holds it in a [`ContextSlot`] that is attached when the
//! host registers the bridge and detached on teardown. `initialize` issued
//! while the slot is empty fails with `NO_CONTEXT`.

use std::sync::Arc;

use parking_lot::RwLock;

/// Opaque host resource the vendor SDK is constructed against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostContext {
    label: String,
}

impl HostContext {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }

    /// Human-readable name of the host (for logs and simulations).
    pub fn label(&self) -> &str {
        &self.label
    }
}

/// Shared, replaceable holder for the current [`HostContext`].
#[derive(Clone, Default)]
pub struct ContextSlot {
    inner: Arc<RwLock<Option<HostContext>>>,
}

impl ContextSlot {
    /// A slot holding `context`.
    pub fn attached(context: HostContext) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Some(context))),
        }
    }

    /// An empty slot.
    pub fn detached() -> Self {
        Self::default()
    }

    pub fn attach(&self, context: HostContext) {
        log::debug!("[Context] Attached host '{}'", context.label());
        *self.inner.write() = Some(context);
    }

    /// Clears the slot, returning what it held.
    pub fn detach(&self) -> Option<HostContext> {
        self.inner.write().take()
    }

    /// Returns a copy of the current context, if any.
    #[must_use]
    pub fn get(&self) -> Option<HostContext> {
        self.inner.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detached_slot_is_empty() {
        assert!(ContextSlot::detached().get().is_none());
    }

    #[test]
    fn attach_and_detach_round_trip_through_clones() {
        let slot = ContextSlot::detached();
        let view = slot.clone();

        slot.attach(HostContext::new("test-host"));
        assert_eq!(view.get().unwrap().label(), "test-host");

        assert_eq!(view.detach(), Some(HostContext::new("test-host")));
        assert!(slot.get().is_none());
    }
}
