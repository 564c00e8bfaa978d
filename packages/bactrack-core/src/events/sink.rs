//! Single-subscriber event slot.

use std::sync::Arc;

use parking_lot::RwLock;

use super::Event;

/// Receiver of delivered events.
///
/// Implemented for any `Fn(Event) + Send + Sync` closure.
pub trait EventSubscriber: Send + Sync {
    fn on_event(&self, event: Event);
}

impl<F> EventSubscriber for F
where
    F: Fn(Event) + Send + Sync,
{
    fn on_event(&self, event: Event) {
        self(event)
    }
}

/// Holds at most one subscriber at a time.
///
/// `subscribe` replaces the previous subscriber wholesale, `unsubscribe`
/// clears it. Events delivered while the slot is empty are dropped: there is
/// no buffering and no replay for a later subscriber.
///
/// # Thread Safety
///
/// The slot is read on the delivery task and replaced from the command
/// thread; the lock is never held while the subscriber runs.
#[derive(Clone, Default)]
pub struct EventSink {
    subscriber: Arc<RwLock<Option<Arc<dyn EventSubscriber>>>>,
}

impl EventSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs `subscriber`, replacing any previous one.
    pub fn subscribe(&self, subscriber: Arc<dyn EventSubscriber>) {
        let replaced = self.subscriber.write().replace(subscriber).is_some();
        log::debug!("[EventSink] Subscriber installed (replaced: {})", replaced);
    }

    /// Clears the subscriber. Later events are dropped.
    pub fn unsubscribe(&self) {
        if self.subscriber.write().take().is_some() {
            log::debug!("[EventSink] Subscriber cleared");
        }
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscriber.read().is_some()
    }

    /// Hands `event` to the current subscriber.
    ///
    /// Returns `false` when nobody is subscribed and the event was dropped.
    pub fn deliver(&self, event: Event) -> bool {
        let subscriber = self.subscriber.read().clone();
        match subscriber {
            Some(subscriber) => {
                subscriber.on_event(event);
                true
            }
            None => {
                log::trace!("[EventSink] No subscriber, dropping {}", event.state);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;
    use parking_lot::Mutex;

    fn recorder() -> (Arc<Mutex<Vec<Event>>>, Arc<dyn EventSubscriber>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink_seen = Arc::clone(&seen);
        let subscriber: Arc<dyn EventSubscriber> =
            Arc::new(move |event: Event| sink_seen.lock().push(event));
        (seen, subscriber)
    }

    #[test]
    fn drops_events_without_subscriber() {
        let sink = EventSink::new();
        assert!(!sink.deliver(Event::new(EventKind::Start)));
    }

    #[test]
    fn second_subscriber_replaces_first() {
        let sink = EventSink::new();
        let (first, first_sub) = recorder();
        let (second, second_sub) = recorder();

        sink.subscribe(first_sub);
        sink.deliver(Event::new(EventKind::Start));
        sink.subscribe(second_sub);
        sink.deliver(Event::new(EventKind::Analyzing));

        assert_eq!(first.lock().len(), 1);
        assert_eq!(*second.lock(), vec![Event::new(EventKind::Analyzing)]);
    }

    #[test]
    fn unsubscribe_does_not_queue_for_resubscription() {
        let sink = EventSink::new();
        let (seen, subscriber) = recorder();

        sink.subscribe(Arc::clone(&subscriber));
        sink.unsubscribe();
        assert!(!sink.deliver(Event::new(EventKind::Blow)));

        sink.subscribe(subscriber);
        sink.deliver(Event::new(EventKind::Analyzing));
        assert_eq!(*seen.lock(), vec![Event::new(EventKind::Analyzing)]);
    }
}
