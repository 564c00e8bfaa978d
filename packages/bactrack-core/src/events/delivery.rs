//! Serialized event delivery.
//!
//! The [`DeliveryQueue`] is the one dispatch point every event passes through
//! before reaching the subscriber. Vendor threads push into an unbounded
//! channel; a single consumer task, spawned through a [`TaskSpawner`], pops in
//! arrival order and hands each event to the [`EventSink`].

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};

use super::emitter::EventEmitter;
use super::sink::EventSink;
use super::Event;
use crate::runtime::TaskSpawner;

enum Delivery {
    Event(Event),
    /// Resolves once everything queued before it has been delivered.
    Flush(oneshot::Sender<()>),
}

/// Single-consumer delivery executor.
///
/// Implements [`EventEmitter`]: `emit` never blocks and may be called from
/// any thread. An optional mirror emitter sees each event at enqueue time
/// (used for event logging).
///
/// The subscriber slot is consulted when an event is *delivered*, not when it
/// is queued, so an `unsubscribe` drops everything still in flight.
#[derive(Clone)]
pub struct DeliveryQueue {
    tx: mpsc::UnboundedSender<Delivery>,
    mirror: Option<Arc<dyn EventEmitter>>,
}

impl DeliveryQueue {
    /// Starts the consumer task on `spawner`, delivering into `sink`.
    pub fn start<S: TaskSpawner>(spawner: &S, sink: EventSink) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel();

        spawner.spawn(async move {
            while let Some(item) = rx.recv().await {
                match item {
                    Delivery::Event(event) => {
                        sink.deliver(event);
                    }
                    Delivery::Flush(done) => {
                        let _ = done.send(());
                    }
                }
            }
            log::debug!("[Delivery] Queue closed, consumer exiting");
        });

        Self { tx, mirror: None }
    }

    /// Mirrors every queued event to `emitter` as well.
    pub fn with_mirror(mut self, emitter: Arc<dyn EventEmitter>) -> Self {
        self.mirror = Some(emitter);
        self
    }

    /// Waits until every event queued before this call has been delivered
    /// (or dropped, if nobody is subscribed).
    pub async fn flush(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self.tx.send(Delivery::Flush(done_tx)).is_err() {
            return;
        }
        let _ = done_rx.await;
    }
}

impl EventEmitter for DeliveryQueue {
    fn emit(&self, event: Event) {
        if let Some(mirror) = &self.mirror {
            mirror.emit(event.clone());
        }
        if self.tx.send(Delivery::Event(event)).is_err() {
            log::trace!("[Delivery] Consumer gone, event discarded");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{EventKind, EventSubscriber};
    use crate::runtime::TokioSpawner;
    use parking_lot::Mutex;

    fn recording_sink() -> (EventSink, Arc<Mutex<Vec<Event>>>) {
        let sink = EventSink::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = Arc::clone(&seen);
        let subscriber: Arc<dyn EventSubscriber> =
            Arc::new(move |event: Event| seen_clone.lock().push(event));
        sink.subscribe(subscriber);
        (sink, seen)
    }

    #[tokio::test]
    async fn delivers_in_emit_order() {
        let (sink, seen) = recording_sink();
        let queue = DeliveryQueue::start(&TokioSpawner::current(), sink);

        for n in (1..=3).rev() {
            queue.emit(Event::with_message(EventKind::Countdown, n.to_string()));
        }
        queue.emit(Event::new(EventKind::Start));
        queue.flush().await;

        let messages: Vec<_> = seen
            .lock()
            .iter()
            .map(|e| e.message.clone().unwrap_or_default())
            .collect();
        assert_eq!(messages, vec!["3", "2", "1", ""]);
    }

    #[tokio::test]
    async fn emits_from_foreign_threads_are_all_delivered() {
        let (sink, seen) = recording_sink();
        let queue = DeliveryQueue::start(&TokioSpawner::current(), sink);

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let queue = queue.clone();
                std::thread::spawn(move || {
                    for _ in 0..25 {
                        queue.emit(Event::new(EventKind::Blow));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        queue.flush().await;

        assert_eq!(seen.lock().len(), 100);
    }

    #[tokio::test]
    async fn unsubscribe_drops_events_still_in_flight() {
        let (sink, seen) = recording_sink();
        let queue = DeliveryQueue::start(&TokioSpawner::current(), sink.clone());

        queue.emit(Event::new(EventKind::Analyzing));
        sink.unsubscribe();
        queue.flush().await;

        assert!(seen.lock().is_empty());
    }
}
