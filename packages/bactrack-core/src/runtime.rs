//! Execution contexts for event delivery.
//!
//! The delivery consumer is the only background task the bridge runs. It is
//! spawned through [`TaskSpawner`] so the embedding host decides where events
//! are delivered:
//!
//! - [`TokioSpawner`]: on a runtime the host already owns
//! - [`DeliveryRuntime`]: on one dedicated OS thread owned by the bridge,
//!   for hosts whose command thread is not async

use std::future::Future;
use std::sync::mpsc as std_mpsc;
use std::thread::{self, JoinHandle};

use tokio::runtime::{Builder, Handle};
use tokio_util::sync::CancellationToken;

/// Name of the dedicated delivery thread.
pub const DELIVERY_THREAD_NAME: &str = "bactrack-delivery";

/// Abstraction for spawning background tasks.
///
/// # Example
///
/// ```ignore
/// let queue = DeliveryQueue::start(&TokioSpawner::current(), sink);
/// ```
pub trait TaskSpawner: Send + Sync {
    /// Spawns a future as a background task.
    ///
    /// The task runs independently of the caller. The spawner does not
    /// provide a way to cancel or join it.
    fn spawn<F>(&self, future: F)
    where
        F: Future<Output = ()> + Send + 'static;
}

/// Spawner backed by an existing Tokio runtime.
#[derive(Clone)]
pub struct TokioSpawner {
    handle: Handle,
}

impl TokioSpawner {
    #[must_use]
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Uses the current runtime's handle.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime context.
    #[must_use]
    pub fn current() -> Self {
        Self {
            handle: Handle::current(),
        }
    }
}

impl TaskSpawner for TokioSpawner {
    fn spawn<F>(&self, future: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.handle.spawn(future);
    }
}

/// A single-threaded runtime on its own OS thread.
///
/// Everything spawned here runs on [`DELIVERY_THREAD_NAME`], so a subscriber
/// attached through it always observes events from that one thread.
pub struct DeliveryRuntime {
    handle: Handle,
    cancel: CancellationToken,
    thread: Option<JoinHandle<()>>,
}

impl DeliveryRuntime {
    /// Starts the delivery thread and waits until its runtime is ready.
    ///
    /// # Errors
    ///
    /// Returns an error if the thread cannot be spawned or the runtime fails
    /// to build.
    pub fn new() -> std::io::Result<Self> {
        let (tx, rx) = std_mpsc::channel();
        let cancel = CancellationToken::new();
        let cancel_clone = cancel.clone();

        let thread = thread::Builder::new()
            .name(DELIVERY_THREAD_NAME.into())
            .spawn(move || {
                let runtime = match Builder::new_current_thread().enable_all().build() {
                    Ok(runtime) => runtime,
                    Err(e) => {
                        let _ = tx.send(Err(e));
                        return;
                    }
                };

                if tx.send(Ok(runtime.handle().clone())).is_err() {
                    log::error!("[Runtime] Delivery runtime handle was not received");
                    return;
                }

                runtime.block_on(cancel_clone.cancelled());
                log::debug!("[Runtime] Delivery runtime stopped");
            })?;

        let handle = rx
            .recv()
            .map_err(|_| std::io::Error::other("delivery thread exited before start"))??;

        log::info!("[Runtime] Delivery runtime started on '{}'", DELIVERY_THREAD_NAME);

        Ok(Self {
            handle,
            cancel,
            thread: Some(thread),
        })
    }

    /// Stops the runtime and joins its thread.
    ///
    /// Tasks still pending are dropped.
    pub fn shutdown(&mut self) {
        self.cancel.cancel();

        if let Some(thread) = self.thread.take() {
            if let Err(e) = thread.join() {
                log::error!("[Runtime] Delivery thread panicked: {:?}", e);
            }
        }
    }
}

impl TaskSpawner for DeliveryRuntime {
    fn spawn<F>(&self, future: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.handle.spawn(future);
    }
}

impl Drop for DeliveryRuntime {
    fn drop(&mut self) {
        if self.thread.is_some() {
            self.shutdown();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn tokio_spawner_runs_on_the_given_handle() {
        let spawner = TokioSpawner::new(Handle::current());
        let (tx, rx) = tokio::sync::oneshot::channel();

        spawner.spawn(async move {
            let _ = tx.send(7u8);
        });

        let value = tokio::time::timeout(Duration::from_secs(1), rx).await;
        assert_eq!(value.ok().and_then(Result::ok), Some(7));
    }

    #[test]
    fn delivery_runtime_runs_tasks_on_its_own_thread() {
        let mut runtime = DeliveryRuntime::new().unwrap();
        let (tx, rx) = std_mpsc::channel();

        runtime.spawn(async move {
            let name = thread::current().name().map(str::to_owned);
            let _ = tx.send(name);
        });

        let name = rx.recv_timeout(Duration::from_secs(1)).unwrap();
        assert_eq!(name.as_deref(), Some(DELIVERY_THREAD_NAME));

        runtime.shutdown();
    }
}
