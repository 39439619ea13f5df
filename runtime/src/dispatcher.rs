//! Action normalization.
//!
//! Every action reaching a store, sync or async, ends up as a sequence of
//! [`Envelope`]s on the store's FIFO queue. Sync actions are queued on the
//! caller's thread. Async actions get a producer task that forwards each
//! yielded value in order and stops at the first error, at the end of the
//! stream, or when the store goes away.

use futures::StreamExt;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, watch};
use unistore_core::{Action, ActionStream, Dispatch, DispatchError, ProducerError};

/// Unit of work for the pipeline
pub(crate) enum Envelope<A> {
    /// One normalized action
    Action(A),
    /// An async producer failed; routed to the middlewares' failure hook
    ProducerFailed(ProducerError),
}

/// Non-owning handle for dispatching into a store
///
/// Obtained from [`Store::dispatcher`](crate::Store::dispatcher), and handed
/// to middlewares as their `&dyn Dispatch`. Cloning is cheap. A dispatcher
/// does not keep the store alive: once the store is dropped every dispatch
/// returns [`DispatchError::StoreDropped`].
///
/// Async producers run on the runtime the store was created in, so a
/// dispatcher can be used from threads outside that runtime.
pub struct Dispatcher<A> {
    queue: mpsc::WeakUnboundedSender<Envelope<A>>,
    shutdown: watch::Receiver<bool>,
    runtime: Handle,
}

impl<A> Clone for Dispatcher<A> {
    fn clone(&self) -> Self {
        Self {
            queue: self.queue.clone(),
            shutdown: self.shutdown.clone(),
            runtime: self.runtime.clone(),
        }
    }
}

impl<A> std::fmt::Debug for Dispatcher<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("store_alive", &(self.queue.strong_count() > 0))
            .finish()
    }
}

impl<A> Dispatcher<A>
where
    A: Send + 'static,
{
    pub(crate) const fn new(
        queue: mpsc::WeakUnboundedSender<Envelope<A>>,
        shutdown: watch::Receiver<bool>,
        runtime: Handle,
    ) -> Self {
        Self {
            queue,
            shutdown,
            runtime,
        }
    }

    /// Queue an action, or start the producer task for an async one
    pub(crate) fn submit(&self, action: Action<A>) -> Result<(), DispatchError> {
        let queue = self.queue.upgrade().ok_or(DispatchError::StoreDropped)?;

        match action {
            Action::Sync(action) => {
                tracing::trace!("Queueing sync action");
                queue
                    .send(Envelope::Action(action))
                    .map_err(|_| DispatchError::PipelineStopped)
            },
            Action::Async(stream) => {
                if queue.is_closed() {
                    return Err(DispatchError::PipelineStopped);
                }
                tracing::trace!("Spawning producer for async action");
                self.runtime
                    .spawn(forward(stream, self.queue.clone(), self.shutdown.clone()));
                Ok(())
            },
        }
    }

    /// Whether the store behind this handle still exists
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.queue.strong_count() > 0
    }
}

impl<A> Dispatch<A> for Dispatcher<A>
where
    A: Send + 'static,
{
    fn dispatch(&self, action: Action<A>) -> Result<(), DispatchError> {
        self.submit(action)
    }
}

/// Drive one async action, forwarding its values to the queue in order
async fn forward<A>(
    mut stream: ActionStream<A>,
    queue: mpsc::WeakUnboundedSender<Envelope<A>>,
    mut shutdown: watch::Receiver<bool>,
) where
    A: Send + 'static,
{
    let mut forwarded = 0_u64;

    loop {
        let item = tokio::select! {
            item = stream.next() => item,
            // Fires on an explicit shutdown and when the store is dropped
            _ = shutdown.changed() => {
                tracing::debug!(forwarded, "Producer stopped by store shutdown");
                return;
            }
        };

        let Some(item) = item else {
            tracing::trace!(forwarded, "Producer completed");
            return;
        };

        let Some(queue) = queue.upgrade() else {
            tracing::debug!(forwarded, "Store dropped, abandoning producer");
            return;
        };

        let envelope = match item {
            Ok(action) => Envelope::Action(action),
            Err(error) => {
                tracing::warn!(%error, forwarded, "Async action producer failed");
                metrics::counter!("store.producer.failures").increment(1);
                let _ = queue.send(Envelope::ProducerFailed(error));
                return;
            },
        };

        if queue.send(envelope).is_err() {
            tracing::debug!(forwarded, "Pipeline stopped, abandoning producer");
            return;
        }
        forwarded += 1;
    }
}
