//! The single holder of a store's current state.
//!
//! The cell keeps the latest published value and fans every publish out to
//! subscribers over a bounded broadcast channel. Subscribing and publishing
//! are mutually exclusive, so a new subscriber gets the current value plus
//! every later publish with no gap and no duplicate.

use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::broadcast;

/// A publish as seen by subscribers; `None` while the state is absent
pub type Published<S> = Option<Arc<S>>;

struct Slot<S> {
    value: Published<S>,
    /// `None` once the cell is closed
    notify: Option<broadcast::Sender<Published<S>>>,
}

/// Latest-value state holder with replay for late subscribers
///
/// Every [`publish`](Self::publish) notifies every live subscriber, even when
/// the new value equals the old one. Deduplication belongs to projections.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use unistore_runtime::StateCell;
///
/// let cell = StateCell::new(8);
/// assert!(cell.current().is_none());
///
/// cell.publish(Some(Arc::new(1)));
/// let (current, updates) = cell.subscribe();
/// assert_eq!(current.as_deref(), Some(&1));
///
/// cell.publish(Some(Arc::new(2)));
/// let next = updates.unwrap().try_recv().unwrap();
/// assert_eq!(next.as_deref(), Some(&2));
/// ```
pub struct StateCell<S> {
    slot: RwLock<Slot<S>>,
}

impl<S> StateCell<S> {
    /// Create an empty cell
    ///
    /// `capacity` is the number of publishes buffered per subscriber before
    /// a lagging subscriber starts missing the oldest ones.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (notify, _) = broadcast::channel(capacity);
        Self {
            slot: RwLock::new(Slot {
                value: None,
                notify: Some(notify),
            }),
        }
    }

    /// The latest published value
    #[must_use]
    pub fn current(&self) -> Published<S> {
        self.slot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .value
            .clone()
    }

    /// Store `value` and notify every subscriber
    ///
    /// Returns the number of subscribers notified. After [`close`](Self::close)
    /// the value is still stored but nobody is notified.
    pub fn publish(&self, value: Published<S>) -> usize {
        let mut slot = self.slot.write().unwrap_or_else(PoisonError::into_inner);
        slot.value.clone_from(&value);

        // A send error only means there are no subscribers right now
        slot.notify
            .as_ref()
            .and_then(|notify| notify.send(value).ok())
            .unwrap_or(0)
    }

    /// Subscribe to future publishes
    ///
    /// Returns the current value together with a receiver for every publish
    /// after it. The receiver is `None` if the cell has been closed.
    #[must_use]
    pub fn subscribe(&self) -> (Published<S>, Option<broadcast::Receiver<Published<S>>>) {
        let slot = self.slot.read().unwrap_or_else(PoisonError::into_inner);
        let updates = slot.notify.as_ref().map(broadcast::Sender::subscribe);
        (slot.value.clone(), updates)
    }

    /// Number of live subscribers
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.slot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .notify
            .as_ref()
            .map_or(0, broadcast::Sender::receiver_count)
    }

    /// Stop notifying subscribers
    ///
    /// Existing receivers drain what is already buffered and then observe
    /// the channel as closed.
    pub fn close(&self) {
        self.slot
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .notify = None;
    }

    /// Whether [`close`](Self::close) has been called
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.slot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .notify
            .is_none()
    }
}
