//! Action shapes accepted by a store.
//!
//! A store accepts either a value that is available right away or a
//! producer that yields values over time. The runtime normalizes both into
//! one ordered sequence of discrete actions.

use crate::error::ProducerError;
use futures::stream::{self, BoxStream};
use futures::{Stream, StreamExt};
use std::fmt;
use std::future::Future;

/// Stream of actions yielded by an asynchronous producer.
///
/// Items are processed in the order they are yielded. The first `Err` ends
/// the producer: nothing after it is taken from the stream.
pub type ActionStream<A> = BoxStream<'static, Result<A, ProducerError>>;

/// An action as dispatched to a store.
///
/// # Examples
///
/// ```
/// use unistore_core::Action;
/// use futures::stream;
///
/// // Any value converts into a synchronous action
/// let now: Action<u32> = 7.into();
/// assert!(!now.is_async());
///
/// // A stream of values becomes an asynchronous action
/// let later = Action::stream(stream::iter([1_u32, 2, 3]));
/// assert!(later.is_async());
/// ```
pub enum Action<A> {
    /// A single, immediately available action
    Sync(A),

    /// A producer of zero or more actions over time
    Async(ActionStream<A>),
}

impl<A> Action<A> {
    /// Build an asynchronous action from an infallible stream
    #[must_use]
    pub fn stream<St>(stream: St) -> Self
    where
        St: Stream<Item = A> + Send + 'static,
        A: Send + 'static,
    {
        Self::Async(stream.map(Ok).boxed())
    }

    /// Build an asynchronous action from a fallible stream
    ///
    /// The first error ends the producer and is reported through the
    /// store's failure hook.
    #[must_use]
    pub fn try_stream<St, E>(stream: St) -> Self
    where
        St: Stream<Item = Result<A, E>> + Send + 'static,
        E: Into<anyhow::Error>,
        A: Send + 'static,
    {
        Self::Async(stream.map(|item| item.map_err(ProducerError::new)).boxed())
    }

    /// Build an asynchronous action that yields exactly one value once
    /// `future` resolves
    #[must_use]
    pub fn future<F>(future: F) -> Self
    where
        F: Future<Output = A> + Send + 'static,
        A: Send + 'static,
    {
        Self::Async(stream::once(future).map(Ok).boxed())
    }

    /// Whether this action is produced asynchronously
    #[must_use]
    pub const fn is_async(&self) -> bool {
        matches!(self, Self::Async(_))
    }
}

impl<A> From<A> for Action<A> {
    fn from(action: A) -> Self {
        Self::Sync(action)
    }
}

impl<A> fmt::Debug for Action<A>
where
    A: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sync(action) => f.debug_tuple("Action::Sync").field(action).finish(),
            Self::Async(_) => write!(f, "Action::Async(<stream>)"),
        }
    }
}
