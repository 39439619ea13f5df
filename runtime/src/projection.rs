//! Live, read-only views of store state.
//!
//! A [`Projection`] is a [`Stream`] of values derived from the state by a
//! projector function. It never yields for the absent state, starts with the
//! current state if there is one, and follows every publish after that.
//! Dropping the stream unsubscribes.

use crate::cell::Published;
use futures::stream::{self, BoxStream};
use futures::{Stream, StreamExt};
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::broadcast::{self, error::RecvError};

/// Live stream of a projected sub-state
///
/// Created by [`Store::observe`](crate::Store::observe) and its
/// deduplicating variants. A projection buffers a bounded number of
/// publishes; if the consumer falls further behind, the oldest ones are
/// skipped and a warning is logged. The store is never blocked by a slow
/// or idle projection.
///
/// The stream ends when the store is dropped or shut down.
pub struct Projection<T> {
    inner: BoxStream<'static, T>,
}

impl<T> Projection<T>
where
    T: Send + 'static,
{
    pub(crate) fn new<S, F>(
        current: Published<S>,
        updates: Option<broadcast::Receiver<Published<S>>>,
        projector: F,
    ) -> Self
    where
        S: Send + Sync + 'static,
        F: Fn(&S) -> T + Send + 'static,
    {
        let Some(mut updates) = updates else {
            // Store already torn down
            return Self {
                inner: stream::empty().boxed(),
            };
        };

        let inner = async_stream::stream! {
            if let Some(state) = current {
                yield projector(&state);
            }

            loop {
                match updates.recv().await {
                    Ok(Some(state)) => {
                        yield projector(&state);
                    },
                    Ok(None) => {},
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Projection lagged, {} states skipped", skipped);
                        metrics::counter!("store.projection.lagged").increment(skipped);
                    },
                    Err(RecvError::Closed) => break,
                }
            }
        };

        Self {
            inner: inner.boxed(),
        }
    }

    /// Suppress consecutive values that `eq` considers equal
    #[must_use]
    pub fn distinct_by<E>(self, eq: E) -> Self
    where
        E: Fn(&T, &T) -> bool + Send + 'static,
        T: Clone,
    {
        let mut last: Option<T> = None;

        let inner = self.inner.filter_map(move |value| {
            let changed = last.as_ref().is_none_or(|previous| !eq(previous, &value));
            if changed {
                last = Some(value.clone());
            }
            futures::future::ready(changed.then_some(value))
        });

        Self {
            inner: inner.boxed(),
        }
    }

    /// Suppress consecutive equal values
    #[must_use]
    pub fn distinct(self) -> Self
    where
        T: PartialEq + Clone,
    {
        self.distinct_by(T::eq)
    }
}

impl<T> Stream for Projection<T> {
    type Item = T;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        self.inner.poll_next_unpin(cx)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<T> std::fmt::Debug for Projection<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Projection").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::cell::StateCell;
    use std::sync::Arc;

    fn publish_all(cell: &StateCell<u32>, values: &[u32]) {
        for value in values {
            cell.publish(Some(Arc::new(*value)));
        }
    }

    #[tokio::test]
    async fn test_skips_absent_state() {
        let cell = StateCell::new(16);
        let (current, updates) = cell.subscribe();
        let projection = Projection::new(current, updates, |s: &u32| *s);

        cell.publish(None);
        publish_all(&cell, &[4]);
        cell.close();

        assert_eq!(projection.collect::<Vec<_>>().await, vec![4]);
    }

    #[tokio::test]
    async fn test_replays_current_state_first() {
        let cell = StateCell::new(16);
        publish_all(&cell, &[1, 2]);

        let (current, updates) = cell.subscribe();
        let projection = Projection::new(current, updates, |s: &u32| s * 10);

        publish_all(&cell, &[3]);
        cell.close();

        assert_eq!(projection.collect::<Vec<_>>().await, vec![20, 30]);
    }

    #[tokio::test]
    async fn test_distinct_suppresses_consecutive_repeats() {
        let cell = StateCell::new(16);
        let (current, updates) = cell.subscribe();
        let projection = Projection::new(current, updates, |s: &u32| *s).distinct();

        publish_all(&cell, &[1, 1, 2, 2, 2, 3, 1]);
        cell.close();

        assert_eq!(projection.collect::<Vec<_>>().await, vec![1, 2, 3, 1]);
    }

    #[tokio::test]
    async fn test_distinct_by_custom_equality() {
        let cell = StateCell::new(16);
        let (current, updates) = cell.subscribe();
        let projection = Projection::new(current, updates, |s: &u32| *s)
            .distinct_by(|a: &u32, b: &u32| a / 10 == b / 10);

        publish_all(&cell, &[11, 15, 19, 21, 5]);
        cell.close();

        assert_eq!(projection.collect::<Vec<_>>().await, vec![11, 21, 5]);
    }

    #[tokio::test]
    async fn test_lagging_projection_skips_oldest() {
        let cell = StateCell::new(2);
        let (current, updates) = cell.subscribe();
        let projection = Projection::new(current, updates, |s: &u32| *s);

        publish_all(&cell, &[1, 2, 3, 4, 5]);
        cell.close();

        assert_eq!(projection.collect::<Vec<_>>().await, vec![4, 5]);
    }

    #[tokio::test]
    async fn test_closed_cell_yields_empty_projection() {
        let cell = StateCell::new(2);
        publish_all(&cell, &[9]);
        cell.close();

        let (current, updates) = cell.subscribe();
        let projection = Projection::new(current, updates, |s: &u32| *s);

        assert!(projection.collect::<Vec<_>>().await.is_empty());
    }
}
