//! # Unistore Testing
//!
//! Testing utilities and helpers for the Unistore state container.
//!
//! This crate provides:
//! - A Given-When-Then harness for reducers
//! - A recording middleware for asserting what the pipeline saw
//! - Stream helpers for collecting projection output with timeouts
//! - Property-based testing strategies
//!
//! ## Example
//!
//! ```ignore
//! use unistore_testing::{helpers, mocks::RecordingMiddleware};
//!
//! #[tokio::test]
//! async fn test_cart_flow() {
//!     let recorder = RecordingMiddleware::new();
//!     let store = Store::new(vec![Box::new(CartReducer)], Some(vec![recorder.boxed()]));
//!
//!     let totals = store.observe(|cart: &Cart| cart.total());
//!     store.dispatch(CartAction::Add { sku: 7, quantity: 2 }).unwrap();
//!
//!     let totals = helpers::collect_n(totals, 1, Duration::from_secs(1)).await;
//!     assert_eq!(recorder.actions().len(), 1);
//! }
//! ```

/// Ergonomic reducer testing
pub mod reducer_test;

pub use reducer_test::ReducerTest;

/// Mock implementations for testing.
pub mod mocks {
    use std::sync::{Arc, Mutex, PoisonError};
    use unistore_core::{BoxMiddleware, Dispatch, Middleware, ProducerError};

    /// Record of one middleware invocation
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct Invocation<S, A> {
        /// State the middleware observed (pre-mutation)
        pub state: Option<S>,
        /// Action being processed
        pub action: A,
    }

    struct Records<S, A> {
        invocations: Vec<Invocation<S, A>>,
        failures: Vec<String>,
    }

    /// Middleware that records every call it receives
    ///
    /// Clones share the same records, so keep one clone for assertions and
    /// hand the other to the store.
    ///
    /// # Example
    ///
    /// ```
    /// use unistore_core::{Dispatch, Middleware};
    /// use unistore_testing::mocks::RecordingMiddleware;
    ///
    /// # struct Inert;
    /// # impl Dispatch<char> for Inert {
    /// #     fn dispatch(&self, _: unistore_core::Action<char>) -> Result<(), unistore_core::DispatchError> {
    /// #         Ok(())
    /// #     }
    /// # }
    /// let recorder = RecordingMiddleware::<u32, char>::new();
    /// recorder.handle(Some(&1), &'a', &Inert);
    ///
    /// assert_eq!(recorder.states(), vec![Some(1)]);
    /// assert_eq!(recorder.actions(), vec!['a']);
    /// ```
    pub struct RecordingMiddleware<S, A> {
        records: Arc<Mutex<Records<S, A>>>,
    }

    impl<S, A> Clone for RecordingMiddleware<S, A> {
        fn clone(&self) -> Self {
            Self {
                records: Arc::clone(&self.records),
            }
        }
    }

    impl<S, A> Default for RecordingMiddleware<S, A> {
        fn default() -> Self {
            Self::new()
        }
    }

    impl<S, A> std::fmt::Debug for RecordingMiddleware<S, A> {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("RecordingMiddleware").finish_non_exhaustive()
        }
    }

    impl<S, A> RecordingMiddleware<S, A> {
        /// Create a recorder with no records
        #[must_use]
        pub fn new() -> Self {
            Self {
                records: Arc::new(Mutex::new(Records {
                    invocations: Vec::new(),
                    failures: Vec::new(),
                })),
            }
        }

        fn with_records<T>(&self, f: impl FnOnce(&mut Records<S, A>) -> T) -> T {
            f(&mut self.records.lock().unwrap_or_else(PoisonError::into_inner))
        }

        /// Every invocation so far, in order
        #[must_use]
        pub fn invocations(&self) -> Vec<Invocation<S, A>>
        where
            S: Clone,
            A: Clone,
        {
            self.with_records(|records| records.invocations.clone())
        }

        /// The pre-mutation states observed, in order
        #[must_use]
        pub fn states(&self) -> Vec<Option<S>>
        where
            S: Clone,
        {
            self.with_records(|records| {
                records
                    .invocations
                    .iter()
                    .map(|invocation| invocation.state.clone())
                    .collect()
            })
        }

        /// The actions observed, in order
        #[must_use]
        pub fn actions(&self) -> Vec<A>
        where
            A: Clone,
        {
            self.with_records(|records| {
                records
                    .invocations
                    .iter()
                    .map(|invocation| invocation.action.clone())
                    .collect()
            })
        }

        /// Messages of the producer failures reported so far
        #[must_use]
        pub fn failures(&self) -> Vec<String> {
            self.with_records(|records| records.failures.clone())
        }
    }

    impl<S, A> RecordingMiddleware<S, A>
    where
        S: Clone + Send + 'static,
        A: Clone + Send + 'static,
    {
        /// Box a clone of this recorder for a store's middleware chain
        #[must_use]
        pub fn boxed(&self) -> BoxMiddleware<S, A> {
            Box::new(self.clone())
        }
    }

    impl<S, A> Middleware for RecordingMiddleware<S, A>
    where
        S: Clone,
        A: Clone,
    {
        type State = S;
        type Action = A;

        fn handle(&self, state: Option<&S>, action: &A, _dispatch: &dyn Dispatch<A>) {
            self.with_records(|records| {
                records.invocations.push(Invocation {
                    state: state.cloned(),
                    action: action.clone(),
                });
            });
        }

        fn producer_failed(&self, _state: Option<&S>, error: &ProducerError) {
            self.with_records(|records| records.failures.push(error.to_string()));
        }
    }
}

/// Test helpers and utilities.
pub mod helpers {
    use futures::{Stream, StreamExt};
    use std::time::Duration;

    /// Collect up to `n` items, giving up once `timeout` elapses
    ///
    /// Returns whatever arrived in time, so a short result is an assertion
    /// failure at the call site rather than a hung test.
    pub async fn collect_n<St>(mut stream: St, n: usize, timeout: Duration) -> Vec<St::Item>
    where
        St: Stream + Unpin,
    {
        let mut items = Vec::new();

        let _ = tokio::time::timeout(timeout, async {
            while items.len() < n {
                match stream.next().await {
                    Some(item) => items.push(item),
                    None => break,
                }
            }
        })
        .await;

        items
    }

    /// Collect every item until the stream ends or `timeout` elapses
    pub async fn collect_all<St>(stream: St, timeout: Duration) -> Vec<St::Item>
    where
        St: Stream + Unpin,
    {
        collect_n(stream, usize::MAX, timeout).await
    }

    /// Whether the stream yields nothing within `window`
    ///
    /// An ended stream counts as silent.
    pub async fn expect_silence<St>(stream: &mut St, window: Duration) -> bool
    where
        St: Stream + Unpin,
    {
        match tokio::time::timeout(window, stream.next()).await {
            Err(_) | Ok(None) => true,
            Ok(Some(_)) => false,
        }
    }

    /// Install a test tracing subscriber honoring `RUST_LOG`
    ///
    /// Safe to call from every test; only the first call installs.
    pub fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }
}

/// Property-based testing utilities using proptest.
pub mod properties {
    use proptest::collection::vec;
    use proptest::prelude::*;

    /// Sequences of small positive amounts
    pub fn amounts(max_len: usize) -> impl Strategy<Value = Vec<u32>> {
        vec(1_u32..100, 0..max_len)
    }

    /// Sequences of lowercase tags, used to check application order
    pub fn tags(max_len: usize) -> impl Strategy<Value = Vec<char>> {
        vec(proptest::char::range('a', 'z'), 1..max_len)
    }
}
