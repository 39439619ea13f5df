//! # Unistore Runtime
//!
//! Runtime implementation for the Unistore state container.
//!
//! This crate provides the [`Store`](store::Store): it owns the state cell,
//! runs every action through the middleware and reducer chains on a single
//! pipeline task, and exposes read-only projections of the state.
//!
//! ## Core Components
//!
//! - **Store**: Owns the state and the dispatch pipeline
//! - **Dispatcher**: Normalizes sync and async actions into one ordered queue
//! - **State Cell**: Latest-value holder with replay for late subscribers
//! - **Projection**: Live stream of a derived sub-state, optionally deduplicated
//!
//! ## Example
//!
//! ```
//! use futures::StreamExt;
//! use unistore_core::{reducer_fn, BoxReducer};
//! use unistore_runtime::Store;
//!
//! struct Deposit {
//!     amount: i64,
//! }
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let balance: BoxReducer<i64, Deposit> =
//!     Box::new(reducer_fn(|balance: Option<&i64>, deposit: &Deposit| {
//!         balance.copied().unwrap_or(0) + deposit.amount
//!     }));
//! let store = Store::new(vec![balance], None);
//!
//! let mut balances = store.observe(|balance: &i64| *balance);
//!
//! store.dispatch(Deposit { amount: 1 })?;
//! store.dispatch(Deposit { amount: 2 })?;
//!
//! assert_eq!(balances.next().await, Some(1));
//! assert_eq!(balances.next().await, Some(3));
//! # Ok(())
//! # }
//! ```

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Latest-value state holder with subscriber replay
pub mod cell;

/// Action normalization and the non-owning dispatch handle
pub mod dispatcher;

/// Prometheus metrics for observability
pub mod metrics;

/// Live projections of store state
pub mod projection;

pub use cell::StateCell;
pub use dispatcher::Dispatcher;
pub use error::{ConfigError, StoreError};
pub use projection::Projection;
pub use store::Store;

/// Error types for the Store runtime
pub mod error {
    use std::time::Duration;
    use thiserror::Error;
    use unistore_core::DispatchError;

    /// Errors that can occur during Store operations
    #[derive(Error, Debug)]
    pub enum StoreError {
        /// An action could not be queued
        #[error(transparent)]
        Dispatch(#[from] DispatchError),

        /// The pipeline task terminated abnormally
        ///
        /// This typically means a reducer or middleware panicked.
        #[error("Dispatch pipeline failed: {0}")]
        PipelineFailed(#[from] tokio::task::JoinError),

        /// Shutdown timed out while the pipeline was still draining actions
        #[error("Shutdown timed out after {0:?} with actions still queued")]
        ShutdownTimeout(Duration),
    }

    /// Errors raised while loading a [`StoreConfig`](crate::StoreConfig)
    #[derive(Error, Debug, Clone, PartialEq, Eq)]
    pub enum ConfigError {
        /// A configuration value could not be parsed
        #[error("Invalid value for {key}: {value:?}")]
        Parse {
            /// Configuration key (environment variable name)
            key: &'static str,
            /// The rejected raw value
            value: String,
        },

        /// A configuration value is out of range
        #[error("Configuration validation failed: {0}")]
        Invalid(String),
    }
}

/// Environment variable holding the projection broadcast capacity
pub const ENV_BROADCAST_CAPACITY: &str = "UNISTORE_BROADCAST_CAPACITY";

/// Environment variable holding the default shutdown timeout in milliseconds
pub const ENV_SHUTDOWN_TIMEOUT_MS: &str = "UNISTORE_SHUTDOWN_TIMEOUT_MS";

/// Configuration for Store behavior
///
/// Controls how many state publishes a slow projection may fall behind
/// before it starts skipping, and how long a graceful shutdown waits for the
/// pipeline to drain.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use unistore_runtime::StoreConfig;
///
/// let config = StoreConfig::default()
///     .with_broadcast_capacity(1024)
///     .with_shutdown_timeout(Duration::from_secs(5));
///
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Number of state publishes buffered per projection
    ///
    /// A projection that falls further behind skips the oldest buffered
    /// states. The store itself is never blocked by a slow projection.
    pub broadcast_capacity: usize,

    /// Default timeout for [`Store::close`](store::Store::close)
    pub shutdown_timeout: Duration,
}

impl StoreConfig {
    /// Create a new configuration with custom values
    #[must_use]
    pub const fn new(broadcast_capacity: usize, shutdown_timeout: Duration) -> Self {
        Self {
            broadcast_capacity,
            shutdown_timeout,
        }
    }

    /// Set the projection broadcast capacity
    #[must_use]
    pub const fn with_broadcast_capacity(mut self, capacity: usize) -> Self {
        self.broadcast_capacity = capacity;
        self
    }

    /// Set the default shutdown timeout
    #[must_use]
    pub const fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Load configuration from the process environment
    ///
    /// Reads [`ENV_BROADCAST_CAPACITY`] and [`ENV_SHUTDOWN_TIMEOUT_MS`];
    /// unset variables keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a variable is set but cannot be parsed or
    /// the resulting configuration fails [`validate`](Self::validate).
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup
    ///
    /// Same rules as [`from_env`](Self::from_env), with `lookup` standing in
    /// for the environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a value cannot be parsed or the resulting
    /// configuration is invalid.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(capacity) = parse_var(&lookup, ENV_BROADCAST_CAPACITY)? {
            config.broadcast_capacity = capacity;
        }
        if let Some(millis) = parse_var(&lookup, ENV_SHUTDOWN_TIMEOUT_MS)? {
            config.shutdown_timeout = Duration::from_millis(millis);
        }

        config.validate()?;
        Ok(config)
    }

    /// Check that all values are usable
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if the broadcast capacity is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.broadcast_capacity == 0 {
            return Err(ConfigError::Invalid(
                "broadcast_capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            broadcast_capacity: 256,
            shutdown_timeout: Duration::from_secs(30),
        }
    }
}

fn parse_var<F, T>(lookup: &F, key: &'static str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse()
                .map_err(|_| ConfigError::Parse { key, value: raw })
        })
        .transpose()
}

/// Store module - The runtime for reducers
///
/// Store runtime coordinating the dispatch pipeline and its observers.
pub mod store {
    use crate::cell::StateCell;
    use crate::dispatcher::{Dispatcher, Envelope};
    use crate::error::StoreError;
    use crate::projection::Projection;
    use crate::StoreConfig;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::{mpsc, watch};
    use tokio::task::JoinHandle;
    use unistore_core::{
        Action, BoxMiddleware, BoxReducer, Dispatch, DispatchError, ProducerError,
    };

    /// The Store - a single state value behind a dispatch pipeline
    ///
    /// The Store manages:
    /// 1. The state cell (latest state, absent until the first publish)
    /// 2. The reducer chain, fixed at construction
    /// 3. The optional middleware chain, fixed at construction
    /// 4. The pipeline task that applies actions one at a time
    ///
    /// Every action, whichever thread or producer it comes from, passes
    /// through one FIFO queue, so pipeline passes never interleave.
    ///
    /// Dropping the store stops its async producers. Actions already queued
    /// are still applied, then the state cell is released and every live
    /// [`Projection`] ends.
    ///
    /// # Type Parameters
    ///
    /// - `S`: State type
    /// - `A`: Action type
    ///
    /// # Example
    ///
    /// ```ignore
    /// let store = Store::new(vec![Box::new(CartReducer)], Some(vec![Box::new(AuditLog)]));
    ///
    /// let mut totals = store.observe_distinct(|cart: &Cart| cart.total());
    /// store.dispatch(CartAction::Add { sku, quantity: 2 })?;
    /// ```
    pub struct Store<S, A> {
        cell: Arc<StateCell<S>>,
        dispatcher: Dispatcher<A>,
        /// Only strong handle to the queue; the pipeline stops once it is gone
        queue: mpsc::UnboundedSender<Envelope<A>>,
        /// Producer tasks stop when this is dropped
        shutdown: watch::Sender<bool>,
        pipeline: JoinHandle<()>,
        config: StoreConfig,
    }

    impl<S, A> Store<S, A>
    where
        S: Send + Sync + 'static,
        A: Send + 'static,
    {
        /// Create a new store from its reducer and middleware chains
        ///
        /// Creates a Store with the default [`StoreConfig`].
        ///
        /// # Arguments
        ///
        /// - `reducers`: Applied in order to every action; an empty list
        ///   leaves the state unchanged
        /// - `middlewares`: Invoked in order before the reducers, if any
        ///
        /// # Panics
        ///
        /// Panics if called outside a Tokio runtime, since the pipeline runs
        /// as a spawned task.
        #[must_use]
        pub fn new(
            reducers: Vec<BoxReducer<S, A>>,
            middlewares: Option<Vec<BoxMiddleware<S, A>>>,
        ) -> Self {
            Self::with_config(reducers, middlewares, StoreConfig::default())
        }

        /// Create a new store with custom configuration
        ///
        /// A zero broadcast capacity is raised to 1.
        ///
        /// # Panics
        ///
        /// Panics if called outside a Tokio runtime.
        #[must_use]
        pub fn with_config(
            reducers: Vec<BoxReducer<S, A>>,
            middlewares: Option<Vec<BoxMiddleware<S, A>>>,
            config: StoreConfig,
        ) -> Self {
            let cell = Arc::new(StateCell::new(config.broadcast_capacity.max(1)));
            let (queue, receiver) = mpsc::unbounded_channel();
            let (shutdown, shutdown_signal) = watch::channel(false);
            let dispatcher = Dispatcher::new(
                queue.downgrade(),
                shutdown_signal,
                tokio::runtime::Handle::current(),
            );

            tracing::debug!(
                reducers = reducers.len(),
                middlewares = middlewares.as_ref().map_or(0, Vec::len),
                broadcast_capacity = config.broadcast_capacity,
                "Creating store"
            );

            let pipeline = Pipeline {
                cell: Arc::clone(&cell),
                reducers,
                middlewares,
                dispatcher: dispatcher.clone(),
            };
            let pipeline = tokio::spawn(pipeline.run(receiver));

            Self {
                cell,
                dispatcher,
                queue,
                shutdown,
                pipeline,
                config,
            }
        }

        /// Dispatch an action to the store
        ///
        /// A synchronous action is queued immediately. An asynchronous
        /// action is handed to a producer task that queues each value as
        /// it arrives; a producer failure ends that action and is reported
        /// to the middlewares' failure hook.
        ///
        /// Returns once the action is queued, not once it has been applied.
        /// Results are observed through projections.
        ///
        /// # Errors
        ///
        /// Returns [`DispatchError::PipelineStopped`] if a reducer or
        /// middleware panicked earlier and the pipeline is gone.
        #[tracing::instrument(skip(self, action), name = "store_dispatch")]
        pub fn dispatch(&self, action: impl Into<Action<A>>) -> Result<(), DispatchError> {
            self.dispatcher.submit(action.into())
        }

        /// Get a non-owning handle for dispatching into this store
        ///
        /// The handle does not keep the store alive; once the store is
        /// dropped, dispatching through it returns
        /// [`DispatchError::StoreDropped`].
        #[must_use]
        pub fn dispatcher(&self) -> Dispatcher<A> {
            self.dispatcher.clone()
        }

        /// Observe a projection of the state
        ///
        /// The returned stream skips the absent state, then yields
        /// `projector(state)` for the current state (if any) and for every
        /// later publish, including publishes that repeat the same value.
        pub fn observe<T, F>(&self, projector: F) -> Projection<T>
        where
            F: Fn(&S) -> T + Send + 'static,
            T: Send + 'static,
        {
            let (current, updates) = self.cell.subscribe();
            Projection::new(current, updates, projector)
        }

        /// Observe a projection, suppressing consecutive equal values
        ///
        /// Only `T` needs to be comparable; the state type does not.
        pub fn observe_distinct<T, F>(&self, projector: F) -> Projection<T>
        where
            F: Fn(&S) -> T + Send + 'static,
            T: PartialEq + Clone + Send + 'static,
        {
            self.observe(projector).distinct()
        }

        /// Observe a projection, suppressing consecutive values that `eq`
        /// considers equal
        pub fn observe_distinct_by<T, F, E>(&self, projector: F, eq: E) -> Projection<T>
        where
            F: Fn(&S) -> T + Send + 'static,
            E: Fn(&T, &T) -> bool + Send + 'static,
            T: Clone + Send + 'static,
        {
            self.observe(projector).distinct_by(eq)
        }

        /// Read current state via a closure
        ///
        /// ```ignore
        /// let items = store.state(|cart| cart.map_or(0, |c| c.items.len()));
        /// ```
        pub fn state<F, T>(&self, f: F) -> T
        where
            F: FnOnce(Option<&S>) -> T,
        {
            f(self.cell.current().as_deref())
        }

        /// The configuration this store was created with
        #[must_use]
        pub const fn config(&self) -> &StoreConfig {
            &self.config
        }

        /// Shut down using the configured default timeout
        ///
        /// # Errors
        ///
        /// See [`shutdown`](Self::shutdown).
        pub async fn close(self) -> Result<(), StoreError> {
            let timeout = self.config.shutdown_timeout;
            self.shutdown(timeout).await
        }

        /// Gracefully shut down the store
        ///
        /// Stops async producers, lets the pipeline apply every action that
        /// was already queued, then releases the state cell. Live projections
        /// receive the remaining publishes and then end.
        ///
        /// # Errors
        ///
        /// - [`StoreError::ShutdownTimeout`] if the pipeline is still
        ///   draining when `timeout` expires
        /// - [`StoreError::PipelineFailed`] if the pipeline task panicked
        #[tracing::instrument(skip(self))]
        pub async fn shutdown(self, timeout: Duration) -> Result<(), StoreError> {
            tracing::info!("Initiating graceful shutdown");
            metrics::counter!("store.shutdown.initiated").increment(1);

            let Self {
                queue,
                shutdown,
                pipeline,
                ..
            } = self;

            let _ = shutdown.send(true);
            drop(queue);

            match tokio::time::timeout(timeout, pipeline).await {
                Ok(Ok(())) => {
                    tracing::info!("Pipeline drained, shutdown successful");
                    metrics::counter!("store.shutdown.completed").increment(1);
                    Ok(())
                },
                Ok(Err(join_error)) => {
                    tracing::error!(error = %join_error, "Pipeline task failed");
                    Err(StoreError::PipelineFailed(join_error))
                },
                Err(_) => {
                    tracing::error!(?timeout, "Shutdown timeout: pipeline still draining");
                    metrics::counter!("store.shutdown.timeout").increment(1);
                    Err(StoreError::ShutdownTimeout(timeout))
                },
            }
        }
    }

    impl<S, A> Dispatch<A> for Store<S, A>
    where
        A: Send + 'static,
    {
        fn dispatch(&self, action: Action<A>) -> Result<(), DispatchError> {
            self.dispatcher.submit(action)
        }
    }

    impl<S, A> std::fmt::Debug for Store<S, A> {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("Store")
                .field("pipeline_running", &!self.pipeline.is_finished())
                .field("config", &self.config)
                .finish_non_exhaustive()
        }
    }

    /// The single consumer of a store's action queue
    struct Pipeline<S, A> {
        cell: Arc<StateCell<S>>,
        reducers: Vec<BoxReducer<S, A>>,
        middlewares: Option<Vec<BoxMiddleware<S, A>>>,
        dispatcher: Dispatcher<A>,
    }

    impl<S, A> Pipeline<S, A>
    where
        S: Send + Sync + 'static,
        A: Send + 'static,
    {
        async fn run(self, mut queue: mpsc::UnboundedReceiver<Envelope<A>>) {
            // Closes the cell on exit, including a panic in user code, so
            // projections end instead of waiting forever.
            let _close = CloseOnDrop(Arc::clone(&self.cell));
            tracing::debug!("Dispatch pipeline started");

            while let Some(envelope) = queue.recv().await {
                match envelope {
                    Envelope::Action(action) => self.apply(&action),
                    Envelope::ProducerFailed(error) => self.report(&error),
                }
            }

            tracing::debug!("Dispatch pipeline stopped");
        }

        /// One pipeline pass: middlewares, reducer fold, publish
        fn apply(&self, action: &A) {
            metrics::counter!("store.actions.total").increment(1);
            let start = std::time::Instant::now();

            let current = self.cell.current();

            if let Some(middlewares) = &self.middlewares {
                tracing::trace!(count = middlewares.len(), "Running middlewares");
                for middleware in middlewares {
                    middleware.handle(current.as_deref(), action, &self.dispatcher);
                }
            }

            let next = {
                let span = tracing::debug_span!("reducer_chain", reducers = self.reducers.len());
                let _enter = span.enter();

                self.reducers.iter().fold(current, |state, reducer| {
                    Some(Arc::new(reducer.reduce(state.as_deref(), action)))
                })
            };

            let receivers = self.cell.publish(next);

            metrics::histogram!("store.pipeline.duration_seconds")
                .record(start.elapsed().as_secs_f64());
            tracing::trace!(receivers, "Published state");
        }

        fn report(&self, error: &ProducerError) {
            let Some(middlewares) = &self.middlewares else {
                return;
            };

            let current = self.cell.current();
            for middleware in middlewares {
                middleware.producer_failed(current.as_deref(), error);
            }
        }
    }

    struct CloseOnDrop<S>(Arc<StateCell<S>>);

    impl<S> Drop for CloseOnDrop<S> {
        fn drop(&mut self) {
            self.0.close();
        }
    }
}
