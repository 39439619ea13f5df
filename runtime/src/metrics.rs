//! Prometheus metrics for observability and monitoring.
//!
//! The store records through the [`metrics`] facade, so nothing is collected
//! until a recorder is installed. This module installs the Prometheus
//! recorder and describes every metric the store emits:
//! - Dispatch pipeline passes and their duration
//! - Async producer failures
//! - Lagging projections
//! - Shutdown outcomes
//!
//! # Example
//!
//! ```rust,no_run
//! use unistore_runtime::metrics::PrometheusMetrics;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut metrics = PrometheusMetrics::new();
//! metrics.install()?;
//!
//! // Serve this text from your own /metrics endpoint
//! let scrape = metrics.render().unwrap_or_default();
//! # Ok(())
//! # }
//! ```

use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use thiserror::Error;

// Re-export metrics macros for use in other modules
pub use metrics::{counter, histogram};

/// Errors from metrics operations.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Failed to build metrics exporter
    #[error("Failed to build metrics exporter: {0}")]
    Build(String),
    /// Failed to install metrics exporter
    #[error("Failed to install metrics exporter: {0}")]
    Install(String),
}

/// Prometheus recorder for store metrics.
#[derive(Default)]
pub struct PrometheusMetrics {
    handle: Option<PrometheusHandle>,
}

impl PrometheusMetrics {
    /// Create an uninstalled recorder.
    #[must_use]
    pub const fn new() -> Self {
        Self { handle: None }
    }

    /// Describe store metrics and install the Prometheus recorder globally.
    ///
    /// # Errors
    ///
    /// Returns error if the exporter cannot be built or installed.
    ///
    /// # Note
    ///
    /// Only one global recorder can exist per process. If another recorder
    /// is already installed (e.g. by a second store in the same test binary),
    /// this logs a warning and leaves [`render`](Self::render) returning
    /// `None`.
    pub fn install(&mut self) -> Result<(), MetricsError> {
        let builder = PrometheusBuilder::new()
            .set_buckets_for_metric(
                Matcher::Suffix("duration_seconds".to_string()),
                &[
                    0.000_01, 0.000_05, 0.000_1, 0.000_5, 0.001, 0.005, 0.01, 0.05, 0.1,
                ],
            )
            .map_err(|e| MetricsError::Build(e.to_string()))?;

        match builder.install_recorder() {
            Ok(handle) => {
                describe_store_metrics();
                self.handle = Some(handle);
                tracing::info!("Prometheus metrics recorder installed");
                Ok(())
            },
            Err(e) => {
                let err_msg = e.to_string();
                if err_msg.contains("already initialized") {
                    tracing::warn!(
                        "Metrics recorder already initialized, skipping re-initialization"
                    );
                    Ok(())
                } else {
                    Err(MetricsError::Install(err_msg))
                }
            },
        }
    }

    /// Get the metrics handle for rendering.
    #[must_use]
    pub const fn handle(&self) -> Option<&PrometheusHandle> {
        self.handle.as_ref()
    }

    /// Render current metrics in Prometheus text format.
    ///
    /// Returns `None` if this instance did not install the recorder.
    #[must_use]
    pub fn render(&self) -> Option<String> {
        self.handle.as_ref().map(PrometheusHandle::render)
    }
}

/// Register descriptions for every metric the store emits.
fn describe_store_metrics() {
    describe_counter!(
        "store.actions.total",
        "Total number of actions applied by store pipelines"
    );
    describe_histogram!(
        "store.pipeline.duration_seconds",
        "Time taken by one pipeline pass (middlewares, reducers, publish)"
    );
    describe_counter!(
        "store.producer.failures",
        "Total number of async action producers that failed"
    );
    describe_counter!(
        "store.projection.lagged",
        "Total number of state publishes skipped by lagging projections"
    );
    describe_counter!(
        "store.shutdown.initiated",
        "Total number of graceful shutdowns started"
    );
    describe_counter!(
        "store.shutdown.completed",
        "Total number of graceful shutdowns that drained in time"
    );
    describe_counter!(
        "store.shutdown.timeout",
        "Total number of graceful shutdowns that timed out"
    );
}
