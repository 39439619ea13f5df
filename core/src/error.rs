//! Error types shared by the store and its handles.

use thiserror::Error;

/// Errors returned when an action cannot be queued.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchError {
    /// The store behind a non-owning handle has been dropped or shut down
    #[error("Store has been dropped")]
    StoreDropped,

    /// The dispatch pipeline is no longer running
    ///
    /// This happens after a reducer or middleware panicked. The store does
    /// not recover from that.
    #[error("Dispatch pipeline has stopped")]
    PipelineStopped,
}

/// Failure reported by an asynchronous action producer.
///
/// A failed producer contributes no further actions. The failure is logged
/// and handed to [`Middleware::producer_failed`](crate::Middleware::producer_failed);
/// it never reaches the reducers.
#[derive(Error, Debug)]
#[error("Action producer failed: {0:#}")]
pub struct ProducerError(anyhow::Error);

impl ProducerError {
    /// Wrap any error raised by a producer
    #[must_use]
    pub fn new(error: impl Into<anyhow::Error>) -> Self {
        Self(error.into())
    }

    /// The underlying error
    #[must_use]
    pub const fn inner(&self) -> &anyhow::Error {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn producer_error_keeps_context() {
        let error = ProducerError::new(anyhow::anyhow!("timed out").context("fetching quotes"));

        assert_eq!(error.to_string(), "Action producer failed: fetching quotes: timed out");
        assert_eq!(error.inner().root_cause().to_string(), "timed out");
    }

    #[test]
    fn dispatch_error_messages() {
        assert_eq!(DispatchError::StoreDropped.to_string(), "Store has been dropped");
        assert_eq!(
            DispatchError::PipelineStopped.to_string(),
            "Dispatch pipeline has stopped"
        );
    }
}
