//! Timeout adapter for controller factories
//!
//! The manager itself has no timeouts. Wrapping the factory bounds each
//! creation without changing any manager invariant: an elapsed call is just
//! another `Failed` outcome.

use std::time::Duration;

use crate::feed::VideoEntry;

use super::{ControllerFactory, FactoryOutcome, VideoSource};

/// Factory wrapper that fails creations taking longer than `limit`
pub struct TimeoutFactory<F> {
    inner: F,
    limit: Duration,
}

impl<F> TimeoutFactory<F> {
    /// Wrap `inner` with a per-call time limit
    pub fn new(inner: F, limit: Duration) -> Self {
        Self { inner, limit }
    }

    /// Configured limit
    pub fn limit(&self) -> Duration {
        self.limit
    }

    /// Wrapped factory
    pub fn inner(&self) -> &F {
        &self.inner
    }
}

#[async_trait::async_trait]
impl<F: ControllerFactory> ControllerFactory for TimeoutFactory<F> {
    async fn create(&self, entry: &VideoEntry, source: &VideoSource) -> FactoryOutcome {
        match tokio::time::timeout(self.limit, self.inner.create(entry, source)).await {
            Ok(outcome) => outcome,
            Err(_) => {
                tracing::warn!(
                    video = %entry.id,
                    source = %source,
                    limit_ms = self.limit.as_millis() as u64,
                    "Controller creation timed out"
                );
                FactoryOutcome::Failed(format!("timed out after {}ms", self.limit.as_millis()))
            }
        }
    }
}
