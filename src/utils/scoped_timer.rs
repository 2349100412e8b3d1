use std::time::Instant;

use tracing::trace;

/// Traces how long one barrier call took and over how many subscriptions
pub(crate) struct ScopedTimer {
    start: Instant,
    operation: &'static str,
    subscriptions: usize,
}

impl ScopedTimer {
    pub(crate) fn new(
        operation: &'static str,
        subscriptions: usize,
    ) -> Self {
        Self {
            start: Instant::now(),
            operation,
            subscriptions,
        }
    }
}

impl Drop for ScopedTimer {
    fn drop(&mut self) {
        trace!(
            target: "timing",
            operation = self.operation,
            subscriptions = self.subscriptions,
            elapsed_ms = self.start.elapsed().as_millis() as u64,
            "barrier call finished"
        );
    }
}
