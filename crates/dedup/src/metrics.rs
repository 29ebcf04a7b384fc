use std::sync::Arc;
use std::time::{Duration, Instant};

/// Observer for optimizer passes.
///
/// Attached to one [`DeduplicationOptimizer`](crate::DeduplicationOptimizer)
/// with `with_metrics`; independent optimizers report independently.
pub trait DedupMetrics: Send + Sync {
    /// Collection pass finished: `registered` paths stored or deduplicated,
    /// `failed` paths that could not be hashed.
    fn record_collection(&self, latency: Duration, registered: usize, failed: usize);

    /// Rewrite pass finished over `documents` documents.
    fn record_rewrite(&self, latency: Duration, documents: usize, unresolved: usize);
}

pub(crate) struct MetricsSpan {
    recorder: Arc<dyn DedupMetrics>,
    start: Instant,
}

impl MetricsSpan {
    pub(crate) fn start(recorder: Option<&Arc<dyn DedupMetrics>>) -> Option<Self> {
        recorder.map(|recorder| Self {
            recorder: Arc::clone(recorder),
            start: Instant::now(),
        })
    }

    pub(crate) fn record_collection(self, registered: usize, failed: usize) {
        self.recorder
            .record_collection(self.start.elapsed(), registered, failed);
    }

    pub(crate) fn record_rewrite(self, documents: usize, unresolved: usize) {
        self.recorder
            .record_rewrite(self.start.elapsed(), documents, unresolved);
    }
}
