use std::sync::Arc;

use parking_lot::Mutex;

use logsieve_types::{FilterConfig, Record};

use crate::{FilterPipeline, PipelineStats, RecordFilter};

/// Thread-safe handle to a single pipeline
///
/// Every call holds the lock for its whole duration, so admission, eviction
/// and reload never interleave between callers. A batch is processed under
/// one lock acquisition and stays contiguous.
#[derive(Clone)]
pub struct SharedPipeline {
    inner: Arc<Mutex<FilterPipeline>>,
}

impl SharedPipeline {
    pub fn new(pipeline: FilterPipeline) -> Self {
        Self {
            inner: Arc::new(Mutex::new(pipeline)),
        }
    }

    pub fn process(&self, record: Record) -> Option<Record> {
        self.inner.lock().process(record)
    }

    pub fn process_batch(&self, records: Vec<Record>) -> Vec<Record> {
        self.inner.lock().process_batch(records)
    }

    pub fn flush_expired(&self) -> Vec<Record> {
        self.inner.lock().flush_expired()
    }

    pub fn close(&self) -> Vec<Record> {
        self.inner.lock().close()
    }

    pub fn stats(&self) -> PipelineStats {
        self.inner.lock().stats()
    }

    /// Clone of the active config snapshot
    pub fn config(&self) -> FilterConfig {
        self.inner.lock().config().clone()
    }

    /// Run `f` with exclusive access to the pipeline
    pub fn with_pipeline<R>(&self, f: impl FnOnce(&mut FilterPipeline) -> R) -> R {
        f(&mut self.inner.lock())
    }
}

impl RecordFilter for SharedPipeline {
    fn process(&mut self, record: Record) -> Option<Record> {
        SharedPipeline::process(self, record)
    }

    fn process_batch(&mut self, records: Vec<Record>) -> Vec<Record> {
        SharedPipeline::process_batch(self, records)
    }
}

impl std::fmt::Debug for SharedPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedPipeline")
            .field("stats", &self.stats())
            .finish()
    }
}
