//! Sequential batch strategy
//!
//! The workload is drained into batches which are submitted one at a time.
//! Each batch stops at its first fault; the run carries on with the next one.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::{report_touched_fields, DispatchStrategy};
use crate::core::{Batcher, DispatchEngine, DispatchOutcome, Workload};
use crate::types::BenchError;

/// One batch request at a time
#[derive(Debug, Clone, Copy)]
pub struct SequentialBatchStrategy {
    batcher: Batcher,
}

impl SequentialBatchStrategy {
    /// Create a strategy building batches with `batcher`
    pub fn new(batcher: Batcher) -> Self {
        Self { batcher }
    }
}

#[async_trait]
impl DispatchStrategy for SequentialBatchStrategy {
    fn name(&self) -> &'static str {
        "execute-multiple"
    }

    async fn dispatch(
        &self,
        engine: &DispatchEngine,
        workload: &mut dyn Workload,
        cancel: &CancellationToken,
    ) -> Result<DispatchOutcome, BenchError> {
        let batches = self.batcher.drain(workload);
        report_touched_fields(engine, &*workload);

        engine
            .execute_sequential_batches(workload.label(), batches, cancel)
            .await
    }
}
