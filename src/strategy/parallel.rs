//! Parallel batch strategy
//!
//! The workload is drained into batches up front and the complete set is
//! handed to the executor in one call. The executor decides how many batches
//! run at once; faults are recorded per operation and never stop siblings.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::{report_touched_fields, DispatchStrategy};
use crate::core::{Batcher, DispatchEngine, DispatchOutcome, Workload};
use crate::types::BenchError;

/// All batches through one concurrent executor call
#[derive(Debug, Clone, Copy)]
pub struct ParallelBatchStrategy {
    batcher: Batcher,
}

impl ParallelBatchStrategy {
    /// Create a strategy building batches with `batcher`
    pub fn new(batcher: Batcher) -> Self {
        Self { batcher }
    }
}

#[async_trait]
impl DispatchStrategy for ParallelBatchStrategy {
    fn name(&self) -> &'static str {
        "parallel-execute-multiple"
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
            .execute_parallel_batches(workload.label(), batches, cancel)
            .await
    }
}
