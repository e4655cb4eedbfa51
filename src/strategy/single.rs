//! Single-request strategy
//!
//! Every operation is sent as its own request, strictly one after another.
//! This is the baseline the batch strategies are compared against.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::{report_touched_fields, DispatchStrategy};
use crate::core::{DispatchEngine, DispatchOutcome, Workload};
use crate::types::{BenchError, Operation};

/// One request per operation
#[derive(Debug, Clone, Copy, Default)]
pub struct SingleStrategy;

#[async_trait]
impl DispatchStrategy for SingleStrategy {
    fn name(&self) -> &'static str {
        "single"
    }

    async fn dispatch(
        &self,
        engine: &DispatchEngine,
        workload: &mut dyn Workload,
        cancel: &CancellationToken,
    ) -> Result<DispatchOutcome, BenchError> {
        let operations: Vec<Operation> =
            std::iter::from_fn(|| workload.next_operation()).collect();
        report_touched_fields(engine, &*workload);

        engine
            .execute_sequential_single(workload.label(), operations, cancel)
            .await
    }
}
