//! Dispatch strategy module
//!
//! This module defines the Strategy pattern over the dispatch engine. A strategy
//! takes a workload, turns it into requests (single operations or batches) and
//! hands them to the matching engine operation. The strategy is selected at
//! runtime from the command line.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::cli::StrategyType;
use crate::core::{Batcher, DispatchEngine, DispatchOutcome, Workload};
use crate::types::BenchError;

pub mod parallel;
pub mod sequential;
pub mod single;

pub use parallel::ParallelBatchStrategy;
pub use sequential::SequentialBatchStrategy;
pub use single::SingleStrategy;

/// Dispatch strategy trait for complete workload runs
///
/// Each strategy drains the workload completely before dispatching, so the
/// time spent synthesizing operations is never part of a timing sample.
#[async_trait]
pub trait DispatchStrategy: Send + Sync {
    /// Name shown in log lines and reports
    fn name(&self) -> &'static str;

    /// Drain `workload` and dispatch every operation through `engine`
    ///
    /// # Errors
    ///
    /// Returns whatever fatal error the engine reports. Remote faults inside
    /// batches are part of the outcome, not errors.
    async fn dispatch(
        &self,
        engine: &DispatchEngine,
        workload: &mut dyn Workload,
        cancel: &CancellationToken,
    ) -> Result<DispatchOutcome, BenchError>;
}

/// Create a dispatch strategy based on the specified strategy type
///
/// # Errors
///
/// Returns `InvalidConfiguration` when a batch strategy is asked for with a
/// zero batch size.
pub fn create_strategy(
    strategy_type: StrategyType,
    batch_size: usize,
) -> Result<Box<dyn DispatchStrategy>, BenchError> {
    let strategy: Box<dyn DispatchStrategy> = match strategy_type {
        StrategyType::Single => Box::new(SingleStrategy),
        StrategyType::ExecuteMultiple => {
            Box::new(SequentialBatchStrategy::new(Batcher::new(batch_size)?))
        }
        StrategyType::ParallelExecuteMultiple => {
            Box::new(ParallelBatchStrategy::new(Batcher::new(batch_size)?))
        }
    };
    Ok(strategy)
}

/// Pass the fields an Update workload rewrote on to the reporter
fn report_touched_fields(engine: &DispatchEngine, workload: &dyn Workload) {
    if let Some(fields) = workload.touched_fields() {
        engine.reporter().fields_touched(fields);
    }
}
