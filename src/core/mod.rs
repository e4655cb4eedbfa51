//! Core benchmark logic
//!
//! This module contains the batch construction and dispatch components:
//! - `traits` - Capabilities consumed from the service side
//! - `record_factory` - Synthetic records for Create runs
//! - `mutator` - Field rewriting for Update runs
//! - `workload` - Per-operation sources of pending operations
//! - `batcher` - Partitioning into bounded batches
//! - `dispatch` - The three dispatch strategies
//! - `retrieve` - Paged retrieval
//! - `stats` - Timing and outcome accumulation
//! - `reporter` - Progress event sink

pub mod batcher;
pub mod dispatch;
pub mod mutator;
pub mod record_factory;
pub mod reporter;
pub mod retrieve;
pub mod stats;
pub mod traits;
pub mod workload;

pub use batcher::{batch_count, partition, Batcher};
pub use dispatch::{DispatchEngine, DispatchOutcome, RetryPolicy};
pub use mutator::RecordMutator;
pub use record_factory::RecordFactory;
pub use reporter::{Reporter, TracingReporter};
pub use retrieve::{PagedRetriever, DEFAULT_PAGE_SIZE};
pub use stats::{DispatchMode, DispatchReport, StatsCollector, TimingSample};
pub use traits::{BatchExecutor, Page, PageRequest, RecordSource, SingleCallExecutor};
pub use workload::{CreateWorkload, DeleteWorkload, UpdateWorkload, Workload};
