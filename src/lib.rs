//! CRUD Dispatch Benchmark Library
//! # Overview
//!
//! This library benchmarks bulk Create / Retrieve / Update / Delete workloads
//! against an entity-oriented data service and compares three dispatch
//! strategies: one request per operation, sequential batches, and batches
//! submitted concurrently through a single executor call.
//!
//! # Architecture
//!
//! The system is organized into several key components:
//!
//! - [`types`] - Core data types (Record, Operation, Batch, BenchError, etc.)
//! - [`cli`] - CLI arguments parsing and interactive prompts
//! - [`config`] - Validated run settings
//! - [`core`] - Batch construction and dispatch:
//!   - [`core::batcher`] - Partitioning into bounded batches
//!   - [`core::dispatch`] - The three dispatch strategies and their aggregation
//!   - [`core::mutator`] - Field rewriting for Update runs
//!   - [`core::stats`] - Timing and outcome accumulation
//! - [`strategy`] - Strategy pattern selecting the dispatch path at runtime
//! - [`service`] - Simulated remote service with a pooled executor
//! - [`runner`] - Entity selection, workload construction, dispatch
//! - [`io`] - Seed record parsing and timing report output
//!
//! # Strategies
//!
//! - **Single**: each operation is its own request; the first failure aborts
//! - **Execute Multiple**: one batch at a time, each batch stops at its first fault
//! - **Parallel Execute Multiple**: every batch in one concurrent call, faults are
//!   recorded and never stop sibling operations
//!
//! # Failures
//!
//! Faults the service reports for a single operation are recorded in the batch
//! result. Transport faults (timeouts, refused connections, cancellation) abort
//! the run.

// Module declarations
pub mod cli;
pub mod config;
pub mod core;
pub mod io;
pub mod runner;
pub mod service;
pub mod strategy;
pub mod types;

pub use config::BenchConfig;
pub use core::{Batcher, DispatchEngine, DispatchReport, RecordMutator, StatsCollector};
pub use io::write_report_csv;
pub use runner::{BenchmarkRunner, RunOutcome};
pub use types::{
    Batch, BatchResult, BenchError, EntityMetadata, Operation, OperationKind, Record, RecordId,
    RecordSet, RemoteFault, TransportFaultKind,
};
