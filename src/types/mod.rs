//! Types module
//!
//! Contains core data structures used throughout the application.
//! This module organizes types into logical submodules:
//! - `record`: Records, references, entity metadata and the working set
//! - `operation`: Create/Update/Delete units of work
//! - `batch`: Batches, batch settings and batch results
//! - `error`: Error types for the benchmark harness

pub mod batch;
pub mod error;
pub mod operation;
pub mod record;

pub use batch::{Batch, BatchResult, BatchSettings, OperationOutcome, OperationResponse};
pub use error::{fault_code, BenchError, RemoteFault, TransportFaultKind};
pub use operation::{CorrelationId, Operation, OperationKind};
pub use record::{EntityMetadata, EntityReference, FieldValue, Record, RecordId, RecordSet};
