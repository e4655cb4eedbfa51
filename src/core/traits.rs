//! Capabilities the dispatch engine consumes
//!
//! The engine never talks to the service directly. It is handed implementations
//! of these traits, which own connection pooling, authentication, timeouts and
//! whatever internal parallelism the transport supports.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::types::{Batch, BatchResult, BenchError, CorrelationId, Operation, Record, RecordId};

/// Executes keyed batches, possibly in parallel
///
/// One call carries the complete set of batches. The call returns once every
/// batch has completed, or fails as a whole with a transport-level error.
#[async_trait]
pub trait BatchExecutor: Send + Sync {
    /// Execute every batch in `requests`, returning one result per key
    async fn execute(
        &self,
        requests: BTreeMap<String, Batch>,
        cancel: &CancellationToken,
    ) -> Result<BTreeMap<String, BatchResult>, BenchError>;

    /// Highest number of batches the executor had in flight at once
    ///
    /// Informational only; `None` when the executor does not track it.
    fn peak_concurrency(&self) -> Option<usize> {
        None
    }
}

/// Executes one operation per call
#[async_trait]
pub trait SingleCallExecutor: Send + Sync {
    /// Execute a single operation, returning the id of the record it touched
    ///
    /// Service-reported failures come back as [`BenchError::RemoteFault`].
    async fn execute_one(
        &self,
        operation: Operation,
        cancel: &CancellationToken,
    ) -> Result<RecordId, BenchError>;
}

/// Request for one page of records
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    /// Fresh id tagging this page request
    pub correlation_id: CorrelationId,

    /// Logical name of the entity to read
    pub entity: String,

    /// One-based page number
    pub page_number: usize,

    /// Maximum number of records on the page
    pub count: usize,

    /// Cookie returned with the previous page, if any
    pub paging_cookie: Option<String>,
}

/// One page of records
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Page {
    /// Records on this page
    pub records: Vec<Record>,

    /// Whether another page follows
    pub more_records: bool,

    /// Cookie to send with the next page request
    pub paging_cookie: Option<String>,
}

/// Supplies records through a paged query
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Fetch a single page
    async fn retrieve_page(
        &self,
        request: PageRequest,
        cancel: &CancellationToken,
    ) -> Result<Page, BenchError>;
}
