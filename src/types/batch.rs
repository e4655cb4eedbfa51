//! Batch-related types for the benchmark harness
//!
//! A [`Batch`] is a bounded group of operations submitted to the service in
//! one call; a [`BatchResult`] is what the service returns for it.

use super::error::RemoteFault;
use super::operation::{CorrelationId, Operation};
use super::record::RecordId;
use std::time::Duration;
use uuid::Uuid;

/// Execution settings sent along with a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchSettings {
    /// Keep executing sibling operations after a fault
    pub continue_on_error: bool,

    /// Return a response for every successful operation, not just faults
    pub return_responses: bool,
}

impl BatchSettings {
    /// Stop at the first fault (sequential batch strategy)
    pub const STOP_ON_ERROR: Self = Self {
        continue_on_error: false,
        return_responses: true,
    };

    /// Record faults and keep going (parallel batch strategy)
    pub const CONTINUE_ON_ERROR: Self = Self {
        continue_on_error: true,
        return_responses: true,
    };
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self::CONTINUE_ON_ERROR
    }
}

/// An ordered, capacity-bounded group of operations
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    /// Fresh correlation id for the batch request
    pub correlation_id: CorrelationId,

    /// Operations in submission order
    pub operations: Vec<Operation>,

    /// Fault handling and response settings
    pub settings: BatchSettings,
}

impl Batch {
    /// Create a batch with a fresh correlation id and default settings
    pub fn new(operations: Vec<Operation>) -> Self {
        Self {
            correlation_id: Uuid::new_v4(),
            operations,
            settings: BatchSettings::default(),
        }
    }

    /// Replace the batch settings
    pub fn with_settings(mut self, settings: BatchSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Number of operations in the batch
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    /// Whether the batch holds no operations
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Ids of the records targeted by the batch, in submission order
    pub fn target_ids(&self) -> impl Iterator<Item = RecordId> + '_ {
        self.operations.iter().map(Operation::target_id)
    }
}

/// Outcome of a single operation inside a batch
#[derive(Debug, Clone, PartialEq)]
pub enum OperationOutcome {
    /// The service applied the operation
    Success {
        /// Id of the record the operation touched
        id: RecordId,
    },

    /// The service rejected the operation
    Fault(RemoteFault),
}

impl OperationOutcome {
    /// Whether the operation succeeded
    pub fn is_success(&self) -> bool {
        matches!(self, OperationOutcome::Success { .. })
    }
}

/// Response entry for one operation of a batch
#[derive(Debug, Clone, PartialEq)]
pub struct OperationResponse {
    /// Position of the operation inside its batch (zero based)
    pub index: usize,

    /// Correlation id of the operation
    pub correlation_id: CorrelationId,

    /// What happened to the operation
    pub outcome: OperationOutcome,
}

/// Everything the service returned for one batch
#[derive(Debug, Clone, PartialEq)]
pub struct BatchResult {
    /// Correlation id of the batch request
    pub correlation_id: CorrelationId,

    /// One entry per processed operation, in submission order
    ///
    /// With `continue_on_error` every operation has an entry. Without it the
    /// entries stop at the first fault.
    pub responses: Vec<OperationResponse>,

    /// Time the executor spent on this batch
    pub elapsed: Duration,
}

impl BatchResult {
    /// Number of successful operations
    pub fn successes(&self) -> usize {
        self.responses
            .iter()
            .filter(|response| response.outcome.is_success())
            .count()
    }

    /// Number of faulted operations
    pub fn failures(&self) -> usize {
        self.responses.len() - self.successes()
    }

    /// Faulted operations with their batch positions
    pub fn faults(&self) -> impl Iterator<Item = (usize, &RemoteFault)> + '_ {
        self.responses
            .iter()
            .filter_map(|response| match &response.outcome {
                OperationOutcome::Fault(fault) => Some((response.index, fault)),
                OperationOutcome::Success { .. } => None,
            })
    }

    /// Number of operations of a batch of `batch_len` that got no entry
    pub fn unprocessed(&self, batch_len: usize) -> usize {
        batch_len.saturating_sub(self.responses.len())
    }
}
