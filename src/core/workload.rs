//! Per-operation workload adapters
//!
//! A workload is a destructive source of pending operations. The batcher and
//! the single-request strategy pull from it until it is empty; nothing is
//! handed out twice.
//!
//! Update and Delete workloads pop records from the tail of their working set,
//! so the first batch holds the last fetched records. This only changes which
//! record lands in which reported batch.

use std::collections::BTreeSet;

use super::mutator::RecordMutator;
use super::record_factory::RecordFactory;
use crate::types::{Operation, RecordSet};

/// Destructive source of pending operations
pub trait Workload: Send {
    /// Verb describing the workload in log lines
    fn label(&self) -> &'static str;

    /// Number of operations still pending
    fn remaining(&self) -> usize;

    /// Take the next pending operation
    fn next_operation(&mut self) -> Option<Operation>;

    /// Field names rewritten so far (Update only)
    fn touched_fields(&self) -> Option<&BTreeSet<String>> {
        None
    }
}

/// Synthetic Create workload
#[derive(Debug)]
pub struct CreateWorkload {
    factory: RecordFactory,
    remaining: usize,
    suppress_duplicate_detection: bool,
}

impl CreateWorkload {
    /// Create `count` records through the factory
    pub fn new(factory: RecordFactory, count: usize, suppress_duplicate_detection: bool) -> Self {
        Self {
            factory,
            remaining: count,
            suppress_duplicate_detection,
        }
    }
}

impl Workload for CreateWorkload {
    fn label(&self) -> &'static str {
        "create"
    }

    fn remaining(&self) -> usize {
        self.remaining
    }

    fn next_operation(&mut self) -> Option<Operation> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        Some(Operation::create(
            self.factory.create(),
            self.suppress_duplicate_detection,
        ))
    }
}

/// Update workload over a fetched working set
#[derive(Debug)]
pub struct UpdateWorkload {
    records: RecordSet,
    mutator: RecordMutator,
    touched: BTreeSet<String>,
}

impl UpdateWorkload {
    /// Rewrite every record of the working set
    pub fn new(records: RecordSet, mutator: RecordMutator) -> Self {
        Self {
            records,
            mutator,
            touched: BTreeSet::new(),
        }
    }
}

impl Workload for UpdateWorkload {
    fn label(&self) -> &'static str {
        "update"
    }

    fn remaining(&self) -> usize {
        self.records.len()
    }

    fn next_operation(&mut self) -> Option<Operation> {
        let record = self.records.pop()?;
        let (record, touched) = self.mutator.select_fields_to_update(record);
        self.touched.extend(touched.iter().cloned());
        Some(Operation::update(record, touched))
    }

    fn touched_fields(&self) -> Option<&BTreeSet<String>> {
        Some(&self.touched)
    }
}

/// Delete workload over a fetched working set
#[derive(Debug)]
pub struct DeleteWorkload {
    records: RecordSet,
}

impl DeleteWorkload {
    /// Delete every record of the working set
    pub fn new(records: RecordSet) -> Self {
        Self { records }
    }
}

impl Workload for DeleteWorkload {
    fn label(&self) -> &'static str {
        "delete"
    }

    fn remaining(&self) -> usize {
        self.records.len()
    }

    fn next_operation(&mut self) -> Option<Operation> {
        self.records
            .pop()
            .map(|record| Operation::delete(record.to_reference()))
    }
}
