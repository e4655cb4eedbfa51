//! Partitioning of operations into bounded batches
//!
//! The batcher turns an arbitrary number of pending operations into
//! `ceil(N / batch_size)` batches of at most `batch_size` operations each.
//! Every operation lands in exactly one batch; only the last batch may be
//! short. Each batch gets its own fresh correlation id.
//!
//! Two entry points exist:
//!
//! - [`Batcher::partition`] takes the operations by value and keeps their order.
//! - [`Batcher::drain`] pulls from a [`Workload`] until it is empty. Callers
//!   rely on the workload's working set being empty afterwards.

use super::workload::Workload;
use crate::types::{Batch, BenchError, Operation};

/// Number of batches needed for `operations` at `batch_size` per batch
pub fn batch_count(operations: usize, batch_size: usize) -> usize {
    operations.div_ceil(batch_size)
}

/// Fixed-capacity batch builder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Batcher {
    batch_size: usize,
}

impl Batcher {
    /// Create a batcher producing batches of at most `batch_size` operations
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` when `batch_size` is zero.
    pub fn new(batch_size: usize) -> Result<Self, BenchError> {
        if batch_size == 0 {
            return Err(BenchError::invalid_configuration(
                "batch size must be at least 1",
            ));
        }
        Ok(Self { batch_size })
    }

    /// Maximum number of operations per batch
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Split `operations` into batches, preserving input order
    pub fn partition(&self, operations: Vec<Operation>) -> Vec<Batch> {
        let mut batches = Vec::with_capacity(batch_count(operations.len(), self.batch_size));
        let mut operations = operations.into_iter().peekable();

        while operations.peek().is_some() {
            let chunk: Vec<Operation> = operations.by_ref().take(self.batch_size).collect();
            batches.push(Batch::new(chunk));
        }

        batches
    }

    /// Drain every pending operation of `workload` into batches
    ///
    /// Batches are filled in the order the workload hands operations out.
    pub fn drain(&self, workload: &mut dyn Workload) -> Vec<Batch> {
        let expected = batch_count(workload.remaining(), self.batch_size);
        let mut batches = Vec::with_capacity(expected);

        loop {
            let mut chunk = Vec::with_capacity(self.batch_size.min(workload.remaining()));
            while chunk.len() < self.batch_size {
                match workload.next_operation() {
                    Some(operation) => chunk.push(operation),
                    None => break,
                }
            }
            if chunk.is_empty() {
                break;
            }
            batches.push(Batch::new(chunk));
        }

        batches
    }
}

/// Split `operations` into batches of at most `batch_size`
///
/// # Errors
///
/// Returns `InvalidConfiguration` when `batch_size` is zero.
pub fn partition(operations: Vec<Operation>, batch_size: usize) -> Result<Vec<Batch>, BenchError> {
    Ok(Batcher::new(batch_size)?.partition(operations))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::workload::{CreateWorkload, DeleteWorkload};
    use crate::core::RecordFactory;
    use crate::types::{EntityMetadata, Record, RecordSet};
    use rstest::rstest;
    use std::collections::HashSet;
    use uuid::Uuid;

    fn operations(n: usize) -> Vec<Operation> {
        (0..n)
            .map(|_| Operation::delete(Record::new("account", Uuid::new_v4()).to_reference()))
            .collect()
    }

    #[rstest]
    #[case::empty(0, 10, 0)]
    #[case::single_partial(3, 10, 1)]
    #[case::exact_fit(20, 10, 2)]
    #[case::remainder(21, 10, 3)]
    #[case::one_per_batch(5, 1, 5)]
    #[case::reference_scenario(3500, 1000, 4)]
    fn test_partition_properties(
        #[case] n: usize,
        #[case] batch_size: usize,
        #[case] expected_batches: usize,
    ) {
        let input = operations(n);
        let input_ids: Vec<_> = input.iter().map(|op| op.correlation_id).collect();

        let batches = partition(input, batch_size).unwrap();

        assert_eq!(batches.len(), expected_batches);
        assert_eq!(batches.len(), batch_count(n, batch_size));
        assert!(batches.iter().all(|b| !b.is_empty() && b.len() <= batch_size));
        assert_eq!(batches.iter().map(Batch::len).sum::<usize>(), n);

        // Order is preserved and nothing is duplicated or lost
        let output_ids: Vec<_> = batches
            .iter()
            .flat_map(|b| b.operations.iter().map(|op| op.correlation_id))
            .collect();
        assert_eq!(output_ids, input_ids);
    }

    #[test]
    fn test_partition_reference_scenario_sizes() {
        let batches = partition(operations(3500), 1000).unwrap();
        let sizes: Vec<_> = batches.iter().map(Batch::len).collect();

        assert_eq!(sizes, vec![1000, 1000, 1000, 500]);
    }

    #[test]
    fn test_partition_assigns_distinct_batch_correlation_ids() {
        let batches = partition(operations(50), 7).unwrap();
        let ids: HashSet<_> = batches.iter().map(|b| b.correlation_id).collect();

        assert_eq!(ids.len(), batches.len());
    }

    #[test]
    fn test_zero_batch_size_is_invalid_configuration() {
        let result = partition(operations(3), 0);
        assert!(matches!(
            result,
            Err(BenchError::InvalidConfiguration { .. })
        ));
        assert!(Batcher::new(0).is_err());
    }

    #[test]
    fn test_drain_empties_working_set() {
        let records: RecordSet = (0..25)
            .map(|_| Record::new("account", Uuid::new_v4()))
            .collect();
        let mut expected: Vec<_> = records.ids();
        let mut workload = DeleteWorkload::new(records);

        let batches = Batcher::new(10).unwrap().drain(&mut workload);

        assert_eq!(workload.remaining(), 0);
        assert_eq!(batches.iter().map(Batch::len).collect::<Vec<_>>(), vec![10, 10, 5]);

        let mut drained: Vec<_> = batches.iter().flat_map(Batch::target_ids).collect();
        drained.sort();
        expected.sort();
        assert_eq!(drained, expected);
    }

    #[test]
    fn test_drain_fills_from_tail_of_working_set() {
        let records: RecordSet = (0..4)
            .map(|_| Record::new("account", Uuid::new_v4()))
            .collect();
        let ids = records.ids();
        let mut workload = DeleteWorkload::new(records);

        let batches = Batcher::new(3).unwrap().drain(&mut workload);

        assert_eq!(
            batches[0].target_ids().collect::<Vec<_>>(),
            vec![ids[3], ids[2], ids[1]]
        );
        assert_eq!(batches[1].target_ids().collect::<Vec<_>>(), vec![ids[0]]);
    }

    #[test]
    fn test_drain_create_workload() {
        let factory = RecordFactory::new(EntityMetadata::new("account", "accountid", "name"));
        let mut workload = CreateWorkload::new(factory, 3500, true);

        let batches = Batcher::new(1000).unwrap().drain(&mut workload);

        assert_eq!(
            batches.iter().map(Batch::len).collect::<Vec<_>>(),
            vec![1000, 1000, 1000, 500]
        );
        let ids: HashSet<_> = batches.iter().flat_map(Batch::target_ids).collect();
        assert_eq!(ids.len(), 3500);
    }

    #[test]
    fn test_drain_empty_workload_yields_no_batches() {
        let mut workload = DeleteWorkload::new(RecordSet::new());
        assert!(Batcher::new(5).unwrap().drain(&mut workload).is_empty());
    }
}
