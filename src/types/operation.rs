//! Operation types for the benchmark harness
//!
//! An [`Operation`] is one Create, Update or Delete unit of work against a
//! single record. It carries a client-generated correlation id so that the
//! request can be matched to its response and log lines.

use super::record::{EntityReference, Record, RecordId};
use std::collections::BTreeSet;
use std::fmt;
use uuid::Uuid;

/// Opaque token linking a request to its logged result
pub type CorrelationId = Uuid;

/// Kind of work an operation performs
#[derive(Debug, Clone, PartialEq)]
pub enum OperationKind {
    /// Insert a new record with a pre-assigned id
    Create(Record),

    /// Overwrite fields of an existing record
    Update {
        /// The record carrying the new field values
        record: Record,
        /// Names of the fields that were rewritten
        changed_fields: BTreeSet<String>,
    },

    /// Remove an existing record
    Delete(EntityReference),
}

/// One unit of work against a single record
#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    /// Fresh correlation id, unique per operation
    pub correlation_id: CorrelationId,

    /// The work to perform
    pub kind: OperationKind,

    /// Ask the service to skip duplicate detection for this request
    pub suppress_duplicate_detection: bool,
}

impl Operation {
    /// Create operation for a synthesized record
    pub fn create(record: Record, suppress_duplicate_detection: bool) -> Self {
        Self {
            correlation_id: Uuid::new_v4(),
            kind: OperationKind::Create(record),
            suppress_duplicate_detection,
        }
    }

    /// Update operation for a mutated record
    pub fn update(record: Record, changed_fields: BTreeSet<String>) -> Self {
        Self {
            correlation_id: Uuid::new_v4(),
            kind: OperationKind::Update {
                record,
                changed_fields,
            },
            suppress_duplicate_detection: false,
        }
    }

    /// Delete operation for an existing record
    pub fn delete(reference: EntityReference) -> Self {
        Self {
            correlation_id: Uuid::new_v4(),
            kind: OperationKind::Delete(reference),
            suppress_duplicate_detection: false,
        }
    }

    /// Id of the record this operation targets
    pub fn target_id(&self) -> RecordId {
        match &self.kind {
            OperationKind::Create(record) => record.id,
            OperationKind::Update { record, .. } => record.id,
            OperationKind::Delete(reference) => reference.id,
        }
    }

    /// Logical name of the entity this operation targets
    pub fn entity(&self) -> &str {
        match &self.kind {
            OperationKind::Create(record) => &record.entity,
            OperationKind::Update { record, .. } => &record.entity,
            OperationKind::Delete(reference) => &reference.entity,
        }
    }

    /// Short verb used in log lines
    pub fn verb(&self) -> &'static str {
        match self.kind {
            OperationKind::Create(_) => "create",
            OperationKind::Update { .. } => "update",
            OperationKind::Delete(_) => "delete",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} (request {})",
            self.verb(),
            self.entity(),
            self.target_id(),
            self.correlation_id
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn record(id: RecordId) -> Record {
        Record::new("contact", id)
    }

    #[rstest]
    #[case::create(Operation::create(record(Uuid::nil()), true), "create")]
    #[case::update(Operation::update(record(Uuid::nil()), BTreeSet::new()), "update")]
    #[case::delete(Operation::delete(record(Uuid::nil()).to_reference()), "delete")]
    fn test_operation_targets_record(#[case] operation: Operation, #[case] verb: &str) {
        assert_eq!(operation.verb(), verb);
        assert_eq!(operation.target_id(), Uuid::nil());
        assert_eq!(operation.entity(), "contact");
    }

    #[test]
    fn test_correlation_ids_are_fresh() {
        let id = Uuid::new_v4();
        let first = Operation::delete(record(id).to_reference());
        let second = Operation::delete(record(id).to_reference());

        assert_ne!(first.correlation_id, second.correlation_id);
        assert_eq!(first.target_id(), second.target_id());
    }

    #[test]
    fn test_only_create_carries_duplicate_detection_flag() {
        assert!(Operation::create(record(Uuid::new_v4()), true).suppress_duplicate_detection);
        assert!(!Operation::update(record(Uuid::new_v4()), BTreeSet::new()).suppress_duplicate_detection);
    }
}
