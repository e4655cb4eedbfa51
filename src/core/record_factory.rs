//! Placeholder record synthesis for the Create workload

use uuid::Uuid;

use crate::types::{EntityMetadata, FieldValue, Record};

/// Synthesizes placeholder records for one entity
///
/// Each record gets a freshly generated id, written both as the record id and
/// into the entity's primary id field, and a display name of the form
/// `"<entity> <id>"` in the primary name field. Running the factory twice never
/// yields the same id.
#[derive(Debug, Clone)]
pub struct RecordFactory {
    metadata: EntityMetadata,
}

impl RecordFactory {
    /// Create a factory for the given entity
    pub fn new(metadata: EntityMetadata) -> Self {
        Self { metadata }
    }

    /// Entity the factory synthesizes records for
    pub fn metadata(&self) -> &EntityMetadata {
        &self.metadata
    }

    /// Synthesize one record with a fresh id
    pub fn create(&self) -> Record {
        let id = Uuid::new_v4();
        let entity = &self.metadata.logical_name;

        Record::new(entity.clone(), id)
            .with_field(self.metadata.primary_id_attribute.clone(), FieldValue::Id(id))
            .with_field(
                self.metadata.primary_name_attribute.clone(),
                FieldValue::Text(format!("{} {}", entity, id)),
            )
    }
}
