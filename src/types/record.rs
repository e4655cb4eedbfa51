//! Record-related types for the benchmark harness
//!
//! This module defines the entity records exchanged with the service, the
//! references used to address them and the working set handed to the batcher.

use rust_decimal::Decimal;
use std::collections::{BTreeMap, BTreeSet};
use uuid::Uuid;

/// Record identifier
///
/// Identifiers are pre-assigned by the client for Create operations.
pub type RecordId = Uuid;

/// Value stored in a record field
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Free text
    Text(String),
    /// Whole number
    Integer(i64),
    /// Currency amount
    Money(Decimal),
    /// Two-option value
    Boolean(bool),
    /// Identifier or lookup value
    Id(Uuid),
}

impl FieldValue {
    /// Borrow the value as text, if it is textual
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Whether the value is textual
    pub fn is_text(&self) -> bool {
        matches!(self, FieldValue::Text(_))
    }
}

/// A single entity record
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// Logical name of the entity this record belongs to
    pub entity: String,

    /// Record identifier
    pub id: RecordId,

    /// Field values keyed by field name
    pub fields: BTreeMap<String, FieldValue>,
}

impl Record {
    /// Create an empty record for the given entity
    pub fn new(entity: impl Into<String>, id: RecordId) -> Self {
        Self {
            entity: entity.into(),
            id,
            fields: BTreeMap::new(),
        }
    }

    /// Builder-style field setter
    pub fn with_field(mut self, name: impl Into<String>, value: FieldValue) -> Self {
        self.fields.insert(name.into(), value);
        self
    }

    /// Get a field value by name
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// Set a field value, returning the previous one
    pub fn set(&mut self, name: impl Into<String>, value: FieldValue) -> Option<FieldValue> {
        self.fields.insert(name.into(), value)
    }

    /// Reference addressing this record
    pub fn to_reference(&self) -> EntityReference {
        EntityReference {
            entity: self.entity.clone(),
            id: self.id,
        }
    }
}

/// Reference to a record by entity name and id
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntityReference {
    /// Logical name of the entity
    pub entity: String,

    /// Record identifier
    pub id: RecordId,
}

/// Schema information the harness needs about an entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityMetadata {
    /// Logical name of the entity, e.g. `account`
    pub logical_name: String,

    /// Field holding the record id
    pub primary_id_attribute: String,

    /// Field holding the record's display name
    pub primary_name_attribute: String,

    /// Whether this is a custom (user-defined) entity rather than an OOB one
    pub is_custom: bool,

    /// Every field name the service accepts for this entity
    pub attributes: BTreeSet<String>,
}

impl EntityMetadata {
    /// Create metadata with the two primary attributes as the whole schema
    pub fn new(
        logical_name: impl Into<String>,
        primary_id_attribute: impl Into<String>,
        primary_name_attribute: impl Into<String>,
    ) -> Self {
        let primary_id_attribute = primary_id_attribute.into();
        let primary_name_attribute = primary_name_attribute.into();
        let attributes = BTreeSet::from([
            primary_id_attribute.clone(),
            primary_name_attribute.clone(),
        ]);

        Self {
            logical_name: logical_name.into(),
            primary_id_attribute,
            primary_name_attribute,
            is_custom: false,
            attributes,
        }
    }

    /// Mark the entity as custom
    pub fn custom(mut self) -> Self {
        self.is_custom = true;
        self
    }

    /// Add extra attributes to the schema
    pub fn with_attributes<I, S>(mut self, attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attributes
            .extend(attributes.into_iter().map(Into::into));
        self
    }

    /// Whether the schema knows the given field
    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.contains(name)
    }
}

/// The working set of records fetched for an Update or Delete run
///
/// Owned by the caller until handed to the batcher, which drains it from the
/// tail so that no record is ever assigned to two batches.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordSet {
    records: Vec<Record>,
}

impl RecordSet {
    /// Create an empty record set
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records left in the set
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the set has been fully drained
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Append records fetched from another page
    pub fn extend(&mut self, records: impl IntoIterator<Item = Record>) {
        self.records.extend(records);
    }

    /// Remove and return the last record of the set
    pub fn pop(&mut self) -> Option<Record> {
        self.records.pop()
    }

    /// Iterate over the remaining records
    pub fn iter(&self) -> impl Iterator<Item = &Record> {
        self.records.iter()
    }

    /// Ids of the remaining records, in set order
    pub fn ids(&self) -> Vec<RecordId> {
        self.records.iter().map(|record| record.id).collect()
    }
}

impl From<Vec<Record>> for RecordSet {
    fn from(records: Vec<Record>) -> Self {
        Self { records }
    }
}

impl FromIterator<Record> for RecordSet {
    fn from_iter<I: IntoIterator<Item = Record>>(iter: I) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_builder_sets_fields() {
        let id = Uuid::new_v4();
        let record = Record::new("account", id)
            .with_field("name", FieldValue::Text("Acme".to_string()))
            .with_field("numberofemployees", FieldValue::Integer(12));

        assert_eq!(record.get("name").and_then(FieldValue::as_text), Some("Acme"));
        assert_eq!(record.get("numberofemployees"), Some(&FieldValue::Integer(12)));
        assert_eq!(record.to_reference(), EntityReference { entity: "account".to_string(), id });
    }

    #[test]
    fn test_metadata_schema_contains_primary_attributes() {
        let metadata = EntityMetadata::new("account", "accountid", "name")
            .with_attributes(["telephone1"]);

        assert!(metadata.has_attribute("accountid"));
        assert!(metadata.has_attribute("name"));
        assert!(metadata.has_attribute("telephone1"));
        assert!(!metadata.has_attribute("fax"));
        assert!(!metadata.is_custom);
        assert!(metadata.custom().is_custom);
    }

    #[test]
    fn test_record_set_pops_from_tail() {
        let first = Record::new("account", Uuid::new_v4());
        let second = Record::new("account", Uuid::new_v4());
        let mut set = RecordSet::from(vec![first.clone(), second.clone()]);

        assert_eq!(set.len(), 2);
        assert_eq!(set.pop(), Some(second));
        assert_eq!(set.pop(), Some(first));
        assert!(set.is_empty());
        assert_eq!(set.pop(), None);
    }
}
