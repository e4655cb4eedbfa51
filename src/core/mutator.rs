//! Field rewriting for the Update workload
//!
//! The mutator decides which fields of a fetched record get rewritten. Values
//! are deterministic placeholders of the form `"<field>:<record id>"`, so a
//! later read can verify that the update round-tripped.
//!
//! Configured field names the service does not know are still sent; the
//! service drops them silently. That is a limitation of the remote contract,
//! not something the mutator tries to detect.

use std::collections::BTreeSet;

use crate::types::{FieldValue, Record, RecordId};

/// Placeholder value written into a field
pub fn placeholder(field: &str, id: RecordId) -> String {
    format!("{}:{}", field, id)
}

/// Rewrites textual fields and adds configured ones
#[derive(Debug, Clone, Default)]
pub struct RecordMutator {
    configured_fields: Vec<String>,
}

impl RecordMutator {
    /// Create a mutator that also writes the given field names
    pub fn new<I, S>(configured_fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            configured_fields: configured_fields.into_iter().map(Into::into).collect(),
        }
    }

    /// Field names written in addition to the record's textual fields
    pub fn configured_fields(&self) -> &[String] {
        &self.configured_fields
    }

    /// Rewrite the record and report the names of the fields it touched
    ///
    /// 1. Every field already on the record holding text is overwritten.
    /// 2. Every configured field missing from the record is added.
    ///
    /// Configured fields that exist with a non-text value are left alone.
    pub fn select_fields_to_update(&self, mut record: Record) -> (Record, BTreeSet<String>) {
        let id = record.id;
        let mut touched = BTreeSet::new();

        for (name, value) in record.fields.iter_mut() {
            if value.is_text() {
                *value = FieldValue::Text(placeholder(name, id));
                touched.insert(name.clone());
            }
        }

        for name in &self.configured_fields {
            if !record.fields.contains_key(name) {
                record.set(name.clone(), FieldValue::Text(placeholder(name, id)));
                touched.insert(name.clone());
            }
        }

        (record, touched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal::Decimal;
    use uuid::Uuid;

    #[test]
    fn test_textual_field_gets_placeholder() {
        let id = Uuid::new_v4();
        let record = Record::new("account", id).with_field("name", FieldValue::Text("Acme".to_string()));

        let (mutated, touched) = RecordMutator::default().select_fields_to_update(record);

        assert_eq!(
            mutated.get("name"),
            Some(&FieldValue::Text(format!("name:{}", id)))
        );
        assert_eq!(touched, BTreeSet::from(["name".to_string()]));
    }

    #[test]
    fn test_non_text_fields_are_untouched() {
        let id = Uuid::new_v4();
        let record = Record::new("account", id)
            .with_field("accountid", FieldValue::Id(id))
            .with_field("revenue", FieldValue::Money(Decimal::new(125_000, 2)))
            .with_field("donotemail", FieldValue::Boolean(true));

        let (mutated, touched) = RecordMutator::default().select_fields_to_update(record.clone());

        assert_eq!(mutated, record);
        assert!(touched.is_empty());
    }

    #[rstest]
    #[case::absent_field_added(vec!["telephone1"], vec!["name", "telephone1"])]
    #[case::present_text_field_not_duplicated(vec!["name"], vec!["name"])]
    #[case::present_non_text_field_skipped(vec!["numberofemployees"], vec!["name"])]
    #[case::nothing_configured(vec![], vec!["name"])]
    fn test_configured_fields(#[case] configured: Vec<&str>, #[case] expected: Vec<&str>) {
        let id = Uuid::new_v4();
        let record = Record::new("account", id)
            .with_field("name", FieldValue::Text("Acme".to_string()))
            .with_field("numberofemployees", FieldValue::Integer(40));

        let (mutated, touched) = RecordMutator::new(configured).select_fields_to_update(record);

        let expected: BTreeSet<String> = expected.into_iter().map(String::from).collect();
        assert_eq!(touched, expected);
        for name in &touched {
            assert_eq!(
                mutated.get(name),
                Some(&FieldValue::Text(placeholder(name, id)))
            );
        }
        assert_eq!(mutated.get("numberofemployees"), Some(&FieldValue::Integer(40)));
    }
}
