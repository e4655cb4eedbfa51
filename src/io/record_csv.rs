//! CSV handling for seed records and timing reports
//!
//! This module centralizes all CSV format concerns, providing:
//! - Seed record parsing (one record per row, one field per column)
//! - Timing report serialization (one row per sample)

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use std::str::FromStr;

use csv::{ReaderBuilder, Trim, Writer};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::core::DispatchReport;
use crate::types::{BenchError, CorrelationId, EntityMetadata, FieldValue, Record};

/// Parse seed records for `metadata`'s entity
///
/// The column named after the primary id attribute (or `id`) holds the record
/// id; rows without one get a fresh id. Every other non-empty cell becomes a
/// field, typed by what it parses as: integer, decimal, `true`/`false`, and
/// text otherwise. The primary name is always text.
///
/// # Errors
///
/// Returns `ParseError` with the line number for malformed rows or ids.
pub fn read_seed_records<R: Read>(
    input: R,
    metadata: &EntityMetadata,
) -> Result<Vec<Record>, BenchError> {
    let mut reader = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(false)
        .from_reader(input);
    let headers = reader.headers()?.clone();

    let id_column = headers
        .iter()
        .position(|h| h == metadata.primary_id_attribute || h == "id");

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row?;
        let line = row.position().map(|pos| pos.line());

        let id = match id_column.and_then(|i| row.get(i)).filter(|cell| !cell.is_empty()) {
            Some(cell) => Uuid::parse_str(cell).map_err(|e| BenchError::ParseError {
                line,
                message: format!("invalid record id '{}': {}", cell, e),
            })?,
            None => Uuid::new_v4(),
        };

        let mut record = Record::new(metadata.logical_name.clone(), id)
            .with_field(metadata.primary_id_attribute.clone(), FieldValue::Id(id));
        for (index, (column, cell)) in headers.iter().zip(row.iter()).enumerate() {
            if Some(index) == id_column || cell.is_empty() {
                continue;
            }
            let value = if column == metadata.primary_name_attribute {
                FieldValue::Text(cell.to_string())
            } else {
                infer_value(cell)
            };
            record.set(column, value);
        }
        records.push(record);
    }

    Ok(records)
}

/// Open `path` and parse its seed records
///
/// # Errors
///
/// Returns `IoError` when the file cannot be opened, otherwise as
/// [`read_seed_records`].
pub fn read_seed_file(path: &Path, metadata: &EntityMetadata) -> Result<Vec<Record>, BenchError> {
    let file = File::open(path).map_err(|e| BenchError::IoError {
        message: format!("Failed to open seed file '{}': {}", path.display(), e),
    })?;
    read_seed_records(file, metadata)
}

fn infer_value(cell: &str) -> FieldValue {
    if let Ok(integer) = cell.parse::<i64>() {
        return FieldValue::Integer(integer);
    }
    if let Ok(amount) = Decimal::from_str(cell) {
        return FieldValue::Money(amount);
    }
    match cell {
        "true" => FieldValue::Boolean(true),
        "false" => FieldValue::Boolean(false),
        _ => FieldValue::Text(cell.to_string()),
    }
}

/// One timing sample as written to the report
#[derive(Debug, Serialize)]
struct ReportRow<'a> {
    mode: String,
    sequence: usize,
    label: &'a str,
    correlation_id: CorrelationId,
    operations: usize,
    elapsed_ms: f64,
}

/// Write a report's timing samples in CSV format
///
/// Columns: mode, sequence, label, correlation_id, operations, elapsed_ms.
/// Rows are in recording order.
///
/// # Errors
///
/// Returns `IoError` if writing fails.
pub fn write_report_csv(report: &DispatchReport, output: &mut dyn Write) -> Result<(), BenchError> {
    let mut writer = Writer::from_writer(output);
    let mode = report.mode.to_string();

    for sample in &report.samples {
        writer
            .serialize(ReportRow {
                mode: mode.clone(),
                sequence: sample.sequence,
                label: &sample.label,
                correlation_id: sample.correlation_id,
                operations: sample.operations,
                elapsed_ms: sample.elapsed.as_secs_f64() * 1000.0,
            })
            .map_err(|e| BenchError::IoError {
                message: format!("Failed to write report row: {}", e),
            })?;
    }

    writer.flush()?;
    Ok(())
}
