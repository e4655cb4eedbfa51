//! I/O module
//!
//! Handles CSV parsing and output.
//!
//! # Components
//!
//! - `record_csv` - Seed record parsing and timing report serialization

pub mod record_csv;

pub use record_csv::{read_seed_file, read_seed_records, write_report_csv};
