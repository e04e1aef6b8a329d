//! Output module for console reporting
//!
//! This module handles:
//! - Printing each extracted record as a table while crawling
//! - Statistics and dumps of the record database
//! - The summary of a finished run

pub mod stats;
pub mod table;

pub use stats::{
    load_statistics, print_records, print_run_summary, print_statistics, RecordStatistics,
};
pub use table::{print_record, record_fields, render_record_table, RecordField};
