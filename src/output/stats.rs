//! Statistics generation from the record database
//!
//! This module provides functionality for extracting and displaying
//! statistics about stored records and finished runs.

use crate::crawler::RunSummary;
use crate::output::table::render_record_table;
use crate::storage::{RecordStore, StorageResult, StoredRecord};
use std::collections::HashMap;

/// Record database statistics summary
#[derive(Debug, Clone, PartialEq)]
pub struct RecordStatistics {
    /// Rows in the main table
    pub total_records: u64,

    /// Rows still waiting in the staging table
    pub staged_records: u64,

    /// Rows whose history row was read
    pub records_with_history: u64,

    /// Row count per history unit, NULL units excluded
    pub records_by_unit: HashMap<String, u64>,

    /// Smallest, largest and mean day count over rows that have one
    pub min_days: Option<i64>,
    pub max_days: Option<i64>,
    pub avg_days: Option<f64>,
}

/// Loads statistics from storage
///
/// # Arguments
///
/// * `storage` - The record store to query
///
/// # Returns
///
/// * `Ok(RecordStatistics)` - Successfully loaded statistics
/// * `Err(StorageError)` - Failed to query statistics
pub fn load_statistics(storage: &dyn RecordStore) -> StorageResult<RecordStatistics> {
    let records = storage.records()?;
    let staged_records = storage.staged_count()?;

    Ok(summarize(&records, staged_records))
}

fn summarize(records: &[StoredRecord], staged_records: u64) -> RecordStatistics {
    let mut records_by_unit = HashMap::new();
    let mut records_with_history = 0;
    let mut days = Vec::new();

    for stored in records {
        let record = &stored.record;
        if record.received_at.is_some() {
            records_with_history += 1;
        }
        if let Some(unit) = &record.unit {
            *records_by_unit.entry(unit.clone()).or_insert(0) += 1;
        }
        if let Some(count) = record.day_count {
            days.push(count);
        }
    }

    let avg_days = if days.is_empty() {
        None
    } else {
        Some(days.iter().sum::<i64>() as f64 / days.len() as f64)
    };

    RecordStatistics {
        total_records: records.len() as u64,
        staged_records,
        records_with_history,
        records_by_unit,
        min_days: days.iter().min().copied(),
        max_days: days.iter().max().copied(),
        avg_days,
    }
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &RecordStatistics) {
    println!("=== Record Statistics ===\n");

    println!("Overview:");
    println!("  Stored records: {}", stats.total_records);
    println!("  With history: {}", stats.records_with_history);
    if stats.staged_records > 0 {
        println!("  Staged, not yet promoted: {}", stats.staged_records);
    }
    println!();

    if !stats.records_by_unit.is_empty() {
        println!("Records by Unit ({}):", stats.records_by_unit.len());
        // Sort units by count (descending), then name
        let mut unit_counts: Vec<_> = stats.records_by_unit.iter().collect();
        unit_counts.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));

        for (unit, count) in unit_counts {
            let percentage = (*count as f64 / stats.total_records as f64) * 100.0;
            println!("  {}: {} ({:.1}%)", unit, count, percentage);
        }
        println!();
    }

    match (stats.min_days, stats.max_days, stats.avg_days) {
        (Some(min), Some(max), Some(avg)) => {
            println!("Days in Unit: min {}, max {}, mean {:.1}", min, max, avg);
        }
        _ => println!("Days in Unit: no data"),
    }
}

/// Prints every stored record as a table, in id order
pub fn print_records(records: &[StoredRecord]) {
    if records.is_empty() {
        println!("No stored records.");
        return;
    }

    for stored in records {
        println!("#{}", stored.id);
        println!("{}", render_record_table(&stored.record));
    }
    println!("\n{} records", records.len());
}

/// Prints the totals of a finished run
pub fn print_run_summary(summary: &RunSummary) {
    println!("=== Harvest Summary ===\n");
    println!("  Started: {}", summary.started_at.to_rfc3339());
    println!("  Finished: {}", summary.finished_at.to_rfc3339());
    println!("  Duration: {}s", summary.elapsed().num_seconds());
    println!(
        "  Session: {}",
        if summary.logged_in {
            "fresh login"
        } else {
            "restored"
        }
    );
    println!();
    println!(
        "  Units: {} total, {} crawled, {} empty, {} skipped",
        summary.units_total, summary.units_crawled, summary.units_empty, summary.units_skipped
    );
    println!("  Pages: {}", summary.pages);
    println!(
        "  Records: {} committed, {} skipped, {} commit failures",
        summary.records_committed, summary.records_skipped, summary.commit_failures
    );
    println!("  Rows stored: {}", summary.rows_stored);
}
