//! Storage traits and error types
//!
//! This module defines the trait interface for record stores and
//! associated error types.

use crate::storage::{ProcessRecord, StoredRecord};
use std::fmt;
use thiserror::Error;

/// Steps of the staging-then-promote commit cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitStep {
    CreateStaging,
    Insert,
    Promote,
    DropStaging,
    Transaction,
}

impl fmt::Display for CommitStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::CreateStaging => "create staging table",
            Self::Insert => "insert into staging",
            Self::Promote => "promote staging rows",
            Self::DropStaging => "drop staging table",
            Self::Transaction => "transaction",
        };
        f.write_str(name)
    }
}

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Commit failed at step '{step}': {source}")]
    Commit {
        step: CommitStep,
        #[source]
        source: rusqlite::Error,
    },
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for record store implementations
///
/// The crawler is the only writer. `clear` runs once at the start of a run,
/// `commit` once per extracted record in extraction order, and `finish` once
/// at the end.
pub trait RecordStore {
    /// Empties the main table and discards any leftover staging rows
    fn clear(&mut self) -> StorageResult<()>;

    /// Stages one record and, depending on the commit mode, promotes it
    fn commit(&mut self, record: &ProcessRecord) -> StorageResult<()>;

    /// Promotes anything still staged; returns the number of rows promoted
    fn finish(&mut self) -> StorageResult<u64>;

    /// Counts rows in the main table
    fn count(&self) -> StorageResult<u64>;

    /// Counts rows waiting in the staging table
    fn staged_count(&self) -> StorageResult<u64>;

    /// Reads every row of the main table in id order
    fn records(&self) -> StorageResult<Vec<StoredRecord>>;
}
