//! Storage module for persisting extracted records
//!
//! This module handles all database operations for the harvester, including:
//! - SQLite database initialization and schema management
//! - The staging-then-promote commit protocol
//! - Read-back of stored records for statistics and dumps

mod schema;
mod sqlite;
mod traits;

pub use schema::{MAIN_TABLE, STAGING_TABLE};
pub use sqlite::SqliteStorage;
pub use traits::{CommitStep, RecordStore, StorageError, StorageResult};

use serde::Deserialize;
use std::path::Path;

/// Initializes or opens a storage database
pub fn open_storage(path: &Path, mode: CommitMode) -> StorageResult<SqliteStorage> {
    SqliteStorage::new(path, mode)
}

/// One case record as written to the `processos` table
///
/// The first two fields come from the record list, the rest are taken
/// positionally from the second row of the record's history table.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProcessRecord {
    /// Process number as shown in the list (`nome_processo`)
    pub name: String,
    /// Text of the list link's tooltip (`descricao`)
    pub description: String,
    /// `data_recebimento`
    pub received_at: Option<String>,
    /// `unidade`
    pub unit: Option<String>,
    /// `usuario`
    pub user: Option<String>,
    /// `detalhes`
    pub details: Option<String>,
    /// `quantidade_dias`
    pub day_count: Option<i64>,
}

/// Number of history cells the schema has room for
pub const HISTORY_COLUMNS: usize = 5;

impl ProcessRecord {
    /// Builds a record from list data and positional history cells
    ///
    /// Missing cells become NULL columns. A day count that is not an integer is
    /// stored as NULL. Cells past the schema's width are dropped.
    pub fn from_parts(name: &str, description: &str, cells: &[String]) -> Self {
        let cell = |index: usize| cells.get(index).cloned();

        let day_count = cells.get(4).and_then(|raw| {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                return None;
            }
            match trimmed.parse::<i64>() {
                Ok(days) => Some(days),
                Err(_) => {
                    tracing::warn!("Day count '{}' for {} is not a number", trimmed, name);
                    None
                }
            }
        });

        if cells.len() > HISTORY_COLUMNS {
            tracing::debug!(
                "Dropping {} history cells beyond the schema for {}",
                cells.len() - HISTORY_COLUMNS,
                name
            );
        }

        Self {
            name: name.to_string(),
            description: description.to_string(),
            received_at: cell(0),
            unit: cell(1),
            user: cell(2),
            details: cell(3),
            day_count,
        }
    }
}

/// A record read back from the main table with its surrogate id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRecord {
    pub id: i64,
    pub record: ProcessRecord,
}

/// When staged records become visible in the main table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CommitMode {
    /// Stage, promote and drop the staging table inside one transaction per record
    #[default]
    PerRecord,
    /// Stage every record and promote them all at the end of the run
    PerRun,
}

impl CommitMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PerRecord => "per-record",
            Self::PerRun => "per-run",
        }
    }
}
