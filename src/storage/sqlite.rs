//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the RecordStore trait.

use crate::storage::schema::{
    initialize_schema, table_exists, MAIN_TABLE, RECORD_COLUMNS, STAGING_SQL, STAGING_TABLE,
};
use crate::storage::traits::{CommitStep, RecordStore, StorageError, StorageResult};
use crate::storage::{CommitMode, ProcessRecord, StoredRecord};
use rusqlite::{params, Connection};
use std::path::Path;

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
    mode: CommitMode,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    /// * `mode` - When staged records are promoted into `processos`
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn new(path: &Path, mode: CommitMode) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn, mode })
    }

    /// Creates an in-memory database
    pub fn new_in_memory(mode: CommitMode) -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self { conn, mode })
    }

    pub fn mode(&self) -> CommitMode {
        self.mode
    }

    /// Creates the staging table if needed and inserts one record into it
    fn stage(conn: &Connection, record: &ProcessRecord) -> StorageResult<()> {
        conn.execute_batch(STAGING_SQL)
            .map_err(|e| commit_error(CommitStep::CreateStaging, e))?;

        conn.execute(
            &format!(
                "INSERT INTO {} ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                STAGING_TABLE, RECORD_COLUMNS
            ),
            params![
                record.name,
                record.description,
                record.received_at,
                record.unit,
                record.user,
                record.details,
                record.day_count,
            ],
        )
        .map_err(|e| commit_error(CommitStep::Insert, e))?;

        Ok(())
    }

    /// Copies every staged row into the main table and drops the staging table
    fn promote(conn: &Connection) -> StorageResult<u64> {
        let promoted = conn
            .execute(
                &format!(
                    "INSERT INTO {} ({}) SELECT {} FROM {} ORDER BY id",
                    MAIN_TABLE, RECORD_COLUMNS, RECORD_COLUMNS, STAGING_TABLE
                ),
                [],
            )
            .map_err(|e| commit_error(CommitStep::Promote, e))?;

        conn.execute_batch(&format!("DROP TABLE IF EXISTS {}", STAGING_TABLE))
            .map_err(|e| commit_error(CommitStep::DropStaging, e))?;

        Ok(promoted as u64)
    }
}

impl RecordStore for SqliteStorage {
    fn clear(&mut self) -> StorageResult<()> {
        self.conn.execute_batch(&format!(
            "DELETE FROM {}; DROP TABLE IF EXISTS {};",
            MAIN_TABLE, STAGING_TABLE
        ))?;
        tracing::info!("Cleared table {}", MAIN_TABLE);
        Ok(())
    }

    fn commit(&mut self, record: &ProcessRecord) -> StorageResult<()> {
        // Every step shares one transaction; dropping it on error rolls back
        let tx = self
            .conn
            .transaction()
            .map_err(|e| commit_error(CommitStep::Transaction, e))?;

        Self::stage(&tx, record)?;

        if self.mode == CommitMode::PerRecord {
            Self::promote(&tx)?;
        }

        tx.commit()
            .map_err(|e| commit_error(CommitStep::Transaction, e))?;

        tracing::debug!("Committed {} ({})", record.name, self.mode.as_str());
        Ok(())
    }

    fn finish(&mut self) -> StorageResult<u64> {
        if !table_exists(&self.conn, STAGING_TABLE)? {
            return Ok(0);
        }

        let tx = self
            .conn
            .transaction()
            .map_err(|e| commit_error(CommitStep::Transaction, e))?;
        let promoted = Self::promote(&tx)?;
        tx.commit()
            .map_err(|e| commit_error(CommitStep::Transaction, e))?;

        tracing::info!("Promoted {} staged records into {}", promoted, MAIN_TABLE);
        Ok(promoted)
    }

    fn count(&self) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", MAIN_TABLE),
            [],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn staged_count(&self) -> StorageResult<u64> {
        if !table_exists(&self.conn, STAGING_TABLE)? {
            return Ok(0);
        }

        let count: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", STAGING_TABLE),
            [],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn records(&self) -> StorageResult<Vec<StoredRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT id, {} FROM {} ORDER BY id",
            RECORD_COLUMNS, MAIN_TABLE
        ))?;

        let rows = stmt.query_map([], |row| {
            Ok(StoredRecord {
                id: row.get(0)?,
                record: ProcessRecord {
                    name: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
                    description: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                    received_at: row.get(3)?,
                    unit: row.get(4)?,
                    user: row.get(5)?,
                    details: row.get(6)?,
                    day_count: row.get(7)?,
                },
            })
        })?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        Ok(records)
    }
}

fn commit_error(step: CommitStep, source: rusqlite::Error) -> StorageError {
    StorageError::Commit { step, source }
}
