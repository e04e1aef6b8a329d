//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the harvester database.

/// Durable table of extracted records
pub const MAIN_TABLE: &str = "processos";

/// Staging table records pass through before promotion
pub const STAGING_TABLE: &str = "processos_temp";

/// Data columns shared by the main and staging tables, in insert order
pub const RECORD_COLUMNS: &str =
    "nome_processo, descricao, data_recebimento, unidade, usuario, detalhes, quantidade_dias";

/// SQL schema for the main table
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS processos (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    nome_processo TEXT,
    descricao TEXT,
    data_recebimento TEXT,
    unidade TEXT,
    usuario TEXT,
    detalhes TEXT,
    quantidade_dias INTEGER
);
"#;

/// SQL for the staging table; same shape as `processos`
pub const STAGING_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS processos_temp (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    nome_processo TEXT,
    descricao TEXT,
    data_recebimento TEXT,
    unidade TEXT,
    usuario TEXT,
    detalhes TEXT,
    quantidade_dias INTEGER
);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}

/// Returns true if a table with the given name exists
pub fn table_exists(conn: &rusqlite::Connection, table: &str) -> Result<bool, rusqlite::Error> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
        [table],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}
