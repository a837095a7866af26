//! Table shape checks shared by the vector and edge tables.
//!
//! Tables are created on first use. A table that already exists is only
//! accepted when its columns match the expected layout exactly, so data
//! written by another tool is never silently reinterpreted.

use rusqlite::Connection;

use super::error::{StoreError, StoreResult};

/// Column layout of the vector table.
pub const VECTOR_COLUMNS: &[&str] = &["id", "embedding"];

/// Column layout of the similarity edge table.
pub const EDGE_COLUMNS: &[&str] = &["source_id", "target_id", "score"];

/// One row of `PRAGMA table_info`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnInfo {
    pub name: String,
    pub declared_type: String,
    /// 1-based position within the primary key, 0 when not part of it.
    pub primary_key: i64,
}

/// Quotes an SQL identifier so any table name can be used safely.
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Reads the column list of `table`, or `None` when the table does not exist.
pub fn table_columns(conn: &Connection, table: &str) -> StoreResult<Option<Vec<ColumnInfo>>> {
    let mut stmt = conn.prepare("SELECT name, type, pk FROM pragma_table_info(?1) ORDER BY cid")?;
    let columns = stmt
        .query_map([table], |row| {
            Ok(ColumnInfo {
                name: row.get(0)?,
                declared_type: row.get(1)?,
                primary_key: row.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    if columns.is_empty() {
        Ok(None)
    } else {
        Ok(Some(columns))
    }
}

/// Returns true when `table` exists in the main schema.
pub fn table_exists(conn: &Connection, table: &str) -> StoreResult<bool> {
    Ok(table_columns(conn, table)?.is_some())
}

/// Compares an existing layout against the expected column names.
///
/// Names are compared case-insensitively, as SQLite does. When `key` is set,
/// that column must also be the table's sole primary key.
pub fn check_columns(
    table: &str,
    found: &[ColumnInfo],
    expected: &[&str],
    key: Option<&str>,
) -> StoreResult<()> {
    let names_match = found.len() == expected.len()
        && found
            .iter()
            .zip(expected)
            .all(|(column, name)| column.name.eq_ignore_ascii_case(name));

    let key_matches = match key {
        Some(key) => {
            let keys: Vec<&ColumnInfo> = found.iter().filter(|c| c.primary_key > 0).collect();
            keys.len() == 1 && keys[0].name.eq_ignore_ascii_case(key)
        }
        None => true,
    };

    if names_match && key_matches {
        Ok(())
    } else {
        Err(StoreError::SchemaConflict {
            table: table.to_string(),
            found: found.iter().map(|c| c.name.clone()).collect(),
            expected: expected.iter().map(|s| (*s).to_string()).collect(),
        })
    }
}

pub(crate) fn create_vector_table_sql(table: &str) -> String {
    format!(
        "CREATE TABLE {} (id TEXT PRIMARY KEY, embedding BLOB)",
        quote_identifier(table)
    )
}

pub(crate) fn create_edge_table_sql(table: &str) -> String {
    format!(
        "CREATE TABLE {} (source_id TEXT, target_id TEXT, score REAL)",
        quote_identifier(table)
    )
}

pub(crate) fn create_edge_index_sql(table: &str) -> String {
    format!(
        "CREATE INDEX IF NOT EXISTS {} ON {} (source_id)",
        quote_identifier(&format!("idx_{table}_source_id")),
        quote_identifier(table)
    )
}
