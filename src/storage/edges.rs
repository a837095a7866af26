//! Persisted similarity edges.
//!
//! Edges live in `(source_id, target_id, score)` rows indexed by
//! `source_id`. Saving a source replaces all of its edges at once, so
//! re-running a calculation never leaves stale neighbours behind and never
//! touches edges of sources outside the run.

use rusqlite::{Connection, params};
use tracing::debug;

use super::error::{StoreError, StoreResult};
use super::schema::{
    EDGE_COLUMNS, check_columns, create_edge_index_sql, create_edge_table_sql, quote_identifier,
    table_columns,
};
use crate::similarity::{SimilarityEdge, SourceNeighbors};

/// Similarity edge table bound to a database connection.
pub struct EdgeStore<'conn> {
    conn: &'conn Connection,
    table: String,
    quoted: String,
}

impl<'conn> EdgeStore<'conn> {
    /// Opens `table`, creating it and its `source_id` index when missing.
    pub fn open(conn: &'conn Connection, table: &str) -> StoreResult<Self> {
        match table_columns(conn, table)? {
            Some(found) => check_columns(table, &found, EDGE_COLUMNS, None)?,
            None => {
                debug!(table, "creating similarity table");
                conn.execute(&create_edge_table_sql(table), [])?;
            }
        }
        conn.execute(&create_edge_index_sql(table), [])?;

        Ok(Self {
            conn,
            table: table.to_string(),
            quoted: quote_identifier(table),
        })
    }

    /// Opens `table` for reading without creating it.
    pub fn open_existing(conn: &'conn Connection, table: &str) -> StoreResult<Self> {
        match table_columns(conn, table)? {
            Some(found) => check_columns(table, &found, EDGE_COLUMNS, None)?,
            None => {
                return Err(StoreError::TableNotFound {
                    table: table.to_string(),
                });
            }
        }
        Ok(Self {
            conn,
            table: table.to_string(),
            quoted: quote_identifier(table),
        })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Replaces every edge of `source_id` with `edges` in one transaction.
    ///
    /// Edges whose `source_id` differs from the argument are rejected by a
    /// debug assertion; callers always pass the output of one source.
    pub fn replace_for_source(&self, source_id: &str, edges: &[SimilarityEdge]) -> StoreResult<()> {
        debug_assert!(edges.iter().all(|e| e.source_id == source_id));

        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            &format!("DELETE FROM {} WHERE source_id = ?1", self.quoted),
            [source_id],
        )?;
        {
            let mut stmt = tx.prepare_cached(&format!(
                "INSERT INTO {} (source_id, target_id, score) VALUES (?1, ?2, ?3)",
                self.quoted
            ))?;
            for edge in edges {
                stmt.execute(params![source_id, edge.target_id, f64::from(edge.score)])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Saves the neighbour lists of several sources, one transaction each.
    ///
    /// Returns the number of edges written.
    pub fn save_all(&self, results: &[SourceNeighbors]) -> StoreResult<usize> {
        let mut written = 0;
        for result in results {
            let edges = result.edges();
            self.replace_for_source(&result.source_id, &edges)?;
            written += edges.len();
        }
        debug!(table = %self.table, sources = results.len(), edges = written, "saved similarity edges");
        Ok(written)
    }

    /// Edges stored for `source_id`, highest score first.
    pub fn edges_for(&self, source_id: &str) -> StoreResult<Vec<SimilarityEdge>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT source_id, target_id, score FROM {} WHERE source_id = ?1 ORDER BY score DESC, rowid",
            self.quoted
        ))?;
        let edges = stmt
            .query_map([source_id], |row| {
                let score: f64 = row.get(2)?;
                Ok(SimilarityEdge {
                    source_id: row.get(0)?,
                    target_id: row.get(1)?,
                    score: score as f32,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(edges)
    }

    /// Total number of stored edges.
    pub fn count(&self) -> StoreResult<usize> {
        let count: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", self.quoted),
            [],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}
