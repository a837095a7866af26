//! Persistent id → vector table.
//!
//! Each table holds `(id TEXT PRIMARY KEY, embedding BLOB)` rows where the
//! blob is the little-endian f32 encoding from [`crate::vector::codec`].
//! All vectors in one table share the dimension of the first vector written.

use rusqlite::{Connection, OptionalExtension, params};
use tracing::debug;

use super::error::{StoreError, StoreResult};
use super::schema::{
    VECTOR_COLUMNS, check_columns, create_vector_table_sql, quote_identifier, table_columns,
};
use crate::vector::{VectorDimension, VectorEntry, codec};

/// Vector table bound to a database connection.
pub struct VectorStore<'conn> {
    conn: &'conn Connection,
    table: String,
    quoted: String,
    dimension: Option<VectorDimension>,
}

impl<'conn> VectorStore<'conn> {
    /// Opens `table`, creating it when missing.
    ///
    /// Fails with [`StoreError::SchemaConflict`] when a table of that name
    /// exists with any other layout.
    pub fn open(conn: &'conn Connection, table: &str) -> StoreResult<Self> {
        match table_columns(conn, table)? {
            Some(found) => check_columns(table, &found, VECTOR_COLUMNS, Some("id"))?,
            None => {
                debug!(table, "creating vector table");
                conn.execute(&create_vector_table_sql(table), [])?;
            }
        }
        Self::bind(conn, table)
    }

    /// Opens `table` for reading; fails with [`StoreError::TableNotFound`]
    /// instead of creating it.
    pub fn open_existing(conn: &'conn Connection, table: &str) -> StoreResult<Self> {
        match table_columns(conn, table)? {
            Some(found) => check_columns(table, &found, VECTOR_COLUMNS, Some("id"))?,
            None => {
                return Err(StoreError::TableNotFound {
                    table: table.to_string(),
                });
            }
        }
        Self::bind(conn, table)
    }

    fn bind(conn: &'conn Connection, table: &str) -> StoreResult<Self> {
        let mut store = Self {
            conn,
            table: table.to_string(),
            quoted: quote_identifier(table),
            dimension: None,
        };
        store.dimension = store.detect_dimension()?;
        Ok(store)
    }

    fn detect_dimension(&self) -> StoreResult<Option<VectorDimension>> {
        let row: Option<(String, Vec<u8>)> = self
            .conn
            .query_row(
                &format!(
                    "SELECT id, embedding FROM {} WHERE embedding IS NOT NULL LIMIT 1",
                    self.quoted
                ),
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        match row {
            Some((id, bytes)) => {
                let vector = self.decode_entry(&id, &bytes)?;
                let dimension = VectorDimension::new(vector.len()).map_err(|source| {
                    StoreError::MalformedEntry {
                        table: self.table.clone(),
                        id,
                        source,
                    }
                })?;
                Ok(Some(dimension))
            }
            None => Ok(None),
        }
    }

    /// Name of the underlying table.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Dimension shared by the stored vectors, `None` while the table is empty.
    pub fn dimension(&self) -> Option<VectorDimension> {
        self.dimension
    }

    /// Inserts or replaces a single vector.
    pub fn upsert(&mut self, entry: &VectorEntry) -> StoreResult<()> {
        self.upsert_many(std::slice::from_ref(entry))
    }

    /// Inserts or replaces a batch of vectors in one transaction.
    ///
    /// The whole batch is checked against the table dimension before
    /// anything is written, so a mismatch leaves the table untouched.
    pub fn upsert_many(&mut self, entries: &[VectorEntry]) -> StoreResult<()> {
        if entries.is_empty() {
            return Ok(());
        }

        let dimension = self.check_batch(entries)?;

        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare_cached(&format!(
                "INSERT INTO {} (id, embedding) VALUES (?1, ?2)
                 ON CONFLICT(id) DO UPDATE SET embedding = excluded.embedding",
                self.quoted
            ))?;
            for entry in entries {
                stmt.execute(params![entry.id, codec::encode(&entry.vector)])?;
            }
        }
        tx.commit()?;

        self.dimension = Some(dimension);
        debug!(table = %self.table, count = entries.len(), "stored vectors");
        Ok(())
    }

    fn check_batch(&self, entries: &[VectorEntry]) -> StoreResult<VectorDimension> {
        let expected = match self.dimension {
            Some(dimension) => dimension,
            None => VectorDimension::new(entries[0].vector.len()).map_err(|source| {
                StoreError::MalformedEntry {
                    table: self.table.clone(),
                    id: entries[0].id.clone(),
                    source,
                }
            })?,
        };

        for entry in entries {
            if entry.vector.len() != expected.get() {
                return Err(StoreError::DimensionMismatch {
                    table: self.table.clone(),
                    id: entry.id.clone(),
                    expected: expected.get(),
                    actual: entry.vector.len(),
                });
            }
        }
        Ok(expected)
    }

    /// Looks up the vector stored for `id`.
    pub fn get(&self, id: &str) -> StoreResult<Option<VectorEntry>> {
        let bytes: Option<Vec<u8>> = self
            .conn
            .query_row(
                &format!("SELECT embedding FROM {} WHERE id = ?1", self.quoted),
                [id],
                |row| row.get(0),
            )
            .optional()?;

        match bytes {
            Some(bytes) => {
                let vector = self.decode_entry(id, &bytes)?;
                Ok(Some(VectorEntry::new(id, vector)))
            }
            None => Ok(None),
        }
    }

    /// Returns true when a row exists for `id`.
    pub fn contains(&self, id: &str) -> StoreResult<bool> {
        let found: Option<i64> = self
            .conn
            .query_row(
                &format!("SELECT 1 FROM {} WHERE id = ?1", self.quoted),
                [id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Number of stored rows.
    pub fn count(&self) -> StoreResult<usize> {
        let count: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", self.quoted),
            [],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// Streams every stored entry to `visit` in table order.
    ///
    /// Rows are decoded one at a time; the first undecodable row stops the
    /// scan with [`StoreError::MalformedEntry`] naming its id.
    pub fn scan_each<F>(&self, mut visit: F) -> StoreResult<()>
    where
        F: FnMut(VectorEntry) -> StoreResult<()>,
    {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT id, embedding FROM {} ORDER BY rowid", self.quoted))?;
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            let id: String = row.get(0)?;
            let bytes: Option<Vec<u8>> = row.get(1)?;
            let vector = self.decode_entry(&id, bytes.as_deref().unwrap_or_default())?;
            visit(VectorEntry::new(id, vector))?;
        }
        Ok(())
    }

    /// Collects every stored entry in table order.
    pub fn scan(&self) -> StoreResult<Vec<VectorEntry>> {
        let mut entries = Vec::new();
        self.scan_each(|entry| {
            entries.push(entry);
            Ok(())
        })?;
        Ok(entries)
    }

    fn decode_entry(&self, id: &str, bytes: &[u8]) -> StoreResult<Vec<f32>> {
        let decoded = match self.dimension {
            Some(dimension) => codec::decode_with_dimension(bytes, dimension),
            None => codec::decode(bytes),
        };
        decoded.map_err(|source| StoreError::MalformedEntry {
            table: self.table.clone(),
            id: id.to_string(),
            source,
        })
    }
}

impl crate::embedding::BatchSink for VectorStore<'_> {
    fn contains(&self, id: &str) -> StoreResult<bool> {
        VectorStore::contains(self, id)
    }

    fn write_batch(&mut self, entries: &[VectorEntry]) -> StoreResult<()> {
        self.upsert_many(entries)
    }
}
