//! Records from an SQL query against the open database.

use rusqlite::Connection;
use rusqlite::types::ValueRef;

use super::{ContentRecord, RecordSource, Records, SourceError, SourceResult, TextJoiner};

/// Records produced by running a query.
///
/// The first projected column is the id. Other databases can be attached to
/// the connection beforehand (see [`crate::storage::attach_database`]) and
/// referenced as `alias.table`.
///
/// Rows are read eagerly: the vector table shares this connection, so the
/// statement must be finished before the first batch is written.
pub struct QuerySource<'conn> {
    conn: &'conn Connection,
    query: String,
    joiner: Box<dyn TextJoiner>,
}

impl<'conn> QuerySource<'conn> {
    pub fn new(conn: &'conn Connection, query: impl Into<String>, joiner: Box<dyn TextJoiner>) -> Self {
        Self {
            conn,
            query: query.into(),
            joiner,
        }
    }

    fn query_error(&self, source: rusqlite::Error) -> SourceError {
        SourceError::Query {
            query: self.query.clone(),
            source,
        }
    }
}

impl RecordSource for QuerySource<'_> {
    fn records(self) -> SourceResult<Records> {
        let mut stmt = self
            .conn
            .prepare(&self.query)
            .map_err(|e| self.query_error(e))?;
        let column_count = stmt.column_count();

        let mut rows = stmt.query([]).map_err(|e| self.query_error(e))?;
        let mut records: Vec<SourceResult<ContentRecord>> = Vec::new();
        let mut row_number = 0;

        while let Some(row) = rows.next().map_err(|e| self.query_error(e))? {
            row_number += 1;
            if column_count < 2 {
                records.push(Err(SourceError::Schema {
                    row: row_number,
                    reason: format!(
                        "query returned {column_count} column(s); expected an id column and at least one text column"
                    ),
                }));
                break;
            }

            let id = match row.get_ref(0).map_err(|e| self.query_error(e))? {
                ValueRef::Blob(_) => {
                    records.push(Err(SourceError::Schema {
                        row: row_number,
                        reason: "id column must not be a BLOB".to_string(),
                    }));
                    break;
                }
                value => render(value).unwrap_or_default(),
            };

            let mut fields = Vec::with_capacity(column_count - 1);
            for index in 1..column_count {
                let value = row.get_ref(index).map_err(|e| self.query_error(e))?;
                if let Some(text) = render(value) {
                    fields.push(text);
                }
            }

            records.push(Ok(ContentRecord {
                id,
                text: self.joiner.join(&fields),
            }));
        }

        tracing::debug!(rows = row_number, "query finished");
        Ok(Box::new(records.into_iter()))
    }
}

/// Text form of a column value; `None` for BLOBs, which carry no text.
fn render(value: ValueRef<'_>) -> Option<String> {
    match value {
        ValueRef::Null => Some(String::new()),
        ValueRef::Integer(i) => Some(i.to_string()),
        ValueRef::Real(f) => Some(f.to_string()),
        ValueRef::Text(bytes) => Some(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(_) => None,
    }
}
