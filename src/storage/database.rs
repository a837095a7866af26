//! Opening the database file and attaching auxiliary databases.

use std::path::Path;

use rusqlite::Connection;
use tracing::debug;

use super::error::{StoreError, StoreResult};
use super::schema::quote_identifier;

/// Opens (creating if needed) the SQLite database at `path`.
pub fn open_database(path: &Path) -> StoreResult<Connection> {
    debug!(path = %path.display(), "opening database");
    let conn = Connection::open(path)?;
    conn.busy_timeout(std::time::Duration::from_secs(5))?;
    Ok(conn)
}

/// Attaches another database file under `alias` so queries can reference it
/// as `alias.table`.
pub fn attach_database(conn: &Connection, alias: &str, path: &Path) -> StoreResult<()> {
    let path_text = path.to_string_lossy().into_owned();
    debug!(alias, path = %path_text, "attaching database");
    conn.execute(
        &format!("ATTACH DATABASE ?1 AS {}", quote_identifier(alias)),
        [&path_text],
    )
    .map_err(|source| StoreError::Attach {
        alias: alias.to_string(),
        path: path_text.clone(),
        source,
    })?;
    Ok(())
}
