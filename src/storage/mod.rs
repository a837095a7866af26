//! SQLite persistence for vectors and similarity edges.

pub mod database;
mod edges;
mod error;
pub mod schema;
mod vectors;

pub use database::{attach_database, open_database};
pub use edges::EdgeStore;
pub use error::{StoreError, StoreResult};
pub use vectors::VectorStore;
