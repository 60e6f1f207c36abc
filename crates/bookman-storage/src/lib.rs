//! Bookman Storage Layer
//!
//! SQLite persistence for users and books.
//! One database file; multi-statement writes go through `Database::transaction`.

mod database;
mod error;
mod migrations;

pub use database::{parse_timestamp, Database};
pub use error::StorageError;
pub use migrations::SCHEMA_VERSION;

pub type Result<T> = std::result::Result<T, StorageError>;
