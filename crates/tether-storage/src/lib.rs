//! Tether Storage Layer
//!
//! SQLite-backed persistence for state that must survive process death:
//! known profiles, session-restore slots and process-wide
//! counters such as the download notification id.

mod database;
mod error;
mod migrations;

pub use database::Database;
pub use error::StorageError;

pub type Result<T> = std::result::Result<T, StorageError>;
