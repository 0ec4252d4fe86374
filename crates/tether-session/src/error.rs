//! Session error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Storage error: {0}")]
    Storage(#[from] tether_storage::StorageError),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unsupported session snapshot version: {0}")]
    UnsupportedVersion(u32),

    #[error("Session key must be 32 bytes, got {0}")]
    InvalidKeyLength(usize),

    #[error("Session slot {0} failed")]
    Crypto(&'static str),
}
