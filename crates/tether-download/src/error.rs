//! Download error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DownloadError {
    #[error("Download not found: {0}")]
    NotFound(i32),

    #[error("Download {id} cannot go from {from} to {to}")]
    InvalidTransition { id: i32, from: String, to: String },

    #[error("Download used after destroy: {0}")]
    Destroyed(i32),

    #[error("Storage error: {0}")]
    Storage(#[from] tether_storage::StorageError),
}
