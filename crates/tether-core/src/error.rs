//! Core error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Storage error: {0}")]
    Storage(#[from] tether_storage::StorageError),

    #[error("Tab error: {0}")]
    Tab(#[from] tether_tabs::TabError),

    #[error("Session error: {0}")]
    Session(#[from] tether_session::SessionError),

    #[error("Download error: {0}")]
    Download(#[from] tether_download::DownloadError),

    #[error("Engine error: {0}")]
    Engine(#[from] tether_engine::EngineError),

    #[error("Crash reporter error: {0}")]
    Crash(#[from] crate::crash::CrashError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0} used after destroy")]
    UsedAfterDestroy(&'static str),

    #[error("Browser is detached from its host")]
    Detached,

    #[error("Browser has not been created yet")]
    NotCreated,

    #[error("Invalid lifecycle transition: {from} -> {to}")]
    InvalidLifecycle { from: String, to: String },

    #[error("Invalid profile name: {0:?}")]
    InvalidProfileName(String),

    #[error("Profile is still in use: {0}")]
    ProfileInUse(String),

    #[error("{capability} needs boundary version {required}, have {available}")]
    Unsupported {
        capability: &'static str,
        required: u32,
        available: u32,
    },

    #[error("Background task ended without a result")]
    BackgroundTaskLost,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Runtime not initialized")]
    NotInitialized,
}

impl From<tether_engine::HandleError> for CoreError {
    fn from(e: tether_engine::HandleError) -> Self {
        CoreError::UsedAfterDestroy(e.kind)
    }
}
