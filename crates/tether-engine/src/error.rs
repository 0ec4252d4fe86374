//! Engine error types

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("Engine startup failed: {0}")]
    StartupFailed(String),

    #[error("Profile is still in use: {0}")]
    ProfileInUse(String),

    #[error("Engine rejected request: {0}")]
    Rejected(String),

    #[error("IO error: {0}")]
    Io(String),
}

/// Raised when an operation reaches a handle that was already closed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind} used after destroy")]
pub struct HandleError {
    pub kind: &'static str,
}
