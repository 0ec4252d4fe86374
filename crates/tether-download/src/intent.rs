//! Host-delivered download intents

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum IntentAction {
    Open {
        location: PathBuf,
        mime_type: Option<String>,
    },
    Delete,
    Pause,
    Resume,
    Cancel,
}

impl IntentAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            IntentAction::Open { .. } => "open",
            IntentAction::Delete => "delete",
            IntentAction::Pause => "pause",
            IntentAction::Resume => "resume",
            IntentAction::Cancel => "cancel",
        }
    }
}

/// An action the user took on a notification, routed back by profile name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadIntent {
    pub notification_id: i32,
    pub profile_name: String,
    pub action: IntentAction,
}

impl DownloadIntent {
    pub fn new(notification_id: i32, profile_name: impl Into<String>, action: IntentAction) -> Self {
        Self {
            notification_id,
            profile_name: profile_name.into(),
            action,
        }
    }
}

/// Transient failures launching a host activity
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HostError {
    #[error("No application can handle {0}")]
    NoHandler(String),

    #[error("Security error: {0}")]
    Security(String),
}

/// Opens completed downloads with whatever the host has registered.
pub trait HostOpener: Send + Sync {
    fn open(&self, location: &Path, mime_type: Option<&str>) -> Result<(), HostError>;
}
