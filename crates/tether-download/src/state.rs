//! Download State Machine
//!
//! ```text
//! InProgress <-> Paused
//!     |             |
//!     +--> Complete |
//!     +--> Failed   |
//!     +--> Cancelled <-+
//! ```

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DownloadState {
    InProgress,
    Paused,
    Complete,
    Cancelled,
    Failed,
}

impl DownloadState {
    pub fn can_transition_to(&self, target: DownloadState) -> bool {
        use DownloadState::*;

        matches!(
            (self, target),
            (InProgress, Paused)
                | (Paused, InProgress)
                | (InProgress, Complete)
                | (InProgress, Failed)
                | (InProgress, Cancelled)
                | (Paused, Cancelled)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            DownloadState::Complete | DownloadState::Cancelled | DownloadState::Failed
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DownloadState::InProgress => "in_progress",
            DownloadState::Paused => "paused",
            DownloadState::Complete => "complete",
            DownloadState::Cancelled => "cancelled",
            DownloadState::Failed => "failed",
        }
    }
}

impl std::fmt::Display for DownloadState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for DownloadState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "in_progress" => Ok(DownloadState::InProgress),
            "paused" => Ok(DownloadState::Paused),
            "complete" => Ok(DownloadState::Complete),
            "cancelled" => Ok(DownloadState::Cancelled),
            "failed" => Ok(DownloadState::Failed),
            _ => Err(format!("Unknown download state: {}", s)),
        }
    }
}
