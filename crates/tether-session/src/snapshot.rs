//! Serialized form of a browser's tabs

use serde::{Deserialize, Serialize};

use tether_tabs::Tab;

use crate::error::SessionError;
use crate::Result;

const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabSnapshot {
    pub url: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub version: u32,
    pub tabs: Vec<TabSnapshot>,
    pub active_index: Option<usize>,
}

impl SessionSnapshot {
    pub fn from_tabs(tabs: &[Tab], active_tab_id: Option<&str>) -> Self {
        let active_index = active_tab_id.and_then(|id| tabs.iter().position(|t| t.id() == id));

        Self {
            version: SNAPSHOT_VERSION,
            tabs: tabs
                .iter()
                .map(|tab| TabSnapshot {
                    url: tab.url(),
                    title: tab.title(),
                })
                .collect(),
            active_index,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tabs.is_empty()
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let snapshot: SessionSnapshot = serde_json::from_slice(bytes)?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(SessionError::UnsupportedVersion(snapshot.version));
        }
        Ok(snapshot)
    }
}
