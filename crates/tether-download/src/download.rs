//! Download session

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};

use tether_engine::{Engine, NativeHandle, RawHandle};

use crate::error::DownloadError;
use crate::state::DownloadState;
use crate::Result;

/// One engine transfer. Not `Clone`: it owns the engine handle.
#[derive(Debug)]
pub struct Download {
    notification_id: i32,
    profile_name: String,
    url: String,
    location: PathBuf,
    mime_type: Option<String>,
    total_bytes: Option<u64>,
    received_bytes: u64,
    state: DownloadState,
    error_code: Option<i32>,
    notifications_disabled: bool,
    created_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    handle: NativeHandle,
}

/// Read-only view of a download handed to callers.
#[derive(Debug, Clone, Serialize)]
pub struct DownloadSnapshot {
    pub notification_id: i32,
    pub profile_name: String,
    pub url: String,
    pub location: PathBuf,
    pub mime_type: Option<String>,
    pub total_bytes: Option<u64>,
    pub received_bytes: u64,
    pub state: DownloadState,
    pub error_code: Option<i32>,
    pub notifications_disabled: bool,
    pub progress: Option<u8>,
    pub destroyed: bool,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Download {
    /// A download the engine just started.
    pub fn new(
        notification_id: i32,
        profile_name: String,
        url: String,
        location: PathBuf,
        mime_type: Option<String>,
        handle: RawHandle,
    ) -> Self {
        Self {
            notification_id,
            profile_name,
            url,
            location,
            mime_type,
            total_bytes: None,
            received_bytes: 0,
            state: DownloadState::InProgress,
            error_code: None,
            notifications_disabled: false,
            created_at: Utc::now(),
            completed_at: None,
            handle: NativeHandle::new("download", handle),
        }
    }

    pub fn notification_id(&self) -> i32 {
        self.notification_id
    }

    pub fn profile_name(&self) -> &str {
        &self.profile_name
    }

    pub fn state(&self) -> DownloadState {
        self.state
    }

    pub fn location(&self) -> &Path {
        &self.location
    }

    pub fn mime_type(&self) -> Option<&str> {
        self.mime_type.as_deref()
    }

    pub fn error_code(&self) -> Option<i32> {
        self.error_code
    }

    pub fn notifications_disabled(&self) -> bool {
        self.notifications_disabled
    }

    pub fn is_destroyed(&self) -> bool {
        !self.handle.is_live()
    }

    pub fn file_name(&self) -> String {
        self.location
            .file_name()
            .and_then(|name| name.to_str())
            .filter(|name| !name.trim().is_empty())
            .unwrap_or("download")
            .to_string()
    }

    /// Progress as a percentage, known only once the total size is.
    pub fn progress(&self) -> Option<u8> {
        match self.total_bytes {
            Some(total) if total > 0 => {
                let percent = (self.received_bytes as f64 / total as f64 * 100.0).min(100.0);
                Some(percent as u8)
            }
            _ => None,
        }
    }

    fn ensure_live(&self) -> Result<RawHandle> {
        self.handle
            .ensure_live()
            .map_err(|_| DownloadError::Destroyed(self.notification_id))
    }

    fn transition_to(&mut self, target: DownloadState) -> Result<()> {
        self.ensure_live()?;

        if !self.state.can_transition_to(target) {
            return Err(DownloadError::InvalidTransition {
                id: self.notification_id,
                from: self.state.to_string(),
                to: target.to_string(),
            });
        }

        tracing::debug!(
            notification_id = self.notification_id,
            from = %self.state,
            to = %target,
            "Download state transition"
        );

        self.state = target;
        if target.is_terminal() {
            self.completed_at = Some(Utc::now());
        }
        Ok(())
    }

    pub fn pause(&mut self, engine: &dyn Engine) -> Result<()> {
        let handle = self.ensure_live()?;
        self.transition_to(DownloadState::Paused)?;
        engine.pause_download(handle);
        Ok(())
    }

    pub fn resume(&mut self, engine: &dyn Engine) -> Result<()> {
        let handle = self.ensure_live()?;
        self.transition_to(DownloadState::InProgress)?;
        engine.resume_download(handle);
        Ok(())
    }

    pub fn cancel(&mut self, engine: &dyn Engine) -> Result<()> {
        let handle = self.ensure_live()?;
        self.transition_to(DownloadState::Cancelled)?;
        engine.cancel_download(handle);
        Ok(())
    }

    /// Engine progress event
    pub fn record_progress(&mut self, received_bytes: u64, total_bytes: Option<u64>) -> Result<()> {
        self.ensure_live()?;
        if self.state.is_terminal() {
            return Err(DownloadError::InvalidTransition {
                id: self.notification_id,
                from: self.state.to_string(),
                to: self.state.to_string(),
            });
        }

        self.received_bytes = received_bytes;
        if total_bytes.is_some() {
            self.total_bytes = total_bytes;
        }
        Ok(())
    }

    /// Engine completion event; the final location may differ from the
    /// one announced at start.
    pub fn complete(&mut self, final_location: Option<PathBuf>) -> Result<()> {
        self.transition_to(DownloadState::Complete)?;
        if let Some(location) = final_location {
            self.location = location;
        }
        if let Some(total) = self.total_bytes {
            self.received_bytes = total;
        }
        Ok(())
    }

    /// Engine failure event
    pub fn fail(&mut self, error_code: i32) -> Result<()> {
        self.transition_to(DownloadState::Failed)?;
        self.error_code = Some(error_code);
        Ok(())
    }

    pub fn disable_notifications(&mut self) -> Result<()> {
        self.ensure_live()?;
        self.notifications_disabled = true;
        Ok(())
    }

    /// Zero the handle; the engine tore the transfer down.
    pub fn destroy(&mut self) -> Option<RawHandle> {
        self.handle.close()
    }

    pub fn snapshot(&self) -> DownloadSnapshot {
        DownloadSnapshot {
            notification_id: self.notification_id,
            profile_name: self.profile_name.clone(),
            url: self.url.clone(),
            location: self.location.clone(),
            mime_type: self.mime_type.clone(),
            total_bytes: self.total_bytes,
            received_bytes: self.received_bytes,
            state: self.state,
            error_code: self.error_code,
            notifications_disabled: self.notifications_disabled,
            progress: self.progress(),
            destroyed: self.is_destroyed(),
            created_at: self.created_at,
            completed_at: self.completed_at,
        }
    }
}
