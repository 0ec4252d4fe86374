//! Per-profile download manager
//!
//! Engine events and host commands both land here; after every transition
//! the host notification is recomputed and pushed to the sink.

use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;

use tether_engine::{Engine, RawHandle};
use tether_storage::Database;

use crate::download::{Download, DownloadSnapshot};
use crate::error::DownloadError;
use crate::ids::NotificationIdAllocator;
use crate::intent::{DownloadIntent, HostOpener, IntentAction};
use crate::notification::{Notification, NotificationSink};
use crate::Result;

pub struct DownloadManager {
    profile_name: String,
    /// Sessions keyed by notification id
    downloads: Arc<RwLock<HashMap<i32, Download>>>,
    /// Ids with a notification currently shown on the host
    shown: Arc<RwLock<HashSet<i32>>>,
    ids: NotificationIdAllocator,
    engine: Arc<dyn Engine>,
    sink: Arc<dyn NotificationSink>,
    opener: Arc<dyn HostOpener>,
}

impl DownloadManager {
    pub fn new(
        profile_name: String,
        db: Database,
        engine: Arc<dyn Engine>,
        sink: Arc<dyn NotificationSink>,
        opener: Arc<dyn HostOpener>,
    ) -> Self {
        Self {
            profile_name,
            downloads: Arc::new(RwLock::new(HashMap::new())),
            shown: Arc::new(RwLock::new(HashSet::new())),
            ids: NotificationIdAllocator::new(db),
            engine,
            sink,
            opener,
        }
    }

    pub fn profile_name(&self) -> &str {
        &self.profile_name
    }

    /// Engine event: a new transfer began.
    pub fn download_started(
        &self,
        handle: RawHandle,
        url: String,
        location: PathBuf,
        mime_type: Option<String>,
    ) -> Result<i32> {
        let id = self.ids.next_id()?;
        let download = Download::new(
            id,
            self.profile_name.clone(),
            url,
            location,
            mime_type,
            handle,
        );

        tracing::info!(
            notification_id = id,
            profile = %self.profile_name,
            "Download started"
        );

        let notification = Notification::for_download(&download);
        self.downloads.write().insert(id, download);
        self.publish(id, notification);

        Ok(id)
    }

    /// Engine event: bytes arrived.
    pub fn progress_changed(&self, id: i32, received: u64, total: Option<u64>) -> Result<()> {
        self.update(id, |d, _| d.record_progress(received, total))
    }

    /// Engine event: transfer finished.
    pub fn download_completed(&self, id: i32, location: Option<PathBuf>) -> Result<()> {
        self.update(id, |d, _| d.complete(location))?;
        tracing::info!(notification_id = id, "Download completed");
        Ok(())
    }

    /// Engine event: transfer failed.
    pub fn download_failed(&self, id: i32, error_code: i32) -> Result<()> {
        self.update(id, |d, _| d.fail(error_code))?;
        tracing::warn!(notification_id = id, error_code, "Download failed");
        Ok(())
    }

    /// Engine event: the transfer object is gone. The session leaves the
    /// id map; a notification already on the host stays until dismissed.
    pub fn download_destroyed(&self, id: i32) -> Result<()> {
        match self.forget(id) {
            Some(_) => tracing::debug!(notification_id = id, "Download handle released"),
            // Cancel already dropped it.
            None => tracing::trace!(notification_id = id, "Destroy for forgotten download"),
        }
        Ok(())
    }

    pub fn pause(&self, id: i32) -> Result<()> {
        self.update(id, |d, engine| d.pause(engine))
    }

    pub fn resume(&self, id: i32) -> Result<()> {
        self.update(id, |d, engine| d.resume(engine))
    }

    /// Cancel the transfer and release its notification id mapping.
    pub fn cancel(&self, id: i32) -> Result<()> {
        self.update(id, |d, engine| d.cancel(engine))?;
        self.forget(id);
        tracing::info!(notification_id = id, "Download cancelled");
        Ok(())
    }

    /// Keep tracking state but never surface this download to the host.
    pub fn disable_notifications(&self, id: i32) -> Result<()> {
        {
            let mut downloads = self.downloads.write();
            let download = downloads.get_mut(&id).ok_or(DownloadError::NotFound(id))?;
            download.disable_notifications()?;
        }
        if self.shown.write().remove(&id) {
            self.sink.remove(id);
        }
        Ok(())
    }

    pub fn get_download(&self, id: i32) -> Result<DownloadSnapshot> {
        self.downloads
            .read()
            .get(&id)
            .map(Download::snapshot)
            .ok_or(DownloadError::NotFound(id))
    }

    /// Number of sessions still tracked.
    pub fn len(&self) -> usize {
        self.downloads.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.downloads.read().is_empty()
    }

    pub fn list_downloads(&self) -> Vec<DownloadSnapshot> {
        let mut list: Vec<DownloadSnapshot> =
            self.downloads.read().values().map(Download::snapshot).collect();
        list.sort_by_key(|d| d.notification_id);
        list
    }

    /// Apply a host intent. Returns false when the host could not act on
    /// it (unknown download, no application to open it).
    pub fn handle_intent(&self, intent: &DownloadIntent) -> Result<bool> {
        let id = intent.notification_id;

        tracing::debug!(
            notification_id = id,
            action = intent.action.as_str(),
            "Handling download intent"
        );

        match &intent.action {
            IntentAction::Open {
                location,
                mime_type,
            } => match self.opener.open(location, mime_type.as_deref()) {
                Ok(()) => Ok(true),
                Err(e) => {
                    tracing::warn!(notification_id = id, error = %e, "Could not open download");
                    Ok(false)
                }
            },
            IntentAction::Delete => {
                self.shown.write().remove(&id);
                let finished = self
                    .downloads
                    .read()
                    .get(&id)
                    .map(|d| d.state().is_terminal())
                    .unwrap_or(false);
                if finished {
                    self.forget(id);
                }
                Ok(finished)
            }
            IntentAction::Pause => self.command(id, Self::pause),
            IntentAction::Resume => self.command(id, Self::resume),
            IntentAction::Cancel => self.command(id, Self::cancel),
        }
    }

    /// Intents for downloads from a previous process are stale, not errors.
    fn command(&self, id: i32, f: fn(&Self, i32) -> Result<()>) -> Result<bool> {
        match f(self, id) {
            Ok(()) => Ok(true),
            Err(DownloadError::NotFound(_)) => {
                tracing::warn!(notification_id = id, "Intent for unknown download");
                self.sink.remove(id);
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    fn forget(&self, id: i32) -> Option<Download> {
        let mut download = self.downloads.write().remove(&id)?;
        download.destroy();
        Some(download)
    }

    fn update<F>(&self, id: i32, f: F) -> Result<()>
    where
        F: FnOnce(&mut Download, &dyn Engine) -> Result<()>,
    {
        let notification = {
            let mut downloads = self.downloads.write();
            let download = downloads.get_mut(&id).ok_or(DownloadError::NotFound(id))?;
            f(download, self.engine.as_ref())?;
            if download.notifications_disabled() {
                return Ok(());
            }
            Notification::for_download(download)
        };

        self.publish(id, notification);
        Ok(())
    }

    /// Push or remove the host notification outside the downloads lock.
    fn publish(&self, id: i32, notification: Option<Notification>) {
        match notification {
            Some(n) => {
                self.shown.write().insert(id);
                self.sink.show(&n);
            }
            None => {
                self.shown.write().remove(&id);
                self.sink.remove(id);
            }
        }
    }
}

impl Clone for DownloadManager {
    fn clone(&self) -> Self {
        Self {
            profile_name: self.profile_name.clone(),
            downloads: Arc::clone(&self.downloads),
            shown: Arc::clone(&self.shown),
            ids: self.ids.clone(),
            engine: Arc::clone(&self.engine),
            sink: Arc::clone(&self.sink),
            opener: Arc::clone(&self.opener),
        }
    }
}
