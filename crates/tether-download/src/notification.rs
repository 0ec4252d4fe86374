//! Host-facing download notifications

use parking_lot::Mutex;
use serde::Serialize;
use std::path::PathBuf;

use crate::download::Download;
use crate::state::DownloadState;

pub const FAILED_MESSAGE: &str = "Download failed";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationAction {
    Pause,
    Resume,
    Cancel,
    Open,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub id: i32,
    pub profile_name: String,
    pub title: String,
    pub state: DownloadState,
    pub progress: Option<u8>,
    pub actions: Vec<NotificationAction>,
    pub dismissible: bool,
    pub message: Option<String>,
    /// Target for the Open action
    pub location: Option<PathBuf>,
    pub mime_type: Option<String>,
}

impl Notification {
    /// The notification a download should currently show, or `None` when
    /// it should be removed.
    pub fn for_download(download: &Download) -> Option<Self> {
        let state = download.state();
        let (actions, dismissible, message) = match state {
            DownloadState::InProgress => (
                vec![NotificationAction::Pause, NotificationAction::Cancel],
                false,
                None,
            ),
            DownloadState::Paused => (
                vec![NotificationAction::Resume, NotificationAction::Cancel],
                false,
                None,
            ),
            DownloadState::Complete => (vec![NotificationAction::Open], true, None),
            DownloadState::Failed => (Vec::new(), true, Some(FAILED_MESSAGE.to_string())),
            DownloadState::Cancelled => return None,
        };

        let complete = state == DownloadState::Complete;

        Some(Self {
            id: download.notification_id(),
            profile_name: download.profile_name().to_string(),
            title: download.file_name(),
            state,
            progress: if complete { Some(100) } else { download.progress() },
            actions,
            dismissible,
            message,
            location: complete.then(|| download.location().to_path_buf()),
            mime_type: if complete {
                download.mime_type().map(str::to_string)
            } else {
                None
            },
        })
    }
}

/// Where notifications are surfaced on the host side
pub trait NotificationSink: Send + Sync {
    fn show(&self, notification: &Notification);

    fn remove(&self, notification_id: i32);
}

/// What a [`RecordingSink`] saw
#[derive(Debug, Clone, PartialEq)]
pub enum SinkEvent {
    Show(Notification),
    Remove(i32),
}

/// Sink that keeps every event, for tests and headless hosts.
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<SinkEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<SinkEvent> {
        self.events.lock().clone()
    }

    /// The last notification shown for an id, if it was not removed since.
    pub fn current(&self, notification_id: i32) -> Option<Notification> {
        let events = self.events.lock();
        for event in events.iter().rev() {
            match event {
                SinkEvent::Show(n) if n.id == notification_id => return Some(n.clone()),
                SinkEvent::Remove(id) if *id == notification_id => return None,
                _ => {}
            }
        }
        None
    }
}

impl NotificationSink for RecordingSink {
    fn show(&self, notification: &Notification) {
        self.events.lock().push(SinkEvent::Show(notification.clone()));
    }

    fn remove(&self, notification_id: i32) {
        self.events.lock().push(SinkEvent::Remove(notification_id));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tether_engine::MockEngine;

    fn download(engine: &MockEngine) -> Download {
        Download::new(
            4,
            "work".to_string(),
            "https://example.com/a.zip".to_string(),
            PathBuf::from("/downloads/a.zip"),
            Some("application/zip".to_string()),
            engine.allocate_handle(),
        )
    }

    #[test]
    fn test_actions_follow_state() {
        let engine = MockEngine::new();
        let mut d = download(&engine);

        let n = Notification::for_download(&d).unwrap();
        assert_eq!(n.actions, vec![NotificationAction::Pause, NotificationAction::Cancel]);
        assert!(!n.dismissible);

        d.pause(&engine).unwrap();
        let n = Notification::for_download(&d).unwrap();
        assert_eq!(n.actions, vec![NotificationAction::Resume, NotificationAction::Cancel]);

        d.cancel(&engine).unwrap();
        assert!(Notification::for_download(&d).is_none());
    }

    #[test]
    fn test_complete_offers_open() {
        let engine = MockEngine::new();
        let mut d = download(&engine);
        d.complete(Some(PathBuf::from("/downloads/a (1).zip"))).unwrap();

        let n = Notification::for_download(&d).unwrap();
        assert_eq!(n.actions, vec![NotificationAction::Open]);
        assert!(n.dismissible);
        assert_eq!(n.location, Some(PathBuf::from("/downloads/a (1).zip")));
        assert_eq!(n.mime_type.as_deref(), Some("application/zip"));
    }

    #[test]
    fn test_failed_shows_generic_message() {
        let engine = MockEngine::new();
        let mut d = download(&engine);
        d.record_progress(10, Some(40)).unwrap();
        d.fail(7).unwrap();

        let n = Notification::for_download(&d).unwrap();
        assert!(n.actions.is_empty());
        assert!(n.dismissible);
        assert_eq!(n.message.as_deref(), Some(FAILED_MESSAGE));
        assert_eq!(n.progress, Some(25));
    }
}
