//! Tether Download Sessions
//!
//! - One session per engine transfer, driven by engine events and host commands
//! - Host-visible notification recomputed on every transition
//! - Notification ids survive process restarts
//! - Host intents can be queued until a profile's downloads are initialized

mod download;
mod error;
mod ids;
mod intent;
mod manager;
mod notification;
mod state;

pub use download::{Download, DownloadSnapshot};
pub use error::DownloadError;
pub use ids::NotificationIdAllocator;
pub use intent::{DownloadIntent, HostError, HostOpener, IntentAction};
pub use manager::DownloadManager;
pub use notification::{
    Notification, NotificationAction, NotificationSink, RecordingSink, SinkEvent,
};
pub use state::DownloadState;

pub type Result<T> = std::result::Result<T, DownloadError>;
