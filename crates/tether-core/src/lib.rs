//! Tether Core
//!
//! Embedding runtime that lets a host load a browser engine as a library.
//! The host talks to [`EmbeddingBoundary`]; everything behind it (profiles,
//! browsers, tabs, downloads) is owned here and driven by host lifecycle
//! callbacks through [`HostAttachment`].

mod background;
mod boundary;
mod browser;
mod config;
mod crash;
mod error;
mod host;
mod metrics;
mod profile;
mod runtime;
mod view;

pub use background::{BackgroundPool, Pending};
pub use boundary::{BoundaryProxy, Capability, EmbeddingBoundary, BOUNDARY_VERSION};
pub use browser::{Browser, BrowserObserver};
pub use config::Config;
pub use crash::{
    CrashError, CrashFileManager, CrashReporterController, CrashUploader, DirectoryCrashFiles,
};
pub use error::CoreError;
pub use host::{
    HostAttachment, HostContext, HostResultListener, HostSettings, InstanceArgs, LifecycleState,
};
pub use metrics::{MetricsSink, TracingMetrics};
pub use profile::{IntentOutcome, Profile};
pub use runtime::{Runtime, RuntimeBuilder};
pub use view::{ViewController, ViewHandle};

// Re-export the entity crates
pub use tether_download::{
    DownloadError, DownloadIntent, DownloadManager, DownloadSnapshot, DownloadState, HostError,
    HostOpener, IntentAction, Notification, NotificationAction, NotificationSink,
};
pub use tether_engine::{Engine, EngineError, MockEngine, NativeHandle, RawHandle};
pub use tether_session::{PersistenceMode, SavedState, SessionError};
pub use tether_storage::{Database, StorageError};
pub use tether_tabs::{Tab, TabError, TabState};

pub type Result<T> = std::result::Result<T, CoreError>;

/// Initialize logging
pub fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    fmt().with_env_filter(filter).with_target(true).init();
}
