//! Runtime bootstrapper
//!
//! One `Runtime` per process. It brings the engine up exactly once, owns
//! the profile and browser registries and the process-wide foreground
//! counter, and is what the host reaches through the boundary.

use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use tether_download::{DownloadIntent, HostError, HostOpener, Notification, NotificationSink};
use tether_engine::Engine;
use tether_session::PersistenceDescriptor;
use tether_storage::Database;

use crate::background::{BackgroundPool, Pending};
use crate::browser::{Browser, BrowserRegistry};
use crate::config::{Config, IN_MEMORY_DATABASE};
use crate::crash::{CrashFileManager, CrashReporterController, DirectoryCrashFiles};
use crate::error::CoreError;
use crate::host::{HostAttachment, InstanceArgs};
use crate::metrics::{ForegroundSessions, MetricsSink, TracingMetrics};
use crate::profile::{IntentOutcome, Profile, ProfileContext, ProfileRegistry, TOMBSTONE_PREFIX};
use crate::Result;

const REMOTE_DEBUGGING_KEY: &str = "devtools.remote_debugging";

/// Host without notification UI or file handlers
struct HeadlessHost;

impl NotificationSink for HeadlessHost {
    fn show(&self, notification: &Notification) {
        tracing::debug!(notification_id = notification.id, "Notification (headless)");
    }

    fn remove(&self, notification_id: i32) {
        tracing::debug!(notification_id, "Notification removed (headless)");
    }
}

impl HostOpener for HeadlessHost {
    fn open(
        &self,
        location: &Path,
        _mime_type: Option<&str>,
    ) -> std::result::Result<(), HostError> {
        Err(HostError::NoHandler(location.display().to_string()))
    }
}

pub struct RuntimeBuilder {
    config: Config,
    engine: Arc<dyn Engine>,
    sink: Option<Arc<dyn NotificationSink>>,
    opener: Option<Arc<dyn HostOpener>>,
    metrics: Option<Arc<dyn MetricsSink>>,
    crash_files: Option<Arc<dyn CrashFileManager>>,
}

impl RuntimeBuilder {
    pub fn new(config: Config, engine: Arc<dyn Engine>) -> Self {
        Self {
            config,
            engine,
            sink: None,
            opener: None,
            metrics: None,
            crash_files: None,
        }
    }

    pub fn notification_sink(mut self, sink: Arc<dyn NotificationSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn host_opener(mut self, opener: Arc<dyn HostOpener>) -> Self {
        self.opener = Some(opener);
        self
    }

    pub fn metrics(mut self, metrics: Arc<dyn MetricsSink>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn crash_files(mut self, files: Arc<dyn CrashFileManager>) -> Self {
        self.crash_files = Some(files);
        self
    }

    pub fn build(self) -> Result<Runtime> {
        let db = if self.config.database_path == Path::new(IN_MEMORY_DATABASE) {
            Database::open_in_memory()?
        } else {
            if let Some(parent) = self.config.database_path.parent() {
                fs::create_dir_all(parent)?;
            }
            Database::open(&self.config.database_path)?
        };

        let pool = BackgroundPool::new()?;

        let remote_debugging = match db.get_setting(REMOTE_DEBUGGING_KEY)? {
            Some(value) => value == "true",
            None => self.config.remote_debugging,
        };

        let host = Arc::new(HeadlessHost);
        let sink = self.sink.unwrap_or_else(|| host.clone());
        let opener = self.opener.unwrap_or(host);
        let crash_files = self
            .crash_files
            .unwrap_or_else(|| Arc::new(DirectoryCrashFiles::new(self.config.crash_dir())));

        let profile_context = Arc::new(ProfileContext {
            engine: Arc::clone(&self.engine),
            db: db.clone(),
            pool: pool.clone(),
            profiles_dir: self.config.profiles_dir(),
            sink,
            opener,
        });

        tracing::info!(data_dir = %self.config.data_dir.display(), "Runtime configured");

        Ok(Runtime {
            inner: Arc::new(RuntimeInner {
                crash_reporter: CrashReporterController::new(crash_files, pool.clone()),
                config: self.config,
                engine: self.engine,
                db,
                pool,
                initialized: Mutex::new(false),
                profile_context,
                profiles: Arc::new(RwLock::new(HashMap::new())),
                browsers: Arc::new(RwLock::new(HashMap::new())),
                foreground: Mutex::new(ForegroundSessions::default()),
                metrics: self.metrics.unwrap_or_else(|| Arc::new(TracingMetrics)),
                remote_debugging: Mutex::new(remote_debugging),
            }),
        })
    }
}

struct RuntimeInner {
    config: Config,
    engine: Arc<dyn Engine>,
    /// Settings, profiles and session slots
    db: Database,
    /// Disk and engine work kept off the caller's thread
    pool: BackgroundPool,
    /// Init latch; held for the whole engine bring-up
    initialized: Mutex<bool>,
    /// Shared by every profile this runtime creates
    profile_context: Arc<ProfileContext>,
    /// Live profiles by name
    profiles: ProfileRegistry,
    /// Live browsers by id (weak)
    browsers: BrowserRegistry,
    /// Process-wide count of resumed hosts
    foreground: Mutex<ForegroundSessions>,
    metrics: Arc<dyn MetricsSink>,
    crash_reporter: CrashReporterController,
    /// Mirrors the persisted remote debugging setting
    remote_debugging: Mutex<bool>,
}

#[derive(Clone)]
pub struct Runtime {
    inner: Arc<RuntimeInner>,
}

impl Runtime {
    pub fn builder(config: Config, engine: Arc<dyn Engine>) -> RuntimeBuilder {
        RuntimeBuilder::new(config, engine)
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    pub fn database(&self) -> &Database {
        &self.inner.db
    }

    /// Bring the engine up. Later calls are no-ops.
    pub fn init_sync(&self) -> Result<()> {
        let mut initialized = self.inner.initialized.lock();
        if *initialized {
            return Ok(());
        }

        self.inner.engine.start()?;
        if *self.inner.remote_debugging.lock() {
            self.inner.engine.set_remote_debugging_enabled(true);
        }
        *initialized = true;

        tracing::info!("Runtime initialized");
        Ok(())
    }

    /// Same as [`Runtime::init_sync`], on the background pool.
    pub fn init_async(&self) -> Pending<()> {
        let runtime = self.clone();
        self.inner.pool.run(move || runtime.init_sync())
    }

    pub fn is_initialized(&self) -> bool {
        *self.inner.initialized.lock()
    }

    fn ensure_initialized(&self) -> Result<()> {
        if self.is_initialized() {
            Ok(())
        } else {
            Err(CoreError::NotInitialized)
        }
    }

    /// Get or create the profile with this name. The empty name is incognito.
    pub fn get_profile(&self, name: &str) -> Result<Profile> {
        self.ensure_initialized()?;

        let mut profiles = self.inner.profiles.write();
        if let Some(profile) = profiles.get(name) {
            return Ok(profile.clone());
        }

        let profile = Profile::create(
            name,
            Arc::clone(&self.inner.profile_context),
            &self.inner.profiles,
        )?;
        profiles.insert(name.to_string(), profile.clone());
        Ok(profile)
    }

    /// Names of profiles with data on disk, resolved from the background pool.
    /// Profiles whose deletion is still in flight are not listed.
    pub fn enumerate_profile_names(&self) -> Result<Pending<Vec<String>>> {
        self.ensure_initialized()?;

        let db = self.inner.db.clone();
        Ok(self.inner.pool.run(move || {
            Ok(db.with_connection(|conn| {
                let mut stmt = conn.prepare(
                    "SELECT name FROM profiles WHERE name NOT LIKE ?1 ORDER BY name",
                )?;
                let names: Vec<String> = stmt
                    .query_map([format!("{TOMBSTONE_PREFIX}%")], |row| row.get(0))?
                    .filter_map(|r| r.ok())
                    .collect();
                Ok(names)
            })?)
        }))
    }

    /// Route a host download intent to its profile.
    pub fn deliver_download_intent(&self, intent: DownloadIntent) -> Result<IntentOutcome> {
        let profile = self.get_profile(&intent.profile_name)?;
        profile.handle_download_intent(intent)
    }

    pub fn set_remote_debugging_enabled(&self, enabled: bool) -> Result<()> {
        self.ensure_initialized()?;

        self.inner.engine.set_remote_debugging_enabled(enabled);
        *self.inner.remote_debugging.lock() = enabled;
        self.inner
            .db
            .set_setting(REMOTE_DEBUGGING_KEY, if enabled { "true" } else { "false" })?;

        tracing::info!(enabled, "Remote debugging toggled");
        Ok(())
    }

    pub fn is_remote_debugging_enabled(&self) -> bool {
        *self.inner.remote_debugging.lock()
    }

    pub fn crash_reporter(&self) -> Result<CrashReporterController> {
        self.ensure_initialized()?;
        Ok(self.inner.crash_reporter.clone())
    }

    pub fn create_embedding_instance(&self, args: InstanceArgs) -> Result<HostAttachment> {
        self.ensure_initialized()?;
        crate::profile::validate_name(&args.profile_name)?;
        Ok(HostAttachment::new(self.clone(), args))
    }

    pub fn live_browser_count(&self) -> usize {
        self.inner
            .browsers
            .read()
            .values()
            .filter(|b| b.strong_count() > 0)
            .count()
    }

    pub(crate) fn create_browser(
        &self,
        profile: Profile,
        descriptor: PersistenceDescriptor,
    ) -> Result<Browser> {
        self.ensure_initialized()?;
        Browser::new(profile, descriptor, Arc::clone(&self.inner.browsers))
    }

    pub(crate) fn foreground_resumed(&self) {
        self.inner.foreground.lock().resumed(Utc::now());
    }

    pub(crate) fn foreground_paused(&self) {
        let duration = self.inner.foreground.lock().paused(Utc::now());
        if let Some(duration) = duration {
            self.inner.metrics.record_session_duration(duration);
        }
    }

    pub fn foreground_count(&self) -> usize {
        self.inner.foreground.lock().count()
    }
}
