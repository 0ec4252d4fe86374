//! Profiles
//!
//! A profile is a named, isolated browsing context. The empty name is the
//! incognito profile, which never touches the `profiles` table.

use parking_lot::RwLock;
use std::collections::{HashMap, VecDeque};
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Weak};

use tether_download::{DownloadIntent, DownloadManager, HostOpener, NotificationSink};
use tether_engine::{Engine, EngineError};
use tether_session::SessionStore;
use tether_storage::Database;

use crate::background::{BackgroundPool, Pending};
use crate::error::CoreError;
use crate::Result;

/// Prefix for rows, slots and directories detached from a deleted profile.
/// Valid names never contain `.` so a tombstone cannot collide with one.
pub(crate) const TOMBSTONE_PREFIX: &str = ".deleted-";

/// Live profiles by name
pub(crate) type ProfileRegistry = Arc<RwLock<HashMap<String, Profile>>>;

/// What happened to a download intent handed to a profile
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntentOutcome {
    /// Downloads not initialized yet; replayed later in arrival order
    Queued,
    Handled,
    Unhandled,
}

/// Collaborators every profile shares
pub(crate) struct ProfileContext {
    pub engine: Arc<dyn Engine>,
    pub db: Database,
    pub pool: BackgroundPool,
    pub profiles_dir: PathBuf,
    pub sink: Arc<dyn NotificationSink>,
    pub opener: Arc<dyn HostOpener>,
}

#[derive(Debug, Default)]
struct ProfileInner {
    destroyed: bool,
    being_deleted: bool,
    downloads_initialized: bool,
    pending_intents: VecDeque<DownloadIntent>,
}

#[derive(Clone)]
pub struct Profile {
    name: String,
    inner: Arc<RwLock<ProfileInner>>,
    downloads: DownloadManager,
    context: Arc<ProfileContext>,
    registry: Weak<RwLock<HashMap<String, Profile>>>,
}

/// Names are `[A-Za-z0-9_]*`
pub(crate) fn validate_name(name: &str) -> Result<()> {
    if name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        Ok(())
    } else {
        Err(CoreError::InvalidProfileName(name.to_string()))
    }
}

impl Profile {
    pub(crate) fn create(
        name: &str,
        context: Arc<ProfileContext>,
        registry: &ProfileRegistry,
    ) -> Result<Self> {
        validate_name(name)?;

        if !name.is_empty() {
            context.db.with_connection(|conn| {
                conn.execute(
                    "INSERT OR IGNORE INTO profiles (name, created_at) VALUES (?1, ?2)",
                    rusqlite::params![name, chrono::Utc::now().to_rfc3339()],
                )?;
                Ok(())
            })?;
            fs::create_dir_all(context.profiles_dir.join(name))?;
        }

        let downloads = DownloadManager::new(
            name.to_string(),
            context.db.clone(),
            Arc::clone(&context.engine),
            Arc::clone(&context.sink),
            Arc::clone(&context.opener),
        );

        tracing::info!(profile = %name, incognito = name.is_empty(), "Profile created");

        Ok(Self {
            name: name.to_string(),
            inner: Arc::new(RwLock::new(ProfileInner::default())),
            downloads,
            context,
            registry: Arc::downgrade(registry),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_incognito(&self) -> bool {
        self.name.is_empty()
    }

    pub fn is_destroyed(&self) -> bool {
        self.inner.read().destroyed
    }

    pub fn is_being_deleted(&self) -> bool {
        self.inner.read().being_deleted
    }

    pub fn same_profile(&self, other: &Profile) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn context(&self) -> &Arc<ProfileContext> {
        &self.context
    }

    pub(crate) fn ensure_usable(&self) -> Result<()> {
        let inner = self.inner.read();
        if inner.destroyed || inner.being_deleted {
            return Err(CoreError::UsedAfterDestroy("profile"));
        }
        Ok(())
    }

    pub fn downloads(&self) -> Result<&DownloadManager> {
        self.ensure_usable()?;
        Ok(&self.downloads)
    }

    pub fn downloads_initialized(&self) -> bool {
        self.inner.read().downloads_initialized
    }

    pub fn pending_intent_count(&self) -> usize {
        self.inner.read().pending_intents.len()
    }

    /// Apply a host download intent, or queue it until downloads are up.
    pub fn handle_download_intent(&self, intent: DownloadIntent) -> Result<IntentOutcome> {
        {
            let mut inner = self.inner.write();
            if inner.destroyed || inner.being_deleted {
                return Err(CoreError::UsedAfterDestroy("profile"));
            }
            if !inner.downloads_initialized {
                tracing::debug!(
                    profile = %self.name,
                    notification_id = intent.notification_id,
                    action = intent.action.as_str(),
                    "Queued download intent"
                );
                inner.pending_intents.push_back(intent);
                return Ok(IntentOutcome::Queued);
            }
        }

        Ok(if self.downloads.handle_intent(&intent)? {
            IntentOutcome::Handled
        } else {
            IntentOutcome::Unhandled
        })
    }

    /// Mark downloads ready and replay queued intents in arrival order.
    /// Returns how many were replayed.
    pub fn initialize_downloads(&self) -> Result<usize> {
        let queued: Vec<DownloadIntent> = {
            let mut inner = self.inner.write();
            if inner.destroyed || inner.being_deleted {
                return Err(CoreError::UsedAfterDestroy("profile"));
            }
            if inner.downloads_initialized {
                return Ok(0);
            }
            inner.downloads_initialized = true;
            inner.pending_intents.drain(..).collect()
        };

        let count = queued.len();
        for intent in queued {
            if let Err(e) = self.downloads.handle_intent(&intent) {
                tracing::warn!(
                    profile = %self.name,
                    notification_id = intent.notification_id,
                    error = %e,
                    "Queued download intent failed"
                );
            }
        }

        tracing::debug!(profile = %self.name, replayed = count, "Downloads initialized");
        Ok(count)
    }

    /// Release in-memory state. No-op when already destroyed or being deleted.
    pub fn destroy(&self) {
        {
            let mut inner = self.inner.write();
            if inner.destroyed || inner.being_deleted {
                return;
            }
            inner.destroyed = true;
            inner.pending_intents.clear();
        }

        self.unregister();
        tracing::info!(profile = %self.name, "Profile destroyed");
    }

    /// Destroy the profile and erase its data in the background.
    ///
    /// The profile's row, slots and directory are moved under a unique
    /// tombstone before this returns, so the name is free for reuse at once
    /// and the background wipe never touches a newer profile's data. Fails
    /// with [`CoreError::ProfileInUse`] while any browser still uses the
    /// profile.
    pub fn destroy_and_delete_data_from_disk(&self) -> Result<Pending<()>> {
        self.ensure_usable()?;

        self.context
            .engine
            .check_profile_deletable(&self.name)
            .map_err(|e| match e {
                EngineError::ProfileInUse(name) => CoreError::ProfileInUse(name),
                other => CoreError::Engine(other),
            })?;

        let tombstone = format!(
            "{}{}-{}",
            TOMBSTONE_PREFIX,
            self.name,
            uuid::Uuid::new_v4().simple()
        );
        self.detach_data(&tombstone)?;

        {
            let mut inner = self.inner.write();
            inner.being_deleted = true;
            inner.pending_intents.clear();
        }
        self.unregister();

        tracing::info!(profile = %self.name, %tombstone, "Deleting profile data");

        let name = self.name.clone();
        let inner = Arc::clone(&self.inner);
        let context = Arc::clone(&self.context);

        Ok(self.context.pool.run(move || {
            context.engine.wipe_profile_data(&name)?;

            let slots = SessionStore::new(context.db.clone()).delete_profile_slots(&tombstone)?;
            context.db.with_connection(|conn| {
                conn.execute("DELETE FROM profiles WHERE name = ?1", [&tombstone])?;
                Ok(())
            })?;

            let dir = context.profiles_dir.join(&tombstone);
            if dir.exists() {
                fs::remove_dir_all(&dir)?;
            }

            inner.write().destroyed = true;
            tracing::info!(profile = %name, slots, "Profile data deleted");
            Ok(())
        }))
    }

    /// Rename this profile's directory, row and slots to `tombstone`.
    fn detach_data(&self, tombstone: &str) -> Result<()> {
        let dir = self.context.profiles_dir.join(&self.name);
        let moved_dir = !self.is_incognito() && dir.exists();
        if moved_dir {
            fs::rename(&dir, self.context.profiles_dir.join(tombstone))?;
        }

        let renamed = self
            .context
            .db
            .with_connection(|conn| {
                conn.execute(
                    "UPDATE profiles SET name = ?2 WHERE name = ?1",
                    [self.name.as_str(), tombstone],
                )?;
                Ok(())
            })
            .map_err(CoreError::from)
            .and_then(|()| {
                SessionStore::new(self.context.db.clone())
                    .retarget_profile_slots(&self.name, tombstone)
                    .map_err(CoreError::from)
            });

        if let Err(e) = renamed {
            if moved_dir {
                if let Err(undo) = fs::rename(self.context.profiles_dir.join(tombstone), &dir) {
                    tracing::warn!(
                        profile = %self.name,
                        error = %undo,
                        "Could not restore profile directory"
                    );
                }
            }
            return Err(e);
        }
        Ok(())
    }

    fn unregister(&self) {
        let Some(registry) = self.registry.upgrade() else {
            return;
        };
        let mut registry = registry.write();
        // A newer profile may already hold the name
        if registry
            .get(&self.name)
            .is_some_and(|p| p.same_profile(self))
        {
            registry.remove(&self.name);
        }
    }
}

impl std::fmt::Debug for Profile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Profile")
            .field("name", &self.name)
            .field("inner", &*self.inner.read())
            .finish()
    }
}
