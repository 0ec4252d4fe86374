//! Engine abstraction layer.
//!
//! Every method is called on the runtime's main thread except
//! [`Engine::wipe_profile_data`], which runs on the background pool.

use crate::Result;

/// Raw engine handle. Zero is never a valid handle.
pub type RawHandle = u64;

pub trait Engine: Send + Sync {
    /// Native engine bring-up. Called exactly once by the runtime
    /// bootstrapper before any other method.
    fn start(&self) -> Result<()>;

    /// Create the engine-side browser for a profile.
    fn create_browser(&self, profile_name: &str, persistence_id: Option<&str>)
        -> Result<RawHandle>;

    fn destroy_browser(&self, browser: RawHandle);

    /// Create a web contents object inside a browser.
    fn create_web_contents(&self, browser: RawHandle) -> Result<RawHandle>;

    fn release_web_contents(&self, contents: RawHandle);

    fn navigate(&self, contents: RawHandle, url: &str) -> Result<()>;

    fn set_contents_visible(&self, contents: RawHandle, visible: bool);

    /// Create the rendering surface a view controller draws into.
    fn create_surface(&self, browser: RawHandle) -> Result<RawHandle>;

    fn destroy_surface(&self, surface: RawHandle);

    fn pause_download(&self, download: RawHandle);

    fn resume_download(&self, download: RawHandle);

    fn cancel_download(&self, download: RawHandle);

    /// Fails with [`crate::EngineError::ProfileInUse`] while any engine-side
    /// browser still references the profile.
    fn check_profile_deletable(&self, profile_name: &str) -> Result<()>;

    /// Erase the profile's on-disk engine data (cookies, caches, storage).
    fn wipe_profile_data(&self, profile_name: &str) -> Result<()>;

    fn set_remote_debugging_enabled(&self, enabled: bool);
}
