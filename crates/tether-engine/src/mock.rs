//! Recording engine used by the runtime tests

use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::time::Duration;

use crate::engine::{Engine, RawHandle};
use crate::error::EngineError;
use crate::Result;

/// One call observed by [`MockEngine`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCall {
    Start,
    CreateBrowser(String),
    DestroyBrowser(RawHandle),
    CreateWebContents(RawHandle),
    ReleaseWebContents(RawHandle),
    Navigate(RawHandle, String),
    SetVisible(RawHandle, bool),
    CreateSurface(RawHandle),
    DestroySurface(RawHandle),
    PauseDownload(RawHandle),
    ResumeDownload(RawHandle),
    CancelDownload(RawHandle),
    WipeProfile(String),
    RemoteDebugging(bool),
}

#[derive(Default)]
struct MockState {
    next_handle: RawHandle,
    live: HashSet<RawHandle>,
    browser_profiles: HashMap<RawHandle, String>,
    calls: Vec<EngineCall>,
    fail_start: bool,
    fail_create_browser: bool,
    wipe_delay: Option<Duration>,
}

/// Engine that hands out sequential handles and records every call.
#[derive(Default)]
pub struct MockEngine {
    state: Mutex<MockState>,
}

impl MockEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `start()` fail
    pub fn fail_start(&self) {
        self.state.lock().fail_start = true;
    }

    /// Make the next `create_browser()` fail
    pub fn fail_create_browser(&self) {
        self.state.lock().fail_create_browser = true;
    }

    /// Block every `wipe_profile_data()` for `delay`
    pub fn slow_wipe(&self, delay: Duration) {
        self.state.lock().wipe_delay = Some(delay);
    }

    pub fn calls(&self) -> Vec<EngineCall> {
        self.state.lock().calls.clone()
    }

    pub fn count(&self, predicate: impl Fn(&EngineCall) -> bool) -> usize {
        self.state.lock().calls.iter().filter(|c| predicate(c)).count()
    }

    pub fn is_live(&self, handle: RawHandle) -> bool {
        self.state.lock().live.contains(&handle)
    }

    pub fn live_handle_count(&self) -> usize {
        self.state.lock().live.len()
    }

    /// Hand out a live handle the way the engine does when a download starts.
    pub fn allocate_handle(&self) -> RawHandle {
        let mut state = self.state.lock();
        state.next_handle += 1;
        let handle = state.next_handle;
        state.live.insert(handle);
        handle
    }

    fn record(&self, call: EngineCall) {
        self.state.lock().calls.push(call);
    }

    fn release(&self, handle: RawHandle) {
        self.state.lock().live.remove(&handle);
    }
}

impl Engine for MockEngine {
    fn start(&self) -> Result<()> {
        let mut state = self.state.lock();
        if std::mem::take(&mut state.fail_start) {
            return Err(EngineError::StartupFailed("mock startup failure".to_string()));
        }
        state.calls.push(EngineCall::Start);
        Ok(())
    }

    fn create_browser(&self, profile_name: &str, _persistence_id: Option<&str>) -> Result<RawHandle> {
        if std::mem::take(&mut self.state.lock().fail_create_browser) {
            return Err(EngineError::Rejected("mock browser failure".to_string()));
        }
        let handle = self.allocate_handle();
        let mut state = self.state.lock();
        state
            .browser_profiles
            .insert(handle, profile_name.to_string());
        state
            .calls
            .push(EngineCall::CreateBrowser(profile_name.to_string()));
        Ok(handle)
    }

    fn destroy_browser(&self, browser: RawHandle) {
        self.release(browser);
        self.state.lock().browser_profiles.remove(&browser);
        self.record(EngineCall::DestroyBrowser(browser));
    }

    fn create_web_contents(&self, browser: RawHandle) -> Result<RawHandle> {
        if !self.is_live(browser) {
            return Err(EngineError::Rejected(format!("unknown browser {browser}")));
        }
        let handle = self.allocate_handle();
        self.record(EngineCall::CreateWebContents(handle));
        Ok(handle)
    }

    fn release_web_contents(&self, contents: RawHandle) {
        self.release(contents);
        self.record(EngineCall::ReleaseWebContents(contents));
    }

    fn navigate(&self, contents: RawHandle, url: &str) -> Result<()> {
        self.record(EngineCall::Navigate(contents, url.to_string()));
        Ok(())
    }

    fn set_contents_visible(&self, contents: RawHandle, visible: bool) {
        self.record(EngineCall::SetVisible(contents, visible));
    }

    fn create_surface(&self, _browser: RawHandle) -> Result<RawHandle> {
        let handle = self.allocate_handle();
        self.record(EngineCall::CreateSurface(handle));
        Ok(handle)
    }

    fn destroy_surface(&self, surface: RawHandle) {
        self.release(surface);
        self.record(EngineCall::DestroySurface(surface));
    }

    fn pause_download(&self, download: RawHandle) {
        self.record(EngineCall::PauseDownload(download));
    }

    fn resume_download(&self, download: RawHandle) {
        self.record(EngineCall::ResumeDownload(download));
    }

    fn cancel_download(&self, download: RawHandle) {
        self.record(EngineCall::CancelDownload(download));
    }

    fn check_profile_deletable(&self, profile_name: &str) -> Result<()> {
        let in_use = self
            .state
            .lock()
            .browser_profiles
            .values()
            .any(|name| name == profile_name);

        if in_use {
            Err(EngineError::ProfileInUse(profile_name.to_string()))
        } else {
            Ok(())
        }
    }

    fn wipe_profile_data(&self, profile_name: &str) -> Result<()> {
        let delay = self.state.lock().wipe_delay;
        if let Some(delay) = delay {
            std::thread::sleep(delay);
        }
        self.record(EngineCall::WipeProfile(profile_name.to_string()));
        Ok(())
    }

    fn set_remote_debugging_enabled(&self, enabled: bool) {
        self.record(EngineCall::RemoteDebugging(enabled));
    }
}
