//! Host attachment
//!
//! Translates the host container's lifecycle callbacks into browser and
//! view controller transitions:
//!
//! ```text
//! Detached -> Attached -> Created -> Started <-> Resumed
//!                                    Started <-> Stopped -> Detached -> Destroyed
//! ```

use std::fmt;
use std::sync::Arc;

use tether_session::{PersistenceDescriptor, SavedState};

use crate::browser::Browser;
use crate::error::CoreError;
use crate::runtime::Runtime;
use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Detached,
    Attached,
    Created,
    Started,
    Resumed,
    Stopped,
    Destroyed,
}

impl LifecycleState {
    pub fn can_transition_to(&self, next: LifecycleState) -> bool {
        use LifecycleState::*;

        matches!(
            (self, next),
            (Detached, Attached)
                | (Attached, Created)
                | (Created, Started)
                | (Started, Resumed)
                | (Resumed, Started)
                | (Started, Stopped)
                | (Stopped, Started)
                | (Attached | Created | Stopped, Detached)
                | (Detached | Attached | Created | Stopped, Destroyed)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleState::Detached => "detached",
            LifecycleState::Attached => "attached",
            LifecycleState::Created => "created",
            LifecycleState::Started => "started",
            LifecycleState::Resumed => "resumed",
            LifecycleState::Stopped => "stopped",
            LifecycleState::Destroyed => "destroyed",
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Arguments the host passes when instantiating an embedding container
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstanceArgs {
    /// Empty means incognito
    pub profile_name: String,
    pub persistence_id: Option<String>,
}

impl InstanceArgs {
    pub fn new(profile_name: impl Into<String>) -> Self {
        Self {
            profile_name: profile_name.into(),
            persistence_id: None,
        }
    }

    pub fn with_persistence_id(mut self, persistence_id: impl Into<String>) -> Self {
        self.persistence_id = Some(persistence_id.into());
        self
    }
}

/// Host capabilities read on every start
pub trait HostSettings: Send + Sync {
    fn password_echo_enabled(&self) -> bool;
}

/// Receives results of host activities and permission prompts.
/// Return true when the result was consumed.
pub trait HostResultListener: Send + Sync {
    fn on_activity_result(
        &self,
        _request_code: i32,
        _result_code: i32,
        _data: Option<&str>,
    ) -> bool {
        false
    }

    fn on_request_permissions_result(
        &self,
        _request_code: i32,
        _permissions: &[String],
        _granted: &[bool],
    ) -> bool {
        false
    }
}

/// Window binding handed over on attach
#[derive(Clone)]
pub struct HostContext {
    pub window_id: u64,
    pub settings: Arc<dyn HostSettings>,
}

impl fmt::Debug for HostContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostContext")
            .field("window_id", &self.window_id)
            .finish()
    }
}

pub struct HostAttachment {
    runtime: Runtime,
    args: InstanceArgs,
    state: LifecycleState,
    browser: Option<Browser>,
    context: Option<HostContext>,
    listeners: Vec<Arc<dyn HostResultListener>>,
}

impl HostAttachment {
    pub(crate) fn new(runtime: Runtime, args: InstanceArgs) -> Self {
        Self {
            runtime,
            args,
            state: LifecycleState::Detached,
            browser: None,
            context: None,
            listeners: Vec::new(),
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn args(&self) -> &InstanceArgs {
        &self.args
    }

    pub fn context(&self) -> Option<&HostContext> {
        self.context.as_ref()
    }

    pub fn browser(&self) -> Result<Browser> {
        if self.state == LifecycleState::Destroyed {
            return Err(CoreError::UsedAfterDestroy("browser"));
        }
        self.browser.clone().ok_or(CoreError::NotCreated)
    }

    /// Reject `next` without touching the state.
    fn check_transition(&self, next: LifecycleState) -> Result<()> {
        if self.state == LifecycleState::Destroyed {
            return Err(CoreError::UsedAfterDestroy("host attachment"));
        }
        if self.state == LifecycleState::Detached && next != LifecycleState::Attached {
            return Err(CoreError::Detached);
        }
        if !self.state.can_transition_to(next) {
            return Err(CoreError::InvalidLifecycle {
                from: self.state.to_string(),
                to: next.to_string(),
            });
        }
        Ok(())
    }

    /// Record a transition whose work already succeeded.
    fn commit(&mut self, next: LifecycleState) {
        tracing::debug!(
            profile = %self.args.profile_name,
            from = %self.state,
            to = %next,
            "Host lifecycle transition"
        );
        self.state = next;
    }

    pub fn attach(&mut self, context: HostContext) -> Result<()> {
        self.check_transition(LifecycleState::Attached)?;

        // Re-attach after a detach: the browser survived, the view did not
        if let Some(browser) = &self.browser {
            browser.attach_view()?;
        }
        self.context = Some(context);
        self.commit(LifecycleState::Attached);
        Ok(())
    }

    /// Build the browser the first time, then signal it is ready.
    pub fn create(&mut self, saved_state: Option<&SavedState>) -> Result<()> {
        self.check_transition(LifecycleState::Created)?;

        let browser = match &self.browser {
            Some(browser) => browser.clone(),
            None => {
                let browser = self.build_browser(saved_state)?;
                self.browser = Some(browser.clone());
                browser
            }
        };
        browser.mark_ready()?;

        self.commit(LifecycleState::Created);
        Ok(())
    }

    fn build_browser(&self, saved_state: Option<&SavedState>) -> Result<Browser> {
        let profile = self.runtime.get_profile(&self.args.profile_name)?;
        let descriptor = PersistenceDescriptor::resolve(
            self.args.persistence_id.clone(),
            profile.is_incognito(),
            saved_state,
        );

        let browser = self.runtime.create_browser(profile, descriptor)?;
        if let Err(e) = browser.attach_view() {
            browser.destroy();
            return Err(e);
        }
        Ok(browser)
    }

    pub fn start(&mut self) -> Result<()> {
        self.check_transition(LifecycleState::Started)?;
        let browser = self.browser()?;

        browser.profile().initialize_downloads()?;

        let password_echo = self
            .context
            .as_ref()
            .map(|c| c.settings.password_echo_enabled())
            .unwrap_or(false);
        browser.set_password_echo_enabled(password_echo);
        browser.set_visible(true)?;

        self.commit(LifecycleState::Started);
        Ok(())
    }

    pub fn resume(&mut self) -> Result<()> {
        self.check_transition(LifecycleState::Resumed)?;
        self.commit(LifecycleState::Resumed);
        self.runtime.foreground_resumed();
        Ok(())
    }

    pub fn pause(&mut self) -> Result<()> {
        if self.state != LifecycleState::Resumed {
            return Err(CoreError::InvalidLifecycle {
                from: self.state.to_string(),
                to: "paused".to_string(),
            });
        }
        self.commit(LifecycleState::Started);
        self.runtime.foreground_paused();
        Ok(())
    }

    pub fn stop(&mut self) -> Result<()> {
        self.check_transition(LifecycleState::Stopped)?;
        self.browser()?.set_visible(false)?;
        self.commit(LifecycleState::Stopped);
        Ok(())
    }

    /// Drop the view and window binding; browser, tabs and profile live on.
    pub fn detach(&mut self) -> Result<()> {
        self.check_transition(LifecycleState::Detached)?;
        if let Some(browser) = &self.browser {
            browser.detach_view();
        }
        self.context = None;
        self.listeners.clear();
        self.commit(LifecycleState::Detached);
        Ok(())
    }

    /// Tear everything down. Idempotent.
    pub fn destroy(&mut self) -> Result<()> {
        if self.state == LifecycleState::Destroyed {
            return Ok(());
        }
        if !self.state.can_transition_to(LifecycleState::Destroyed) {
            return Err(CoreError::InvalidLifecycle {
                from: self.state.to_string(),
                to: LifecycleState::Destroyed.to_string(),
            });
        }
        if self.state != LifecycleState::Detached {
            self.detach()?;
        }

        if let Some(browser) = self.browser.take() {
            browser.destroy();
        }
        self.state = LifecycleState::Destroyed;

        tracing::info!(profile = %self.args.profile_name, "Host attachment destroyed");
        Ok(())
    }

    pub fn save_state(&self, out: &mut SavedState) -> Result<()> {
        self.browser()?.save_state(out)
    }

    pub fn add_result_listener(&mut self, listener: Arc<dyn HostResultListener>) -> Result<()> {
        if self.state == LifecycleState::Destroyed {
            return Err(CoreError::UsedAfterDestroy("host attachment"));
        }
        if self.context.is_none() {
            return Err(CoreError::Detached);
        }
        self.listeners.push(listener);
        Ok(())
    }

    /// Returns false when no listener consumed the result.
    pub fn on_activity_result(
        &self,
        request_code: i32,
        result_code: i32,
        data: Option<&str>,
    ) -> bool {
        let handled = self
            .listeners
            .iter()
            .any(|l| l.on_activity_result(request_code, result_code, data));
        if !handled {
            tracing::debug!(request_code, "Unhandled activity result");
        }
        handled
    }

    pub fn on_request_permissions_result(
        &self,
        request_code: i32,
        permissions: &[String],
        granted: &[bool],
    ) -> bool {
        self.listeners
            .iter()
            .any(|l| l.on_request_permissions_result(request_code, permissions, granted))
    }
}

impl fmt::Debug for HostAttachment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostAttachment")
            .field("args", &self.args)
            .field("state", &self.state)
            .field("browser", &self.browser)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::BrowserObserver;
    use crate::config::Config;
    use crate::metrics::MetricsSink;
    use parking_lot::Mutex;
    use tether_engine::{EngineCall, MockEngine};
    use tether_tabs::{Tab, TabState};

    struct Settings(bool);

    impl HostSettings for Settings {
        fn password_echo_enabled(&self) -> bool {
            self.0
        }
    }

    #[derive(Default)]
    struct Durations(Mutex<Vec<chrono::Duration>>);

    impl MetricsSink for Durations {
        fn record_session_duration(&self, duration: chrono::Duration) {
            self.0.lock().push(duration);
        }
    }

    #[derive(Default)]
    struct Events(Mutex<Vec<String>>);

    impl BrowserObserver for Events {
        fn on_tab_added(&self, tab: &Tab) {
            self.0.lock().push(format!("added {}", tab.id()));
        }

        fn on_tab_removed(&self, tab: &Tab) {
            self.0.lock().push(format!("removed {}", tab.id()));
        }

        fn on_active_tab_changed(&self, tab: Option<&Tab>) {
            let id = tab.map(|t| t.id()).unwrap_or_default();
            self.0.lock().push(format!("active {}", id));
        }
    }

    struct Fixture {
        runtime: Runtime,
        engine: Arc<MockEngine>,
        durations: Arc<Durations>,
        _dir: tempfile::TempDir,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let engine = Arc::new(MockEngine::new());
        let durations = Arc::new(Durations::default());
        let config = Config::in_memory(dir.path().to_path_buf());
        let runtime = Runtime::builder(config, engine.clone())
            .metrics(durations.clone())
            .build()
            .unwrap();
        runtime.init_sync().unwrap();
        Fixture {
            runtime,
            engine,
            durations,
            _dir: dir,
        }
    }

    fn context() -> HostContext {
        HostContext {
            window_id: 1,
            settings: Arc::new(Settings(true)),
        }
    }

    fn started(f: &Fixture, args: InstanceArgs, saved: Option<&SavedState>) -> HostAttachment {
        let mut host = f.runtime.create_embedding_instance(args).unwrap();
        host.attach(context()).unwrap();
        host.create(saved).unwrap();
        host.start().unwrap();
        host
    }

    #[test]
    fn test_lifecycle_transitions() {
        use LifecycleState::*;

        assert!(Detached.can_transition_to(Attached));
        assert!(Stopped.can_transition_to(Started));
        assert!(Resumed.can_transition_to(Started));
        assert!(!Detached.can_transition_to(Started));
        assert!(!Resumed.can_transition_to(Destroyed));
        assert!(!Destroyed.can_transition_to(Attached));
    }

    #[test]
    fn test_fresh_browser_gets_one_active_tab() {
        let f = fixture();
        let host = started(&f, InstanceArgs::new("work"), None);
        let browser = host.browser().unwrap();

        assert_eq!(browser.tab_count(), 1);
        let active = browser.active_tab().unwrap();
        assert_eq!(active.browser_id().as_deref(), Some(browser.id()));
        assert!(active.is_visible());
        assert!(browser.password_echo_enabled());
        assert!(browser.profile().downloads_initialized());
    }

    #[test]
    fn test_callbacks_out_of_order() {
        let f = fixture();
        let mut host = f.runtime.create_embedding_instance(InstanceArgs::new("work")).unwrap();

        assert!(matches!(host.start(), Err(CoreError::Detached)));
        assert!(matches!(host.browser(), Err(CoreError::NotCreated)));

        host.attach(context()).unwrap();
        assert!(matches!(
            host.resume(),
            Err(CoreError::InvalidLifecycle { .. })
        ));
    }

    #[test]
    fn test_stop_hides_and_start_shows() {
        let f = fixture();
        let mut host = started(&f, InstanceArgs::new("work"), None);
        let tab = host.browser().unwrap().active_tab().unwrap();

        host.stop().unwrap();
        assert!(!tab.is_visible());

        host.start().unwrap();
        assert!(tab.is_visible());
    }

    #[test]
    fn test_detach_keeps_tabs_and_reattach_rebinds() {
        let f = fixture();
        let mut host = started(&f, InstanceArgs::new("work"), None);
        let browser = host.browser().unwrap();
        let second = browser.create_tab().unwrap();

        host.stop().unwrap();
        host.detach().unwrap();

        assert!(!browser.is_attached());
        assert!(matches!(browser.create_tab(), Err(CoreError::Detached)));
        assert_eq!(second.state(), TabState::Attached);
        assert_eq!(browser.tab_count(), 2);

        host.attach(context()).unwrap();
        assert!(browser.is_attached());
        host.create(None).unwrap();
        host.start().unwrap();

        // Same browser, no second engine browser
        assert!(host.browser().unwrap().same_browser(&browser));
        assert_eq!(
            f.engine.count(|c| matches!(c, EngineCall::CreateBrowser(_))),
            1
        );
        assert_eq!(
            f.engine.count(|c| matches!(c, EngineCall::CreateSurface(_))),
            2
        );
    }

    #[test]
    fn test_destroy_is_idempotent_and_releases_everything() {
        let f = fixture();
        let mut host = started(&f, InstanceArgs::new("work"), None);
        let browser = host.browser().unwrap();
        let tabs = vec![browser.active_tab().unwrap(), browser.create_tab().unwrap()];

        host.stop().unwrap();
        host.destroy().unwrap();
        host.destroy().unwrap();
        browser.destroy();

        assert_eq!(host.state(), LifecycleState::Destroyed);
        assert!(browser.is_destroyed());
        assert_eq!(browser.tab_count(), 0);
        for tab in &tabs {
            assert!(tab.is_destroyed());
            assert_eq!(tab.browser_id(), None);
        }
        assert_eq!(f.engine.live_handle_count(), 0);
        assert_eq!(
            f.engine.count(|c| matches!(c, EngineCall::DestroyBrowser(_))),
            1
        );

        assert!(matches!(
            host.browser(),
            Err(CoreError::UsedAfterDestroy("browser"))
        ));
        assert!(matches!(
            browser.create_tab(),
            Err(CoreError::UsedAfterDestroy("browser"))
        ));
        assert!(matches!(
            host.start(),
            Err(CoreError::UsedAfterDestroy(_))
        ));
    }

    #[test]
    fn test_destroy_while_resumed_is_rejected() {
        let f = fixture();
        let mut host = started(&f, InstanceArgs::new("work"), None);
        host.resume().unwrap();

        assert!(matches!(
            host.destroy(),
            Err(CoreError::InvalidLifecycle { .. })
        ));
        host.pause().unwrap();
    }

    #[test]
    fn test_failed_create_leaves_state_for_retry() {
        let f = fixture();
        let mut host = f.runtime.create_embedding_instance(InstanceArgs::new("work")).unwrap();
        host.attach(context()).unwrap();

        f.engine.fail_create_browser();
        assert!(matches!(host.create(None), Err(CoreError::Engine(_))));
        assert_eq!(host.state(), LifecycleState::Attached);
        assert!(matches!(host.browser(), Err(CoreError::NotCreated)));
        assert!(matches!(
            host.start(),
            Err(CoreError::InvalidLifecycle { .. })
        ));
        assert_eq!(host.state(), LifecycleState::Attached);

        host.create(None).unwrap();
        host.start().unwrap();
        assert_eq!(host.state(), LifecycleState::Started);
        assert_eq!(host.browser().unwrap().tab_count(), 1);
    }

    #[test]
    fn test_intents_before_start_apply_in_order_on_start() {
        use crate::profile::IntentOutcome;
        use tether_download::{DownloadIntent, IntentAction};

        let f = fixture();
        let mut host = f.runtime.create_embedding_instance(InstanceArgs::new("work")).unwrap();
        host.attach(context()).unwrap();
        host.create(None).unwrap();

        let profile = f.runtime.get_profile("work").unwrap();
        let handle = f.engine.allocate_handle();
        let id = profile
            .downloads()
            .unwrap()
            .download_started(
                handle,
                "https://example.com/big.iso".to_string(),
                std::path::PathBuf::from("/downloads/big.iso"),
                None,
            )
            .unwrap();

        for action in [IntentAction::Pause, IntentAction::Resume, IntentAction::Cancel] {
            let outcome = f
                .runtime
                .deliver_download_intent(DownloadIntent::new(id, "work", action))
                .unwrap();
            assert_eq!(outcome, IntentOutcome::Queued);
        }
        let download_calls = || -> Vec<EngineCall> {
            f.engine
                .calls()
                .into_iter()
                .filter(|c| {
                    matches!(
                        c,
                        EngineCall::PauseDownload(_)
                            | EngineCall::ResumeDownload(_)
                            | EngineCall::CancelDownload(_)
                    )
                })
                .collect()
        };
        assert!(download_calls().is_empty());

        host.start().unwrap();

        assert_eq!(
            download_calls(),
            vec![
                EngineCall::PauseDownload(handle),
                EngineCall::ResumeDownload(handle),
                EngineCall::CancelDownload(handle),
            ]
        );
        assert_eq!(profile.pending_intent_count(), 0);
        assert!(profile.downloads().unwrap().is_empty());

        // Once started, intents apply immediately
        let late = f
            .runtime
            .deliver_download_intent(DownloadIntent::new(id, "work", IntentAction::Pause))
            .unwrap();
        assert_eq!(late, IntentOutcome::Unhandled);
    }

    #[test]
    fn test_session_duration_with_two_browsers() {
        let f = fixture();
        let mut a = started(&f, InstanceArgs::new("work"), None);
        let mut b = started(&f, InstanceArgs::new("home"), None);

        a.resume().unwrap();
        b.resume().unwrap();
        assert_eq!(f.runtime.foreground_count(), 2);

        a.pause().unwrap();
        assert!(f.durations.0.lock().is_empty());

        b.pause().unwrap();
        assert_eq!(f.durations.0.lock().len(), 1);
        assert_eq!(f.runtime.foreground_count(), 0);
    }

    #[test]
    fn test_tab_moves_between_browsers() {
        let f = fixture();
        let a = started(&f, InstanceArgs::new("work"), None);
        let b = started(&f, InstanceArgs::new("work"), None);
        let (browser_a, browser_b) = (a.browser().unwrap(), b.browser().unwrap());
        let events = Arc::new(Events::default());
        browser_a.add_observer(events.clone());

        let tab = browser_a.create_tab().unwrap();
        browser_b.add_tab(&tab).unwrap();

        assert_eq!(tab.browser_id().as_deref(), Some(browser_b.id()));
        assert!(browser_b.tabs().iter().any(|t| t.same_tab(&tab)));
        assert!(!browser_a.tabs().iter().any(|t| t.same_tab(&tab)));
        assert_eq!(
            events.0.lock().clone(),
            vec![format!("added {}", tab.id()), format!("removed {}", tab.id())]
        );
        // Not active in its new home, so not shown
        assert!(!tab.is_visible());
    }

    #[test]
    fn test_destroying_active_tab_activates_neighbour() {
        let f = fixture();
        let host = started(&f, InstanceArgs::new("work"), None);
        let browser = host.browser().unwrap();
        let events = Arc::new(Events::default());
        browser.add_observer(events.clone());

        let first = browser.active_tab().unwrap();
        let second = browser.create_tab().unwrap();
        browser.destroy_tab(&first.id()).unwrap();

        assert_eq!(browser.active_tab_id(), Some(second.id()));
        assert!(second.is_visible());
        assert!(first.is_destroyed());
        assert_eq!(
            f.engine.count(|c| matches!(c, EngineCall::ReleaseWebContents(_))),
            1
        );
        assert_eq!(
            events.0.lock().clone(),
            vec![
                format!("added {}", second.id()),
                format!("removed {}", first.id()),
                format!("active {}", second.id()),
            ]
        );
    }

    #[test]
    fn test_minimal_state_round_trip() {
        let f = fixture();
        let host = started(&f, InstanceArgs::new("work"), None);
        let browser = host.browser().unwrap();
        let second = browser.create_tab().unwrap();
        browser.navigate(&second.id(), "https://example.com/").unwrap();
        browser.set_active_tab(Some(&second.id())).unwrap();

        let mut saved = SavedState::default();
        host.save_state(&mut saved).unwrap();
        assert!(saved.minimal_persistence_state.is_some());
        assert!(saved.session_crypto_key.is_none());

        let restored = started(&f, InstanceArgs::new("work"), Some(&saved));
        let browser = restored.browser().unwrap();
        assert_eq!(browser.tab_count(), 2);
        let active = browser.active_tab().unwrap();
        assert_eq!(active.url(), "https://example.com/");
        assert!(active.is_visible());
    }

    #[test]
    fn test_invalid_url_rejected() {
        let f = fixture();
        let host = started(&f, InstanceArgs::new("work"), None);
        let browser = host.browser().unwrap();
        let tab = browser.active_tab().unwrap();

        assert!(matches!(
            browser.navigate(&tab.id(), "not a url"),
            Err(CoreError::Tab(_))
        ));
        assert_eq!(
            f.engine.count(|c| matches!(c, EngineCall::Navigate(..))),
            0
        );
    }

    #[test]
    fn test_unhandled_results() {
        struct Consumes;
        impl HostResultListener for Consumes {
            fn on_activity_result(&self, request_code: i32, _: i32, _: Option<&str>) -> bool {
                request_code == 7
            }
        }

        let f = fixture();
        let mut host = started(&f, InstanceArgs::new("work"), None);
        assert!(!host.on_activity_result(7, 0, None));

        host.add_result_listener(Arc::new(Consumes)).unwrap();
        assert!(host.on_activity_result(7, 0, None));
        assert!(!host.on_activity_result(8, 0, None));
        assert!(!host.on_request_permissions_result(1, &[], &[]));

        host.stop().unwrap();
        host.detach().unwrap();
        assert!(!host.on_activity_result(7, 0, None));
    }

    #[tokio::test]
    async fn test_slot_restore_is_async() {
        let f = fixture();
        let args = InstanceArgs::new("work").with_persistence_id("main");

        let host = started(&f, args.clone(), None);
        let browser = host.browser().unwrap();
        // Nothing stored yet, nothing created synchronously
        assert_eq!(browser.tab_count(), 0);
        assert!(browser.is_restore_pending());

        browser.finish_restore().await.unwrap();
        assert_eq!(browser.tab_count(), 1);
        assert!(browser.active_tab().unwrap().is_visible());

        let tab = browser.active_tab().unwrap();
        browser.navigate(&tab.id(), "https://example.com/").unwrap();

        let mut saved = SavedState::default();
        host.save_state(&mut saved).unwrap();
        assert!(saved.is_empty());

        // Slot save is fire-and-forget; wait for it to land
        let store = tether_session::SessionStore::new(f.runtime.database().clone());
        for _ in 0..100 {
            if store.load_slot("work", "main", None).unwrap().is_some() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }

        let again = started(&f, args, None);
        let browser = again.browser().unwrap();
        browser.finish_restore().await.unwrap();
        assert_eq!(browser.tab_count(), 1);
        assert_eq!(browser.active_tab().unwrap().url(), "https://example.com/");
        assert!(browser.poll_restore().unwrap());
    }

    #[tokio::test]
    async fn test_incognito_slot_bound_to_key() {
        let f = fixture();
        let args = InstanceArgs::new("").with_persistence_id("private");

        let host = started(&f, args.clone(), None);
        let browser = host.browser().unwrap();
        browser.finish_restore().await.unwrap();

        let mut saved = SavedState::default();
        host.save_state(&mut saved).unwrap();
        let key = saved.session_crypto_key.clone().unwrap();
        assert_eq!(key.len(), 32);
        assert!(saved.minimal_persistence_state.is_none());

        // Same key on the next save
        host.save_state(&mut saved).unwrap();
        assert_eq!(saved.session_crypto_key.as_deref(), Some(key.as_slice()));

        let store = tether_session::SessionStore::new(f.runtime.database().clone());
        for _ in 0..100 {
            if store.load_slot("", "private", Some(&key)).unwrap().is_some() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert!(store.load_slot("", "private", None).unwrap().is_none());
    }

    #[test]
    fn test_incognito_without_id_uses_minimal_state() {
        let f = fixture();
        let host = started(&f, InstanceArgs::new(""), None);

        let mut saved = SavedState::default();
        host.save_state(&mut saved).unwrap();
        assert!(saved.session_crypto_key.is_none());
        assert!(saved.minimal_persistence_state.is_some());
    }
}
