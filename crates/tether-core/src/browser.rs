//! Browser
//!
//! A browser aggregates one profile, an ordered set of tabs with at most one
//! active tab, and (while attached to a host) a view controller. It also owns
//! session persistence for its tabs.
//!
//! Observer callbacks are collected while the state lock is held and fired
//! after it is released, in event order.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use tokio::sync::oneshot::error::TryRecvError;
use uuid::Uuid;

use tether_engine::NativeHandle;
use tether_session::{
    generate_crypto_key, PersistenceDescriptor, PersistenceMode, SavedState, SessionSnapshot,
    SessionStore,
};
use tether_tabs::{Tab, TabError, TabSet, BLANK_URL};

use crate::background::{resolve, Pending};
use crate::error::CoreError;
use crate::profile::Profile;
use crate::view::{ViewController, ViewHandle};
use crate::Result;

/// Live browsers by id, used to move tabs between them
pub(crate) type BrowserRegistry = Arc<RwLock<HashMap<String, Weak<BrowserShared>>>>;

/// Per-attachment listener for tab-set changes
pub trait BrowserObserver: Send + Sync {
    fn on_tab_added(&self, _tab: &Tab) {}

    fn on_tab_removed(&self, _tab: &Tab) {}

    fn on_active_tab_changed(&self, _tab: Option<&Tab>) {}

    fn on_restore_completed(&self, _tab_count: usize) {}
}

enum BrowserEvent {
    TabAdded(Tab),
    TabRemoved(Tab),
    ActiveTabChanged(Option<Tab>),
    RestoreCompleted(usize),
}

enum RestoreState {
    NotStarted,
    /// Slot load in flight; `None` while someone is awaiting the receiver
    Loading(Option<Pending<Option<SessionSnapshot>>>),
    Done,
}

struct BrowserState {
    /// Ordered tabs and the active pointer
    tabs: TabSet,
    /// Persistence id and crypto key chosen at creation or restore
    descriptor: PersistenceDescriptor,
    /// Engine browser, zeroed on destroy
    handle: NativeHandle,
    /// Present only while attached to a host
    view: Option<ViewController>,
    observers: Vec<Arc<dyn BrowserObserver>>,
    restore: RestoreState,
    destroyed: bool,
    /// Host is between start and stop
    visible: bool,
    /// System "show passwords" preference, pushed on start
    password_echo: bool,
}

pub(crate) struct BrowserShared {
    id: String,
    profile: Profile,
    registry: BrowserRegistry,
    state: RwLock<BrowserState>,
}

#[derive(Clone)]
pub struct Browser {
    shared: Arc<BrowserShared>,
}

impl Browser {
    pub(crate) fn new(
        profile: Profile,
        descriptor: PersistenceDescriptor,
        registry: BrowserRegistry,
    ) -> Result<Self> {
        profile.ensure_usable()?;

        let id = Uuid::new_v4().to_string();
        let raw = profile
            .context()
            .engine
            .create_browser(profile.name(), descriptor.persistence_id.as_deref())?;

        tracing::info!(
            browser_id = %id,
            profile = %profile.name(),
            persistence_id = ?descriptor.persistence_id,
            "Browser created"
        );

        let shared = Arc::new(BrowserShared {
            id: id.clone(),
            profile,
            registry: Arc::clone(&registry),
            state: RwLock::new(BrowserState {
                tabs: TabSet::new(),
                descriptor,
                handle: NativeHandle::new("browser", raw),
                view: None,
                observers: Vec::new(),
                restore: RestoreState::NotStarted,
                destroyed: false,
                visible: false,
                password_echo: false,
            }),
        });

        registry.write().insert(id, Arc::downgrade(&shared));
        Ok(Self { shared })
    }

    pub fn id(&self) -> &str {
        &self.shared.id
    }

    pub fn profile(&self) -> &Profile {
        &self.shared.profile
    }

    pub fn same_browser(&self, other: &Browser) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }

    pub fn is_destroyed(&self) -> bool {
        self.shared.state.read().destroyed
    }

    /// Attached means a view controller exists.
    pub fn is_attached(&self) -> bool {
        self.shared.state.read().view.is_some()
    }

    pub fn is_visible(&self) -> bool {
        self.shared.state.read().visible
    }

    pub fn persistence_id(&self) -> Option<String> {
        self.shared.state.read().descriptor.persistence_id.clone()
    }

    pub fn persistence_mode(&self) -> PersistenceMode {
        self.shared
            .state
            .read()
            .descriptor
            .mode(self.shared.profile.is_incognito())
    }

    pub fn is_restore_pending(&self) -> bool {
        matches!(self.shared.state.read().restore, RestoreState::Loading(_))
    }

    pub fn password_echo_enabled(&self) -> bool {
        self.shared.state.read().password_echo
    }

    pub(crate) fn set_password_echo_enabled(&self, enabled: bool) {
        self.shared.state.write().password_echo = enabled;
    }

    pub fn tabs(&self) -> Vec<Tab> {
        self.shared.state.read().tabs.tabs()
    }

    pub fn tab_count(&self) -> usize {
        self.shared.state.read().tabs.len()
    }

    pub fn get_tab(&self, tab_id: &str) -> Result<Tab> {
        Ok(self.shared.state.read().tabs.get(tab_id)?)
    }

    pub fn active_tab(&self) -> Option<Tab> {
        self.shared.state.read().tabs.active()
    }

    pub fn active_tab_id(&self) -> Option<String> {
        self.shared.state.read().tabs.active_tab_id()
    }

    pub fn add_observer(&self, observer: Arc<dyn BrowserObserver>) {
        self.shared.state.write().observers.push(observer);
    }

    /// Open a blank tab. It becomes active when no tab is.
    pub fn create_tab(&self) -> Result<Tab> {
        self.mutate(|shared, state, events| {
            ensure_attached(state)?;
            let tab = shared.open_tab(state, events)?;
            if state.tabs.active_tab_id().is_none() {
                shared.activate(state, Some(&tab.id()), events)?;
            }
            Ok(tab)
        })
    }

    /// Move a tab here from whichever browser owns it.
    pub fn add_tab(&self, tab: &Tab) -> Result<()> {
        if tab.is_destroyed() {
            return Err(CoreError::UsedAfterDestroy("tab"));
        }
        if tab.browser_id().as_deref() == Some(self.id()) {
            return Ok(());
        }
        {
            let state = self.shared.state.read();
            check_alive(&state)?;
            ensure_attached(&state)?;
        }

        if let Some(owner_id) = tab.browser_id() {
            let owner = self.shared.registry.read().get(&owner_id).and_then(Weak::upgrade);
            match owner {
                Some(owner) => Browser { shared: owner }.release_tab(&tab.id())?,
                None => tab.detach()?,
            }
        }

        self.mutate(|shared, state, events| {
            tab.attach_to(&shared.id)?;
            state.tabs.insert(tab.clone())?;
            if let Some(view) = state.view.as_mut() {
                view.bind_tab(&tab.id())?;
            }
            events.push(BrowserEvent::TabAdded(tab.clone()));

            if state.tabs.active_tab_id().is_none() {
                shared.activate(state, Some(&tab.id()), events)?;
            }
            tracing::debug!(browser_id = %shared.id, tab_id = %tab.id(), "Tab adopted");
            Ok(())
        })
    }

    /// Give up ownership of a tab without destroying it.
    fn release_tab(&self, tab_id: &str) -> Result<()> {
        self.mutate(|shared, state, events| {
            let tab = shared.unlink(state, tab_id, events)?;
            tab.detach()?;
            Ok(())
        })
    }

    /// Remove a tab from the set, then release its contents.
    pub fn destroy_tab(&self, tab_id: &str) -> Result<()> {
        self.mutate(|shared, state, events| {
            ensure_attached(state)?;
            let tab = shared.unlink(state, tab_id, events)?;
            if let Some(raw) = tab.destroy() {
                shared.profile.context().engine.release_web_contents(raw);
            }
            tracing::debug!(browser_id = %shared.id, tab_id = %tab_id, "Tab destroyed");
            Ok(())
        })
    }

    pub fn set_active_tab(&self, tab_id: Option<&str>) -> Result<()> {
        self.mutate(|shared, state, events| {
            ensure_attached(state)?;
            shared.activate(state, tab_id, events)
        })
    }

    pub fn navigate(&self, tab_id: &str, url: &str) -> Result<()> {
        let state = self.shared.state.read();
        check_alive(&state)?;
        ensure_attached(&state)?;

        let tab = state.tabs.get(tab_id)?;
        if url::Url::parse(url).is_err() {
            return Err(TabError::InvalidUrl(url.to_string()).into());
        }
        let contents = tab.contents()?;
        self.shared.profile.context().engine.navigate(contents, url)?;
        tab.record_navigation(url)?;
        Ok(())
    }

    /// Host signalled the browser is ready; restore tabs once.
    pub fn mark_ready(&self) -> Result<()> {
        let incognito = self.shared.profile.is_incognito();
        let profile_name = self.shared.profile.name().to_string();

        self.mutate(|shared, state, events| {
            if !matches!(state.restore, RestoreState::NotStarted) {
                return Ok(());
            }

            let descriptor = state.descriptor.clone();
            match (descriptor.mode(incognito), descriptor.persistence_id) {
                (PersistenceMode::MinimalState, _) | (_, None) => {
                    let snapshot = descriptor
                        .minimal_state
                        .as_deref()
                        .and_then(|bytes| match SessionSnapshot::decode(bytes) {
                            Ok(snapshot) => Some(snapshot),
                            Err(e) => {
                                tracing::warn!(browser_id = %shared.id, error = %e, "Discarding unreadable saved state");
                                None
                            }
                        });
                    state.restore = RestoreState::Done;
                    shared.apply_restored(state, snapshot, events)
                }
                (_, Some(persistence_id)) => {
                    let store = SessionStore::new(shared.profile.context().db.clone());
                    let key = descriptor.crypto_key;
                    let rx = shared.profile.context().pool.run(move || {
                        Ok(store.load_slot(&profile_name, &persistence_id, key.as_deref())?)
                    });
                    state.restore = RestoreState::Loading(Some(rx));
                    tracing::debug!(browser_id = %shared.id, "Session restore started");
                    Ok(())
                }
            }
        })
    }

    /// Apply a finished background restore. Returns true once restore is done.
    pub fn poll_restore(&self) -> Result<bool> {
        self.mutate(|shared, state, events| {
            let rx = match &mut state.restore {
                RestoreState::Done => return Ok(true),
                RestoreState::NotStarted | RestoreState::Loading(None) => return Ok(false),
                RestoreState::Loading(Some(rx)) => rx,
            };

            let result = match rx.try_recv() {
                Err(TryRecvError::Empty) => return Ok(false),
                Ok(result) => result,
                Err(TryRecvError::Closed) => Err(CoreError::BackgroundTaskLost),
            };

            state.restore = RestoreState::Done;
            shared.apply_restored(state, restored_or_log(&shared.id, result), events)?;
            Ok(true)
        })
    }

    /// Wait for a background restore and apply it.
    pub async fn finish_restore(&self) -> Result<()> {
        let rx = {
            let mut state = self.shared.state.write();
            match &mut state.restore {
                RestoreState::Loading(rx) => rx.take(),
                _ => None,
            }
        };
        let Some(rx) = rx else {
            return Ok(());
        };

        let result = resolve(rx).await;
        self.mutate(|shared, state, events| {
            state.restore = RestoreState::Done;
            shared.apply_restored(state, restored_or_log(&shared.id, result), events)
        })
    }

    /// Capture what the host must keep to restore this browser.
    pub fn save_state(&self, out: &mut SavedState) -> Result<()> {
        let incognito = self.shared.profile.is_incognito();
        let mut state = self.shared.state.write();
        check_alive(&state)?;

        let snapshot = SessionSnapshot::from_tabs(
            &state.tabs.tabs(),
            state.tabs.active_tab_id().as_deref(),
        );
        let mode = state.descriptor.mode(incognito);

        out.session_crypto_key = None;
        out.minimal_persistence_state = None;

        match mode {
            PersistenceMode::MinimalState => {
                out.minimal_persistence_state = Some(snapshot.encode()?);
                return Ok(());
            }
            PersistenceMode::KeyedSlot => {
                let key = state
                    .descriptor
                    .crypto_key
                    .get_or_insert_with(generate_crypto_key)
                    .clone();
                out.session_crypto_key = Some(key);
            }
            PersistenceMode::Slot => {}
        }

        // Saving now would overwrite the slot before it was read back
        if matches!(state.restore, RestoreState::Loading(_)) {
            tracing::debug!(browser_id = %self.shared.id, "Restore pending, slot save skipped");
            return Ok(());
        }

        let Some(persistence_id) = state.descriptor.persistence_id.clone() else {
            return Ok(());
        };
        let key = state.descriptor.crypto_key.clone();
        drop(state);

        let context = self.shared.profile.context();
        let store = SessionStore::new(context.db.clone());
        let profile_name = self.shared.profile.name().to_string();
        context.pool.fire_and_forget("session slot save", move || {
            Ok(store.save_slot(&profile_name, &persistence_id, key.as_deref(), &snapshot)?)
        });
        Ok(())
    }

    pub(crate) fn attach_view(&self) -> Result<()> {
        let mut state = self.shared.state.write();
        check_alive(&state)?;
        if state.view.is_some() {
            return Ok(());
        }

        let engine = &self.shared.profile.context().engine;
        let raw = state.handle.ensure_live()?;
        let mut view = ViewController::new(engine.as_ref(), &self.shared.id, raw)?;
        for tab in state.tabs.tabs() {
            view.bind_tab(&tab.id())?;
        }
        state.view = Some(view);
        self.shared.sync_visibility(&state);
        Ok(())
    }

    /// Tear down the view and per-attachment observers; tabs stay alive.
    pub(crate) fn detach_view(&self) {
        let mut state = self.shared.state.write();
        if let Some(mut view) = state.view.take() {
            view.destroy(self.shared.profile.context().engine.as_ref());
        }
        state.visible = false;
        state.observers.clear();
        self.shared.sync_visibility(&state);
    }

    pub(crate) fn set_visible(&self, visible: bool) -> Result<()> {
        let mut state = self.shared.state.write();
        check_alive(&state)?;
        state.visible = visible;
        self.shared.sync_visibility(&state);
        Ok(())
    }

    pub fn top_view(&self) -> Option<ViewHandle> {
        self.shared.state.read().view.as_ref().and_then(|v| v.top_view())
    }

    pub fn set_top_view(&self, view: Option<ViewHandle>) -> Result<Option<ViewHandle>> {
        self.with_view(|v| v.set_top_view(view))
    }

    pub fn set_bottom_view(&self, view: Option<ViewHandle>) -> Result<Option<ViewHandle>> {
        self.with_view(|v| v.set_bottom_view(view))
    }

    pub fn add_overlay_view(&self, view: ViewHandle) -> Result<()> {
        self.with_view(|v| v.add_overlay_view(view))
    }

    pub fn remove_overlay_view(&self, view: ViewHandle) -> Result<bool> {
        self.with_view(|v| v.remove_overlay_view(view))
    }

    fn with_view<T>(&self, f: impl FnOnce(&mut ViewController) -> Result<T>) -> Result<T> {
        let mut state = self.shared.state.write();
        check_alive(&state)?;
        let view = state.view.as_mut().ok_or(CoreError::Detached)?;
        f(view)
    }

    /// Destroy every tab, the view and the engine browser. Idempotent.
    pub fn destroy(&self) {
        let engine = Arc::clone(&self.shared.profile.context().engine);
        {
            let mut state = self.shared.state.write();
            if state.destroyed {
                return;
            }
            state.destroyed = true;
            state.visible = false;
            state.observers.clear();
            state.restore = RestoreState::Done;

            // Out of the set first, then release
            for tab in state.tabs.drain() {
                if let Some(raw) = tab.destroy() {
                    engine.release_web_contents(raw);
                }
            }

            if let Some(mut view) = state.view.take() {
                view.destroy(engine.as_ref());
            }
            if let Some(raw) = state.handle.close() {
                engine.destroy_browser(raw);
            }
        }

        self.shared.registry.write().remove(&self.shared.id);
        tracing::info!(browser_id = %self.shared.id, "Browser destroyed");
    }

    /// Run a mutation under the state lock, then notify observers.
    fn mutate<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&BrowserShared, &mut BrowserState, &mut Vec<BrowserEvent>) -> Result<T>,
    {
        let mut events = Vec::new();
        let (result, observers) = {
            let mut state = self.shared.state.write();
            check_alive(&state)?;
            let result = f(self.shared.as_ref(), &mut *state, &mut events);
            if !events.is_empty() {
                self.shared.sync_visibility(&state);
            }
            (result, state.observers.clone())
        };

        for event in &events {
            for observer in &observers {
                match event {
                    BrowserEvent::TabAdded(tab) => observer.on_tab_added(tab),
                    BrowserEvent::TabRemoved(tab) => observer.on_tab_removed(tab),
                    BrowserEvent::ActiveTabChanged(tab) => {
                        observer.on_active_tab_changed(tab.as_ref())
                    }
                    BrowserEvent::RestoreCompleted(count) => observer.on_restore_completed(*count),
                }
            }
        }

        result
    }
}

impl BrowserShared {
    fn open_tab(&self, state: &mut BrowserState, events: &mut Vec<BrowserEvent>) -> Result<Tab> {
        let engine = &self.profile.context().engine;
        let browser = state.handle.ensure_live()?;
        let contents = engine.create_web_contents(browser)?;

        let tab = Tab::new(self.id.clone(), contents);
        state.tabs.insert(tab.clone())?;
        if let Some(view) = state.view.as_mut() {
            view.bind_tab(&tab.id())?;
        }

        tracing::debug!(browser_id = %self.id, tab_id = %tab.id(), "Tab created");
        events.push(BrowserEvent::TabAdded(tab.clone()));
        Ok(tab)
    }

    /// Take a tab out of the set, moving the active tab to a neighbour.
    fn unlink(
        &self,
        state: &mut BrowserState,
        tab_id: &str,
        events: &mut Vec<BrowserEvent>,
    ) -> Result<Tab> {
        let index = state
            .tabs
            .tabs()
            .iter()
            .position(|t| t.id() == tab_id)
            .unwrap_or(0);
        let (tab, was_active) = state.tabs.remove(tab_id)?;
        if let Some(view) = state.view.as_mut() {
            view.unbind_tab(tab_id);
        }
        events.push(BrowserEvent::TabRemoved(tab.clone()));

        if was_active {
            let remaining = state.tabs.tabs();
            let next = remaining
                .get(index)
                .or_else(|| remaining.last())
                .map(|t| t.id());
            self.activate(state, next.as_deref(), events)?;
        }
        Ok(tab)
    }

    fn activate(
        &self,
        state: &mut BrowserState,
        tab_id: Option<&str>,
        events: &mut Vec<BrowserEvent>,
    ) -> Result<()> {
        let previous = state.tabs.set_active(tab_id)?;
        if previous.as_deref() != tab_id {
            tracing::debug!(browser_id = %self.id, tab_id = ?tab_id, "Active tab changed");
            events.push(BrowserEvent::ActiveTabChanged(state.tabs.active()));
        }
        Ok(())
    }

    fn apply_restored(
        &self,
        state: &mut BrowserState,
        snapshot: Option<SessionSnapshot>,
        events: &mut Vec<BrowserEvent>,
    ) -> Result<()> {
        let engine = Arc::clone(&self.profile.context().engine);
        let mut restored = Vec::new();

        if let Some(snapshot) = snapshot {
            for saved in &snapshot.tabs {
                let tab = self.open_tab(state, events)?;
                if saved.url != BLANK_URL {
                    match engine.navigate(tab.contents()?, &saved.url) {
                        Ok(()) => tab.record_navigation(&saved.url)?,
                        Err(e) => tracing::warn!(tab_id = %tab.id(), error = %e, "Restored navigation failed"),
                    }
                }
                tab.set_title(saved.title.clone())?;
                restored.push(tab);
            }

            let active = snapshot
                .active_index
                .and_then(|i| restored.get(i))
                .or_else(|| restored.first());
            if let Some(active) = active {
                self.activate(state, Some(&active.id()), events)?;
            }
        }

        if state.tabs.is_empty() {
            let tab = self.open_tab(state, events)?;
            self.activate(state, Some(&tab.id()), events)?;
        }

        tracing::info!(browser_id = %self.id, restored = restored.len(), "Session restore finished");
        events.push(BrowserEvent::RestoreCompleted(restored.len()));
        Ok(())
    }

    /// Only the active tab of a visible, attached browser is shown.
    fn sync_visibility(&self, state: &BrowserState) {
        let engine = &self.profile.context().engine;
        let shown = state.visible && state.view.is_some() && !state.destroyed;
        let active = state.tabs.active_tab_id();

        for tab in state.tabs.tabs() {
            let visible = shown && active.as_deref() == Some(tab.id().as_str());
            match tab.set_visible(visible) {
                Ok(true) => {
                    if let Ok(contents) = tab.contents() {
                        engine.set_contents_visible(contents, visible);
                    }
                }
                Ok(false) => {}
                Err(e) => tracing::warn!(tab_id = %tab.id(), error = %e, "Visibility update failed"),
            }
        }
    }
}

fn check_alive(state: &BrowserState) -> Result<()> {
    if state.destroyed {
        return Err(CoreError::UsedAfterDestroy("browser"));
    }
    Ok(())
}

fn ensure_attached(state: &BrowserState) -> Result<()> {
    if state.view.is_none() {
        return Err(CoreError::Detached);
    }
    Ok(())
}

fn restored_or_log(
    browser_id: &str,
    result: Result<Option<SessionSnapshot>>,
) -> Option<SessionSnapshot> {
    match result {
        Ok(snapshot) => snapshot,
        Err(e) => {
            tracing::warn!(browser_id = %browser_id, error = %e, "Session restore failed, starting fresh");
            None
        }
    }
}

impl std::fmt::Debug for Browser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Browser")
            .field("id", &self.shared.id)
            .field("profile", &self.shared.profile.name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::runtime::Runtime;
    use parking_lot::Mutex;
    use tether_engine::{EngineCall, MockEngine};

    #[derive(Default)]
    struct Recorder(Mutex<Vec<String>>);

    impl BrowserObserver for Recorder {
        fn on_tab_added(&self, tab: &Tab) {
            self.0.lock().push(format!("added {}", tab.id()));
        }

        fn on_active_tab_changed(&self, tab: Option<&Tab>) {
            let id = tab.map(|t| t.id()).unwrap_or_default();
            self.0.lock().push(format!("active {}", id));
        }

        fn on_restore_completed(&self, tab_count: usize) {
            self.0.lock().push(format!("restored {}", tab_count));
        }
    }

    fn setup(dir: &std::path::Path) -> (Runtime, Arc<MockEngine>) {
        let engine = Arc::new(MockEngine::new());
        let runtime = Runtime::builder(Config::in_memory(dir.to_path_buf()), engine.clone())
            .build()
            .unwrap();
        runtime.init_sync().unwrap();
        (runtime, engine)
    }

    fn browser(runtime: &Runtime, profile: &str, descriptor: PersistenceDescriptor) -> Browser {
        let profile = runtime.get_profile(profile).unwrap();
        let browser = runtime.create_browser(profile, descriptor).unwrap();
        browser.attach_view().unwrap();
        browser
    }

    #[test]
    fn test_blank_tab_added_before_activated() {
        let dir = tempfile::tempdir().unwrap();
        let (runtime, _) = setup(dir.path());
        let browser = browser(&runtime, "work", PersistenceDescriptor::default());
        let recorder = Arc::new(Recorder::default());
        browser.add_observer(recorder.clone());

        browser.mark_ready().unwrap();
        browser.mark_ready().unwrap();

        let tab = browser.active_tab().unwrap();
        assert_eq!(browser.tab_count(), 1);
        assert_eq!(
            recorder.0.lock().clone(),
            vec![
                format!("added {}", tab.id()),
                format!("active {}", tab.id()),
                "restored 0".to_string(),
            ]
        );
    }

    #[test]
    fn test_unreadable_minimal_state_starts_fresh() {
        let dir = tempfile::tempdir().unwrap();
        let (runtime, _) = setup(dir.path());
        let descriptor = PersistenceDescriptor {
            minimal_state: Some(b"not json".to_vec()),
            ..Default::default()
        };
        let browser = browser(&runtime, "work", descriptor);

        browser.mark_ready().unwrap();
        assert_eq!(browser.tab_count(), 1);
        assert!(browser.poll_restore().unwrap());
    }

    #[tokio::test]
    async fn test_pending_restore_creates_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let (runtime, engine) = setup(dir.path());
        let descriptor = PersistenceDescriptor {
            persistence_id: Some("main".to_string()),
            ..Default::default()
        };
        let browser = browser(&runtime, "work", descriptor);

        browser.mark_ready().unwrap();
        assert!(browser.is_restore_pending());
        assert_eq!(
            engine.count(|c| matches!(c, EngineCall::CreateWebContents(_))),
            0
        );

        let mut saved = SavedState::default();
        browser.save_state(&mut saved).unwrap();
        assert!(saved.is_empty());

        browser.finish_restore().await.unwrap();
        assert!(!browser.is_restore_pending());
        assert_eq!(browser.tab_count(), 1);
        assert_eq!(
            browser.active_tab().unwrap().browser_id().as_deref(),
            Some(browser.id())
        );
    }

    #[test]
    fn test_visibility_follows_browser_and_active_tab() {
        let dir = tempfile::tempdir().unwrap();
        let (runtime, _) = setup(dir.path());
        let browser = browser(&runtime, "work", PersistenceDescriptor::default());
        browser.mark_ready().unwrap();

        let first = browser.active_tab().unwrap();
        let second = browser.create_tab().unwrap();
        assert!(!first.is_visible());

        browser.set_visible(true).unwrap();
        assert!(first.is_visible());
        assert!(!second.is_visible());

        browser.set_active_tab(Some(&second.id())).unwrap();
        assert!(!first.is_visible());
        assert!(second.is_visible());

        browser.detach_view();
        assert!(!second.is_visible());
    }

    #[test]
    fn test_chrome_views_need_attachment() {
        let dir = tempfile::tempdir().unwrap();
        let (runtime, _) = setup(dir.path());
        let browser = browser(&runtime, "work", PersistenceDescriptor::default());

        browser.set_top_view(Some(ViewHandle(1))).unwrap();
        assert_eq!(browser.top_view(), Some(ViewHandle(1)));

        browser.detach_view();
        assert!(matches!(
            browser.set_top_view(None),
            Err(CoreError::Detached)
        ));
    }
}
