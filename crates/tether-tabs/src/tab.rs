//! Tab handle
//!
//! `Tab` is a cheap clone over shared state so the owning browser, the view
//! controller and the host UI all observe the same tab.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::sync::Arc;
use uuid::Uuid;

use tether_engine::{NativeHandle, RawHandle};

use crate::error::TabError;
use crate::state::TabState;
use crate::Result;

pub const BLANK_URL: &str = "about:blank";

#[derive(Debug)]
struct TabInner {
    id: String,
    browser_id: Option<String>,
    state: TabState,
    contents: NativeHandle,
    visible: bool,
    url: String,
    title: String,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct Tab {
    inner: Arc<RwLock<TabInner>>,
}

impl Tab {
    /// Wrap a freshly created web contents owned by `browser_id`.
    pub fn new(browser_id: String, contents: RawHandle) -> Self {
        Self {
            inner: Arc::new(RwLock::new(TabInner {
                id: Uuid::new_v4().to_string(),
                browser_id: Some(browser_id),
                state: TabState::Attached,
                contents: NativeHandle::new("tab", contents),
                visible: false,
                url: BLANK_URL.to_string(),
                title: String::new(),
                created_at: Utc::now(),
            })),
        }
    }

    pub fn id(&self) -> String {
        self.inner.read().id.clone()
    }

    pub fn browser_id(&self) -> Option<String> {
        self.inner.read().browser_id.clone()
    }

    pub fn state(&self) -> TabState {
        self.inner.read().state
    }

    pub fn is_destroyed(&self) -> bool {
        self.state().is_destroyed()
    }

    pub fn is_visible(&self) -> bool {
        self.inner.read().visible
    }

    pub fn url(&self) -> String {
        self.inner.read().url.clone()
    }

    pub fn title(&self) -> String {
        self.inner.read().title.clone()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.inner.read().created_at
    }

    /// Raw contents handle, failing once the tab is destroyed.
    pub fn contents(&self) -> Result<RawHandle> {
        Ok(self.inner.read().contents.ensure_live()?)
    }

    pub fn same_tab(&self, other: &Tab) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    fn transition(inner: &mut TabInner, new_state: TabState) -> Result<()> {
        if !inner.state.can_transition_to(new_state) {
            return Err(TabError::InvalidTransition {
                from: inner.state.to_string(),
                to: new_state.to_string(),
            });
        }

        tracing::debug!(
            tab_id = %inner.id,
            from = %inner.state,
            to = %new_state,
            "Tab state transition"
        );

        inner.state = new_state;
        Ok(())
    }

    /// Record a new owner. The previous owner must have released the tab.
    pub fn attach_to(&self, browser_id: &str) -> Result<()> {
        let mut inner = self.inner.write();
        Self::transition(&mut inner, TabState::Attached)?;
        inner.browser_id = Some(browser_id.to_string());
        Ok(())
    }

    /// Release ownership; a detached tab is never visible.
    pub fn detach(&self) -> Result<()> {
        let mut inner = self.inner.write();
        Self::transition(&mut inner, TabState::Detached)?;
        inner.browser_id = None;
        inner.visible = false;
        Ok(())
    }

    /// Returns true when visibility actually changed.
    pub fn set_visible(&self, visible: bool) -> Result<bool> {
        let mut inner = self.inner.write();
        inner.contents.ensure_live()?;
        if inner.visible == visible {
            return Ok(false);
        }
        inner.visible = visible;
        Ok(true)
    }

    /// Record a committed navigation.
    pub fn record_navigation(&self, url: &str) -> Result<()> {
        if url::Url::parse(url).is_err() {
            return Err(TabError::InvalidUrl(url.to_string()));
        }

        let mut inner = self.inner.write();
        inner.contents.ensure_live()?;
        inner.url = url.to_string();
        inner.title = String::new();
        Ok(())
    }

    pub fn set_title(&self, title: String) -> Result<()> {
        let mut inner = self.inner.write();
        inner.contents.ensure_live()?;
        inner.title = title;
        Ok(())
    }

    /// Mark destroyed and hand back the contents handle for release.
    /// Returns `None` if the tab was already destroyed.
    pub fn destroy(&self) -> Option<RawHandle> {
        let mut inner = self.inner.write();
        if inner.state.is_destroyed() {
            return None;
        }

        inner.state = TabState::Destroyed;
        inner.browser_id = None;
        inner.visible = false;

        tracing::debug!(tab_id = %inner.id, "Tab destroyed");

        inner.contents.close()
    }

    /// Get display title (with fallback to URL)
    pub fn display_title(&self) -> String {
        let inner = self.inner.read();
        if inner.title.is_empty() {
            inner.url.clone()
        } else {
            inner.title.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_tab() {
        let tab = Tab::new("browser-1".to_string(), 5);
        assert_eq!(tab.state(), TabState::Attached);
        assert_eq!(tab.browser_id().as_deref(), Some("browser-1"));
        assert_eq!(tab.url(), BLANK_URL);
        assert_eq!(tab.contents().unwrap(), 5);
        assert!(!tab.is_visible());
    }

    #[test]
    fn test_move_between_owners() {
        let tab = Tab::new("browser-1".to_string(), 5);
        tab.set_visible(true).unwrap();

        tab.detach().unwrap();
        assert_eq!(tab.browser_id(), None);
        assert!(!tab.is_visible());

        tab.attach_to("browser-2").unwrap();
        assert_eq!(tab.browser_id().as_deref(), Some("browser-2"));
    }

    #[test]
    fn test_destroy_releases_once() {
        let tab = Tab::new("browser-1".to_string(), 5);
        let clone = tab.clone();

        assert_eq!(tab.destroy(), Some(5));
        assert_eq!(clone.destroy(), None);
        assert!(clone.is_destroyed());
        assert_eq!(clone.browser_id(), None);
        assert!(clone.contents().is_err());
        assert!(clone.attach_to("browser-2").is_err());
        assert!(clone.set_visible(true).is_err());
    }

    #[test]
    fn test_navigation_resets_title() {
        let tab = Tab::new("browser-1".to_string(), 5);
        tab.set_title("Old".to_string()).unwrap();

        tab.record_navigation("https://example.com/").unwrap();
        assert_eq!(tab.url(), "https://example.com/");
        assert_eq!(tab.display_title(), "https://example.com/");

        assert!(tab.record_navigation("not a url").is_err());
    }
}
