//! View controller
//!
//! Owns the rendering surface a browser draws into plus the host chrome
//! stacked around it. Exists only while the browser is attached to a host.

use tether_engine::{Engine, NativeHandle, RawHandle};

use crate::Result;

/// Opaque host view (toolbar, bottom sheet, overlay)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ViewHandle(pub u64);

#[derive(Debug)]
pub struct ViewController {
    browser_id: String,
    surface: NativeHandle,
    top_view: Option<ViewHandle>,
    bottom_view: Option<ViewHandle>,
    overlay_views: Vec<ViewHandle>,
    /// Tabs whose contents render into the surface, in browser order
    bound_tabs: Vec<String>,
}

impl ViewController {
    pub(crate) fn new(engine: &dyn Engine, browser_id: &str, browser: RawHandle) -> Result<Self> {
        let surface = engine.create_surface(browser)?;

        tracing::debug!(browser_id = %browser_id, surface, "View controller created");

        Ok(Self {
            browser_id: browser_id.to_string(),
            surface: NativeHandle::new("view controller", surface),
            top_view: None,
            bottom_view: None,
            overlay_views: Vec::new(),
            bound_tabs: Vec::new(),
        })
    }

    pub fn browser_id(&self) -> &str {
        &self.browser_id
    }

    pub fn surface(&self) -> Result<RawHandle> {
        Ok(self.surface.ensure_live()?)
    }

    pub fn is_destroyed(&self) -> bool {
        !self.surface.is_live()
    }

    pub fn bound_tabs(&self) -> &[String] {
        &self.bound_tabs
    }

    pub fn is_bound(&self, tab_id: &str) -> bool {
        self.bound_tabs.iter().any(|id| id == tab_id)
    }

    pub(crate) fn bind_tab(&mut self, tab_id: &str) -> Result<()> {
        self.surface.ensure_live()?;
        if !self.is_bound(tab_id) {
            self.bound_tabs.push(tab_id.to_string());
        }
        Ok(())
    }

    pub(crate) fn unbind_tab(&mut self, tab_id: &str) {
        self.bound_tabs.retain(|id| id != tab_id);
    }

    pub fn top_view(&self) -> Option<ViewHandle> {
        self.top_view
    }

    pub fn bottom_view(&self) -> Option<ViewHandle> {
        self.bottom_view
    }

    pub fn overlay_views(&self) -> &[ViewHandle] {
        &self.overlay_views
    }

    /// Returns the view previously in that slot.
    pub fn set_top_view(&mut self, view: Option<ViewHandle>) -> Result<Option<ViewHandle>> {
        self.surface.ensure_live()?;
        Ok(std::mem::replace(&mut self.top_view, view))
    }

    pub fn set_bottom_view(&mut self, view: Option<ViewHandle>) -> Result<Option<ViewHandle>> {
        self.surface.ensure_live()?;
        Ok(std::mem::replace(&mut self.bottom_view, view))
    }

    /// Overlays stack in insertion order; adding one twice is a no-op.
    pub fn add_overlay_view(&mut self, view: ViewHandle) -> Result<()> {
        self.surface.ensure_live()?;
        if !self.overlay_views.contains(&view) {
            self.overlay_views.push(view);
        }
        Ok(())
    }

    pub fn remove_overlay_view(&mut self, view: ViewHandle) -> Result<bool> {
        self.surface.ensure_live()?;
        let before = self.overlay_views.len();
        self.overlay_views.retain(|v| *v != view);
        Ok(self.overlay_views.len() != before)
    }

    /// Release the surface. Safe to call more than once.
    pub(crate) fn destroy(&mut self, engine: &dyn Engine) {
        self.bound_tabs.clear();
        self.overlay_views.clear();
        self.top_view = None;
        self.bottom_view = None;

        if let Some(surface) = self.surface.close() {
            engine.destroy_surface(surface);
            tracing::debug!(browser_id = %self.browser_id, "View controller destroyed");
        }
    }
}
