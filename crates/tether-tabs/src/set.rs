//! Insertion-ordered tab set with an optional active tab

use crate::error::TabError;
use crate::tab::Tab;
use crate::Result;

#[derive(Debug, Default)]
pub struct TabSet {
    tabs: Vec<Tab>,
    active_tab_id: Option<String>,
}

impl TabSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.tabs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tabs.is_empty()
    }

    pub fn tabs(&self) -> Vec<Tab> {
        self.tabs.clone()
    }

    pub fn contains(&self, tab_id: &str) -> bool {
        self.position(tab_id).is_some()
    }

    pub fn get(&self, tab_id: &str) -> Result<Tab> {
        self.position(tab_id)
            .map(|i| self.tabs[i].clone())
            .ok_or_else(|| TabError::NotFound(tab_id.to_string()))
    }

    pub fn active_tab_id(&self) -> Option<String> {
        self.active_tab_id.clone()
    }

    pub fn active(&self) -> Option<Tab> {
        self.active_tab_id
            .as_deref()
            .and_then(|id| self.get(id).ok())
    }

    /// Append a tab; a tab id appears at most once.
    pub fn insert(&mut self, tab: Tab) -> Result<()> {
        let id = tab.id();
        if self.contains(&id) {
            return Err(TabError::Duplicate(id));
        }
        self.tabs.push(tab);
        Ok(())
    }

    /// Remove a tab, clearing the active id if it pointed at it.
    /// Returns the tab and whether it was active.
    pub fn remove(&mut self, tab_id: &str) -> Result<(Tab, bool)> {
        let index = self
            .position(tab_id)
            .ok_or_else(|| TabError::NotFound(tab_id.to_string()))?;
        let tab = self.tabs.remove(index);

        let was_active = self.active_tab_id.as_deref() == Some(tab_id);
        if was_active {
            self.active_tab_id = None;
        }

        Ok((tab, was_active))
    }

    /// Set or clear the active tab. Returns the previously active id.
    pub fn set_active(&mut self, tab_id: Option<&str>) -> Result<Option<String>> {
        if let Some(id) = tab_id {
            if !self.contains(id) {
                return Err(TabError::NotFound(id.to_string()));
            }
        }
        Ok(std::mem::replace(
            &mut self.active_tab_id,
            tab_id.map(str::to_string),
        ))
    }

    /// Take every tab out of the set in insertion order.
    pub fn drain(&mut self) -> Vec<Tab> {
        self.active_tab_id = None;
        std::mem::take(&mut self.tabs)
    }

    fn position(&self, tab_id: &str) -> Option<usize> {
        self.tabs.iter().position(|t| t.id() == tab_id)
    }
}
