//! Tab State Machine
//!
//! ```text
//! Attached <-> Detached
//!     \         /
//!      Destroyed
//! ```

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TabState {
    /// Owned by a browser
    Attached,
    /// Between owners while moving from one browser to another
    Detached,
    /// Contents released; terminal
    Destroyed,
}

impl TabState {
    /// Check if transition to another state is valid
    pub fn can_transition_to(&self, target: TabState) -> bool {
        match (self, target) {
            (TabState::Attached, TabState::Detached) => true,
            (TabState::Detached, TabState::Attached) => true,
            (TabState::Attached, TabState::Destroyed) => true,
            (TabState::Detached, TabState::Destroyed) => true,
            (TabState::Destroyed, _) => false,
            (a, b) if *a == b => true,
            _ => false,
        }
    }

    pub fn is_destroyed(&self) -> bool {
        matches!(self, TabState::Destroyed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TabState::Attached => "attached",
            TabState::Detached => "detached",
            TabState::Destroyed => "destroyed",
        }
    }
}

impl std::fmt::Display for TabState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_transitions() {
        assert!(TabState::Attached.can_transition_to(TabState::Detached));
        assert!(TabState::Detached.can_transition_to(TabState::Attached));
        assert!(TabState::Attached.can_transition_to(TabState::Destroyed));
        assert!(TabState::Detached.can_transition_to(TabState::Destroyed));
    }

    #[test]
    fn test_destroyed_is_terminal() {
        assert!(!TabState::Destroyed.can_transition_to(TabState::Attached));
        assert!(!TabState::Destroyed.can_transition_to(TabState::Detached));
        assert!(!TabState::Destroyed.can_transition_to(TabState::Destroyed));
    }
}
