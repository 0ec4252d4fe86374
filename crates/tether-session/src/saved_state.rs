//! Host saved-state blob

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const CRYPTO_KEY: &str = "sessionCryptoKey";
pub const MINIMAL_STATE: &str = "minimalPersistenceState";

/// What the host keeps for us across process death.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedState {
    pub session_crypto_key: Option<Vec<u8>>,
    pub minimal_persistence_state: Option<Vec<u8>>,
}

impl SavedState {
    pub fn is_empty(&self) -> bool {
        self.session_crypto_key.is_none() && self.minimal_persistence_state.is_none()
    }

    /// Flatten into the host's key/value bundle
    pub fn to_bundle(&self) -> HashMap<String, Vec<u8>> {
        let mut bundle = HashMap::new();
        if let Some(key) = &self.session_crypto_key {
            bundle.insert(CRYPTO_KEY.to_string(), key.clone());
        }
        if let Some(state) = &self.minimal_persistence_state {
            bundle.insert(MINIMAL_STATE.to_string(), state.clone());
        }
        bundle
    }

    pub fn from_bundle(bundle: &HashMap<String, Vec<u8>>) -> Self {
        Self {
            session_crypto_key: bundle.get(CRYPTO_KEY).cloned(),
            minimal_persistence_state: bundle.get(MINIMAL_STATE).cloned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bundle_only_carries_present_values() {
        let saved = SavedState {
            session_crypto_key: Some(vec![1, 2, 3]),
            minimal_persistence_state: None,
        };

        let bundle = saved.to_bundle();
        assert_eq!(bundle.len(), 1);
        assert_eq!(SavedState::from_bundle(&bundle), saved);
        assert!(SavedState::from_bundle(&HashMap::new()).is_empty());
    }
}
