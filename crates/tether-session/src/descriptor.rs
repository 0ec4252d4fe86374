//! Which persistence path a browser uses, resolved once at construction

use rand::RngCore;

use crate::saved_state::SavedState;

const CRYPTO_KEY_LEN: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistenceMode {
    /// No persistence id: tabs travel as a blob in the host's saved state
    MinimalState,
    /// Durable slot keyed by persistence id
    Slot,
    /// Incognito slot, readable only with the key from saved state
    KeyedSlot,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersistenceDescriptor {
    pub persistence_id: Option<String>,
    pub crypto_key: Option<Vec<u8>>,
    pub minimal_state: Option<Vec<u8>>,
}

impl PersistenceDescriptor {
    /// Pick what to keep from saved state. The crypto key is only honoured
    /// for an incognito profile with a persistence id; the minimal blob only
    /// when there is no persistence id, regardless of incognito.
    pub fn resolve(
        persistence_id: Option<String>,
        incognito: bool,
        saved: Option<&SavedState>,
    ) -> Self {
        let persistence_id = persistence_id.filter(|id| !id.is_empty());
        let saved = saved.cloned().unwrap_or_default();

        match persistence_id {
            Some(id) => Self {
                crypto_key: if incognito {
                    saved.session_crypto_key
                } else {
                    None
                },
                persistence_id: Some(id),
                minimal_state: None,
            },
            None => Self {
                persistence_id: None,
                crypto_key: None,
                minimal_state: saved.minimal_persistence_state,
            },
        }
    }

    pub fn mode(&self, incognito: bool) -> PersistenceMode {
        match (&self.persistence_id, incognito) {
            (None, _) => PersistenceMode::MinimalState,
            (Some(_), true) => PersistenceMode::KeyedSlot,
            (Some(_), false) => PersistenceMode::Slot,
        }
    }
}

pub fn generate_crypto_key() -> Vec<u8> {
    let mut key = vec![0u8; CRYPTO_KEY_LEN];
    rand::thread_rng().fill_bytes(&mut key);
    key
}
