//! Durable session slots
//!
//! Slots are written and read from the background pool; nothing here is
//! called on the main thread.
//!
//! A keyed slot is sealed with ChaCha20-Poly1305 under the caller's key; the
//! stored payload is `nonce || ciphertext`. Unkeyed slots hold plain JSON.

use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{ChaCha20Poly1305, Nonce};
use chrono::Utc;
use rand::RngCore;
use rusqlite::OptionalExtension;
use sha2::{Digest, Sha256};

use tether_storage::Database;

use crate::error::SessionError;
use crate::snapshot::SessionSnapshot;
use crate::Result;

const NONCE_LEN: usize = 12;

pub struct SessionStore {
    db: Database,
}

impl SessionStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Write a slot. A key encrypts the slot so only the same key reads it back.
    pub fn save_slot(
        &self,
        profile_name: &str,
        persistence_id: &str,
        key: Option<&[u8]>,
        snapshot: &SessionSnapshot,
    ) -> Result<()> {
        let json = serde_json::to_vec(snapshot)?;
        let payload = match key {
            Some(key) => seal(key, &json)?,
            None => json,
        };
        let digest = key.map(key_digest);

        self.db.with_connection(|conn| {
            conn.execute(
                "INSERT OR REPLACE INTO session_slots
                 (profile_name, persistence_id, key_digest, payload, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![
                    profile_name,
                    persistence_id,
                    digest,
                    payload,
                    Utc::now().to_rfc3339(),
                ],
            )?;
            Ok(())
        })?;

        tracing::debug!(
            profile = %profile_name,
            persistence_id = %persistence_id,
            tab_count = snapshot.tabs.len(),
            "Saved session slot"
        );

        Ok(())
    }

    /// Read a slot. A slot sealed with a different key (or with a key when
    /// none is presented) reads as empty.
    pub fn load_slot(
        &self,
        profile_name: &str,
        persistence_id: &str,
        key: Option<&[u8]>,
    ) -> Result<Option<SessionSnapshot>> {
        let row: Option<(Option<String>, Vec<u8>)> = self.db.with_connection(|conn| {
            Ok(conn
                .query_row(
                    "SELECT key_digest, payload FROM session_slots
                     WHERE profile_name = ?1 AND persistence_id = ?2",
                    [profile_name, persistence_id],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?)
        })?;

        let Some((stored_digest, payload)) = row else {
            return Ok(None);
        };

        if stored_digest != key.map(key_digest) {
            tracing::warn!(
                profile = %profile_name,
                persistence_id = %persistence_id,
                "Session slot key mismatch, starting fresh"
            );
            return Ok(None);
        }

        let json = match key {
            Some(key) => match open(key, &payload) {
                Ok(json) => json,
                Err(e) => {
                    tracing::warn!(
                        profile = %profile_name,
                        persistence_id = %persistence_id,
                        error = %e,
                        "Session slot did not decrypt, starting fresh"
                    );
                    return Ok(None);
                }
            },
            None => payload,
        };

        Ok(Some(SessionSnapshot::decode(&json)?))
    }

    pub fn list_slots(&self, profile_name: &str) -> Result<Vec<String>> {
        Ok(self.db.with_connection(|conn| {
            let mut stmt = conn.prepare(
                "SELECT persistence_id FROM session_slots
                 WHERE profile_name = ?1 ORDER BY persistence_id",
            )?;
            let ids: Vec<String> = stmt
                .query_map([profile_name], |row| row.get(0))?
                .filter_map(|r| r.ok())
                .collect();
            Ok(ids)
        })?)
    }

    /// Move every slot of `from` under `to`. Used to detach a deleted
    /// profile's slots from its name before the name is reused.
    pub fn retarget_profile_slots(&self, from: &str, to: &str) -> Result<usize> {
        Ok(self.db.with_connection(|conn| {
            Ok(conn.execute(
                "UPDATE session_slots SET profile_name = ?2 WHERE profile_name = ?1",
                [from, to],
            )?)
        })?)
    }

    pub fn delete_profile_slots(&self, profile_name: &str) -> Result<usize> {
        Ok(self.db.with_connection(|conn| {
            Ok(conn.execute(
                "DELETE FROM session_slots WHERE profile_name = ?1",
                [profile_name],
            )?)
        })?)
    }
}

impl Clone for SessionStore {
    fn clone(&self) -> Self {
        Self {
            db: self.db.clone(),
        }
    }
}

fn cipher(key: &[u8]) -> Result<ChaCha20Poly1305> {
    ChaCha20Poly1305::new_from_slice(key).map_err(|_| SessionError::InvalidKeyLength(key.len()))
}

fn seal(key: &[u8], plaintext: &[u8]) -> Result<Vec<u8>> {
    let mut nonce = [0u8; NONCE_LEN];
    rand::thread_rng().fill_bytes(&mut nonce);

    let ciphertext = cipher(key)?
        .encrypt(Nonce::from_slice(&nonce), plaintext)
        .map_err(|_| SessionError::Crypto("encrypt"))?;

    let mut sealed = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    sealed.extend_from_slice(&nonce);
    sealed.extend_from_slice(&ciphertext);
    Ok(sealed)
}

fn open(key: &[u8], sealed: &[u8]) -> Result<Vec<u8>> {
    if sealed.len() < NONCE_LEN {
        return Err(SessionError::Crypto("truncated payload"));
    }
    let (nonce, ciphertext) = sealed.split_at(NONCE_LEN);
    cipher(key)?
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|_| SessionError::Crypto("decrypt"))
}

fn key_digest(key: &[u8]) -> String {
    Sha256::digest(key)
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}
