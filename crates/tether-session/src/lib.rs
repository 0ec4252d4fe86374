//! Tether Session Persistence
//!
//! A browser persists its tabs one of two ways, never both:
//! - with a persistence id, into a durable slot (encrypted with a crypto key for
//!   incognito profiles, in which case only the key travels in saved state)
//! - without one, as a minimal state blob carried in the host's saved state

mod descriptor;
mod error;
mod saved_state;
mod snapshot;
mod store;

pub use descriptor::{generate_crypto_key, PersistenceDescriptor, PersistenceMode};
pub use error::SessionError;
pub use saved_state::SavedState;
pub use snapshot::{SessionSnapshot, TabSnapshot};
pub use store::SessionStore;

pub type Result<T> = std::result::Result<T, SessionError>;
