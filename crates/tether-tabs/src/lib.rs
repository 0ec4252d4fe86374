//! Tether Tab Management
//!
//! A tab is one browsing unit wrapping a single web contents handle. It is
//! owned by exactly one browser at a time and can move between browsers, so
//! tabs are shared handles and ownership is recorded on the tab itself.

mod error;
mod set;
mod state;
mod tab;

pub use error::TabError;
pub use set::TabSet;
pub use state::TabState;
pub use tab::{Tab, BLANK_URL};

pub type Result<T> = std::result::Result<T, TabError>;
