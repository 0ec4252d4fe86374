//! Tether Engine Seam
//!
//! The browser engine beneath the embedding runtime is opaque: it hands out
//! raw handles for browsers, web contents, rendering surfaces and downloads,
//! and the runtime only ever attaches to and lifecycle-manages them.
//!
//! - [`Engine`] is the trait every engine backend implements.
//! - [`NativeHandle`] owns one raw handle and zeroes it on close, so a
//!   use-after-destroy is reported instead of reaching the engine.
//! - [`MockEngine`] records every call and is what the runtime tests run on.

mod engine;
mod error;
mod handle;
mod mock;

pub use engine::{Engine, RawHandle};
pub use error::{EngineError, HandleError};
pub use handle::NativeHandle;
pub use mock::{EngineCall, MockEngine};

pub type Result<T> = std::result::Result<T, EngineError>;
