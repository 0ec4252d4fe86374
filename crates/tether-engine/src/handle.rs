//! Owned native handle with a zeroed-after-destroy sentinel

use crate::engine::RawHandle;
use crate::error::HandleError;

/// Owns one raw engine handle.
///
/// A raw value of `0` is the "destroyed" sentinel. [`NativeHandle::close`]
/// hands the raw value back exactly once so the owner can release it with the
/// engine; every later [`NativeHandle::ensure_live`] fails.
#[derive(Debug)]
pub struct NativeHandle {
    kind: &'static str,
    raw: RawHandle,
}

impl NativeHandle {
    pub fn new(kind: &'static str, raw: RawHandle) -> Self {
        Self { kind, raw }
    }

    /// A handle that is already closed
    pub fn closed(kind: &'static str) -> Self {
        Self { kind, raw: 0 }
    }

    pub fn kind(&self) -> &'static str {
        self.kind
    }

    pub fn is_live(&self) -> bool {
        self.raw != 0
    }

    pub fn raw(&self) -> Option<RawHandle> {
        self.is_live().then_some(self.raw)
    }

    pub fn ensure_live(&self) -> Result<RawHandle, HandleError> {
        self.raw().ok_or(HandleError { kind: self.kind })
    }

    /// Zero the handle, returning the raw value if it was still live.
    pub fn close(&mut self) -> Option<RawHandle> {
        let raw = self.raw();
        self.raw = 0;
        raw
    }
}

impl Drop for NativeHandle {
    fn drop(&mut self) {
        if self.is_live() {
            tracing::debug!(kind = self.kind, raw = self.raw, "Native handle dropped while live");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_close_returns_raw_once() {
        let mut handle = NativeHandle::new("tab", 7);
        assert_eq!(handle.ensure_live().unwrap(), 7);

        assert_eq!(handle.close(), Some(7));
        assert_eq!(handle.close(), None);
        assert!(!handle.is_live());
    }

    #[test]
    fn test_closed_handle_reports_kind() {
        let handle = NativeHandle::closed("download");
        let err = handle.ensure_live().unwrap_err();
        assert_eq!(err.kind, "download");
        assert_eq!(err.to_string(), "download used after destroy");
    }
}
