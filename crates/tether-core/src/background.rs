//! Background task pool
//!
//! Disk-bound work runs on tokio's blocking pool. Each job resolves exactly
//! once through a oneshot channel carrying either its value or its error.

use std::sync::Arc;
use tokio::runtime::{Handle, Runtime};
use tokio::sync::oneshot;

use crate::error::CoreError;
use crate::Result;

/// Single-resolution result of a background job
pub type Pending<T> = oneshot::Receiver<Result<T>>;

#[derive(Clone)]
pub struct BackgroundPool {
    handle: Handle,
    // Only set when no tokio runtime was running at construction
    _owned: Option<Arc<OwnedRuntime>>,
}

/// Private runtime released without blocking, so the last pool clone may be
/// dropped from async code.
struct OwnedRuntime(Option<Runtime>);

impl Drop for OwnedRuntime {
    fn drop(&mut self) {
        if let Some(runtime) = self.0.take() {
            runtime.shutdown_background();
        }
    }
}

impl BackgroundPool {
    /// Use the ambient tokio runtime, or start a small private one.
    pub fn new() -> Result<Self> {
        if let Ok(handle) = Handle::try_current() {
            return Ok(Self {
                handle,
                _owned: None,
            });
        }

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("tether-background")
            .enable_all()
            .build()
            .map_err(|e| CoreError::Config(format!("background pool: {}", e)))?;

        Ok(Self {
            handle: runtime.handle().clone(),
            _owned: Some(Arc::new(OwnedRuntime(Some(runtime)))),
        })
    }

    pub fn run<T, F>(&self, job: F) -> Pending<T>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T> + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        self.handle.spawn_blocking(move || {
            // Receiver may be gone; the job still ran to completion
            let _ = tx.send(job());
        });
        rx
    }

    /// Run a job nobody waits for; failures are logged.
    pub fn fire_and_forget<F>(&self, what: &'static str, job: F)
    where
        F: FnOnce() -> Result<()> + Send + 'static,
    {
        self.handle.spawn_blocking(move || {
            if let Err(e) = job() {
                tracing::warn!(task = what, error = %e, "Background task failed");
            }
        });
    }
}

/// Wait for a pending result from async code.
pub async fn resolve<T>(pending: Pending<T>) -> Result<T> {
    pending.await.map_err(|_| CoreError::BackgroundTaskLost)?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_run_resolves_once_with_value() {
        let pool = BackgroundPool::new().unwrap();
        let value = resolve(pool.run(|| Ok(41 + 1))).await.unwrap();
        assert_eq!(value, 42);
    }

    #[tokio::test]
    async fn test_errors_travel_through_channel() {
        let pool = BackgroundPool::new().unwrap();
        let result: Result<()> =
            resolve(pool.run(|| Err(CoreError::Config("boom".to_string())))).await;
        assert!(matches!(result, Err(CoreError::Config(msg)) if msg == "boom"));
    }

    #[test]
    fn test_private_runtime_outside_tokio() {
        let pool = BackgroundPool::new().unwrap();
        let value = pool.run(|| Ok("done")).blocking_recv().unwrap().unwrap();
        assert_eq!(value, "done");
    }

    #[test]
    fn test_private_runtime_dropped_from_async_code() {
        let pool = BackgroundPool::new().unwrap();
        assert!(pool._owned.is_some());

        let outer = tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap();
        outer.block_on(async move {
            let value = resolve(pool.run(|| Ok(7))).await.unwrap();
            assert_eq!(value, 7);
            drop(pool);
        });
    }
}
