//! Offload pool for CPU-bound jobs.
//!
//! Jobs run on tokio's blocking thread pool so the request-serving scheduler
//! stays free while they execute. A semaphore caps how many run at once,
//! the same way a fixed-size process pool would.

use std::sync::Arc;
use tokio::sync::Semaphore;

use crate::error::{ApiError, Result};

#[derive(Clone)]
pub struct OffloadPool {
    permits: Arc<Semaphore>,
}

impl OffloadPool {
    /// Create a pool that runs at most `size` jobs concurrently
    pub fn new(size: usize) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(size)),
        }
    }

    /// Jobs that could start right now without waiting
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    /// Run `job` off the scheduler and await its result without blocking.
    ///
    /// Queues behind the semaphore when the pool is saturated.
    pub async fn run<F, T>(&self, job: F) -> Result<T>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| ApiError::Offload(e.to_string()))?;

        let handle = tokio::task::spawn_blocking(move || {
            let result = job();
            drop(permit);
            result
        });

        handle.await.map_err(|e| {
            if e.is_panic() {
                ApiError::Offload("worker panicked".to_string())
            } else {
                ApiError::Offload(e.to_string())
            }
        })
    }

    /// Stop accepting new jobs; queued and future `run` calls fail
    pub fn close(&self) {
        self.permits.close();
    }
}
