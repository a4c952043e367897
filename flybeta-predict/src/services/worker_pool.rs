//! Bounded admission pool for per-record pipelines
//!
//! At most `capacity` futures run inside [`WorkerPool::run`] at once; the rest
//! wait for a permit. The pool also tracks the current and peak in-flight count.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::error;

pub const DEFAULT_CONCURRENCY: usize = 10;

#[derive(Debug, Clone)]
pub struct WorkerPool {
    semaphore: Arc<Semaphore>,
    capacity: usize,
    in_flight: Arc<AtomicUsize>,
    high_water: Arc<AtomicUsize>,
}

impl WorkerPool {
    /// `capacity` is clamped to at least 1
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
            in_flight: Arc::new(AtomicUsize::new(0)),
            high_water: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Largest in-flight count observed since creation
    pub fn high_water_mark(&self) -> usize {
        self.high_water.load(Ordering::SeqCst)
    }

    /// Wait for a slot, then drive `fut` to completion while holding it
    pub async fn run<F, T>(&self, fut: F) -> T
    where
        F: Future<Output = T>,
    {
        let _permit = match self.semaphore.acquire().await {
            Ok(permit) => Some(permit),
            Err(e) => {
                error!(
                    capacity = self.capacity,
                    in_flight = self.in_flight(),
                    error = %e,
                    "Worker pool semaphore closed, running without admission"
                );
                None
            }
        };

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.high_water.fetch_max(current, Ordering::SeqCst);

        let _slot = SlotGuard(&self.in_flight);
        fut.await
    }
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::new(DEFAULT_CONCURRENCY)
    }
}

/// Releases the in-flight slot even if the future is dropped early
struct SlotGuard<'a>(&'a AtomicUsize);

impl Drop for SlotGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}
