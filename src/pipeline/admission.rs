//! Global admission pool for slicing work.
//!
//! One pool is shared by every processing task of every aggregate. A task
//! waits for a permit before it starts and gives it back when it finishes,
//! whatever the outcome.

use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::{Semaphore, SemaphorePermit};

use crate::error::ProcessingError;

/// Default number of concurrently processed items.
pub const DEFAULT_SLICE_CONCURRENCY: usize = 2;

/// Counting gate with in-flight and peak instrumentation.
#[derive(Debug)]
pub struct AdmissionPool {
    semaphore: Semaphore,
    capacity: usize,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl AdmissionPool {
    /// Create a pool admitting `capacity` tasks at once (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            semaphore: Semaphore::new(capacity),
            capacity,
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    /// Wait for a permit. Waiters are served in FIFO order.
    pub async fn acquire(&self) -> Result<AdmissionPermit<'_>, ProcessingError> {
        let permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|_| ProcessingError::AdmissionClosed)?;

        let current = self.in_flight.fetch_add(1, Ordering::AcqRel) + 1;
        self.peak.fetch_max(current, Ordering::AcqRel);

        Ok(AdmissionPermit {
            _permit: permit,
            in_flight: &self.in_flight,
        })
    }

    /// Stop admitting work. Pending and future `acquire` calls fail.
    pub fn close(&self) {
        self.semaphore.close();
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Tasks currently holding a permit.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Highest number of simultaneous permit holders observed.
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::Acquire)
    }

    /// Permits currently free.
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }
}

impl Default for AdmissionPool {
    fn default() -> Self {
        Self::new(DEFAULT_SLICE_CONCURRENCY)
    }
}

/// Held for the duration of one task; released on drop.
#[derive(Debug)]
pub struct AdmissionPermit<'a> {
    _permit: SemaphorePermit<'a>,
    in_flight: &'a AtomicUsize,
}

impl Drop for AdmissionPermit<'_> {
    fn drop(&mut self) {
        self.in_flight.fetch_sub(1, Ordering::AcqRel);
    }
}
