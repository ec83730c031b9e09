use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Default)]
struct Counters {
    acquired: AtomicU64,
    released: AtomicU64,
    active: AtomicUsize,
    peak: AtomicUsize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LimiterStats {
    pub capacity: usize,
    pub acquired: u64,
    pub released: u64,
    pub peak_active: usize,
}

/// Fixed pool of concurrency slots.
///
/// A slot is only ever handed out as a [`Slot`] guard, and dropping the guard
/// is the only way to give it back.
#[derive(Debug, Clone)]
pub struct Limiter {
    permits: Arc<Semaphore>,
    counters: Arc<Counters>,
    capacity: usize,
}

impl Limiter {
    /// A capacity of zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            permits: Arc::new(Semaphore::new(capacity)),
            counters: Arc::new(Counters::default()),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Waits for a free slot. Returns `None` if `cancel` fires first, in which
    /// case nothing was acquired.
    pub async fn acquire(&self, cancel: &CancellationToken) -> Option<Slot> {
        let permit = tokio::select! {
            biased;
            _ = cancel.cancelled() => return None,
            permit = Arc::clone(&self.permits).acquire_owned() => permit.ok()?,
        };

        self.counters.acquired.fetch_add(1, Ordering::SeqCst);
        let active = self.counters.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.counters.peak.fetch_max(active, Ordering::SeqCst);

        Some(Slot {
            counters: Arc::clone(&self.counters),
            _permit: permit,
        })
    }

    pub fn active(&self) -> usize {
        self.counters.active.load(Ordering::SeqCst)
    }

    pub fn stats(&self) -> LimiterStats {
        LimiterStats {
            capacity: self.capacity,
            acquired: self.counters.acquired.load(Ordering::SeqCst),
            released: self.counters.released.load(Ordering::SeqCst),
            peak_active: self.counters.peak.load(Ordering::SeqCst),
        }
    }
}

/// One held slot. Released on drop, whatever the exit path.
#[derive(Debug)]
pub struct Slot {
    counters: Arc<Counters>,
    // Dropped after `Drop::drop` runs, so the counters never show more
    // active slots than the semaphore allows.
    _permit: OwnedSemaphorePermit,
}

impl Drop for Slot {
    fn drop(&mut self) {
        self.counters.active.fetch_sub(1, Ordering::SeqCst);
        self.counters.released.fetch_add(1, Ordering::SeqCst);
    }
}
