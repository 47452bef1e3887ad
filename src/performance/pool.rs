use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Bounded set of VUs an arrival-rate scenario hands iterations to.
///
/// The pool starts with `pre_allocated` VUs and grows on demand, one VU per
/// start that finds every allocated VU busy, until `max` are allocated. A
/// start that finds all `max` VUs busy gets no lease and must be dropped.
pub struct VuPool {
    permits: Arc<Semaphore>,
    max: u32,
    allocated: AtomicU32,
}

/// A busy VU. Dropping the lease returns the VU to the pool.
pub struct VuLease {
    _permit: OwnedSemaphorePermit,
}

impl VuPool {
    pub fn new(pre_allocated: u32, max: u32) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(max as usize)),
            max,
            allocated: AtomicU32::new(pre_allocated.min(max)),
        }
    }

    pub fn try_acquire(&self) -> Option<VuLease> {
        let permit = Arc::clone(&self.permits).try_acquire_owned().ok()?;
        let busy = self.busy();
        self.allocated.fetch_max(busy, Ordering::Relaxed);
        Some(VuLease { _permit: permit })
    }

    pub fn busy(&self) -> u32 {
        self.max - self.permits.available_permits() as u32
    }

    pub fn allocated(&self) -> u32 {
        self.allocated.load(Ordering::Relaxed)
    }
}
