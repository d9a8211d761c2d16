use parking_lot::Mutex;
use tokio::sync::Notify;

/// Counting semaphore for a single admission bucket
///
/// `available` is guarded by its own mutex and never touched while any other
/// lock is held by this type. Blocking is done on a [`Notify`]: each release
/// wakes at most one waiter, and woken waiters re-check the count, so there is
/// no ordering guarantee among waiters.
#[derive(Debug)]
pub struct Semaphore {
    /// Number of holders allowed at once
    capacity: usize,

    /// Slots currently free (0..=capacity)
    available: Mutex<usize>,

    /// Wakes waiters blocked on `available == 0`
    notify: Notify,
}

impl Semaphore {
    /// Create a semaphore with all `capacity` slots free
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "Capacity must be greater than 0");

        Self { capacity, available: Mutex::new(capacity), notify: Notify::new() }
    }

    /// Take a slot without waiting
    pub fn try_acquire(&self) -> bool {
        let mut available = self.available.lock();
        if *available == 0 {
            return false;
        }
        *available -= 1;
        true
    }

    /// Wait until a slot is free and take it
    ///
    /// Cancel safe: dropping the future before it completes takes nothing.
    pub async fn acquire(&self) {
        loop {
            // Registered as a waiter before the check. `notify_one` only reaches
            // enabled waiters; otherwise releases coalesce into one stored permit.
            let mut notified = std::pin::pin!(self.notify.notified());
            notified.as_mut().enable();
            if self.try_acquire() {
                return;
            }
            notified.await;
        }
    }

    /// Return a slot and wake one waiter
    ///
    /// Returns the number of free slots right after the release.
    pub fn release(&self) -> usize {
        let available = {
            let mut available = self.available.lock();
            debug_assert!(*available < self.capacity, "released more slots than acquired");
            *available += 1;
            *available
        };
        self.notify.notify_one();
        available
    }

    /// Number of free slots
    pub fn available(&self) -> usize {
        *self.available.lock()
    }

    /// Maximum number of concurrent holders
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// True when nobody holds a slot
    pub fn is_idle(&self) -> bool {
        self.available() == self.capacity
    }
}
