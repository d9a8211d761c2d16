use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::trace;

use crate::semaphore::Semaphore;

/// Registry slot for one key
struct Entry {
    semaphore: Arc<Semaphore>,

    /// Lockers handed out for this key that have not locked yet
    waiters: usize,
}

struct Shared<K> {
    capacity: usize,

    /// Guards the map and every entry's `waiters`
    entries: Mutex<HashMap<K, Entry>>,
}

impl<K: Eq + Hash> Shared<K> {
    /// Drop `key` from the map if it still points at `semaphore` and nobody
    /// waits on or holds it.
    ///
    /// Caller holds the registry lock. This is the only place both locks are
    /// held at once: registry first, then the semaphore's own, released
    /// before returning. No path takes the registry lock while holding a
    /// semaphore lock (`release` drops its lock before `released` runs), so
    /// the nesting cannot deadlock.
    ///
    /// `v` has to be read live here rather than passed in: a value read before
    /// taking the registry lock can be stale, since another locker may register,
    /// acquire and leave `waiters` at 0 in between, and pruning on that stale
    /// `v == n` would drop an entry that still has a holder.
    fn prune_locked(entries: &mut HashMap<K, Entry>, key: &K, semaphore: &Arc<Semaphore>) {
        let idle = match entries.get(key) {
            Some(entry) => Arc::ptr_eq(&entry.semaphore, semaphore) && entry.waiters == 0 && semaphore.is_idle(),
            None => false,
        };
        if idle {
            entries.remove(key);
            trace!(remaining = entries.len(), "removed idle registry entry");
        }
    }

    /// A waiter became a holder
    fn admitted(&self, key: &K, semaphore: &Arc<Semaphore>) {
        let mut entries = self.entries.lock();
        match entries.get_mut(key) {
            Some(entry) if Arc::ptr_eq(&entry.semaphore, semaphore) => entry.waiters -= 1,
            _ => debug_assert!(false, "entry removed while a waiter was queued"),
        }
    }

    /// A waiter gave up before locking
    fn withdraw(&self, key: &K, semaphore: &Arc<Semaphore>) {
        let mut entries = self.entries.lock();
        match entries.get_mut(key) {
            Some(entry) if Arc::ptr_eq(&entry.semaphore, semaphore) => entry.waiters -= 1,
            _ => {
                debug_assert!(false, "entry removed while a waiter was queued");
                return;
            }
        }
        Self::prune_locked(&mut entries, key, semaphore);
    }

    /// A holder released its slot
    fn released(&self, key: &K, semaphore: &Arc<Semaphore>) {
        let mut entries = self.entries.lock();
        Self::prune_locked(&mut entries, key, semaphore);
    }
}

/// Map from classification key to that key's [`Semaphore`]
///
/// Entries are created on the first [`KeyRegistry::locker`] call for a key and
/// removed as soon as the key is fully idle (no holders, no queued lockers),
/// so memory tracks the number of active keys rather than every key ever
/// seen.
///
/// Cloning is cheap and yields a handle to the same registry.
pub struct KeyRegistry<K> {
    shared: Arc<Shared<K>>,
}

impl<K> Clone for KeyRegistry<K> {
    fn clone(&self) -> Self {
        Self { shared: Arc::clone(&self.shared) }
    }
}

impl<K> fmt::Debug for KeyRegistry<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyRegistry").field("capacity", &self.shared.capacity).field("keys", &self.shared.entries.lock().len()).finish()
    }
}

impl<K: Eq + Hash + Clone> KeyRegistry<K> {
    /// Create an empty registry allowing `capacity` concurrent holders per key
    ///
    /// # Panics
    /// Panics if capacity is 0
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "Capacity must be greater than 0");

        Self { shared: Arc::new(Shared { capacity, entries: Mutex::new(HashMap::new()) }) }
    }

    /// Get a [`Locker`] for `key`, creating the key's entry if needed
    ///
    /// The caller counts as waiting on `key` until the locker is locked or
    /// dropped, which keeps the entry alive in between.
    pub fn locker(&self, key: K) -> Locker<K> {
        let semaphore = {
            let mut entries = self.shared.entries.lock();
            let entry = entries.entry(key.clone()).or_insert_with(|| {
                trace!("created registry entry");
                Entry { semaphore: Arc::new(Semaphore::new(self.shared.capacity)), waiters: 0 }
            });
            entry.waiters += 1;
            Arc::clone(&entry.semaphore)
        };

        Locker { shared: Arc::clone(&self.shared), key, semaphore, waiting: true }
    }

    /// Concurrent holders allowed per key
    pub fn capacity(&self) -> usize {
        self.shared.capacity
    }

    /// Number of keys currently in use
    pub fn len(&self) -> usize {
        self.shared.entries.lock().len()
    }

    /// True when no key is in use
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True when `key` has an entry
    pub fn contains(&self, key: &K) -> bool {
        self.shared.entries.lock().contains_key(key)
    }

    /// Number of lockers for `key` that have not locked yet
    pub fn waiters(&self, key: &K) -> usize {
        self.shared.entries.lock().get(key).map_or(0, |entry| entry.waiters)
    }

    /// Free slots for `key`; a key without an entry has all of them
    pub fn available(&self, key: &K) -> usize {
        self.shared.entries.lock().get(key).map_or(self.shared.capacity, |entry| entry.semaphore.available())
    }
}

/// Handle for one pending acquisition of a key's slot
///
/// Obtained from [`KeyRegistry::locker`]. Consumed by [`Locker::lock`];
/// dropping it unlocked (or dropping the `lock` future mid-wait) withdraws
/// from the key's queue.
#[must_use = "a locker keeps its key's entry alive until locked or dropped"]
pub struct Locker<K: Eq + Hash> {
    shared: Arc<Shared<K>>,
    key: K,
    semaphore: Arc<Semaphore>,
    waiting: bool,
}

impl<K: Eq + Hash + Clone> Locker<K> {
    /// Wait for a free slot and take it
    pub async fn lock(mut self) -> Permit<K> {
        self.semaphore.acquire().await;
        self.shared.admitted(&self.key, &self.semaphore);
        self.waiting = false;

        Permit { shared: Arc::clone(&self.shared), key: self.key.clone(), semaphore: Arc::clone(&self.semaphore) }
    }

    /// Key this locker queues on
    pub fn key(&self) -> &K {
        &self.key
    }
}

impl<K: Eq + Hash> Drop for Locker<K> {
    fn drop(&mut self) {
        if self.waiting {
            self.shared.withdraw(&self.key, &self.semaphore);
        }
    }
}

impl<K: Eq + Hash + fmt::Debug> fmt::Debug for Locker<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Locker").field("key", &self.key).field("waiting", &self.waiting).finish()
    }
}

/// A held slot; dropping it releases the slot
#[must_use = "the slot is released as soon as the permit is dropped"]
pub struct Permit<K: Eq + Hash> {
    shared: Arc<Shared<K>>,
    key: K,
    semaphore: Arc<Semaphore>,
}

impl<K: Eq + Hash> Permit<K> {
    /// Key this slot belongs to
    pub fn key(&self) -> &K {
        &self.key
    }
}

impl<K: Eq + Hash> Drop for Permit<K> {
    fn drop(&mut self) {
        // Semaphore lock is taken and released inside `release`, before the
        // registry lock is touched.
        let available = self.semaphore.release();
        if available == self.semaphore.capacity() {
            self.shared.released(&self.key, &self.semaphore);
        }
    }
}

impl<K: Eq + Hash + fmt::Debug> fmt::Debug for Permit<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Permit").field("key", &self.key).finish()
    }
}
