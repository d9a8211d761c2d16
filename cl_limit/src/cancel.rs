use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fmt;

use parking_lot::Mutex;

use crate::limiter::RequestId;

/// Callback that abandons a queued request
pub type CancelFn = Box<dyn FnOnce() + Send>;

/// Cancel callbacks for requests still waiting for admission
///
/// An entry lives from the moment a request starts waiting until it is
/// admitted, canceled, or its dispatch is dropped.
#[derive(Default)]
pub struct CancellationRegistry {
    callbacks: Mutex<HashMap<RequestId, CancelFn>>,
}

impl CancellationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `callback` for `id`
    ///
    /// An id already queued keeps its callback; the new one is handed back
    /// unregistered.
    pub fn register(&self, id: RequestId, callback: CancelFn) -> Result<(), CancelFn> {
        match self.callbacks.lock().entry(id) {
            Entry::Occupied(_) => Err(callback),
            Entry::Vacant(slot) => {
                slot.insert(callback);
                Ok(())
            }
        }
    }

    /// Remove the callback for `id` without running it
    pub fn deregister(&self, id: RequestId) -> Option<CancelFn> {
        self.callbacks.lock().remove(&id)
    }

    /// Run and remove the callback for `id`
    ///
    /// Returns false when `id` is not queued. The callback runs after the map
    /// lock is released.
    pub fn cancel(&self, id: RequestId) -> bool {
        let callback = self.deregister(id);
        match callback {
            Some(callback) => {
                callback();
                true
            }
            None => false,
        }
    }

    /// True when `id` is waiting for admission
    pub fn contains(&self, id: RequestId) -> bool {
        self.callbacks.lock().contains_key(&id)
    }

    /// Number of requests waiting for admission
    pub fn len(&self) -> usize {
        self.callbacks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for CancellationRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancellationRegistry").field("pending", &self.len()).finish()
    }
}
