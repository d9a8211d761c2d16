use std::fmt;
use std::hash::Hash;
use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::AtomicU8;
use std::sync::atomic::Ordering;

use tokio::sync::oneshot;
use tokio::sync::watch;
use tracing::debug;
use tracing::trace;
use tracing::warn;

use crate::backend::Backend;
use crate::cancel::CancellationRegistry;
use crate::classify;
use crate::classify::Classifier;
use crate::classify::GlobalKey;
use crate::classify::RequestTarget;
use crate::error::DispatchError;
use crate::error::LimitError;
use crate::error::Result;
use crate::registry::KeyRegistry;
use crate::registry::Locker;
use crate::registry::Permit;

/// Identity of one dispatched request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(u64);

impl RequestId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl From<u64> for RequestId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// How a request waits for its slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AdmissionMode {
    /// Wait in a background task that [`Limiter::cancel`] can abandon
    #[default]
    Cancelable,

    /// Wait inline. `cancel` only reaches the backend; dropping the dispatch
    /// future is the way out of the queue.
    Direct,
}

const PENDING: u8 = 0;
const ADMITTED: u8 = 1;
const CANCELED: u8 = 2;

/// Records, exactly once, whether a queued request was admitted or canceled
struct Admission {
    decision: AtomicU8,
    canceled: watch::Sender<bool>,
}

impl Admission {
    fn new() -> Self {
        let (canceled, _) = watch::channel(false);
        Self { decision: AtomicU8::new(PENDING), canceled }
    }

    fn decide(&self, outcome: u8) -> bool {
        self.decision.compare_exchange(PENDING, outcome, Ordering::AcqRel, Ordering::Acquire).is_ok()
    }

    /// Claim the request for dispatch. False if cancellation got there first.
    fn admit(&self) -> bool {
        self.decide(ADMITTED)
    }

    /// Claim the request for cancellation and signal every listener.
    /// False if it was already admitted (or canceled).
    fn cancel(&self) -> bool {
        if !self.decide(CANCELED) {
            return false;
        }
        self.canceled.send_replace(true);
        true
    }

    /// Resolves once `cancel` has won
    async fn canceled(&self) {
        let mut rx = self.canceled.subscribe();
        let _ = rx.wait_for(|canceled| *canceled).await;
    }
}

/// Background half of a cancelable admission
///
/// Hands the permit over only if admission wins the decision; otherwise the
/// permit is dropped on the spot so the slot goes back to the key.
async fn acquire_in_background<K>(locker: Locker<K>, admission: Arc<Admission>, admitted: oneshot::Sender<Permit<K>>)
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
{
    tokio::select! {
        biased;

        permit = locker.lock() => {
            if admission.admit() {
                // A closed receiver hands the permit back and it is released here
                let _ = admitted.send(permit);
            } else {
                trace!("slot acquired after cancellation, releasing");
                drop(permit);
            }
        }
        () = admission.canceled() => {
            trace!("stopped waiting for a slot");
        }
    }
}

/// Deregisters a queued request and abandons its admission on every exit
/// path, including the dispatch future being dropped.
struct Queued<'a> {
    pending: &'a CancellationRegistry,
    id: RequestId,
    admission: &'a Admission,
}

impl Drop for Queued<'_> {
    fn drop(&mut self) {
        self.pending.deregister(self.id);
        self.admission.cancel();
    }
}

/// Executor wrapper that bounds concurrent requests per classification key
///
/// Each request is classified, waits for a slot in its key's bucket, is
/// handed to the backend, and gives the slot back as soon as the backend
/// future resolves (response head received), not when the body is consumed.
pub struct Limiter<Req, K, B> {
    registry: KeyRegistry<K>,
    classifier: Classifier<Req, K>,
    backend: B,
    pending: CancellationRegistry,
    next_id: AtomicU64,
    mode: AdmissionMode,
}

impl<Req, K, B> Limiter<Req, K, B>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    B: Backend<Req>,
{
    /// Limit to `capacity` concurrent requests per key produced by `classifier`
    ///
    /// # Panics
    /// Panics if capacity is 0
    pub fn by_key<F>(classifier: F, capacity: usize, backend: B) -> Self
    where
        F: Fn(&Req) -> K + Send + Sync + 'static,
    {
        Self::from_parts(KeyRegistry::new(capacity), Arc::new(classifier), backend, AdmissionMode::default())
    }

    fn from_parts(registry: KeyRegistry<K>, classifier: Classifier<Req, K>, backend: B, mode: AdmissionMode) -> Self {
        Self { registry, classifier, backend, pending: CancellationRegistry::new(), next_id: AtomicU64::new(1), mode }
    }

    /// Allocate an id for [`Limiter::dispatch_with_id`]
    pub fn next_request_id(&self) -> RequestId {
        RequestId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Dispatch `request` under a fresh id
    pub async fn dispatch(&self, request: Req) -> std::result::Result<B::Response, DispatchError<B::Error>> {
        let id = self.next_request_id();
        self.dispatch_with_id(id, request).await
    }

    /// Dispatch `request` as `id`, so it can be passed to [`Limiter::cancel`]
    ///
    /// # Errors
    /// [`DispatchError::Canceled`] if canceled before admission (the backend
    /// never sees the request), [`DispatchError::DuplicateId`] if `id` is
    /// already queued under another dispatch, otherwise the backend's own
    /// error.
    pub async fn dispatch_with_id(&self, id: RequestId, request: Req) -> std::result::Result<B::Response, DispatchError<B::Error>> {
        let key = (self.classifier)(&request);
        let locker = self.registry.locker(key);

        let permit = match self.mode {
            AdmissionMode::Cancelable => self.admit(id, locker).await?,
            AdmissionMode::Direct => locker.lock().await,
        };
        debug!(%id, "admitted");

        let result = self.backend.execute(id, request).await;
        drop(permit);

        result.map_err(DispatchError::Backend)
    }

    async fn admit(&self, id: RequestId, locker: Locker<K>) -> std::result::Result<Permit<K>, DispatchError<B::Error>> {
        let admission = Arc::new(Admission::new());
        let (admitted_tx, admitted_rx) = oneshot::channel();

        let on_cancel = Arc::clone(&admission);
        let registered = self.pending.register(
            id,
            Box::new(move || {
                on_cancel.cancel();
            }),
        );
        if registered.is_err() {
            // Dropping the locker withdraws from the queue it just joined
            warn!(%id, "request id already queued, rejecting");
            return Err(DispatchError::DuplicateId(id));
        }
        let _queued = Queued { pending: &self.pending, id, admission: &admission };

        tokio::spawn(acquire_in_background(locker, Arc::clone(&admission), admitted_tx));

        tokio::select! {
            admitted = admitted_rx => admitted.map_err(|_| DispatchError::Canceled(id)),
            () = admission.canceled() => Err(DispatchError::Canceled(id)),
        }
    }

    /// Cancel `id`
    ///
    /// A request still queued for a slot is abandoned and its dispatch
    /// returns [`DispatchError::Canceled`]. The backend is asked to abort `id`
    /// in either case, covering requests already in flight.
    pub fn cancel(&self, id: RequestId) {
        if self.pending.cancel(id) {
            debug!(%id, "canceled while queued");
        }
        self.backend.cancel(id);
    }

    /// Registry holding the per-key semaphores
    pub fn registry(&self) -> &KeyRegistry<K> {
        &self.registry
    }

    /// Number of requests waiting for admission
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Wrapped backend
    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn mode(&self) -> AdmissionMode {
        self.mode
    }
}

impl<Req: 'static, B: Backend<Req>> Limiter<Req, GlobalKey, B> {
    /// At most `capacity` requests in flight overall
    ///
    /// # Panics
    /// Panics if capacity is 0
    pub fn by_global(capacity: usize, backend: B) -> Self {
        Self::by_key(classify::global::<Req>, capacity, backend)
    }
}

impl<Req: RequestTarget + 'static, B: Backend<Req>> Limiter<Req, String, B> {
    /// At most `capacity` requests in flight per destination host
    ///
    /// # Panics
    /// Panics if capacity is 0
    pub fn by_host(capacity: usize, backend: B) -> Self {
        Self::by_key(classify::host::<Req>, capacity, backend)
    }

    /// At most `capacity` requests in flight per URL
    ///
    /// # Panics
    /// Panics if capacity is 0
    pub fn by_url(capacity: usize, backend: B) -> Self {
        Self::by_key(classify::url::<Req>, capacity, backend)
    }
}

impl<Req, K, B: fmt::Debug> fmt::Debug for Limiter<Req, K, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Limiter").field("registry", &self.registry).field("pending", &self.pending).field("mode", &self.mode).field("backend", &self.backend).finish()
    }
}

/// Builder for a [`Limiter`]
pub struct LimiterBuilder<Req, K> {
    capacity: Option<usize>,
    classifier: Option<Classifier<Req, K>>,
    registry: Option<KeyRegistry<K>>,
    mode: AdmissionMode,
}

impl<Req, K> LimiterBuilder<Req, K>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self { capacity: None, classifier: None, registry: None, mode: AdmissionMode::default() }
    }

    /// Concurrent requests allowed per key
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = Some(capacity);
        self
    }

    /// Function deriving the key from a request
    pub fn classifier<F>(mut self, classifier: F) -> Self
    where
        F: Fn(&Req) -> K + Send + Sync + 'static,
    {
        self.classifier = Some(Arc::new(classifier));
        self
    }

    /// Share an existing registry (and its capacity) with other limiters
    pub fn registry(mut self, registry: KeyRegistry<K>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn mode(mut self, mode: AdmissionMode) -> Self {
        self.mode = mode;
        self
    }

    /// Build the limiter around `backend`
    ///
    /// # Errors
    /// [`LimitError::InvalidConfig`] when the classifier is missing, the
    /// capacity is missing or zero, or it disagrees with a shared registry.
    pub fn build<B: Backend<Req>>(self, backend: B) -> Result<Limiter<Req, K, B>> {
        let classifier = self.classifier.ok_or(LimitError::InvalidConfig("classifier must be set"))?;

        let registry = match (self.registry, self.capacity) {
            (Some(registry), Some(capacity)) if registry.capacity() != capacity => {
                return Err(LimitError::InvalidConfig("capacity conflicts with the shared registry"));
            }
            (Some(registry), _) => registry,
            (None, Some(0)) => return Err(LimitError::InvalidConfig("capacity must be at least 1")),
            (None, Some(capacity)) => KeyRegistry::new(capacity),
            (None, None) => return Err(LimitError::InvalidConfig("capacity must be set")),
        };

        Ok(Limiter::from_parts(registry, classifier, backend, self.mode))
    }
}

impl<Req, K> Default for LimiterBuilder<Req, K>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}
