use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::limiter::RequestId;

/// Boxed future returned by [`Backend::execute`]
pub type BackendFuture<'a, T, E> = Pin<Box<dyn Future<Output = Result<T, E>> + Send + 'a>>;

/// Capability that actually performs a request
///
/// `execute` resolves once the response head is available; anything that
/// streams afterwards (the body) is outside the admission slot.
pub trait Backend<Req>: Send + Sync {
    type Response: Send + 'static;
    type Error: Send + 'static;

    /// Perform `request`
    fn execute(&self, id: RequestId, request: Req) -> BackendFuture<'_, Self::Response, Self::Error>;

    /// Abort `id` if it is in flight. Best effort; the default does nothing.
    fn cancel(&self, _id: RequestId) {}
}

impl<Req, B: Backend<Req> + ?Sized> Backend<Req> for Arc<B> {
    type Response = B::Response;
    type Error = B::Error;

    fn execute(&self, id: RequestId, request: Req) -> BackendFuture<'_, Self::Response, Self::Error> {
        (**self).execute(id, request)
    }

    fn cancel(&self, id: RequestId) {
        (**self).cancel(id)
    }
}
