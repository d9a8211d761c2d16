use cl_limit::Backend;
use cl_limit::BackendFuture;
use cl_limit::RequestId;
use dashmap::DashMap;
use futures::future::AbortHandle;
use futures::future::Abortable;
use reqwest::Request;
use reqwest::Response;
use tracing::debug;

use crate::client::HttpClient;
use crate::errors::HttpError;

/// [`Backend`] that sends requests through a `reqwest` client
///
/// Every request in flight is abortable by id. `execute` resolves with the
/// response head; reading the body happens after the limiter slot is freed.
#[derive(Debug)]
pub struct ReqwestBackend {
    client: HttpClient,
    in_flight: DashMap<RequestId, AbortHandle>,
}

impl ReqwestBackend {
    pub fn new(client: HttpClient) -> Self {
        Self { client, in_flight: DashMap::new() }
    }

    pub fn client(&self) -> &HttpClient {
        &self.client
    }

    /// Number of requests currently on the wire
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }
}

/// Removes the abort handle when the request settles or is dropped
struct InFlight<'a> {
    in_flight: &'a DashMap<RequestId, AbortHandle>,
    id: RequestId,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.in_flight.remove(&self.id);
    }
}

impl Backend<Request> for ReqwestBackend {
    type Response = Response;
    type Error = HttpError;

    fn execute(&self, id: RequestId, request: Request) -> BackendFuture<'_, Response, HttpError> {
        let (handle, registration) = AbortHandle::new_pair();
        self.in_flight.insert(id, handle);
        let guard = InFlight { in_flight: &self.in_flight, id };

        debug!(%id, method = %request.method(), url = %request.url(), "sending");
        let response = Abortable::new(self.client.inner().execute(request), registration);

        Box::pin(async move {
            let _guard = guard;
            match response.await {
                Ok(result) => Ok(result?),
                Err(_aborted) => Err(HttpError::Canceled(id)),
            }
        })
    }

    fn cancel(&self, id: RequestId) {
        if let Some((_, handle)) = self.in_flight.remove(&id) {
            debug!(%id, "aborting in-flight request");
            handle.abort();
        }
    }
}
