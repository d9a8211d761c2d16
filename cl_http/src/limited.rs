//! Concurrency-limited HTTP clients
//!
//! Each constructor wraps a [`ReqwestBackend`] in a [`Limiter`] keyed one
//! of the usual ways. The plain variants build a default [`HttpClient`];
//! the `*_with_client` variants reuse an existing one (and its pool).

use std::hash::Hash;

use cl_limit::GlobalKey;
use cl_limit::Limiter;
use cl_limit::LimiterBuilder;
use cl_limit::RequestId;
use reqwest::IntoUrl;
use reqwest::Request;
use reqwest::RequestBuilder;
use reqwest::Response;

use crate::backend::ReqwestBackend;
use crate::classify;
use crate::client::HttpClient;
use crate::errors::Result;

/// Limiter over the reqwest backend, keyed by `K`
pub type LimitedClient<K> = Limiter<Request, K, ReqwestBackend>;

/// At most `capacity` requests in flight overall
pub fn by_global(capacity: usize) -> Result<LimitedClient<GlobalKey>> {
    by_global_with_client(HttpClient::new()?, capacity)
}

pub fn by_global_with_client(client: HttpClient, capacity: usize) -> Result<LimitedClient<GlobalKey>> {
    by_key_with_client(client, cl_limit::classify::global::<Request>, capacity)
}

/// At most `capacity` requests in flight per `host[:port]`
pub fn by_host(capacity: usize) -> Result<LimitedClient<String>> {
    by_host_with_client(HttpClient::new()?, capacity)
}

pub fn by_host_with_client(client: HttpClient, capacity: usize) -> Result<LimitedClient<String>> {
    by_key_with_client(client, classify::host, capacity)
}

/// At most `capacity` requests in flight per full URL
pub fn by_url(capacity: usize) -> Result<LimitedClient<String>> {
    by_url_with_client(HttpClient::new()?, capacity)
}

pub fn by_url_with_client(client: HttpClient, capacity: usize) -> Result<LimitedClient<String>> {
    by_key_with_client(client, classify::url, capacity)
}

/// At most `capacity` requests in flight per key from `classifier`
pub fn by_key<K, F>(classifier: F, capacity: usize) -> Result<LimitedClient<K>>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    F: Fn(&Request) -> K + Send + Sync + 'static,
{
    by_key_with_client(HttpClient::new()?, classifier, capacity)
}

/// # Errors
/// [`HttpError::InvalidConfig`](crate::HttpError::InvalidConfig) if `capacity` is 0
pub fn by_key_with_client<K, F>(client: HttpClient, classifier: F, capacity: usize) -> Result<LimitedClient<K>>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    F: Fn(&Request) -> K + Send + Sync + 'static,
{
    Ok(LimiterBuilder::new().classifier(classifier).capacity(capacity).build(ReqwestBackend::new(client))?)
}

/// Build `builder` and send it through `limiter`
pub async fn send<K>(limiter: &LimitedClient<K>, builder: RequestBuilder) -> Result<Response>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
{
    send_with_id(limiter, limiter.next_request_id(), builder).await
}

/// Like [`send`], under an id that can be passed to `limiter.cancel`
pub async fn send_with_id<K>(limiter: &LimitedClient<K>, id: RequestId, builder: RequestBuilder) -> Result<Response>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
{
    let request = builder.build()?;
    Ok(limiter.dispatch_with_id(id, request).await?)
}

/// GET `url` through `limiter`, using the limiter's own client
pub async fn get<K, U>(limiter: &LimitedClient<K>, url: U) -> Result<Response>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    U: IntoUrl,
{
    let builder = limiter.backend().client().inner().get(url);
    send(limiter, builder).await
}
