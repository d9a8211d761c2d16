use std::time::Duration;

use reqwest::Client;
use reqwest::ClientBuilder;

use crate::errors::Result;

/// Connection and timeout settings for the outbound client
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Maximum idle connections kept per host (default: 32)
    pub pool_max_idle_per_host: usize,

    /// How long an idle pooled connection survives (default: 90s)
    pub pool_idle_timeout: Duration,

    /// Connection establishment timeout (default: 10s)
    pub connect_timeout: Duration,

    /// Total request timeout, `None` for no limit (default: 30s)
    pub request_timeout: Option<Duration>,

    /// TCP keepalive interval (default: 60s)
    pub tcp_keepalive: Duration,

    /// Enable TCP_NODELAY (default: true)
    pub tcp_nodelay: bool,

    /// Speak HTTP/2 without negotiation (default: false)
    pub http2_prior_knowledge: bool,

    /// HTTP/2 keep-alive interval (default: 30s)
    pub http2_keep_alive_interval: Duration,

    /// HTTP/2 keep-alive timeout (default: 20s)
    pub http2_keep_alive_timeout: Duration,

    /// Resolve through Hickory DNS instead of the system resolver (default: true)
    pub hickory_dns: bool,

    /// `User-Agent` sent with every request
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            pool_max_idle_per_host: 32,
            pool_idle_timeout: Duration::from_secs(90),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Some(Duration::from_secs(30)),
            tcp_keepalive: Duration::from_secs(60),
            tcp_nodelay: true,
            http2_prior_knowledge: false,
            http2_keep_alive_interval: Duration::from_secs(30),
            http2_keep_alive_timeout: Duration::from_secs(20),
            hickory_dns: true,
            user_agent: concat!("cl_http/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl HttpClientConfig {
    /// Short timeouts and a small pool
    pub fn low_latency() -> Self {
        Self {
            pool_max_idle_per_host: 8,
            pool_idle_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(3),
            request_timeout: Some(Duration::from_secs(10)),
            tcp_keepalive: Duration::from_secs(30),
            ..Default::default()
        }
    }

    /// Large pool for many concurrent requests per host
    pub fn high_throughput() -> Self {
        Self { pool_max_idle_per_host: 128, pool_idle_timeout: Duration::from_secs(120), ..Default::default() }
    }

    /// Replace the total request timeout
    pub fn with_request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request_timeout = timeout;
        self
    }
}

/// Shared `reqwest` client built from an [`HttpClientConfig`]
///
/// Cloning is cheap and clones share the connection pool.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    config: HttpClientConfig,
}

impl HttpClient {
    /// Client with the default configuration
    pub fn new() -> Result<Self> {
        Self::with_config(HttpClientConfig::default())
    }

    pub fn with_config(config: HttpClientConfig) -> Result<Self> {
        let mut builder = ClientBuilder::new()
            // Connection pooling
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .pool_idle_timeout(config.pool_idle_timeout)
            // TCP
            .tcp_nodelay(config.tcp_nodelay)
            .tcp_keepalive(Some(config.tcp_keepalive))
            .connect_timeout(config.connect_timeout)
            // TLS with rustls
            .use_rustls_tls()
            .min_tls_version(reqwest::tls::Version::TLS_1_2)
            .http2_keep_alive_interval(Some(config.http2_keep_alive_interval))
            .http2_keep_alive_timeout(config.http2_keep_alive_timeout)
            .user_agent(config.user_agent.clone())
            .gzip(true)
            .brotli(true);

        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }

        if config.http2_prior_knowledge {
            builder = builder.http2_prior_knowledge();
        }

        if config.hickory_dns {
            builder = builder.hickory_dns(true);
        }

        let client = builder.build()?;

        Ok(Self { client, config })
    }

    /// Underlying reqwest client
    pub fn inner(&self) -> &Client {
        &self.client
    }

    pub fn config(&self) -> &HttpClientConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = HttpClientConfig::default();
        assert_eq!(config.pool_max_idle_per_host, 32);
        assert_eq!(config.request_timeout, Some(Duration::from_secs(30)));
        assert!(config.tcp_nodelay);
        assert!(config.user_agent.starts_with("cl_http/"));
    }

    #[test]
    fn test_presets() {
        let config = HttpClientConfig::low_latency();
        assert_eq!(config.connect_timeout, Duration::from_secs(3));
        assert!(config.hickory_dns);

        let config = HttpClientConfig::high_throughput();
        assert_eq!(config.pool_max_idle_per_host, 128);
        assert_eq!(config.pool_idle_timeout, Duration::from_secs(120));
    }

    #[test]
    fn test_client_creation() {
        let client = HttpClient::with_config(HttpClientConfig::default().with_request_timeout(None)).unwrap();
        assert_eq!(client.config().request_timeout, None);
        assert!(HttpClient::new().is_ok());
    }
}
