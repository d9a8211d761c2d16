use std::path::Path;
use std::time::Duration;

use config::Config;
use config::ConfigError;
use cl_http::HttpClientConfig;
use config::File;
use serde::Deserialize;

pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:8080";

/// How `cl_fetch` buckets its requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassifyMode {
    /// One bucket for everything
    Global,
    /// One bucket per `host[:port]`
    #[default]
    Host,
    /// One bucket per URL
    Url,
}

/// Connection pool tuning for the HTTP client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientProfile {
    #[default]
    Default,
    LowLatency,
    HighThroughput,
}

impl ClientProfile {
    pub fn http_config(self) -> HttpClientConfig {
        match self {
            Self::Default => HttpClientConfig::default(),
            Self::LowLatency => HttpClientConfig::low_latency(),
            Self::HighThroughput => HttpClientConfig::high_throughput(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct FetchConfigFile {
    #[serde(default)]
    pub mode: ClassifyMode,
    pub capacity: usize,
    #[serde(default)]
    pub urls: Vec<String>,
    #[serde(default)]
    pub client_profile: ClientProfile,
    pub request_timeout_ms: Option<u64>,
}

impl FetchConfigFile {
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }

    /// Client settings for the chosen profile; `request_timeout_ms` overrides
    /// the profile's timeout when set
    pub fn http_config(&self) -> HttpClientConfig {
        let config = self.client_profile.http_config();
        match self.request_timeout() {
            Some(timeout) => config.with_request_timeout(Some(timeout)),
            None => config,
        }
    }
}

impl Default for FetchConfigFile {
    fn default() -> Self {
        Self {
            mode: ClassifyMode::Host,
            capacity: 2,
            urls: (1..=4).map(|n| format!("http://{DEFAULT_LISTEN_ADDR}/{n}")).collect(),
            client_profile: ClientProfile::Default,
            request_timeout_ms: Some(30_000),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct EchoConfigFile {
    pub listen_addr: String,
}

impl Default for EchoConfigFile {
    fn default() -> Self {
        Self { listen_addr: DEFAULT_LISTEN_ADDR.to_string() }
    }
}

pub fn load_fetch_config<P: AsRef<Path>>(path: P) -> Result<FetchConfigFile, ConfigError> {
    let config = Config::builder().add_source(File::from(path.as_ref())).build()?;

    config.try_deserialize()
}

pub fn load_echo_config<P: AsRef<Path>>(path: P) -> Result<EchoConfigFile, ConfigError> {
    let config = Config::builder().add_source(File::from(path.as_ref())).build()?;

    config.try_deserialize()
}

/// Load fetch config with fallback to default
pub fn load_fetch_config_or_default(path: &str) -> FetchConfigFile {
    match load_fetch_config(path) {
        Ok(config) => {
            tracing::info!("Loaded fetch config from {path}");
            config
        }
        Err(err) => {
            tracing::warn!("Failed to load fetch config from {}: {}. Using defaults.", path, err);
            FetchConfigFile::default()
        }
    }
}

/// Load echo config with fallback to default
pub fn load_echo_config_or_default(path: &str) -> EchoConfigFile {
    match load_echo_config(path) {
        Ok(config) => {
            tracing::info!("Loaded echo config from {path}");
            config
        }
        Err(err) => {
            tracing::warn!("Failed to load echo config from {}: {}. Using defaults.", path, err);
            EchoConfigFile::default()
        }
    }
}
