use std::hash::Hash;
use std::sync::Arc;
use std::time::Instant;

use cl_app::cli;
use cl_app::config_loader;
use cl_app::config_loader::ClassifyMode;
use cl_app::shutdown_handler;
use cl_app::tracing_setup;
use cl_http::HttpClient;
use cl_http::LimitedClient;
use cl_http::limited;
use futures::future::join_all;
use tokio::sync::Notify;
use tracing::Level;
use tracing::info;
use tracing::warn;

async fn fetch<K>(limiter: &LimitedClient<K>, url: &str)
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
{
    let start = Instant::now();

    let response = match limited::get(limiter, url).await {
        Ok(response) => response,
        Err(err) => {
            warn!(url, "request failed: {err}");
            return;
        }
    };
    let admitted_for = start.elapsed();
    let status = response.status();

    // The body is read after the slot has been handed back
    match response.bytes().await {
        Ok(body) => info!(url, %status, bytes = body.len(), head_ms = admitted_for.as_millis() as u64, total_ms = start.elapsed().as_millis() as u64, "fetched"),
        Err(err) => warn!(url, %status, "body read failed: {err}"),
    }
}

async fn run<K>(limiter: LimitedClient<K>, urls: &[String], shutdown: &Notify)
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
{
    let start = Instant::now();
    let fetches = join_all(urls.iter().map(|url| fetch(&limiter, url)));

    tokio::select! {
        _ = fetches => info!(count = urls.len(), elapsed_ms = start.elapsed().as_millis() as u64, "all requests finished"),
        () = shutdown.notified() => warn!(pending = limiter.pending(), "interrupted"),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _guard = tracing_setup::init_with_stdout("cl_fetch", "logs", Level::INFO);

    let path = cli::get_arg(1, "fetch.toml");
    let config = config_loader::load_fetch_config_or_default(&path);
    info!(mode = ?config.mode, capacity = config.capacity, profile = ?config.client_profile, urls = config.urls.len(), "starting");

    let shutdown = Arc::new(Notify::new());
    shutdown_handler::setup(Arc::clone(&shutdown))?;

    let client = HttpClient::with_config(config.http_config())?;

    match config.mode {
        ClassifyMode::Global => run(limited::by_global_with_client(client, config.capacity)?, &config.urls, &shutdown).await,
        ClassifyMode::Host => run(limited::by_host_with_client(client, config.capacity)?, &config.urls, &shutdown).await,
        ClassifyMode::Url => run(limited::by_url_with_client(client, config.capacity)?, &config.urls, &shutdown).await,
    }

    Ok(())
}
