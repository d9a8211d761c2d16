use std::sync::Arc;

use tokio::sync::Notify;

/// Wake `shutdown` on Ctrl+C
///
/// Uses `notify_one`, so a signal that arrives before anyone waits is kept
/// for the next `notified().await`.
pub fn setup(shutdown: Arc<Notify>) -> Result<(), ctrlc::Error> {
    ctrlc::set_handler(move || {
        tracing::info!("Shutdown signal received");
        shutdown.notify_one();
    })
}
