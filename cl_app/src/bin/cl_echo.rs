use std::io;
use std::sync::Arc;

use cl_app::cli;
use cl_app::config_loader;
use cl_app::echo;
use cl_app::shutdown_handler;
use cl_app::tracing_setup;
use parking_lot::Mutex;
use tokio::net::TcpListener;
use tokio::sync::Notify;
use tracing::Level;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // File only: stdout carries the request dumps
    let _guard = tracing_setup::init("cl_echo", "logs", Level::INFO);

    let config = config_loader::load_echo_config_or_default("echo.toml");
    let addr = cli::get_arg(1, &config.listen_addr);

    let shutdown = Arc::new(Notify::new());
    shutdown_handler::setup(Arc::clone(&shutdown))?;

    let listener = TcpListener::bind(&addr).await?;
    echo::serve(listener, Arc::new(Mutex::new(io::stdout())), shutdown).await?;

    Ok(())
}
