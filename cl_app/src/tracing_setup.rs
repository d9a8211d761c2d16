use std::io;

use tracing::Level;
use tracing_appender::non_blocking::NonBlocking;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

/// Non-blocking hourly rolling writer for `{log_dir}/{app_name}.log`
fn file_writer(app_name: &str, log_dir: &str) -> (NonBlocking, WorkerGuard) {
    let _ = std::fs::create_dir_all(log_dir);

    let file_appender = tracing_appender::rolling::hourly(log_dir, format!("{app_name}.log"));
    tracing_appender::non_blocking(file_appender)
}

/// `RUST_LOG` if set, otherwise everything at `default_level` and above
fn env_filter(default_level: Level) -> EnvFilter {
    EnvFilter::builder().with_default_directive(default_level.into()).from_env_lossy()
}

/// Log to file only
///
/// Keeps stdout free for program output. Hold the returned guard until exit
/// or buffered lines are lost.
pub fn init(app_name: &str, log_dir: &str, default_level: Level) -> WorkerGuard {
    let (writer, guard) = file_writer(app_name, log_dir);

    let file_layer = fmt::layer().with_writer(writer).with_target(true).with_thread_ids(true).with_line_number(true).with_ansi(false).compact();

    tracing_subscriber::registry().with(env_filter(default_level)).with(file_layer).init();

    guard
}

/// Log to file and to stdout
pub fn init_with_stdout(app_name: &str, log_dir: &str, default_level: Level) -> WorkerGuard {
    let (writer, guard) = file_writer(app_name, log_dir);

    let file_layer = fmt::layer().with_writer(writer).with_target(true).with_thread_ids(true).with_line_number(true).with_ansi(false).compact();

    // Request-level lines are what a user of the CLI wants to see
    let stdout_layer = fmt::layer().with_writer(io::stdout).with_target(false).with_ansi(true).compact();

    tracing_subscriber::registry().with(env_filter(default_level)).with(file_layer).with(stdout_layer).init();

    guard
}
