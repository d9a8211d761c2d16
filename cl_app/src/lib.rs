//! # cl_app
//!
//! Shared plumbing for the workspace binaries: logging, configuration files,
//! command-line arguments, Ctrl+C handling and the request echo server.

pub mod cli;
pub mod config_loader;
pub mod echo;
pub mod shutdown_handler;
pub mod tracing_setup;
