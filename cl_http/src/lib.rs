//! # cl_http
//!
//! `reqwest` integration for `cl_limit`: a [`ReqwestBackend`] whose in-flight
//! requests can be aborted by id, request classifiers, and constructors for
//! per-host, per-URL and global limited clients.

pub mod backend;
pub mod classify;
pub mod client;
pub mod errors;
pub mod limited;

pub use backend::ReqwestBackend;
pub use client::HttpClient;
pub use client::HttpClientConfig;
pub use errors::HttpError;
pub use errors::Result;
pub use limited::LimitedClient;
