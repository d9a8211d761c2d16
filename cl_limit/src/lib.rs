//! # cl_limit
//!
//! Keyed concurrency limiting for outbound requests. A [`Limiter`] wraps any
//! [`Backend`] and admits at most `n` requests at a time per classification
//! key (one global bucket, one per host, one per URL, or a caller-supplied
//! key). Per-key semaphores live in a [`KeyRegistry`] that drops them again
//! once idle, so memory stays proportional to the keys in use.

pub mod backend;
pub mod cancel;
pub mod classify;
pub mod error;
pub mod limiter;
pub mod registry;
pub mod semaphore;

pub use backend::Backend;
pub use backend::BackendFuture;
pub use cancel::CancellationRegistry;
pub use classify::Classifier;
pub use classify::GlobalKey;
pub use classify::RequestTarget;
pub use error::DispatchError;
pub use error::LimitError;
pub use error::Result;
pub use limiter::AdmissionMode;
pub use limiter::Limiter;
pub use limiter::LimiterBuilder;
pub use limiter::RequestId;
pub use registry::KeyRegistry;
pub use registry::Locker;
pub use registry::Permit;
pub use semaphore::Semaphore;
