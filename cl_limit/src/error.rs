use thiserror::Error;

use crate::limiter::RequestId;

/// Result type for limiter configuration
pub type Result<T> = std::result::Result<T, LimitError>;

/// Errors raised while building a limiter
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitError {
    /// Invalid configuration
    #[error("Invalid limiter configuration: {0}")]
    InvalidConfig(&'static str),
}

/// Outcome of a failed dispatch
///
/// Backend errors pass through untouched; the limiter only adds the
/// cancellation and id-collision cases.
#[derive(Error, Debug)]
pub enum DispatchError<E> {
    /// Request was canceled while still queued for a slot
    #[error("Request {0} canceled while waiting for admission")]
    Canceled(RequestId),

    /// Id is already queued under another dispatch; the request was not sent
    #[error("Request {0} is already queued")]
    DuplicateId(RequestId),

    /// Error reported by the backend
    #[error(transparent)]
    Backend(E),
}

impl<E> DispatchError<E> {
    /// True when the request never reached the backend because it was canceled
    pub fn is_canceled(&self) -> bool {
        matches!(self, DispatchError::Canceled(_))
    }

    /// Unwrap the backend error, if that is what this is
    pub fn into_backend(self) -> Option<E> {
        match self {
            DispatchError::Backend(err) => Some(err),
            DispatchError::Canceled(_) | DispatchError::DuplicateId(_) => None,
        }
    }
}
