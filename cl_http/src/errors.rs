use cl_limit::DispatchError;
use cl_limit::LimitError;
use cl_limit::RequestId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HttpError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("Request {0} canceled")]
    Canceled(RequestId),

    #[error("Request {0} is already queued")]
    DuplicateId(RequestId),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(&'static str),
}

impl HttpError {
    pub fn is_canceled(&self) -> bool {
        matches!(self, Self::Canceled(_))
    }
}

/// Cancellation in the queue and abort in flight both become [`HttpError::Canceled`]
impl From<DispatchError<HttpError>> for HttpError {
    fn from(err: DispatchError<HttpError>) -> Self {
        match err {
            DispatchError::Canceled(id) => Self::Canceled(id),
            DispatchError::DuplicateId(id) => Self::DuplicateId(id),
            DispatchError::Backend(err) => err,
        }
    }
}

impl From<LimitError> for HttpError {
    fn from(err: LimitError) -> Self {
        match err {
            LimitError::InvalidConfig(reason) => Self::InvalidConfig(reason),
        }
    }
}

pub type Result<T> = std::result::Result<T, HttpError>;
