//! Error types for the dispatch layer.

use crate::http::HttpResponse;

/// A request attempt that produced no response.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The connection could not be established.
    #[error("connection failed: {0}")]
    Connect(String),

    /// The request did not complete in time.
    #[error("request timed out")]
    Timeout,

    /// The request could not be built.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Any other failure, reported verbatim.
    #[error("{0}")]
    Other(String),
}

/// Terminal outcome of a failed dispatch.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// The transport failed on the last permitted attempt.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The endpoint answered with a status that must not be retried.
    #[error("{status}")]
    Status { status: u16 },

    /// Every permitted attempt answered with a retryable status.
    #[error("retries exhausted, last status {}", .response.status)]
    Exhausted { response: HttpResponse },

    /// A backoff wait was interrupted by shutdown.
    #[error("dispatch cancelled by shutdown")]
    Cancelled,
}

impl DispatchError {
    /// The HTTP status behind this failure, if a response was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status } => Some(*status),
            Self::Exhausted { response } => Some(response.status),
            Self::Transport(_) | Self::Cancelled => None,
        }
    }
}
