//! Request error kinds
//!
//! Every handler failure is one of these; the dispatcher turns it into the
//! uniform `{"error": {"message", "code"}}` envelope.

use hyper::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProxyError {
    /// Inbound body is not the JSON we expect
    #[error("{0}")]
    BadRequest(String),

    /// No credential for the selected upstream provider
    #[error("{0}")]
    Unconfigured(String),

    /// Upstream answered with a non-success status
    #[error("API request failed: {body}")]
    Upstream { status: StatusCode, body: String },

    /// Upstream unreachable, timed out, or its body could not be read
    #[error("Network error: {0}")]
    Network(String),

    /// Local entry store could not be read or written
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Not Found")]
    NotFound,

    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("Request body exceeds {0} bytes")]
    PayloadTooLarge(u64),

    /// Handling took longer than the per-request bound
    #[error("Request did not complete within {0} seconds")]
    RequestTimeout(u64),
}

impl ProxyError {
    /// HTTP status used for the error envelope
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Upstream { status, .. } => *status,
            Self::Unconfigured(_) | Self::Network(_) | Self::Storage(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::RequestTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
        }
    }
}
