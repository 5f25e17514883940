//! Typed outcomes for every way a request can fail.
//!
//! Workflows never panic on server behavior: every failure surfaces as a
//! [`ClientError`] variant, and the retry loop consults
//! [`ClientError::is_retryable`] instead of inspecting error internals.

use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    /// The operation must be authenticated but no cookie is attached.
    /// Raised before any network traffic.
    #[error("operation requires a usable cookie, but none is attached")]
    LoginRequired,

    /// A board page past the gatekeeper ceiling was requested. The server
    /// serves looping stale content there, so the request is refused
    /// outright even when a cookie is available.
    #[error("{context} page {page} is past the gatekeeper page {gatekeeper_page}")]
    Gated {
        context: &'static str,
        page: u64,
        gatekeeper_page: u64,
    },

    /// The server denied the operation despite the attached credential.
    #[error("server denied the operation (status {status})")]
    NoPermission { status: StatusCode },

    /// The server reported that the requested resource does not exist.
    #[error("target resource does not exist")]
    ResourceNotFound,

    /// The payload matched neither the expected structure nor a known
    /// error pattern. The raw body is kept for diagnosis.
    #[error("unrecognized response from server ({} bytes)", body.len())]
    UnknownResponse { body: String },

    /// The server explicitly rejected a submitted reply.
    #[error("reply rejected by server: {message}")]
    ReplyRejected {
        message: String,
        detail: Option<String>,
    },

    /// Transport-level failure (connect, timeout, interrupted body).
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Non-success HTTP status that is not a permission denial.
    #[error("unexpected http status {status}")]
    Http { status: StatusCode },

    /// The response body could not be decoded as JSON. Truncated bodies
    /// from flaky intermediaries look the same, so this is retried.
    #[error("failed to decode response body: {0}")]
    Decode(#[from] serde_json::Error),

    /// The retry ceiling was hit; wraps the last retryable failure.
    #[error("{operation} failed after {attempts} attempts: {source}")]
    RetriesExhausted {
        operation: String,
        attempts: u32,
        #[source]
        source: Box<ClientError>,
    },

    /// A login policy string that names no known policy.
    #[error("unrecognized login policy: {0:?}")]
    InvalidLoginPolicy(String),

    /// Request options that cannot describe a performable request.
    #[error("invalid request options: {0}")]
    InvalidOptions(String),
}

impl ClientError {
    /// Whether the retry loop may spend another attempt on this failure.
    ///
    /// Transport failures, server-side errors (5xx, 429) and malformed
    /// bodies are transient; everything else is a definitive answer from
    /// the server or a defect in the request itself.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            ClientError::Network(_) | ClientError::Decode(_) => true,
            ClientError::Http { status } => {
                status.is_server_error() || *status == StatusCode::TOO_MANY_REQUESTS
            }
            _ => false,
        }
    }
}
