use http::StatusCode;
use thiserror::Error;

use crate::storage::StorageError;

/// Failures raised by [`SessionStore`](crate::SessionStore).
#[derive(Debug, Error)]
pub enum SessionError {
    /// The side channel rejected a read, write or delete.
    #[error(transparent)]
    Storage(#[from] StorageError),
    /// The stored user record is not a JSON object.
    #[error("stored user record is corrupt: {0}")]
    CorruptUser(#[source] serde_json::Error),
    /// A user record could not be serialized for storage.
    #[error("failed to serialize user record: {0}")]
    Serialize(#[source] serde_json::Error),
}

/// Failures raised by a [`Transport`](crate::Transport).
#[derive(Debug, Error)]
pub enum TransportError {
    /// The request target is not a valid URL.
    #[error("invalid request URL '{target}': {reason}")]
    InvalidUrl {
        /// Target as supplied by the caller
        target: String,
        /// Parse failure
        reason: String,
    },
    /// A header value could not be encoded.
    #[error("invalid header value for {0}")]
    InvalidHeader(String),
    /// The HTTP client failed (connect, TLS, timeout, body read).
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// A request body could not be encoded.
    #[error("failed to encode request body: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Failures raised by [`AuthApi`](crate::AuthApi).
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request never produced a response.
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// Updating the local session failed.
    #[error(transparent)]
    Session(#[from] SessionError),
    /// The server answered with a non-success status.
    #[error("server returned {status}: {detail}")]
    Status {
        /// HTTP status
        status: StatusCode,
        /// The server's `detail` message, or the raw body
        detail: String,
    },
    /// A success response had an unexpected body.
    #[error("unexpected response body: {0}")]
    Decode(#[source] serde_json::Error),
}

impl ApiError {
    /// The HTTP status for [`ApiError::Status`].
    #[must_use]
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}
