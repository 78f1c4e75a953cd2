use bytes::Bytes;
use http::{HeaderValue, Method, StatusCode};
use mender_core::{CredentialError, HttpError};
use thiserror::Error;

use crate::dispatch::Channel;

/// Errors that can occur while proxying a request
#[derive(Debug, Error)]
pub enum ProxyError {
    /// Method, channel, and path do not form a supported combination
    #[error("{method} {path} is not supported on the {channel} channel")]
    ProtocolMismatch {
        method: Method,
        path: String,
        channel: Channel,
    },

    /// Tool messages were not one contiguous block at the end of the history
    #[error("tool messages must form a single contiguous block at the end of the conversation")]
    MalformedHistory,

    /// Backend answered with a non-success status; the body is relayed as-is
    #[error("upstream returned {status}")]
    UpstreamStatus {
        status: StatusCode,
        content_type: Option<HeaderValue>,
        body: Bytes,
    },

    /// Backend could not be reached or returned an unusable response
    #[error("upstream error: {0}")]
    Upstream(String),

    /// Error after a stream has started
    #[error("streaming error: {0}")]
    Streaming(String),

    /// Missing or malformed bearer credential
    #[error(transparent)]
    Credential(#[from] CredentialError),

    /// Streamed chat completions cannot be normalized yet
    #[error("streaming chat completions are not implemented")]
    StreamingNotImplemented,

    /// Client sent a body that is not a valid request
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Unexpected internal error
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl HttpError for ProxyError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::ProtocolMismatch { .. } | Self::StreamingNotImplemented => StatusCode::NOT_IMPLEMENTED,
            Self::MalformedHistory | Self::Streaming(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::UpstreamStatus { status, .. } => *status,
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
            Self::Credential(_) => StatusCode::UNAUTHORIZED,
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    fn error_type(&self) -> &str {
        match self {
            Self::ProtocolMismatch { .. } | Self::StreamingNotImplemented => "not_implemented_error",
            Self::MalformedHistory => "malformed_history_error",
            Self::UpstreamStatus { .. } | Self::Upstream(_) => "upstream_error",
            Self::Streaming(_) => "streaming_error",
            Self::Credential(_) => "authentication_error",
            Self::InvalidRequest(_) => "invalid_request_error",
            Self::Internal(_) => "internal_error",
        }
    }

    fn client_message(&self) -> String {
        match self {
            Self::Internal(_) => "an internal error occurred".to_owned(),
            other => other.to_string(),
        }
    }
}
