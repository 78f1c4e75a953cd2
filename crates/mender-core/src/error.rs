use http::StatusCode;
use serde::Serialize;

/// Trait for domain errors that can be converted to HTTP responses
///
/// The server layer turns these into `OpenAI`-style error bodies, keeping
/// domain errors decoupled from axum.
pub trait HttpError: std::error::Error {
    /// HTTP status code for this error
    fn status_code(&self) -> StatusCode;

    /// Machine-readable error type (e.g. `invalid_request_error`)
    fn error_type(&self) -> &str;

    /// Message safe to expose to API consumers
    fn client_message(&self) -> String;

    /// Render the error in the `OpenAI` error envelope
    fn error_body(&self) -> ErrorBody {
        ErrorBody {
            error: ErrorDetail {
                message: self.client_message(),
                error_type: self.error_type().to_owned(),
                code: None,
            },
        }
    }
}

/// `OpenAI`-compatible error response body
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    /// Error details
    pub error: ErrorDetail,
}

/// Details inside an [`ErrorBody`]
#[derive(Debug, Clone, Serialize)]
pub struct ErrorDetail {
    /// Human-readable message
    pub message: String,
    /// Error category
    #[serde(rename = "type")]
    pub error_type: String,
    /// Provider-specific code, always serialized (as `null` when absent)
    pub code: Option<String>,
}
