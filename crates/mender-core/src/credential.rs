use http::HeaderMap;
use http::header::AUTHORIZATION;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

/// Reasons a bearer credential could not be extracted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CredentialError {
    /// No `Authorization` header on the request
    #[error("missing Authorization header")]
    Missing,
    /// Header present but not of the form `Bearer <token>`
    #[error("Authorization header must be of the form `Bearer <token>`")]
    Malformed,
}

/// Bearer token supplied by the client
///
/// Forwarded to the backend as-is; the proxy never inspects it.
#[derive(Debug, Clone)]
pub struct Credential(SecretString);

impl Credential {
    /// Extract the bearer token from request headers
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::Missing`] when there is no `Authorization`
    /// header and [`CredentialError::Malformed`] when it is not valid
    /// `Bearer <token>` text
    pub fn from_headers(headers: &HeaderMap) -> Result<Self, CredentialError> {
        let value = headers.get(AUTHORIZATION).ok_or(CredentialError::Missing)?;
        let value = value.to_str().map_err(|_| CredentialError::Malformed)?;

        let token = value
            .strip_prefix("Bearer ")
            .and_then(|rest| rest.split_whitespace().next())
            .ok_or(CredentialError::Malformed)?;

        Ok(Self(SecretString::from(token.to_owned())))
    }

    /// Raw token for the outgoing `Authorization` header
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

impl From<&str> for Credential {
    fn from(token: &str) -> Self {
        Self(SecretString::from(token.to_owned()))
    }
}
