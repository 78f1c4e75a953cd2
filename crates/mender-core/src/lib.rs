//! Shared primitives for Mender crates

#![allow(clippy::must_use_candidate)]

mod credential;
mod error;

pub use credential::{Credential, CredentialError};
pub use error::{ErrorBody, ErrorDetail, HttpError};
