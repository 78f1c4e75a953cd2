//! Request pipeline for the Mender proxy
//!
//! Rewrites tool-call history for backends without tool support, dispatches
//! requests over a structured client or raw HTTP, reassembles streamed
//! events, and repairs known content malformations in responses.

#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

pub mod assembler;
pub mod client;
pub mod dispatch;
pub mod error;
pub mod handler;
pub mod normalize;
pub mod passthrough;
pub mod protocol;
pub mod rewrite;
pub mod upstream;

pub use dispatch::{CHAT_COMPLETIONS_PATH, Channel, Dispatched, EventStream, dispatch};
pub use error::ProxyError;
pub use handler::{ProxyState, proxy_router};
pub use upstream::Upstream;
