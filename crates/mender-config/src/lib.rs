#![allow(clippy::must_use_candidate)]

pub mod cors;
pub mod health;
mod loader;
pub mod rewrite;
pub mod server;
pub mod telemetry;
pub mod upstream;

use serde::Deserialize;

pub use cors::*;
pub use health::*;
pub use rewrite::*;
pub use server::*;
pub use telemetry::{LogFormat, TelemetryConfig};
pub use upstream::*;

/// Top-level Mender configuration
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Backend the proxy forwards to
    #[serde(default)]
    pub upstream: UpstreamConfig,
    /// Tool-history rewrite text
    #[serde(default)]
    pub rewrite: RewriteConfig,
    /// Telemetry configuration
    #[serde(default)]
    pub telemetry: Option<TelemetryConfig>,
}
