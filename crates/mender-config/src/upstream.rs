use std::time::Duration;

use serde::Deserialize;
use url::Url;

/// Path suffix every backend base URL must carry
pub const API_VERSION_SUFFIX: &str = "/v1";

/// Backend connection configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpstreamConfig {
    /// Backend base URL including the `/v1` suffix
    /// (e.g. `http://localhost:9997/v1`)
    #[serde(default)]
    pub base_url: Option<Url>,
    /// Overall timeout for raw HTTP streaming calls (e.g. "30s", "2m")
    #[serde(default = "default_timeout")]
    pub timeout: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout: default_timeout(),
        }
    }
}

impl UpstreamConfig {
    /// Parse the configured timeout
    ///
    /// # Errors
    ///
    /// Returns an error if the timeout string is not a valid duration
    pub fn timeout_duration(&self) -> anyhow::Result<Duration> {
        duration_str::parse(&self.timeout)
            .map_err(|e| anyhow::anyhow!("invalid upstream timeout '{}': {e}", self.timeout))
    }
}

fn default_timeout() -> String {
    "30s".to_string()
}
