//! Shared handle to the backend: connection pool plus URL resolution

use std::sync::Arc;
use std::time::Duration;

use mender_config::{API_VERSION_SUFFIX, UpstreamConfig};
use reqwest::Client;
use url::Url;

/// Backend connection handle
///
/// Owns the process-wide connection pool. Cheap to clone; every clone
/// shares the same pool, which is closed when the last clone is dropped.
#[derive(Clone)]
pub struct Upstream {
    inner: Arc<UpstreamInner>,
}

struct UpstreamInner {
    client: Client,
    base_url: Url,
    authority: String,
    timeout: Duration,
}

impl Upstream {
    /// Build the handle and its connection pool from configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is missing or has no host, the
    /// timeout does not parse, or the HTTP client cannot be built
    pub fn from_config(config: &UpstreamConfig) -> anyhow::Result<Self> {
        let base_url = config
            .base_url
            .clone()
            .ok_or_else(|| anyhow::anyhow!("upstream.base_url is not configured"))?;
        let timeout = config.timeout_duration()?;

        let client = Client::builder()
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build HTTP client: {e}"))?;

        Self::new(client, base_url, timeout)
    }

    /// Wrap an existing client
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL has no host
    pub fn new(client: Client, base_url: Url, timeout: Duration) -> anyhow::Result<Self> {
        let host = base_url
            .host_str()
            .ok_or_else(|| anyhow::anyhow!("upstream base URL '{base_url}' has no host"))?;
        let authority = match base_url.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_owned(),
        };

        Ok(Self {
            inner: Arc::new(UpstreamInner {
                client,
                base_url,
                authority,
                timeout,
            }),
        })
    }

    /// Pooled HTTP client
    pub fn client(&self) -> &Client {
        &self.inner.client
    }

    /// Configured base URL, ending in `/v1`
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// `host[:port]` of the backend
    pub fn authority(&self) -> &str {
        &self.inner.authority
    }

    /// Overall timeout for raw HTTP streaming calls
    pub fn timeout(&self) -> Duration {
        self.inner.timeout
    }

    /// Chat completions endpoint used by the structured client
    pub fn chat_completions_url(&self) -> String {
        let base = self.inner.base_url.as_str().trim_end_matches('/');
        format!("{base}/chat/completions")
    }

    /// Backend origin joined with the client's request path
    pub fn raw_url(&self, path: &str) -> Url {
        let mut url = self.inner.base_url.clone();
        url.set_path(path);
        url.set_query(None);
        url
    }

    /// Base URL without its `/v1` suffix, joined with the request path and query
    pub fn passthrough_url(&self, path: &str, query: Option<&str>) -> Url {
        let base_path = self.inner.base_url.path().trim_end_matches('/');
        let prefix = base_path.strip_suffix(API_VERSION_SUFFIX).unwrap_or(base_path);

        let mut url = self.inner.base_url.clone();
        url.set_path(&format!("{prefix}{path}"));
        url.set_query(query);
        url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upstream(base: &str) -> Upstream {
        let config = UpstreamConfig {
            base_url: Some(Url::parse(base).unwrap()),
            timeout: "5s".to_owned(),
        };
        Upstream::from_config(&config).unwrap()
    }

    #[test]
    fn chat_completions_url_extends_base() {
        let upstream = upstream("http://localhost:9997/v1");
        assert_eq!(upstream.chat_completions_url(), "http://localhost:9997/v1/chat/completions");
    }

    #[test]
    fn raw_url_uses_origin_only() {
        let upstream = upstream("https://llm.internal/proxy/v1");
        assert_eq!(
            upstream.raw_url("/v1/completions").as_str(),
            "https://llm.internal/v1/completions"
        );
    }

    #[test]
    fn passthrough_url_strips_version_and_keeps_prefix() {
        let upstream = upstream("https://llm.internal/proxy/v1");
        assert_eq!(
            upstream.passthrough_url("/v1/models", Some("limit=5")).as_str(),
            "https://llm.internal/proxy/v1/models?limit=5"
        );
    }

    #[test]
    fn passthrough_url_without_prefix() {
        let upstream = upstream("http://localhost:9997/v1/");
        assert_eq!(
            upstream.passthrough_url("/v1/models", None).as_str(),
            "http://localhost:9997/v1/models"
        );
    }

    #[test]
    fn authority_includes_explicit_port() {
        assert_eq!(upstream("http://localhost:9997/v1").authority(), "localhost:9997");
        assert_eq!(upstream("https://llm.internal/v1").authority(), "llm.internal");
    }

    #[test]
    fn missing_base_url_is_an_error() {
        assert!(Upstream::from_config(&UpstreamConfig::default()).is_err());
    }
}
