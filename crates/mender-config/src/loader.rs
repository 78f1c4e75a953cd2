use std::path::Path;

use crate::{AnyOrList, Config, upstream::API_VERSION_SUFFIX};

impl Config {
    /// Load and validate configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, TOML parsing fails, or
    /// validation fails
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let config = Self::read(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML file without validating it
    ///
    /// Lets the caller apply command-line overrides before calling
    /// [`Config::validate`].
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or TOML parsing fails
    pub fn read(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read config file {}: {e}", path.display()))?;

        toml::from_str(&raw).map_err(|e| anyhow::anyhow!("failed to parse config: {e}"))
    }

    /// Validate that the configuration is internally consistent
    ///
    /// # Errors
    ///
    /// Returns an error if the upstream is missing or malformed, or the
    /// server settings cannot be applied
    pub fn validate(&self) -> anyhow::Result<()> {
        self.validate_upstream()?;
        self.validate_server()?;
        Ok(())
    }

    /// The backend base URL must exist, be absolute HTTP(S), and end in `/v1`
    fn validate_upstream(&self) -> anyhow::Result<()> {
        let Some(ref base_url) = self.upstream.base_url else {
            anyhow::bail!("upstream.base_url must be configured (or pass --upstream-url / OPENAI_BASE_URL)");
        };

        if !matches!(base_url.scheme(), "http" | "https") {
            anyhow::bail!("upstream.base_url must use http or https, got '{}'", base_url.scheme());
        }

        if base_url.host_str().is_none() {
            anyhow::bail!("upstream.base_url must include a host");
        }

        if !base_url.path().ends_with(API_VERSION_SUFFIX) {
            anyhow::bail!("upstream.base_url must end with {API_VERSION_SUFFIX}, got '{base_url}'");
        }

        if self.upstream.timeout_duration()?.is_zero() {
            anyhow::bail!("upstream.timeout must be greater than 0");
        }

        Ok(())
    }

    /// Reject settings the HTTP layer would refuse at startup
    fn validate_server(&self) -> anyhow::Result<()> {
        if !self.server.health.path.starts_with('/') {
            anyhow::bail!("server.health.path must start with '/'");
        }

        let cors = &self.server.cors;
        if cors.enabled
            && cors.credentials
            && [&cors.origins, &cors.methods, &cors.headers]
                .into_iter()
                .any(|list| *list == AnyOrList::Any)
        {
            anyhow::bail!("server.cors.credentials requires explicit origins, methods, and headers");
        }

        Ok(())
    }
}
