//! Programmatic configuration builder for integration tests

use std::net::SocketAddr;

use mender_config::{Config, CorsConfig, RewriteConfig, ServerConfig, UpstreamConfig};

/// Builder for constructing test configurations
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Minimal configuration proxying to `base_url`
    pub fn new(base_url: &str) -> Self {
        Self {
            config: Config {
                server: ServerConfig {
                    listen_address: Some(SocketAddr::from(([127, 0, 0, 1], 0))),
                    ..ServerConfig::default()
                },
                upstream: UpstreamConfig {
                    base_url: Some(base_url.parse().expect("valid URL")),
                    timeout: "5s".to_owned(),
                },
                rewrite: RewriteConfig::default(),
                telemetry: None,
            },
        }
    }

    /// Set CORS configuration
    pub fn with_cors(mut self, config: CorsConfig) -> Self {
        self.config.server.cors = config;
        self
    }

    /// Set the tool history rewrite text
    pub fn with_rewrite(mut self, config: RewriteConfig) -> Self {
        self.config.rewrite = config;
        self
    }

    /// Disable health endpoint
    pub fn without_health(mut self) -> Self {
        self.config.server.health.enabled = false;
        self
    }

    /// Build the final config, validated like the binary does
    pub fn build(self) -> Config {
        self.config.validate().expect("valid test config");
        self.config
    }
}
