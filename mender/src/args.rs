use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use clap::Parser;
use mender_config::Config;
use url::Url;

/// Config file read when `--config` is not given
const DEFAULT_CONFIG_PATH: &str = "mender.toml";

/// Mender OpenAI-compatible repair proxy
#[derive(Debug, Parser)]
#[command(
    name = "mender",
    about = "Reverse proxy that repairs responses from non-compliant OpenAI-compatible backends"
)]
pub struct Args {
    /// Path to configuration file [default: mender.toml, if present]
    #[arg(short, long, env = "MENDER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Override the listen address
    #[arg(long, env = "MENDER_LISTEN")]
    pub listen: Option<SocketAddr>,

    /// Override the backend base URL (must end with /v1)
    #[arg(long, env = "OPENAI_BASE_URL")]
    pub upstream_url: Option<Url>,

    /// Log filter directive (e.g. "info", "mender_proxy=debug")
    #[arg(long, default_value = "info", env = "MENDER_LOG")]
    pub log: String,
}

impl Args {
    /// Read the config file, apply command-line overrides, and validate
    ///
    /// An explicitly given config path must exist; the default path falls
    /// back to built-in defaults when absent.
    pub fn load_config(&self) -> anyhow::Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::read(path)?,
            None if Path::new(DEFAULT_CONFIG_PATH).exists() => Config::read(Path::new(DEFAULT_CONFIG_PATH))?,
            None => Config::default(),
        };

        if let Some(listen) = self.listen {
            config.server.listen_address = Some(listen);
        }

        if let Some(ref url) = self.upstream_url {
            config.upstream.base_url = Some(url.clone());
        }

        config.validate()?;
        Ok(config)
    }

    /// Config path for log output
    pub fn config_source(&self) -> String {
        self.config
            .as_ref()
            .map_or_else(|| format!("{DEFAULT_CONFIG_PATH} (optional)"), |p| p.display().to_string())
    }
}
