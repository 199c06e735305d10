//! Configuration file handling for ota-agent

use anyhow::{Context, Result};
use ota_client::{BootstrapSettings, HttpsClientConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const DEFAULT_SERVER: &str = "https://localhost:443";

/// Configuration for the agent
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Management server URL
    pub server: Option<String>,
    /// Device identifier used for update checks
    pub device_id: Option<String>,
    /// Disable colored output
    pub no_color: Option<bool>,
    /// TLS material for update traffic
    #[serde(default)]
    pub tls: HttpsClientConfig,
    /// Bootstrap target and certificate locations
    #[serde(default)]
    pub bootstrap: BootstrapSettings,
}

/// Values supplied on the command line (or via environment)
#[derive(Debug, Clone, Default)]
pub struct ArgOverrides {
    pub server: Option<String>,
    pub device_id: Option<String>,
    pub cert: Option<PathBuf>,
    pub key: Option<PathBuf>,
    pub trusted_certs: Option<PathBuf>,
    pub insecure: bool,
    pub no_color: bool,
}

impl Config {
    /// Load configuration from the default config file
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Get the default config file path
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Could not determine config directory")?
            .join("ota-agent");

        Ok(config_dir.join("config.toml"))
    }

    /// Merge CLI arguments over config file values
    ///
    /// Certificate arguments apply to both update traffic and bootstrap.
    pub fn merge_with_args(&self, args: &ArgOverrides) -> MergedConfig {
        let mut tls = self.tls.clone();
        let mut bootstrap = self.bootstrap.clone();

        if let Some(cert) = &args.cert {
            tls.client_cert = Some(cert.clone());
            bootstrap.cert_file = Some(cert.clone());
        }
        if let Some(key) = &args.key {
            tls.client_key = Some(key.clone());
            bootstrap.key_file = Some(key.clone());
        }
        if let Some(trusted) = &args.trusted_certs {
            tls.server_cert = Some(trusted.clone());
            bootstrap.server_cert = Some(trusted.clone());
        }
        tls.skip_verify = args.insecure || tls.skip_verify;

        MergedConfig {
            server: args
                .server
                .clone()
                .or_else(|| self.server.clone())
                .unwrap_or_else(|| DEFAULT_SERVER.to_string()),
            device_id: args.device_id.clone().or_else(|| self.device_id.clone()),
            no_color: args.no_color || self.no_color.unwrap_or(false),
            tls,
            bootstrap,
        }
    }
}

/// Fully resolved configuration after merging CLI args
#[derive(Debug, Clone)]
pub struct MergedConfig {
    pub server: String,
    pub device_id: Option<String>,
    pub no_color: bool,
    pub tls: HttpsClientConfig,
    pub bootstrap: BootstrapSettings,
}

impl MergedConfig {
    /// Device identifier, required for update traffic
    pub fn require_device_id(&self) -> Result<&str> {
        self.device_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .context("No device ID configured, use --device-id or set device_id in the config file")
    }
}
