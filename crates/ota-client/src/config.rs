//! Client configuration: TLS material, timeouts and certificate locations

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default location of the device certificate
pub const DEFAULT_CERT_FILE: &str = "/data/certfile";
/// Default location of the device private key
pub const DEFAULT_CERT_KEY: &str = "/data/certkey";
/// Default location of the trusted server certificate
pub const DEFAULT_SERVER_CERT: &str = "/data/servercert";

/// HTTPS client configuration
///
/// Every path is optional. The client certificate and key must be supplied
/// together; a lone half is rejected when the transport is built.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpsClientConfig {
    /// PEM file with the device certificate (chain)
    #[serde(default)]
    pub client_cert: Option<PathBuf>,

    /// PEM file with the device private key
    #[serde(default)]
    pub client_key: Option<PathBuf>,

    /// PEM file with one or more trusted server certificates
    #[serde(default)]
    pub server_cert: Option<PathBuf>,

    /// Disable server certificate verification (development only)
    #[serde(default)]
    pub skip_verify: bool,

    /// Transport timeouts
    #[serde(default)]
    pub timeouts: TimeoutsConfig,
}

/// Timeout configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeoutsConfig {
    /// General request timeout in milliseconds (default: 30s)
    #[serde(default = "default_request_timeout")]
    pub request_ms: u64,

    /// Connect timeout in milliseconds (default: 10s)
    #[serde(default = "default_connect_timeout")]
    pub connect_ms: u64,
}

impl Default for TimeoutsConfig {
    fn default() -> Self {
        Self {
            request_ms: default_request_timeout(),
            connect_ms: default_connect_timeout(),
        }
    }
}

impl TimeoutsConfig {
    pub fn request(&self) -> Duration {
        Duration::from_millis(self.request_ms)
    }

    pub fn connect(&self) -> Duration {
        Duration::from_millis(self.connect_ms)
    }
}

fn default_request_timeout() -> u64 {
    30_000 // 30 seconds
}

fn default_connect_timeout() -> u64 {
    10_000 // 10 seconds
}

impl HttpsClientConfig {
    /// Create a builder for programmatic configuration
    pub fn builder() -> HttpsClientConfigBuilder {
        HttpsClientConfigBuilder::default()
    }

    /// True when no TLS material at all is configured
    ///
    /// Empty paths count as unset.
    pub fn is_plain(&self) -> bool {
        non_empty(self.client_cert.as_deref()).is_none()
            && non_empty(self.client_key.as_deref()).is_none()
            && non_empty(self.server_cert.as_deref()).is_none()
    }
}

/// Builder for HttpsClientConfig
#[derive(Debug, Default)]
pub struct HttpsClientConfigBuilder {
    config: HttpsClientConfig,
}

impl HttpsClientConfigBuilder {
    /// Set the device certificate and private key files
    pub fn client_identity(mut self, cert: impl Into<PathBuf>, key: impl Into<PathBuf>) -> Self {
        self.config.client_cert = Some(cert.into());
        self.config.client_key = Some(key.into());
        self
    }

    /// Set only the device certificate file
    pub fn client_cert(mut self, cert: impl Into<PathBuf>) -> Self {
        self.config.client_cert = Some(cert.into());
        self
    }

    /// Set only the device private key file
    pub fn client_key(mut self, key: impl Into<PathBuf>) -> Self {
        self.config.client_key = Some(key.into());
        self
    }

    /// Set the trusted server certificate file
    pub fn server_cert(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.server_cert = Some(path.into());
        self
    }

    /// Disable server certificate verification
    pub fn skip_verify(mut self, skip: bool) -> Self {
        self.config.skip_verify = skip;
        self
    }

    /// Set request timeout in milliseconds
    pub fn request_timeout_ms(mut self, ms: u64) -> Self {
        self.config.timeouts.request_ms = ms;
        self
    }

    /// Set connect timeout in milliseconds
    pub fn connect_timeout_ms(mut self, ms: u64) -> Self {
        self.config.timeouts.connect_ms = ms;
        self
    }

    /// Build the configuration
    pub fn build(self) -> HttpsClientConfig {
        self.config
    }
}

/// Fully resolved certificate locations used by the bootstrap exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificatePaths {
    pub cert_file: PathBuf,
    pub key_file: PathBuf,
    pub server_cert: PathBuf,
}

impl Default for CertificatePaths {
    fn default() -> Self {
        Self {
            cert_file: PathBuf::from(DEFAULT_CERT_FILE),
            key_file: PathBuf::from(DEFAULT_CERT_KEY),
            server_cert: PathBuf::from(DEFAULT_SERVER_CERT),
        }
    }
}

/// Bootstrap settings as supplied by the caller's configuration layer
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BootstrapSettings {
    /// Host name (optionally with port) of the bootstrap server
    #[serde(default)]
    pub server: Option<String>,

    #[serde(default)]
    pub cert_file: Option<PathBuf>,

    #[serde(default)]
    pub key_file: Option<PathBuf>,

    #[serde(default)]
    pub server_cert: Option<PathBuf>,
}

impl BootstrapSettings {
    /// Resolve certificate paths, falling back to the deployment defaults
    /// for anything left unset or empty.
    pub fn resolve(&self) -> CertificatePaths {
        let defaults = CertificatePaths::default();
        CertificatePaths {
            cert_file: non_empty(self.cert_file.as_deref()).unwrap_or(defaults.cert_file),
            key_file: non_empty(self.key_file.as_deref()).unwrap_or(defaults.key_file),
            server_cert: non_empty(self.server_cert.as_deref()).unwrap_or(defaults.server_cert),
        }
    }

    /// The configured bootstrap target, if any
    pub fn target(&self) -> Option<&str> {
        self.server.as_deref().filter(|s| !s.is_empty())
    }
}

pub(crate) fn non_empty(path: Option<&Path>) -> Option<PathBuf> {
    path.filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
}
