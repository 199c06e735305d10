//! TLS transport factory
//!
//! Builds the `reqwest` client shared by the bootstrap exchange and the
//! update protocol. Server trust comes from a [`TrustPool`] loaded from a PEM
//! file, the device presents a [`ClientIdentity`] during the handshake.

use std::path::{Path, PathBuf};

use reqwest::{Certificate, Client, Identity};
use tracing::{debug, warn};

use crate::config::{non_empty, HttpsClientConfig, TimeoutsConfig};
use crate::error::{OtaClientError, Result};

/// Set of trusted root certificates used to verify the server
///
/// A pool is never empty: constructors reject input without certificates.
#[derive(Clone)]
pub struct TrustPool {
    certificates: Vec<Certificate>,
    source: PathBuf,
}

impl TrustPool {
    /// Load every certificate from a PEM bundle file
    pub fn from_pem_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let pem = std::fs::read(path).map_err(|source| OtaClientError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_pem(&pem, path)
    }

    fn from_pem(pem: &[u8], source: &Path) -> Result<Self> {
        let certificates = Certificate::from_pem_bundle(pem).map_err(|e| {
            OtaClientError::InvalidTrustCertificate {
                path: source.to_path_buf(),
                message: e.to_string(),
            }
        })?;

        if certificates.is_empty() {
            return Err(OtaClientError::EmptyTrustPool);
        }

        debug!(
            "Loaded {} trusted certificate(s) from {}",
            certificates.len(),
            source.display()
        );

        Ok(Self {
            certificates,
            source: source.to_path_buf(),
        })
    }

    /// Number of trusted certificates
    pub fn len(&self) -> usize {
        self.certificates.len()
    }

    /// Always false for a constructed pool
    pub fn is_empty(&self) -> bool {
        self.certificates.is_empty()
    }

    /// File the pool was loaded from
    pub fn source(&self) -> &Path {
        &self.source
    }
}

impl std::fmt::Debug for TrustPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrustPool")
            .field("certificates", &self.certificates.len())
            .field("source", &self.source)
            .finish()
    }
}

/// Device certificate and private key presented during the TLS handshake
#[derive(Clone)]
pub struct ClientIdentity {
    identity: Identity,
    cert_file: PathBuf,
    key_file: PathBuf,
}

impl ClientIdentity {
    /// Load a certificate/key pair from two PEM files
    pub fn from_pem_files(cert: impl AsRef<Path>, key: impl AsRef<Path>) -> Result<Self> {
        let cert = cert.as_ref();
        let key = key.as_ref();

        let identity_error = |message: String| OtaClientError::ClientIdentity {
            cert: cert.to_path_buf(),
            key: key.to_path_buf(),
            message,
        };

        let mut pem = std::fs::read(cert).map_err(|e| identity_error(e.to_string()))?;
        let key_pem = std::fs::read(key).map_err(|e| identity_error(e.to_string()))?;
        if !pem.ends_with(b"\n") {
            pem.push(b'\n');
        }
        pem.extend_from_slice(&key_pem);

        let identity = Identity::from_pem(&pem).map_err(|e| identity_error(e.to_string()))?;

        debug!(
            "Loaded client identity from {} and {}",
            cert.display(),
            key.display()
        );

        Ok(Self {
            identity,
            cert_file: cert.to_path_buf(),
            key_file: key.to_path_buf(),
        })
    }

    pub fn cert_file(&self) -> &Path {
        &self.cert_file
    }

    pub fn key_file(&self) -> &Path {
        &self.key_file
    }

    fn mismatch(&self, source: reqwest::Error) -> OtaClientError {
        OtaClientError::ClientIdentity {
            cert: self.cert_file.clone(),
            key: self.key_file.clone(),
            message: source.to_string(),
        }
    }
}

impl std::fmt::Debug for ClientIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientIdentity")
            .field("cert_file", &self.cert_file)
            .field("key_file", &self.key_file)
            .finish_non_exhaustive()
    }
}

/// Build an HTTP client from an [`HttpsClientConfig`]
///
/// Without any TLS material a plain client is returned. A lone client
/// certificate or key is rejected, as is any certificate file that cannot be
/// loaded.
pub fn build_http_client(config: &HttpsClientConfig) -> Result<Client> {
    if config.is_plain() {
        if config.skip_verify {
            warn!("Skip-verify ignored: no TLS material configured, using plain client");
        }
        return build_plain_client(&config.timeouts);
    }

    let client_cert = non_empty(config.client_cert.as_deref());
    let client_key = non_empty(config.client_key.as_deref());
    let server_cert = non_empty(config.server_cert.as_deref());

    let identity = match (client_cert, client_key) {
        (Some(cert), Some(key)) => Some(ClientIdentity::from_pem_files(cert, key)?),
        (None, None) => None,
        _ => return Err(OtaClientError::IncompleteIdentity),
    };

    let trust = server_cert.map(TrustPool::from_pem_file).transpose()?;

    build_tls_client(
        trust.as_ref(),
        identity.as_ref(),
        config.skip_verify,
        &config.timeouts,
    )
}

/// Build a client with default TLS settings and the given timeouts
pub fn build_plain_client(timeouts: &TimeoutsConfig) -> Result<Client> {
    Client::builder()
        .timeout(timeouts.request())
        .connect_timeout(timeouts.connect())
        .build()
        .map_err(OtaClientError::ClientBuild)
}

/// Build a TLS client verifying against `trust` and presenting `identity`
///
/// When a trust pool is given it replaces the built-in roots.
pub fn build_tls_client(
    trust: Option<&TrustPool>,
    identity: Option<&ClientIdentity>,
    skip_verify: bool,
    timeouts: &TimeoutsConfig,
) -> Result<Client> {
    let mut builder = Client::builder()
        .use_rustls_tls()
        .timeout(timeouts.request())
        .connect_timeout(timeouts.connect());

    if let Some(pool) = trust {
        if pool.is_empty() {
            return Err(OtaClientError::EmptyTrustPool);
        }
        builder = builder.tls_built_in_root_certs(false);
        for cert in &pool.certificates {
            builder = builder.add_root_certificate(cert.clone());
        }
    }

    if let Some(identity) = identity {
        builder = builder.identity(identity.identity.clone());
    }

    if skip_verify {
        warn!("Server certificate verification disabled, do not use in production");
        builder = builder.danger_accept_invalid_certs(true);
    }

    builder.build().map_err(|e| match identity {
        Some(identity) => identity.mismatch(e),
        None => OtaClientError::ClientBuild(e),
    })
}

/// Normalize a server address, defaulting to HTTPS when no scheme is given
pub fn build_url(server: &str) -> String {
    if server.starts_with("https://") || server.starts_with("http://") {
        server.to_string()
    } else {
        format!("https://{}", server)
    }
}

/// Join a normalized server address with an API path
pub fn build_api_url(server: &str, path: &str) -> String {
    let base = build_url(server);
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// URL-encode an identifier for use in a single path segment.
pub(crate) fn encode_path_segment(id: &str) -> String {
    id.replace('/', "%2F")
}
