//! Bootstrap exchange
//!
//! Proves once that the management server accepts the device identity:
//! certificate material is validated locally first, then a single mutually
//! authenticated `GET /bootstrap` is issued.

use reqwest::Client;
use tracing::{debug, instrument, warn};

use crate::config::{CertificatePaths, TimeoutsConfig};
use crate::error::{OtaClientError, Result};
use crate::transport::{build_tls_client, ClientIdentity, TrustPool};

/// Entry point of the bootstrap exchange
pub struct BootstrapExchange;

impl BootstrapExchange {
    /// Validate certificate material for a bootstrap against `server_host`
    ///
    /// Performs no network I/O. The certificate and key must form a usable
    /// pair; a key that does not belong to the certificate is rejected here.
    ///
    /// # Panics
    ///
    /// Panics if `server_host` is empty; validating without a bootstrap
    /// target is a caller bug, not a runtime condition.
    pub fn validate(server_host: &str, paths: &CertificatePaths) -> Result<ValidatedBootstrap> {
        Self::validate_with_timeouts(server_host, paths, &TimeoutsConfig::default())
    }

    /// Same as [`BootstrapExchange::validate`] with explicit transport timeouts
    pub fn validate_with_timeouts(
        server_host: &str,
        paths: &CertificatePaths,
        timeouts: &TimeoutsConfig,
    ) -> Result<ValidatedBootstrap> {
        assert!(
            !server_host.is_empty(),
            "trying to validate bootstrap parameters while not performing bootstrap"
        );

        let trusted = match TrustPool::from_pem_file(&paths.server_cert) {
            Ok(pool) => pool,
            Err(OtaClientError::InvalidTrustCertificate { path, message }) => {
                debug!("Ignoring unparsable trust file {}: {}", path.display(), message);
                return Err(OtaClientError::EmptyTrustPool);
            }
            Err(e) => return Err(e),
        };

        let identity = ClientIdentity::from_pem_files(&paths.cert_file, &paths.key_file)?;

        // rustls checks that the key matches the certificate when the
        // client is assembled
        let client = build_tls_client(Some(&trusted), Some(&identity), false, timeouts)?;

        Ok(ValidatedBootstrap {
            server_host: server_host.to_string(),
            trusted,
            identity,
            client,
        })
    }
}

/// Certificate material that passed validation, ready for the exchange
#[derive(Debug, Clone)]
pub struct ValidatedBootstrap {
    server_host: String,
    trusted: TrustPool,
    identity: ClientIdentity,
    client: Client,
}

impl ValidatedBootstrap {
    pub fn server_host(&self) -> &str {
        &self.server_host
    }

    pub fn trusted(&self) -> &TrustPool {
        &self.trusted
    }

    pub fn identity(&self) -> &ClientIdentity {
        &self.identity
    }

    /// Bootstrap endpoint on the configured host
    pub fn bootstrap_url(&self) -> String {
        format!("https://{}/bootstrap", self.server_host)
    }

    /// Perform the authenticated bootstrap request
    ///
    /// Any response that arrives without a transport error counts as
    /// success; the body is logged and discarded.
    #[instrument(skip(self), fields(server = %self.server_host))]
    pub async fn exchange(&self) -> Result<()> {
        let url = self.bootstrap_url();
        debug!("Sending HTTP GET to: {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| OtaClientError::transport("bootstrap request failed", e))?;

        let status = response.status();
        debug!("Received headers: {:?}", response.headers());
        if !status.is_success() {
            warn!("Bootstrap server answered with {}", status);
        }

        let body = response
            .text()
            .await
            .map_err(|e| OtaClientError::transport("failed to read bootstrap response", e))?;
        debug!("Received data: {}", body);

        Ok(())
    }
}
