//! Bootstrap command - prove the device identity to the server

use anyhow::{Context, Result};
use ota_client::{BootstrapExchange, BootstrapSettings, TimeoutsConfig};

use crate::output::OutputContext;

/// Validate certificate material and perform the bootstrap exchange
pub async fn bootstrap(
    settings: &BootstrapSettings,
    timeouts: &TimeoutsConfig,
    ctx: &OutputContext,
) -> Result<()> {
    let host = settings.target().context(
        "No bootstrap server configured, use --host or set bootstrap.server in the config file",
    )?;
    let paths = settings.resolve();

    ctx.info(&format!(
        "Validating certificates ({}, {}, trusted: {})...",
        paths.cert_file.display(),
        paths.key_file.display(),
        paths.server_cert.display()
    ));
    let validated = BootstrapExchange::validate_with_timeouts(host, &paths, timeouts)
        .context("Bootstrap validation failed")?;

    ctx.info(&format!("Contacting {}...", validated.bootstrap_url()));
    validated
        .exchange()
        .await
        .with_context(|| format!("Bootstrap exchange with {} failed", host))?;

    ctx.success("Bootstrap completed successfully");
    Ok(())
}
