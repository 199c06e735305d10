//! OTA Agent - device-side command-line tool for OTA management servers
//!
//! Each invocation performs one action: the bootstrap exchange, a single
//! update check, or a check followed by an image download. Scheduling and
//! retries are left to whatever runs the agent.

mod commands;
mod config;
mod output;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ota_client::UpdateClient;
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::{ArgOverrides, Config};
use crate::output::{OutputContext, OutputFormat};

#[derive(Parser)]
#[command(name = "ota-agent")]
#[command(author, version, about = "OTA device agent")]
#[command(propagate_version = true)]
struct Cli {
    /// Management server URL (https:// is assumed when no scheme is given)
    #[arg(short, long, env = "OTA_SERVER")]
    server: Option<String>,

    /// Device identifier
    #[arg(short, long, env = "OTA_DEVICE_ID")]
    device_id: Option<String>,

    /// Device certificate (PEM)
    #[arg(long, env = "OTA_CERT")]
    cert: Option<PathBuf>,

    /// Device private key (PEM)
    #[arg(long, env = "OTA_KEY")]
    key: Option<PathBuf>,

    /// Trusted server certificate(s) (PEM)
    #[arg(long, env = "OTA_TRUSTED_CERTS")]
    trusted_certs: Option<PathBuf>,

    /// Skip server certificate verification (development only)
    #[arg(long)]
    insecure: bool,

    /// Configuration file path
    #[arg(short, long, env = "OTA_CONFIG")]
    config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    output: OutputFormat,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    /// Minimal output (for scripting)
    #[arg(short, long)]
    quiet: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Prove the device identity to the bootstrap server
    Bootstrap {
        /// Bootstrap server host (overrides bootstrap.server)
        #[arg(long, env = "OTA_BOOTSTRAP_SERVER")]
        host: Option<String>,
    },

    /// Check once for a scheduled update
    Check,

    /// Check for a scheduled update and download its image
    Fetch {
        /// Destination file for the image
        #[arg(long, value_name = "FILE")]
        dest: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();

    // Load config file
    let config = if let Some(config_path) = &cli.config {
        Config::load_from(config_path)?
    } else {
        Config::load().unwrap_or_default()
    };

    let mut merged = config.merge_with_args(&ArgOverrides {
        server: cli.server.clone(),
        device_id: cli.device_id.clone(),
        cert: cli.cert.clone(),
        key: cli.key.clone(),
        trusted_certs: cli.trusted_certs.clone(),
        insecure: cli.insecure,
        no_color: cli.no_color,
    });

    debug!(
        "Using server {} (device: {:?})",
        merged.server, merged.device_id
    );

    let ctx = OutputContext::new(cli.output, merged.no_color, cli.quiet);
    if merged.tls.skip_verify {
        ctx.warn("Warning: server certificate verification is disabled");
    }

    match &cli.command {
        Commands::Bootstrap { host } => {
            if let Some(host) = host {
                merged.bootstrap.server = Some(host.clone());
            }
            commands::bootstrap(&merged.bootstrap, &merged.tls.timeouts, &ctx).await?;
        }

        Commands::Check => {
            let device_id = merged.require_device_id()?;
            let client = create_client(&merged.tls)?;
            commands::check(&client, &merged.server, device_id, &ctx).await?;
        }

        Commands::Fetch { dest } => {
            let device_id = merged.require_device_id()?;
            let client = create_client(&merged.tls)?;
            commands::fetch(&client, &merged.server, device_id, dest, &ctx).await?;
        }
    }

    Ok(())
}

/// Create an update client from the merged TLS settings
fn create_client(tls: &ota_client::HttpsClientConfig) -> Result<UpdateClient> {
    UpdateClient::new(tls).context("Failed to create update client")
}
