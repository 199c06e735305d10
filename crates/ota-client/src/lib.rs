//! OTA Client Library
//!
//! Device-side client for an OTA management server: a one-time mutually
//! authenticated bootstrap exchange, followed by repeated update checks and
//! image downloads over the same kind of TLS transport.
//!
//! # Example
//!
//! ```rust,no_run
//! use ota_client::{HttpsClientConfig, UpdateCheck, UpdateClient, Updater};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = HttpsClientConfig::builder()
//!         .client_identity("/data/certfile", "/data/certkey")
//!         .server_cert("/data/servercert")
//!         .build();
//!     let client = UpdateClient::new(&config)?;
//!
//!     if let UpdateCheck::Available(update) =
//!         client.get_scheduled_update("ota.example.com", "device-1").await?
//!     {
//!         let download = client.fetch_update(&update.image.uri).await?;
//!         let mut file = tokio::fs::File::create("/tmp/update.img").await?;
//!         download.copy_to(&mut file).await?;
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! # Bootstrap
//!
//! ```rust,ignore
//! use ota_client::{BootstrapExchange, BootstrapSettings};
//!
//! let paths = settings.resolve();
//! let validated = BootstrapExchange::validate("ota.example.com", &paths)?;
//! validated.exchange().await?;
//! ```
//!
//! # Testing
//!
//! The `testing` module provides a mock server for integration tests:
//!
//! ```rust,ignore
//! use ota_client::testing::TestServer;
//!
//! let server = TestServer::start(router).await?;
//! let check = server.client.get_scheduled_update(&server.base_url(), "dev-1").await?;
//! ```

pub mod bootstrap;
pub mod config;
mod error;
pub mod testing;
pub mod transport;
mod types;
pub mod update;

pub use bootstrap::{BootstrapExchange, ValidatedBootstrap};
pub use config::{BootstrapSettings, CertificatePaths, HttpsClientConfig, TimeoutsConfig};
pub use error::{ErrorKind, OtaClientError, Result};
pub use transport::{build_api_url, build_http_client, build_url, ClientIdentity, TrustPool};
pub use types::*;
pub use update::{ImageDownload, UpdateClient, Updater, MINIMUM_IMAGE_SIZE};
