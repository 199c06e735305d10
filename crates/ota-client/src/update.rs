//! Update protocol client
//!
//! Polls the management server for a scheduled update and streams the
//! announced image. Each call is a single request/response exchange; the
//! caller owns any retry or scheduling policy.

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use futures::{Stream, StreamExt, TryStreamExt};
use reqwest::{Client, StatusCode};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, error, info, instrument};
use url::Url;

use crate::config::HttpsClientConfig;
use crate::error::{OtaClientError, Result};
use crate::transport::{build_api_url, build_http_client, encode_path_segment};
use crate::types::{UpdateCheck, UpdateDescriptor};

/// Smallest image the client accepts, in bytes
pub const MINIMUM_IMAGE_SIZE: u64 = 4096;

/// Update check and fetch capability
///
/// [`UpdateClient`] talks to a real server; tests substitute canned doubles.
#[async_trait]
pub trait Updater: Send + Sync {
    /// Ask the server whether an update is scheduled for `device_id`
    async fn get_scheduled_update(&self, server: &str, device_id: &str) -> Result<UpdateCheck>;

    /// Open a download of the image at `url`
    async fn fetch_update(&self, url: &str) -> Result<ImageDownload>;
}

/// HTTP implementation of [`Updater`]
#[derive(Debug, Clone)]
pub struct UpdateClient {
    client: Client,
    min_image_size: u64,
}

impl UpdateClient {
    /// Create an update client from HTTPS configuration
    pub fn new(config: &HttpsClientConfig) -> Result<Self> {
        let client = build_http_client(config).map_err(|e| {
            error!("Failed to create updater HTTP client: {}", e);
            e
        })?;
        Ok(Self::from_http_client(client))
    }

    /// Wrap an already configured HTTP client
    pub fn from_http_client(client: Client) -> Self {
        Self {
            client,
            min_image_size: MINIMUM_IMAGE_SIZE,
        }
    }

    /// Override the smallest accepted image size
    pub fn with_min_image_size(mut self, bytes: u64) -> Self {
        self.min_image_size = bytes;
        self
    }

    pub fn min_image_size(&self) -> u64 {
        self.min_image_size
    }

    /// URL of the update check endpoint for a device
    pub fn update_check_url(server: &str, device_id: &str) -> Result<Url> {
        let url = build_api_url(
            server,
            &format!(
                "/deployments/devices/{}/update",
                encode_path_segment(device_id)
            ),
        );
        Ok(Url::parse(&url)?)
    }

    /// Classify an update check response
    ///
    /// The body is read in full before the status is looked at, so the
    /// connection can go back to the pool whatever the outcome.
    async fn process_update_response(response: reqwest::Response) -> Result<UpdateCheck> {
        let status = response.status();
        debug!("Received update check response: {}", status);

        let body = response
            .bytes()
            .await
            .map_err(|e| OtaClientError::transport("failed to read update check response", e))?;

        match status {
            StatusCode::OK => {
                debug!("Have update available");
                let update: UpdateDescriptor = serde_json::from_slice(&body)
                    .map_err(|e| OtaClientError::Parse(e.to_string()))?;
                update.validate()?;
                info!("Correct request for getting image from: {}", update.image.uri);
                Ok(UpdateCheck::Available(update))
            }
            StatusCode::NO_CONTENT => {
                debug!("No update available");
                Ok(UpdateCheck::NoUpdate)
            }
            StatusCode::NOT_FOUND => Err(OtaClientError::Unauthorized),
            _ => Err(OtaClientError::UnexpectedStatus(status.as_u16())),
        }
    }
}

#[async_trait]
impl Updater for UpdateClient {
    #[instrument(skip(self))]
    async fn get_scheduled_update(&self, server: &str, device_id: &str) -> Result<UpdateCheck> {
        let url = Self::update_check_url(server, device_id)?;
        debug!("Checking for update at {}", url);

        let response = self.client.get(url).send().await.map_err(|e| {
            debug!("Sending request error: {}", e);
            OtaClientError::transport("update check request failed", e)
        })?;

        Self::process_update_response(response).await
    }

    #[instrument(skip(self))]
    async fn fetch_update(&self, url: &str) -> Result<ImageDownload> {
        let url = Url::parse(url)?;

        let response = self.client.get(url).send().await.map_err(|e| {
            error!("Can not fetch update image: {}", e);
            OtaClientError::transport("update fetch request failed", e)
        })?;

        debug!(
            "Received fetch update response: {} {:?}",
            response.status(),
            response.headers()
        );

        if response.status() != StatusCode::OK {
            error!(
                "Error fetching scheduled update image: code ({})",
                response.status().as_u16()
            );
            return Err(OtaClientError::FetchFailed(response.status().as_u16()));
        }

        let Some(length) = response.content_length() else {
            return Err(OtaClientError::UnknownImageSize);
        };

        if length < self.min_image_size {
            error!(
                "Image smaller than expected. Expected: {}, received: {}",
                self.min_image_size, length
            );
            return Err(OtaClientError::ImageTooSmall {
                minimum: self.min_image_size,
                received: length,
            });
        }

        Ok(ImageDownload::from_response(response, length))
    }
}

/// Open image download handed to the caller by [`Updater::fetch_update`]
///
/// Owns the response body; dropping it closes the connection.
pub struct ImageDownload {
    stream: BoxStream<'static, Result<Bytes>>,
    content_length: u64,
}

impl ImageDownload {
    /// Create a download from any byte stream with a known length
    pub fn new<S>(stream: S, content_length: u64) -> Self
    where
        S: Stream<Item = Result<Bytes>> + Send + 'static,
    {
        Self {
            stream: stream.boxed(),
            content_length,
        }
    }

    fn from_response(response: reqwest::Response, content_length: u64) -> Self {
        let stream = response
            .bytes_stream()
            .map_err(|e| OtaClientError::transport("failed to read update image", e));
        Self::new(stream, content_length)
    }

    /// Length announced by the server
    pub fn content_length(&self) -> u64 {
        self.content_length
    }

    /// Next chunk of the image, `None` at end of stream
    pub async fn chunk(&mut self) -> Result<Option<Bytes>> {
        self.stream.try_next().await
    }

    /// Consume the download as a stream of chunks
    pub fn into_stream(self) -> BoxStream<'static, Result<Bytes>> {
        self.stream
    }

    /// Write the whole image to `writer`
    ///
    /// Fails if the stream delivers a different number of bytes than
    /// announced.
    pub async fn copy_to<W>(mut self, writer: &mut W) -> Result<u64>
    where
        W: AsyncWrite + Unpin,
    {
        let mut written: u64 = 0;
        while let Some(chunk) = self.chunk().await? {
            writer.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        writer.flush().await?;

        if written != self.content_length {
            return Err(OtaClientError::LengthMismatch {
                expected: self.content_length,
                received: written,
            });
        }

        debug!("Wrote {} image bytes", written);
        Ok(written)
    }
}

impl std::fmt::Debug for ImageDownload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageDownload")
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}
