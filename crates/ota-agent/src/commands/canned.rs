//! Canned [`Updater`] double for command tests

use async_trait::async_trait;
use bytes::Bytes;
use ota_client::{ImageDownload, OtaClientError, Result, UpdateCheck, UpdateDescriptor, Updater};

pub struct CannedUpdater {
    pub check: Option<UpdateDescriptor>,
    pub image: Vec<u8>,
    /// Length announced for the image, may differ from `image.len()`
    pub announced: u64,
    pub unauthorized: bool,
}

impl CannedUpdater {
    pub fn no_update() -> Self {
        Self {
            check: None,
            image: Vec::new(),
            announced: 0,
            unauthorized: false,
        }
    }

    pub fn with_image(image: Vec<u8>) -> Self {
        let mut update = UpdateDescriptor {
            id: "deployment-1".into(),
            ..Default::default()
        };
        update.image.id = "image-1".into();
        update.image.uri = "https://cdn.example.com/image-1".into();
        update.image.checksum = "abcd".into();
        update.image.variant_id = "core-image-minimal".into();

        Self {
            check: Some(update),
            announced: image.len() as u64,
            image,
            unauthorized: false,
        }
    }
}

#[async_trait]
impl Updater for CannedUpdater {
    async fn get_scheduled_update(&self, _server: &str, _device_id: &str) -> Result<UpdateCheck> {
        if self.unauthorized {
            return Err(OtaClientError::Unauthorized);
        }
        Ok(match &self.check {
            Some(update) => UpdateCheck::Available(update.clone()),
            None => UpdateCheck::NoUpdate,
        })
    }

    async fn fetch_update(&self, _url: &str) -> Result<ImageDownload> {
        let chunks = self
            .image
            .chunks(1024)
            .map(|c| Ok(Bytes::copy_from_slice(c)))
            .collect::<Vec<_>>();
        Ok(ImageDownload::new(
            futures::stream::iter(chunks),
            self.announced,
        ))
    }
}
