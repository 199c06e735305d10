//! Response types for the update protocol

use serde::{Deserialize, Serialize};

use crate::error::{OtaClientError, Result};

// =============================================================================
// Update Check Types
// =============================================================================

/// Scheduled update announced by the server
///
/// Describes a deployable artifact; the artifact bytes are fetched
/// separately from [`ImageInfo::uri`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateDescriptor {
    /// Deployment identifier
    #[serde(rename = "ID", alias = "id", default)]
    pub id: String,

    /// Image to install
    #[serde(rename = "Image", alias = "image", default)]
    pub image: ImageInfo,
}

/// Image metadata within an [`UpdateDescriptor`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageInfo {
    /// Download location of the artifact
    #[serde(rename = "URI", alias = "uri", default)]
    pub uri: String,

    #[serde(rename = "Checksum", alias = "checksum", default)]
    pub checksum: String,

    /// Build variant the image targets
    #[serde(rename = "yocto_id", default)]
    pub variant_id: String,

    #[serde(rename = "ID", alias = "id", default)]
    pub id: String,
}

impl UpdateDescriptor {
    /// Check that every field the protocol requires is populated
    pub fn validate(&self) -> Result<()> {
        let complete = !self.id.is_empty()
            && !self.image.id.is_empty()
            && !self.image.uri.is_empty()
            && !self.image.checksum.is_empty()
            && !self.image.variant_id.is_empty();

        if complete {
            Ok(())
        } else {
            Err(OtaClientError::MissingParameters)
        }
    }
}

/// Outcome of a successful update check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateCheck {
    /// Server has nothing scheduled for this device
    NoUpdate,
    /// An update is ready to be fetched
    Available(UpdateDescriptor),
}

impl UpdateCheck {
    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available(_))
    }

    /// The descriptor, if an update is available
    pub fn descriptor(&self) -> Option<&UpdateDescriptor> {
        match self {
            Self::Available(update) => Some(update),
            Self::NoUpdate => None,
        }
    }

    pub fn into_descriptor(self) -> Option<UpdateDescriptor> {
        match self {
            Self::Available(update) => Some(update),
            Self::NoUpdate => None,
        }
    }
}
