//! Error types for OTA client operations

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for OTA client operations
pub type Result<T> = std::result::Result<T, OtaClientError>;

/// Broad classification of an [`OtaClientError`]
///
/// Callers use this to decide whether to retry, escalate or stop polling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Certificate material or client setup is wrong; retrying will not help
    Configuration,
    /// Connection, TLS handshake or timeout failure
    Transport,
    /// The server answered, but not in a way the protocol accepts
    Protocol,
}

/// Errors that can occur during OTA client operations
#[derive(Error, Debug)]
pub enum OtaClientError {
    /// Only one half of the client certificate/key pair was configured
    #[error("incomplete client identity: certificate and key must be supplied together")]
    IncompleteIdentity,

    /// A certificate or key file could not be read
    #[error("failed to read {}: {source}", path.display())]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Trusted certificate file is not valid PEM
    #[error("invalid trusted certificate in {}: {message}", path.display())]
    InvalidTrustCertificate { path: PathBuf, message: String },

    /// Trust pool ended up without any certificate
    #[error("no server certificate is trusted, configure a file with a proper certificate")]
    EmptyTrustPool,

    /// Client certificate and key could not be loaded as an identity
    #[error(
        "failed to load certificate and key from files: {} {}: {message}",
        cert.display(),
        key.display()
    )]
    ClientIdentity {
        cert: PathBuf,
        key: PathBuf,
        message: String,
    },

    /// The HTTP client could not be constructed
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),

    /// Request could not be sent or the response could not be received
    #[error("{context}: {source}")]
    Transport {
        context: &'static str,
        #[source]
        source: reqwest::Error,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Failed to parse response
    #[error("failed to parse response: {0}")]
    Parse(String),

    /// Update response decoded but lacks required fields
    #[error("missing parameters in decoded response")]
    MissingParameters,

    /// Server refused to hand out the update schedule
    #[error("client not authorized to get update schedule")]
    Unauthorized,

    /// Update check answered with a status outside the protocol
    #[error("invalid response received from server: HTTP {0}")]
    UnexpectedStatus(u16),

    /// Image download answered with a non-200 status
    #[error("error fetching scheduled update image: HTTP {0}")]
    FetchFailed(u16),

    /// Image download did not announce its size
    #[error("will not continue with unknown image size")]
    UnknownImageSize,

    /// Image download announced a size below the floor
    #[error("image size is smaller than expected: expected at least {minimum}, received {received}")]
    ImageTooSmall { minimum: u64, received: u64 },

    /// Image stream ended with a different byte count than announced
    #[error("image length mismatch: expected {expected} bytes, received {received}")]
    LengthMismatch { expected: u64, received: u64 },
}

impl OtaClientError {
    /// Wrap a transport failure with the operation it interrupted
    pub fn transport(context: &'static str, source: reqwest::Error) -> Self {
        Self::Transport { context, source }
    }

    /// Classify the error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::IncompleteIdentity
            | Self::ReadFile { .. }
            | Self::InvalidTrustCertificate { .. }
            | Self::EmptyTrustPool
            | Self::ClientIdentity { .. }
            | Self::ClientBuild(_) => ErrorKind::Configuration,
            Self::Transport { .. } | Self::Io(_) => ErrorKind::Transport,
            Self::InvalidUrl(_)
            | Self::Parse(_)
            | Self::MissingParameters
            | Self::Unauthorized
            | Self::UnexpectedStatus(_)
            | Self::FetchFailed(_)
            | Self::UnknownImageSize
            | Self::ImageTooSmall { .. }
            | Self::LengthMismatch { .. } => ErrorKind::Protocol,
        }
    }

    /// True for errors caused by certificate material or client setup
    pub fn is_configuration(&self) -> bool {
        self.kind() == ErrorKind::Configuration
    }
}
