//! Code decoder abstraction.
//!
//! A scan tries a [`LocalDecoder`] first and only falls back to a
//! [`RemoteDecoder`] when the local pass finds nothing.

pub mod gemini;
pub mod qr;

use crate::frame::PixelFrame;

/// Synchronous, side-effect free decoder that reads codes from pixels.
pub trait LocalDecoder: Send + Sync {
    fn name(&self) -> &str;

    /// Payloads of every recognized code, in detection order.
    fn decode(&self, frame: &PixelFrame) -> Vec<String>;
}

/// Remote decoder that asks an external service to read the code.
///
/// Returns at most one identifier. Any failure is reported as a
/// [`RemoteError`] and the caller decides how to degrade.
#[async_trait::async_trait]
pub trait RemoteDecoder: Send + Sync {
    fn name(&self) -> &str;
    async fn decode(&self, frame: &PixelFrame) -> Result<Vec<String>, RemoteError>;
}

/// Why a remote decode produced nothing usable.
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    #[error("API key is not configured")]
    MissingCredential,

    #[error("failed to encode frame as JPEG: {0}")]
    Encode(#[from] image::ImageError),

    #[error("request timed out")]
    Timeout,

    #[error("transport error: {0}")]
    Transport(reqwest::Error),

    #[error("API error ({status}): {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("unexpected response body: {0}")]
    Malformed(#[from] serde_json::Error),
}

impl From<reqwest::Error> for RemoteError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            // The request URL carries the API key
            Self::Transport(err.without_url())
        }
    }
}
