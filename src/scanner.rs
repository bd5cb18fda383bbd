//! Local-then-remote fallback chain for a single uploaded image.

use crate::decoder::{LocalDecoder, RemoteDecoder, RemoteError};
use crate::frame::PixelFrame;
use crate::schema::ScanResult;
use axum::body::Bytes;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Scan orchestrator. Holds no per-request state, so one instance is shared
/// by every handler.
#[derive(Clone)]
pub struct Scanner {
    local: Arc<dyn LocalDecoder>,
    remote: Arc<dyn RemoteDecoder>,
}

impl Scanner {
    pub fn new(local: Arc<dyn LocalDecoder>, remote: Arc<dyn RemoteDecoder>) -> Self {
        Self { local, remote }
    }

    /// Decode `bytes` and look for codes, locally first.
    pub async fn scan(&self, bytes: Bytes) -> ScanResult {
        let frame = match decode_frame(bytes).await {
            Some(frame) => Arc::new(frame),
            None => return ScanResult::undecodable(),
        };
        debug!("Decoded {}x{} frame", frame.width(), frame.height());

        let ids = self.decode_local(Arc::clone(&frame)).await;
        if !ids.is_empty() {
            info!("{} found {} code(s)", self.local.name(), ids.len());
            return ScanResult::from_ids(ids);
        }

        info!(
            "{} found nothing, falling back to {}",
            self.local.name(),
            self.remote.name()
        );
        let ids = match self.remote.decode(&frame).await {
            Ok(ids) => ids,
            Err(RemoteError::MissingCredential) => {
                debug!("{} skipped: API key is not configured", self.remote.name());
                Vec::new()
            }
            Err(e) => {
                warn!("{} failed: {}", self.remote.name(), e);
                Vec::new()
            }
        };

        if let Some(id) = ids.first() {
            info!("{} found {}", self.remote.name(), id);
        }
        ScanResult::from_ids(ids)
    }

    /// Run the local decoder off the async runtime. A panic inside the
    /// decoding library counts as "nothing found".
    async fn decode_local(&self, frame: Arc<PixelFrame>) -> Vec<String> {
        let local = Arc::clone(&self.local);
        match tokio::task::spawn_blocking(move || local.decode(&frame)).await {
            Ok(ids) => ids,
            Err(e) => {
                error!("{} worker failed: {}", self.local.name(), e);
                Vec::new()
            }
        }
    }
}

async fn decode_frame(bytes: Bytes) -> Option<PixelFrame> {
    match tokio::task::spawn_blocking(move || PixelFrame::decode(&bytes)).await {
        Ok(Ok(frame)) => Some(frame),
        Ok(Err(e)) => {
            info!("Rejected upload: {}", e);
            None
        }
        Err(e) => {
            error!("Image decode worker failed: {}", e);
            None
        }
    }
}
