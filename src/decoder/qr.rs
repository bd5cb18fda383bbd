//! Local QR decoding with `rqrr`.

use super::LocalDecoder;
use crate::frame::PixelFrame;
use rqrr::PreparedImage;
use tracing::debug;

#[derive(Debug, Default, Clone, Copy)]
pub struct QrDecoder;

impl QrDecoder {
    pub fn new() -> Self {
        Self
    }
}

impl LocalDecoder for QrDecoder {
    fn name(&self) -> &str {
        "rqrr"
    }

    fn decode(&self, frame: &PixelFrame) -> Vec<String> {
        let mut prepared = PreparedImage::prepare(frame.to_luma());
        let grids = prepared.detect_grids();
        debug!("QrDecoder: {} candidate grid(s)", grids.len());

        grids
            .iter()
            .enumerate()
            .filter_map(|(index, grid)| match grid.decode() {
                Ok((_, content)) => Some(content),
                Err(e) => {
                    debug!("QrDecoder: grid {} failed to decode: {:?}", index, e);
                    None
                }
            })
            .collect()
    }
}
