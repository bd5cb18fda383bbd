//! Decoded upload bitmap shared by both decoders.

use image::codecs::jpeg::JpegEncoder;
use image::{ColorType, GrayImage, ImageResult, RgbImage};

const JPEG_QUALITY: u8 = 95;

/// An uploaded image decoded into 8-bit RGB.
///
/// Alpha is dropped and grayscale sources are expanded, so every frame has the
/// same layout regardless of the container format it came from.
#[derive(Debug, Clone)]
pub struct PixelFrame {
    rgb: RgbImage,
}

impl PixelFrame {
    /// Decode raw upload bytes. The container format is sniffed from the data.
    pub fn decode(bytes: &[u8]) -> ImageResult<Self> {
        let image = image::load_from_memory(bytes)?;
        Ok(Self {
            rgb: image.to_rgb8(),
        })
    }

    pub fn width(&self) -> u32 {
        self.rgb.width()
    }

    pub fn height(&self) -> u32 {
        self.rgb.height()
    }

    /// 8-bit luma view used by the QR detector.
    pub fn to_luma(&self) -> GrayImage {
        image::DynamicImage::ImageRgb8(self.rgb.clone()).to_luma8()
    }

    /// Re-encode as a baseline JPEG.
    pub fn to_jpeg(&self) -> ImageResult<Vec<u8>> {
        let mut buf = Vec::new();
        let mut encoder = JpegEncoder::new_with_quality(&mut buf, JPEG_QUALITY);
        encoder.encode(
            self.rgb.as_raw(),
            self.rgb.width(),
            self.rgb.height(),
            ColorType::Rgb8,
        )?;
        Ok(buf)
    }
}

impl From<RgbImage> for PixelFrame {
    fn from(rgb: RgbImage) -> Self {
        Self { rgb }
    }
}
