use anyhow::{anyhow, Context, Result};
use image::{ColorType, DynamicImage, RgbaImage};

use crate::ports::RawFrame;

/// JPEG quality used for captured selfies.
pub const CAPTURE_JPEG_QUALITY: u8 = 95;

#[derive(Debug, Clone, Copy)]
pub struct JpegFrameEncoder {
    quality: u8,
}

impl Default for JpegFrameEncoder {
    fn default() -> Self {
        Self::new(CAPTURE_JPEG_QUALITY)
    }
}

impl JpegFrameEncoder {
    pub fn new(quality: u8) -> Self {
        Self {
            quality: quality.clamp(1, 100),
        }
    }

    pub fn quality(&self) -> u8 {
        self.quality
    }

    pub fn encode(&self, frame: &RawFrame) -> Result<Vec<u8>> {
        let rgba = RgbaImage::from_raw(frame.width, frame.height, frame.rgba.clone())
            .ok_or_else(|| {
                anyhow!(
                    "frame buffer does not match {}x{} RGBA",
                    frame.width,
                    frame.height
                )
            })?;
        let rgb = DynamicImage::ImageRgba8(rgba).to_rgb8();

        let mut jpeg_bytes = Vec::new();
        let mut encoder =
            image::codecs::jpeg::JpegEncoder::new_with_quality(&mut jpeg_bytes, self.quality);
        encoder
            .encode(rgb.as_raw(), frame.width, frame.height, ColorType::Rgb8.into())
            .context("encode frame to jpeg")?;
        Ok(jpeg_bytes)
    }
}
