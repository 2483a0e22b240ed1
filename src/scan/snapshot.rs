//! Still-image encoding of decoded frames.

use crate::decode::FrameSnapshot;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{ColorType, DynamicImage, ImageEncoder, RgbaImage};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Encoding used for captured stills.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StillFormat {
    /// Lossy, honours the quality setting.
    #[default]
    Jpeg,
    /// Lossless RGBA.
    Png,
}

impl StillFormat {
    /// MIME type of the encoded bytes.
    pub fn mime_type(self) -> &'static str {
        match self {
            StillFormat::Jpeg => "image/jpeg",
            StillFormat::Png => "image/png",
        }
    }
}

/// Errors that can occur while encoding a still.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot buffer does not match {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },
    #[error("failed to encode still image: {0}")]
    Encode(#[from] image::ImageError),
}

/// An encoded still of the frame a result was decoded from.
#[derive(Clone, PartialEq, Eq)]
pub struct StillImage {
    /// Encoding of `bytes`.
    pub format: StillFormat,
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
    /// Encoded file contents.
    pub bytes: Vec<u8>,
}

impl std::fmt::Debug for StillImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StillImage")
            .field("format", &self.format)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("encoded_bytes", &self.bytes.len())
            .finish()
    }
}

/// Encodes `snapshot` as a still image.
///
/// `quality` applies to JPEG only. JPEG carries no alpha, so the channel is
/// dropped before encoding.
pub fn encode_still(
    snapshot: &FrameSnapshot,
    format: StillFormat,
    quality: u8,
) -> Result<StillImage, SnapshotError> {
    let (width, height) = (snapshot.width, snapshot.height);
    let rgba = RgbaImage::from_raw(width, height, snapshot.rgba.clone())
        .ok_or(SnapshotError::InvalidDimensions { width, height })?;

    let mut bytes = Vec::new();
    match format {
        StillFormat::Jpeg => {
            let rgb = DynamicImage::ImageRgba8(rgba).to_rgb8();
            JpegEncoder::new_with_quality(&mut bytes, quality.clamp(1, 100)).write_image(
                rgb.as_raw(),
                width,
                height,
                ColorType::Rgb8,
            )?;
        }
        StillFormat::Png => {
            PngEncoder::new(&mut bytes).write_image(rgba.as_raw(), width, height, ColorType::Rgba8)?;
        }
    }

    Ok(StillImage {
        format,
        width,
        height,
        bytes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(width: u32, height: u32) -> FrameSnapshot {
        FrameSnapshot {
            width,
            height,
            rgba: [120u8, 60, 30, 255].repeat((width * height) as usize),
        }
    }

    #[test]
    fn test_jpeg_still() {
        let still = encode_still(&snapshot(16, 8), StillFormat::Jpeg, 80).unwrap();
        assert_eq!((still.width, still.height), (16, 8));
        // SOI marker
        assert_eq!(&still.bytes[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn test_png_still() {
        let still = encode_still(&snapshot(4, 4), StillFormat::Png, 80).unwrap();
        assert_eq!(&still.bytes[1..4], b"PNG");
        assert_eq!(still.format.mime_type(), "image/png");
    }

    #[test]
    fn test_mismatched_buffer_rejected() {
        let mut bad = snapshot(4, 4);
        bad.rgba.truncate(10);
        assert!(matches!(
            encode_still(&bad, StillFormat::Png, 80),
            Err(SnapshotError::InvalidDimensions { .. })
        ));
    }
}
