//! Frame type representing a captured image with metadata.

use std::time::Instant;

/// Bytes per pixel of a captured frame (RGBA8).
pub const BYTES_PER_PIXEL: usize = 4;

/// A single captured frame from the camera.
///
/// Pixels are stored as tightly packed RGBA8 rows, the layout a video
/// surface exposes when it is read back.
#[derive(Clone)]
pub struct Frame {
    /// Raw RGBA pixel data.
    pixels: Vec<u8>,
    /// Frame width in pixels.
    width: u32,
    /// Frame height in pixels.
    height: u32,
    /// Capture timestamp.
    timestamp: Instant,
    /// Monotonic sequence number.
    sequence: u64,
}

impl Frame {
    /// Creates a new frame with the given parameters.
    pub fn new(pixels: Vec<u8>, width: u32, height: u32, sequence: u64) -> Self {
        Self {
            pixels,
            width,
            height,
            timestamp: Instant::now(),
            sequence,
        }
    }

    /// Creates a frame where every pixel has the same RGBA value.
    pub fn solid(width: u32, height: u32, rgba: [u8; 4], sequence: u64) -> Self {
        let count = (width as usize) * (height as usize);
        let pixels = rgba.iter().copied().cycle().take(count * BYTES_PER_PIXEL).collect();
        Self::new(pixels, width, height, sequence)
    }

    /// Returns a reference to the raw pixel data.
    #[inline]
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Returns the frame width.
    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Returns the frame height.
    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Returns the capture timestamp.
    #[inline]
    pub fn timestamp(&self) -> Instant {
        self.timestamp
    }

    /// Returns the sequence number.
    #[inline]
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Returns the total number of pixels (width * height).
    #[inline]
    pub fn pixel_count(&self) -> usize {
        (self.width as usize) * (self.height as usize)
    }

    /// Returns one row of RGBA bytes, or `None` past the last row.
    pub fn row(&self, y: u32) -> Option<&[u8]> {
        if y >= self.height {
            return None;
        }
        let stride = self.width as usize * BYTES_PER_PIXEL;
        let start = y as usize * stride;
        self.pixels.get(start..start + stride)
    }

    /// Validates that the pixel buffer size matches dimensions.
    pub fn is_valid(&self) -> bool {
        self.pixels.len() == self.pixel_count() * BYTES_PER_PIXEL
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("sequence", &self.sequence)
            .field("pixel_bytes", &self.pixels.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_creation() {
        let pixels = vec![0u8; 640 * 480 * BYTES_PER_PIXEL];
        let frame = Frame::new(pixels, 640, 480, 1);

        assert_eq!(frame.width(), 640);
        assert_eq!(frame.height(), 480);
        assert_eq!(frame.sequence(), 1);
        assert!(frame.is_valid());
    }

    #[test]
    fn test_frame_invalid_size() {
        // One byte per pixel is not RGBA
        let pixels = vec![0u8; 640 * 480];
        let frame = Frame::new(pixels, 640, 480, 1);

        assert!(!frame.is_valid());
    }

    #[test]
    fn test_solid_frame_rows() {
        let frame = Frame::solid(3, 2, [10, 20, 30, 255], 7);
        assert!(frame.is_valid());
        assert_eq!(frame.row(1), Some(&[10, 20, 30, 255, 10, 20, 30, 255, 10, 20, 30, 255][..]));
        assert!(frame.row(2).is_none());
    }
}
