//! QR decode primitive backed by `rqrr`.

use super::primitive::{BufferHandle, ChunkSink, DecodePrimitive, DECODE_OK};
use ::rqrr::PreparedImage;

/// No grid in the image decoded successfully.
const NO_CODE: i32 = 1;

/// Decodes QR codes from a greyscale buffer with `rqrr`.
///
/// The first grid that decodes wins and is reported as a single chunk.
#[derive(Debug, Default)]
pub struct RqrrDecoder {
    buffer: Vec<u8>,
    width: usize,
    height: usize,
    generation: usize,
}

impl RqrrDecoder {
    /// Creates a decoder with an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }
}

impl DecodePrimitive for RqrrDecoder {
    fn resize(&mut self, width: u32, height: u32) -> BufferHandle {
        self.width = width as usize;
        self.height = height as usize;
        self.buffer = vec![0; self.width * self.height];
        self.generation += 1;
        BufferHandle(self.generation)
    }

    fn buffer_mut(&mut self, handle: BufferHandle) -> Option<&mut [u8]> {
        (handle.0 == self.generation).then_some(self.buffer.as_mut_slice())
    }

    fn decode(&mut self, handle: BufferHandle, sink: &mut ChunkSink<'_>) -> i32 {
        if handle.0 != self.generation || self.buffer.is_empty() {
            return NO_CODE;
        }

        let width = self.width;
        let buffer = &self.buffer;
        let mut prepared =
            PreparedImage::prepare_from_greyscale(self.width, self.height, |x, y| buffer[y * width + x]);

        let grids = prepared.detect_grids();
        tracing::trace!(grids = grids.len(), "Detected candidate QR grids");

        for grid in grids {
            match grid.decode() {
                Ok((_, content)) => {
                    sink(content.as_bytes(), 0, 1);
                    return DECODE_OK;
                }
                Err(e) => tracing::trace!(error = ?e, "Grid decode failed"),
            }
        }
        NO_CODE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_image_has_no_code() {
        let mut decoder = RqrrDecoder::new();
        let handle = decoder.resize(64, 48);
        decoder.buffer_mut(handle).unwrap().fill(255);

        let mut chunks = 0;
        let status = decoder.decode(handle, &mut |_, _, _| chunks += 1);
        assert_eq!(status, NO_CODE);
        assert_eq!(chunks, 0);
    }

    #[test]
    fn test_stale_handle_rejected() {
        let mut decoder = RqrrDecoder::new();
        let old = decoder.resize(8, 8);
        let current = decoder.resize(16, 16);

        assert!(decoder.buffer_mut(old).is_none());
        assert_eq!(decoder.buffer_mut(current).unwrap().len(), 256);
        assert_eq!(decoder.decode(old, &mut |_, _, _| {}), NO_CODE);
    }
}
