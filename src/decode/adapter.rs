//! Frame analysis against the decode primitive.

use super::primitive::{BufferHandle, DecodePrimitive, DECODE_OK};
use crate::capture::{SensorWindow, VideoSurface, BYTES_PER_PIXEL};

/// RGBA copy of the sensor window a result was decoded from.
#[derive(Clone)]
pub struct FrameSnapshot {
    /// Window width in pixels.
    pub width: u32,
    /// Window height in pixels.
    pub height: u32,
    /// Row-major RGBA bytes.
    pub rgba: Vec<u8>,
}

impl std::fmt::Debug for FrameSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameSnapshot")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("pixel_bytes", &self.rgba.len())
            .finish()
    }
}

/// A successful decode.
#[derive(Debug, Clone)]
pub struct Analysis {
    /// Decoded payload, lossily converted to UTF-8.
    pub text: String,
    /// The pixels the payload was decoded from.
    pub snapshot: FrameSnapshot,
}

/// Sized decoder buffer for a given source geometry.
#[derive(Debug, Clone, Copy)]
struct Sizing {
    source: (u32, u32),
    window: SensorWindow,
    buffer: BufferHandle,
}

/// Feeds video frames to a [`DecodePrimitive`].
///
/// Sizing is lazy: the first call that sees valid source dimensions only
/// measures the frame and allocates the decoder buffer. Decoding starts on
/// the following call.
pub struct DecodeAdapter<D> {
    decoder: D,
    sizing: Option<Sizing>,
    staging: Vec<u8>,
}

impl<D: DecodePrimitive> DecodeAdapter<D> {
    /// Wraps `decoder`. No buffer is allocated until a frame is seen.
    pub fn new(decoder: D) -> Self {
        Self {
            decoder,
            sizing: None,
            staging: Vec::new(),
        }
    }

    /// Analyzes the frame currently shown on `surface`.
    pub fn analyze(&mut self, surface: &VideoSurface) -> Option<Analysis> {
        let source = (surface.width(), surface.height());
        if source.0 == 0 || source.1 == 0 {
            return None;
        }

        let sizing = match self.sizing {
            Some(sizing) if sizing.source == source => sizing,
            _ => {
                self.allocate(source);
                return None;
            }
        };

        if !surface.read_window(&sizing.window, &mut self.staging) {
            return None;
        }

        let buffer = self.decoder.buffer_mut(sizing.buffer)?;
        for (dst, px) in buffer
            .iter_mut()
            .zip(self.staging.chunks_exact(BYTES_PER_PIXEL))
        {
            *dst = px[0];
        }

        let mut output: Option<Vec<u8>> = None;
        let status = self
            .decoder
            .decode(sizing.buffer, &mut |chunk: &[u8], index: usize, _total: usize| {
                let acc = output.get_or_insert_with(Vec::new);
                if index == 0 {
                    acc.clear();
                }
                acc.extend_from_slice(chunk);
            });

        if status != DECODE_OK {
            tracing::trace!(status, "Decode produced no result");
            return None;
        }

        let text = String::from_utf8_lossy(&output?).into_owned();
        Some(Analysis {
            text,
            snapshot: FrameSnapshot {
                width: sizing.window.width,
                height: sizing.window.height,
                rgba: std::mem::take(&mut self.staging),
            },
        })
    }

    /// Forgets the measured geometry; the next analysis re-measures.
    pub fn reset(&mut self) {
        self.sizing = None;
    }

    /// Returns true once the decoder buffer has been sized.
    pub fn is_sized(&self) -> bool {
        self.sizing.is_some()
    }

    /// The wrapped decode primitive.
    pub fn decoder(&self) -> &D {
        &self.decoder
    }

    fn allocate(&mut self, source: (u32, u32)) {
        let window = SensorWindow::centered(source.0, source.1);
        let buffer = self.decoder.resize(window.width, window.height);
        tracing::debug!(
            width = window.width,
            height = window.height,
            "Sized decoder buffer to sensor window"
        );
        self.sizing = Some(Sizing {
            source,
            window,
            buffer,
        });
    }
}
