//! Contract of the external decode routine.

/// Opaque reference to a decoder-owned pixel buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferHandle(pub usize);

/// Status returned by a successful decode. Anything else means no result.
pub const DECODE_OK: i32 = 0;

/// Receives decoded output as `(bytes, chunk_index, total_chunks)`.
pub type ChunkSink<'a> = dyn FnMut(&[u8], usize, usize) + 'a;

/// Opaque barcode/QR decode routine.
///
/// The routine owns a single-channel (one byte per pixel) buffer. The
/// caller sizes it with [`resize`](Self::resize), fills it through
/// [`buffer_mut`](Self::buffer_mut) and runs [`decode`](Self::decode), which
/// reports the payload through the sink in one or more chunks.
pub trait DecodePrimitive {
    /// (Re)allocates the buffer for a `width` x `height` image.
    fn resize(&mut self, width: u32, height: u32) -> BufferHandle;

    /// Writable view of the buffer, `None` for a stale handle.
    fn buffer_mut(&mut self, handle: BufferHandle) -> Option<&mut [u8]>;

    /// Decodes the buffer. Returns [`DECODE_OK`] on success.
    fn decode(&mut self, handle: BufferHandle, sink: &mut ChunkSink<'_>) -> i32;
}
