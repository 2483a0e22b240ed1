//! Decoding of video frames.
//!
//! The decoding algorithm itself is external: anything implementing
//! [`DecodePrimitive`] can be plugged in. [`DecodeAdapter`] owns the
//! buffer-management contract around it.

mod adapter;
mod mock;
mod primitive;
#[cfg(feature = "rqrr")]
mod rqrr;

pub use adapter::{Analysis, DecodeAdapter, FrameSnapshot};
pub use mock::MockDecoder;
pub use primitive::{BufferHandle, ChunkSink, DecodePrimitive, DECODE_OK};
#[cfg(feature = "rqrr")]
pub use self::rqrr::RqrrDecoder;
