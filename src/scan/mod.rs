//! The scan loop.
//!
//! A [`FrameLoop`] fires once per display refresh. The [`ScanController`]
//! forwards every `scan_period`-th frame to the decode adapter, filters
//! repeated results through the [`DuplicateSuppressor`] and hands accepted
//! ones to listeners on a later turn.

mod controller;
mod sampler;
mod snapshot;
mod suppressor;

pub use controller::{FrameLoop, ScanController, ScanStats};
pub use sampler::FrameSampler;
pub use snapshot::{encode_still, SnapshotError, StillFormat, StillImage};
pub use suppressor::DuplicateSuppressor;
