//! Camera input, video surface and visibility.
//!
//! The camera is an external provider of frame streams; the scanner binds
//! a stream to a [`VideoSurface`] while active and samples it on every
//! display refresh. Visibility of the hosting page gates activation.

mod camera;
mod frame;
mod surface;
mod visibility;

pub use camera::{Camera, CameraError, FrameStream, MockCamera};
pub use frame::{Frame, BYTES_PER_PIXEL};
pub use surface::{SensorWindow, VideoSurface};
pub use visibility::{PageVisibility, Visibility, VisibilitySource};
