//! Video surface bound to a camera stream.
//!
//! The surface plays the role of a video element: it has a settable stream
//! source, reports the current frame's dimensions (zero until a frame has
//! arrived) and lets callers read back a rectangular pixel window.

use super::camera::FrameStream;
use super::frame::{Frame, BYTES_PER_PIXEL};
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

/// Rectangular pixel region sampled from a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorWindow {
    /// Left edge in frame pixels.
    pub x: u32,
    /// Top edge in frame pixels.
    pub y: u32,
    /// Window width in pixels.
    pub width: u32,
    /// Window height in pixels.
    pub height: u32,
}

impl SensorWindow {
    /// Window centred in a `frame_width` x `frame_height` frame.
    ///
    /// The window spans the whole frame, so the centring offsets are zero.
    pub fn centered(frame_width: u32, frame_height: u32) -> Self {
        let width = frame_width;
        let height = frame_height;
        Self {
            x: (frame_width - width) / 2,
            y: (frame_height - height) / 2,
            width,
            height,
        }
    }

    /// Number of pixels covered by the window.
    pub fn pixel_count(&self) -> usize {
        (self.width as usize) * (self.height as usize)
    }

    fn fits(&self, frame: &Frame) -> bool {
        self.x + self.width <= frame.width() && self.y + self.height <= frame.height()
    }
}

#[derive(Debug)]
struct SurfaceState {
    source: Option<FrameStream>,
    mirror: bool,
}

/// Shared handle to a video surface.
#[derive(Debug, Clone)]
pub struct VideoSurface {
    state: Rc<RefCell<SurfaceState>>,
}

impl VideoSurface {
    /// Creates an unbound surface.
    pub fn new(mirror: bool) -> Self {
        Self {
            state: Rc::new(RefCell::new(SurfaceState {
                source: None,
                mirror,
            })),
        }
    }

    /// Binds (or clears, with `None`) the stream the surface displays.
    pub fn set_source(&self, source: Option<FrameStream>) {
        self.state.borrow_mut().source = source;
    }

    /// Returns true if a stream is bound.
    pub fn has_source(&self) -> bool {
        self.state.borrow().source.is_some()
    }

    /// Whether the preview is presented mirrored.
    pub fn mirror(&self) -> bool {
        self.state.borrow().mirror
    }

    /// Sets whether the preview is mirrored.
    pub fn set_mirror(&self, mirror: bool) {
        self.state.borrow_mut().mirror = mirror;
    }

    /// The frame currently shown, if any.
    pub fn current_frame(&self) -> Option<Arc<Frame>> {
        let state = self.state.borrow();
        let source = state.source.as_ref()?;
        let frame = source.borrow().clone();
        frame
    }

    /// Current frame width, 0 before the stream has produced a frame.
    pub fn width(&self) -> u32 {
        self.current_frame().map_or(0, |f| f.width())
    }

    /// Current frame height, 0 before the stream has produced a frame.
    pub fn height(&self) -> u32 {
        self.current_frame().map_or(0, |f| f.height())
    }

    /// Copies the RGBA pixels of `window` from the current frame into `out`.
    ///
    /// Returns false (leaving `out` untouched) when there is no frame or the
    /// window does not fit inside it.
    pub fn read_window(&self, window: &SensorWindow, out: &mut Vec<u8>) -> bool {
        let Some(frame) = self.current_frame() else {
            return false;
        };
        if !frame.is_valid() || !window.fits(&frame) {
            return false;
        }

        let start = window.x as usize * BYTES_PER_PIXEL;
        let end = start + window.width as usize * BYTES_PER_PIXEL;
        out.clear();
        out.reserve(window.pixel_count() * BYTES_PER_PIXEL);
        for y in window.y..window.y + window.height {
            if let Some(row) = frame.row(y) {
                out.extend_from_slice(&row[start..end]);
            }
        }
        true
    }
}

impl Default for VideoSurface {
    fn default() -> Self {
        Self::new(true)
    }
}
