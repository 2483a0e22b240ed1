//! Camera abstraction for stream acquisition.
//!
//! A camera hands out a [`FrameStream`] when started: a watch channel that
//! always holds the most recent frame. The scanner never pulls frames from
//! the camera directly; it binds the stream to a video surface and samples
//! whatever frame is current on each display refresh.

use super::Frame;
use std::cell::Cell;
use std::future::Future;
use std::rc::Rc;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;

/// Stream of frames produced by a started camera. `None` until the first
/// frame arrives (no metadata yet).
pub type FrameStream = watch::Receiver<Option<Arc<Frame>>>;

/// Errors that can occur during camera operations.
#[derive(Debug, Error)]
pub enum CameraError {
    #[error("camera device not found: {0}")]
    DeviceNotFound(String),
    #[error("failed to open camera: {0}")]
    OpenFailed(String),
}

/// Trait for camera providers.
///
/// Implementations are cheap handles: the scanner clones and stores the
/// handle given to `start` so later activations can reuse it.
pub trait Camera {
    /// Acquires the device and returns its frame stream.
    fn start(&self) -> impl Future<Output = Result<FrameStream, CameraError>>;

    /// Releases the device.
    fn stop(&self);

    /// Human readable name, used in logs.
    fn name(&self) -> &str;
}

#[derive(Debug)]
struct MockState {
    name: String,
    sender: watch::Sender<Option<Arc<Frame>>>,
    streaming: Cell<bool>,
    fail_start: Cell<bool>,
    starts: Cell<u32>,
    stops: Cell<u32>,
    sequence: Cell<u64>,
}

/// Mock camera for testing that streams frames pushed by the caller.
///
/// Clones share the same device, so a test can keep one handle to push
/// frames and inspect start/stop counts while the scanner holds another.
#[derive(Debug, Clone)]
pub struct MockCamera {
    state: Rc<MockState>,
}

impl MockCamera {
    /// Creates an idle camera called `name`.
    pub fn new(name: impl Into<String>) -> Self {
        let (sender, _) = watch::channel(None);
        Self {
            state: Rc::new(MockState {
                name: name.into(),
                sender,
                streaming: Cell::new(false),
                fail_start: Cell::new(false),
                starts: Cell::new(0),
                stops: Cell::new(0),
                sequence: Cell::new(0),
            }),
        }
    }

    /// Makes subsequent `start` calls fail with [`CameraError::OpenFailed`].
    pub fn set_fail_start(&self, fail: bool) {
        self.state.fail_start.set(fail);
    }

    /// Publishes a frame to every bound stream.
    pub fn push_frame(&self, frame: Frame) {
        self.state.sender.send_replace(Some(Arc::new(frame)));
    }

    /// Publishes a solid-colour test frame with the next sequence number.
    pub fn push_test_pattern(&self, width: u32, height: u32, rgba: [u8; 4]) {
        let sequence = self.state.sequence.get() + 1;
        self.state.sequence.set(sequence);
        self.push_frame(Frame::solid(width, height, rgba, sequence));
    }

    /// Returns true while the camera is started.
    pub fn is_streaming(&self) -> bool {
        self.state.streaming.get()
    }

    /// Number of successful `start` calls.
    pub fn start_count(&self) -> u32 {
        self.state.starts.get()
    }

    /// Number of `stop` calls.
    pub fn stop_count(&self) -> u32 {
        self.state.stops.get()
    }
}

impl Default for MockCamera {
    fn default() -> Self {
        Self::new("mock")
    }
}

impl Camera for MockCamera {
    async fn start(&self) -> Result<FrameStream, CameraError> {
        if self.state.fail_start.get() {
            return Err(CameraError::OpenFailed(self.state.name.clone()));
        }
        self.state.starts.set(self.state.starts.get() + 1);
        self.state.streaming.set(true);
        tracing::info!(camera = %self.state.name, "MockCamera started");
        Ok(self.state.sender.subscribe())
    }

    fn stop(&self) {
        self.state.stops.set(self.state.stops.get() + 1);
        self.state.streaming.set(false);
        self.state.sender.send_replace(None);
        tracing::info!(camera = %self.state.name, "MockCamera stopped");
    }

    fn name(&self) -> &str {
        &self.state.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_camera_lifecycle() {
        let camera = MockCamera::new("front");
        assert!(!camera.is_streaming());

        let stream = camera.start().await.unwrap();
        assert!(camera.is_streaming());
        assert!(stream.borrow().is_none());

        camera.push_test_pattern(4, 4, [1, 2, 3, 255]);
        let frame = stream.borrow().clone().unwrap();
        assert!(frame.is_valid());
        assert_eq!(frame.sequence(), 1);

        camera.stop();
        assert!(!camera.is_streaming());
        assert!(stream.borrow().is_none());
        assert_eq!(camera.start_count(), 1);
        assert_eq!(camera.stop_count(), 1);
    }

    #[tokio::test]
    async fn test_start_failure() {
        let camera = MockCamera::default();
        camera.set_fail_start(true);
        assert!(matches!(
            camera.start().await,
            Err(CameraError::OpenFailed(_))
        ));
        assert_eq!(camera.start_count(), 0);
    }
}
