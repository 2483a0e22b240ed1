//! Camera Scan Library
//!
//! Drives a camera feed through a barcode/QR decoding loop and reports
//! results as events. Scanning pauses while the hosting page is hidden
//! unless background scanning is enabled.
//!
//! # Architecture
//!
//! ```text
//! camera → video surface → frame loop → decode adapter → suppressor → events
//!                               ↑
//!              activation state machine (start/stop, visibility)
//! ```
//!
//! The decoding algorithm, the camera and the visibility signal are
//! external collaborators behind the [`DecodePrimitive`], [`Camera`] and
//! [`VisibilitySource`] traits.
//!
//! # Concurrency
//!
//! Everything runs on one thread as local tasks: frame ticks, refractory
//! timers and deferred event emission interleave but never run in
//! parallel. Drive the scanner from a [`tokio::task::LocalSet`].
//!
//! # Example
//!
//! ```no_run
//! use camera_scan::{
//!     capture::{MockCamera, PageVisibility},
//!     decode::MockDecoder,
//!     events::{EventKind, ScanEvent},
//!     ScannerConfig, Scanner,
//! };
//!
//! # async fn run() -> Result<(), camera_scan::ScanError> {
//! let visibility = PageVisibility::default();
//! let scanner = Scanner::new(
//!     ScannerConfig::default(),
//!     None,
//!     MockDecoder::always("hello"),
//!     &visibility,
//! )?;
//!
//! scanner.on(EventKind::Scan, |event| {
//!     if let ScanEvent::Scan(result) = event {
//!         println!("scanned: {}", result.text);
//!     }
//! });
//!
//! scanner.start(Some(MockCamera::new("front"))).await?;
//! // ... page hidden: scanning pauses and the camera is released
//! scanner.stop().await;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod capture;
pub mod config;
pub mod decode;
pub mod events;
pub mod metrics;
pub mod scan;
pub mod session;

// Re-export commonly used types at crate root
pub use capture::{Camera, Frame, MockCamera, PageVisibility, VideoSurface, Visibility, VisibilitySource};
pub use config::{ScanSettings, ScannerConfig};
pub use decode::{DecodeAdapter, DecodePrimitive, MockDecoder};
pub use events::{EventKind, ScanEvent, ScanResult};
pub use scan::{ScanController, StillFormat, StillImage};
pub use session::{ActivationState, ScanError, Scanner};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
