//! Prometheus metrics exporter for scan monitoring.
//!
//! # Metrics Exposed
//!
//! - `camera_scan_active` - Whether the scanner holds the camera (1=active)
//! - `camera_scan_ticks_total` - Display frames observed by the scan loop
//! - `camera_scan_decode_attempts_total` - Frames handed to the decoder
//! - `camera_scan_decoded_total` - Decode attempts that produced a result
//! - `camera_scan_accepted_total` - Results reported to listeners
//! - `camera_scan_suppressed_total` - Duplicates dropped within the refractory period
//! - `camera_scan_activations_total` - Times the scanner became active
//!
//! # Example
//!
//! ```no_run
//! use camera_scan::metrics::{MetricsRegistry, MetricsSnapshot};
//!
//! let registry = MetricsRegistry::new().expect("Failed to create registry");
//!
//! let snapshot = MetricsSnapshot {
//!     is_active: true,
//!     ticks: 600,
//!     decode_attempts: 200,
//!     decoded: 12,
//!     accepted: 2,
//!     suppressed: 10,
//!     activations: 1,
//! };
//!
//! registry.update(&snapshot);
//! ```

mod collector;
#[cfg(feature = "metrics")]
mod server;

pub use collector::{MetricsError, MetricsRegistry, MetricsSnapshot};
#[cfg(feature = "metrics")]
pub use server::{MetricsServer, MetricsServerConfig, MetricsState};
