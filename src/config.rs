//! Scanner configuration.
//!
//! Values are validated on construction and on every setter, so a running
//! scanner never sees a zero scan period or an out-of-range quality.

use crate::scan::StillFormat;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Configuration supplied when constructing a scanner.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    /// Keep scanning while the page is hidden.
    pub background_scan: bool,
    /// Attach a still image to every scan result.
    pub capture_image: bool,
    /// Attempt a decode every Nth display frame.
    pub scan_period: u32,
    /// Minimum time before the same result is reported again, in milliseconds.
    pub refractory_period_ms: u64,
    /// Present the preview mirrored.
    pub mirror: bool,
    /// Display refresh rate driving the frame loop.
    pub refresh_rate_hz: u32,
    /// Encoding of captured still images.
    pub still_format: StillFormat,
    /// JPEG quality of captured still images (1-100).
    pub still_quality: u8,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            background_scan: false,
            capture_image: false,
            scan_period: 1,
            refractory_period_ms: 5000,
            mirror: true,
            refresh_rate_hz: 60,
            still_format: StillFormat::Jpeg,
            still_quality: 80,
        }
    }
}

impl ScannerConfig {
    /// Validates the configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_scan_period(self.scan_period)?;
        if self.refresh_rate_hz == 0 || self.refresh_rate_hz > 240 {
            return Err(ConfigError::InvalidRefreshRate);
        }
        if self.still_quality == 0 || self.still_quality > 100 {
            return Err(ConfigError::InvalidQuality);
        }
        Ok(())
    }

    /// Refractory period as a [`Duration`].
    pub fn refractory_period(&self) -> Duration {
        Duration::from_millis(self.refractory_period_ms)
    }

    /// Interval between display refresh callbacks.
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(1) / self.refresh_rate_hz.max(1)
    }

    /// The mutable subset consulted on every frame tick.
    pub fn scan_settings(&self) -> ScanSettings {
        ScanSettings {
            capture_image: self.capture_image,
            scan_period: self.scan_period,
            refractory_period: self.refractory_period(),
            still_format: self.still_format,
            still_quality: self.still_quality,
        }
    }
}

pub(crate) fn validate_scan_period(scan_period: u32) -> Result<(), ConfigError> {
    if scan_period == 0 {
        return Err(ConfigError::InvalidScanPeriod);
    }
    Ok(())
}

/// Settings the scan loop re-reads on every tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanSettings {
    /// Attach a still image to each result.
    pub capture_image: bool,
    /// Decode every Nth display frame.
    pub scan_period: u32,
    /// Suppression window for repeated results.
    pub refractory_period: Duration,
    /// Encoding of attached stills.
    pub still_format: StillFormat,
    /// JPEG quality, 1 to 100.
    pub still_quality: u8,
}

impl Default for ScanSettings {
    fn default() -> Self {
        ScannerConfig::default().scan_settings()
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    #[error("scan period must be at least one frame")]
    InvalidScanPeriod,
    #[error("invalid refresh rate (must be 1-240 Hz)")]
    InvalidRefreshRate,
    #[error("invalid still image quality (must be 1-100)")]
    InvalidQuality,
    #[error("video surface is already bound to a stream")]
    SurfaceInUse,
    #[error("failed to read config file: {0}")]
    FileReadError(String),
    #[error("failed to parse config file: {0}")]
    ParseError(String),
}

/// Full configuration file format.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FileConfig {
    #[serde(default)]
    pub scanner: ScannerConfig,
    #[serde(default)]
    pub demo: DemoConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Synthetic feed used by the demonstration binary.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DemoConfig {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Frames per second produced by the mock camera.
    pub fps: u32,
    /// Payload the mock decoder reports.
    pub payload: String,
    /// Run time in seconds (0 runs until interrupted).
    pub duration_secs: u64,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            fps: 30,
            payload: "https://example.com/demo".to_string(),
            duration_secs: 10,
        }
    }
}

/// Metrics output configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Metrics server port (0 to disable).
    pub port: u16,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { port: 9090 }
    }
}

impl FileConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::FileReadError(e.to_string()))?;
        Self::from_toml(&content)
    }

    /// Parses and validates configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: FileConfig =
            toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.scanner.validate()?;
        Ok(config)
    }
}
