//! Metrics collection and registry.

use crate::capture::Camera;
use crate::decode::DecodePrimitive;
use crate::session::{ActivationState, Scanner};
use prometheus::{Encoder, IntCounter, IntGauge, Registry, TextEncoder};
use thiserror::Error;

/// Errors that can occur during metrics operations.
#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),
}

/// A snapshot of scanner state for metrics update.
#[derive(Debug, Clone, Default)]
pub struct MetricsSnapshot {
    /// Whether the scanner currently holds the camera.
    pub is_active: bool,
    /// Display frames observed by the scan loop.
    pub ticks: u64,
    /// Frames handed to the decoder.
    pub decode_attempts: u64,
    /// Decode attempts that produced a result.
    pub decoded: u64,
    /// Results reported to listeners.
    pub accepted: u64,
    /// Results dropped as duplicates.
    pub suppressed: u64,
    /// Times the scanner became active.
    pub activations: u64,
}

/// Prometheus metrics registry for scan monitoring.
pub struct MetricsRegistry {
    registry: Registry,

    active: IntGauge,

    // Scan loop metrics
    ticks_total: IntCounter,
    decode_attempts_total: IntCounter,
    decoded_total: IntCounter,
    accepted_total: IntCounter,
    suppressed_total: IntCounter,

    // Lifecycle metrics
    activations_total: IntCounter,
}

impl MetricsRegistry {
    /// Creates a new metrics registry with all scan metrics registered.
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();

        let active = IntGauge::new(
            "camera_scan_active",
            "Whether the scanner holds the camera (1=active, 0=not active)",
        )?;
        let ticks_total = IntCounter::new(
            "camera_scan_ticks_total",
            "Display frames observed by the scan loop",
        )?;
        let decode_attempts_total = IntCounter::new(
            "camera_scan_decode_attempts_total",
            "Frames handed to the decoder",
        )?;
        let decoded_total = IntCounter::new(
            "camera_scan_decoded_total",
            "Decode attempts that produced a result",
        )?;
        let accepted_total = IntCounter::new(
            "camera_scan_accepted_total",
            "Scan results reported to listeners",
        )?;
        let suppressed_total = IntCounter::new(
            "camera_scan_suppressed_total",
            "Scan results dropped as duplicates within the refractory period",
        )?;
        let activations_total = IntCounter::new(
            "camera_scan_activations_total",
            "Times the scanner entered the active state",
        )?;

        registry.register(Box::new(active.clone()))?;
        registry.register(Box::new(ticks_total.clone()))?;
        registry.register(Box::new(decode_attempts_total.clone()))?;
        registry.register(Box::new(decoded_total.clone()))?;
        registry.register(Box::new(accepted_total.clone()))?;
        registry.register(Box::new(suppressed_total.clone()))?;
        registry.register(Box::new(activations_total.clone()))?;

        Ok(Self {
            registry,
            active,
            ticks_total,
            decode_attempts_total,
            decoded_total,
            accepted_total,
            suppressed_total,
            activations_total,
        })
    }

    /// Updates all metrics from a snapshot of scanner state.
    pub fn update(&self, snapshot: &MetricsSnapshot) {
        self.active.set(i64::from(snapshot.is_active));

        // Counters only move forward by the difference
        advance(&self.ticks_total, snapshot.ticks);
        advance(&self.decode_attempts_total, snapshot.decode_attempts);
        advance(&self.decoded_total, snapshot.decoded);
        advance(&self.accepted_total, snapshot.accepted);
        advance(&self.suppressed_total, snapshot.suppressed);
        advance(&self.activations_total, snapshot.activations);
    }

    /// Returns the underlying Prometheus registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Encodes all metrics in Prometheus text format.
    pub fn encode(&self) -> Result<String, MetricsError> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

fn advance(counter: &IntCounter, total: u64) {
    let current = counter.get();
    if total > current {
        counter.inc_by(total - current);
    }
}

impl MetricsSnapshot {
    /// Creates a snapshot from the current state of a scanner.
    pub fn from_scanner<C, D>(scanner: &Scanner<C, D>) -> Self
    where
        C: Camera + Clone + 'static,
        D: DecodePrimitive + 'static,
    {
        let stats = scanner.stats();
        Self {
            is_active: scanner.state() == ActivationState::Active,
            ticks: stats.ticks,
            decode_attempts: stats.decode_attempts,
            decoded: stats.decoded,
            accepted: stats.accepted,
            suppressed: stats.suppressed,
            activations: scanner.activations(),
        }
    }
}
