//! Frame-rate throttling of decode attempts.

/// Counts display frames and selects every Nth for decoding.
///
/// Decoding is far more expensive than a display refresh, so only one
/// frame in `scan_period` is analyzed. A stopped sampler ignores ticks.
#[derive(Debug, Default)]
pub struct FrameSampler {
    running: bool,
    frame_count: u32,
}

impl FrameSampler {
    /// A stopped sampler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Arms the sampler with a fresh frame count.
    pub fn start(&mut self) {
        self.running = true;
        self.frame_count = 0;
    }

    /// Disarms the sampler. Later ticks do nothing.
    pub fn stop(&mut self) {
        self.running = false;
    }

    /// Whether ticks are being counted.
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Records one display frame. Returns true when this frame should be
    /// decoded.
    pub fn tick(&mut self, scan_period: u32) -> bool {
        if !self.running {
            return false;
        }

        self.frame_count += 1;
        if self.frame_count < scan_period {
            return false;
        }

        self.frame_count = 0;
        true
    }
}
