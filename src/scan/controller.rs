//! Scan loop: sampling, decoding, suppression and emission.

use super::sampler::FrameSampler;
use super::snapshot::encode_still;
use super::suppressor::DuplicateSuppressor;
use crate::capture::VideoSurface;
use crate::config::ScanSettings;
use crate::decode::{DecodeAdapter, DecodePrimitive};
use crate::events::{EventBus, ScanEvent, ScanResult};
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Counters maintained by the scan loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanStats {
    /// Display frames observed while running.
    pub ticks: u64,
    /// Frames handed to the decode adapter.
    pub decode_attempts: u64,
    /// Attempts that produced a result.
    pub decoded: u64,
    /// Results reported to listeners.
    pub accepted: u64,
    /// Results dropped as duplicates.
    pub suppressed: u64,
}

/// Composes frame sampling, decoding and duplicate suppression.
///
/// Settings are shared with the owning scanner and re-read on every tick.
pub struct ScanController<D> {
    sampler: FrameSampler,
    adapter: DecodeAdapter<D>,
    suppressor: DuplicateSuppressor,
    settings: Rc<RefCell<ScanSettings>>,
    events: EventBus,
    stats: ScanStats,
}

impl<D: DecodePrimitive> ScanController<D> {
    /// Creates a stopped controller sharing `settings` with its owner.
    pub fn new(decoder: D, settings: Rc<RefCell<ScanSettings>>, events: EventBus) -> Self {
        Self {
            sampler: FrameSampler::new(),
            adapter: DecodeAdapter::new(decoder),
            suppressor: DuplicateSuppressor::new(),
            settings,
            events,
            stats: ScanStats::default(),
        }
    }

    /// Starts counting frames.
    pub fn start(&mut self) {
        self.sampler.start();
    }

    /// Stops sampling and forgets the measured source geometry.
    pub fn stop(&mut self) {
        self.sampler.stop();
        self.adapter.reset();
    }

    /// Whether the sampler is running.
    pub fn is_running(&self) -> bool {
        self.sampler.is_running()
    }

    /// Counters since construction.
    pub fn stats(&self) -> ScanStats {
        self.stats
    }

    /// Handles one display frame. Returns true if a result was accepted.
    ///
    /// The still is encoded during the tick; the event itself is emitted on
    /// a later turn, so this must run within a [`tokio::task::LocalSet`].
    pub fn tick(&mut self, surface: &VideoSurface) -> bool {
        if !self.sampler.is_running() {
            return false;
        }
        let settings = *self.settings.borrow();
        self.stats.ticks += 1;

        if !self.sampler.tick(settings.scan_period) {
            return false;
        }
        self.stats.decode_attempts += 1;

        let Some(analysis) = self.adapter.analyze(surface) else {
            return false;
        };
        self.stats.decoded += 1;

        if !self
            .suppressor
            .accept(Some(&analysis.text), settings.refractory_period)
        {
            self.stats.suppressed += 1;
            tracing::trace!(text = %analysis.text, "Suppressed duplicate scan");
            return false;
        }
        self.stats.accepted += 1;
        tracing::info!(text = %analysis.text, "Scan accepted");

        let image = if settings.capture_image {
            match encode_still(&analysis.snapshot, settings.still_format, settings.still_quality) {
                Ok(image) => Some(image),
                Err(e) => {
                    tracing::warn!(error = %e, "Still capture failed, reporting scan without image");
                    None
                }
            }
        } else {
            None
        };

        self.events.emit_deferred(ScanEvent::Scan(ScanResult {
            text: analysis.text,
            image,
            scanned_at: chrono::Utc::now(),
        }));
        true
    }
}

/// Display-refresh loop driving a [`ScanController`].
///
/// Each refresh runs one synchronous controller tick, so ticks never
/// overlap. The loop ends when cancelled or when it finds the controller
/// stopped.
pub struct FrameLoop {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl FrameLoop {
    /// Spawns the loop on the current [`tokio::task::LocalSet`].
    pub fn spawn<D: DecodePrimitive + 'static>(
        controller: Rc<RefCell<ScanController<D>>>,
        surface: VideoSurface,
        refresh: Duration,
    ) -> Self {
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        let handle = tokio::task::spawn_local(async move {
            let mut refresh = tokio::time::interval(refresh);
            refresh.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                // Cancellation wins over a tick that is already due
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    _ = refresh.tick() => {
                        let mut controller = controller.borrow_mut();
                        if !controller.is_running() {
                            break;
                        }
                        controller.tick(&surface);
                    }
                }
            }
            tracing::trace!("Frame loop exited");
        });

        Self { cancel, handle }
    }

    /// Cancels the loop. A tick already scheduled does nothing.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    /// True once the loop task has exited.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for FrameLoop {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{Camera, MockCamera};
    use crate::decode::MockDecoder;
    use crate::events::EventKind;
    use tokio::task::LocalSet;

    async fn settle() {
        for _ in 0..4 {
            tokio::task::yield_now().await;
        }
    }

    struct Harness {
        controller: ScanController<MockDecoder>,
        decoder: MockDecoder,
        settings: Rc<RefCell<ScanSettings>>,
        surface: VideoSurface,
        scans: Rc<RefCell<Vec<ScanResult>>>,
        _camera: MockCamera,
    }

    async fn harness(settings: ScanSettings) -> Harness {
        let decoder = MockDecoder::new();
        let settings = Rc::new(RefCell::new(settings));
        let events = EventBus::new();
        let scans = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&scans);
        events.on(EventKind::Scan, move |event| {
            if let ScanEvent::Scan(result) = event {
                sink.borrow_mut().push(result.clone());
            }
        });

        let camera = MockCamera::default();
        let surface = VideoSurface::default();
        surface.set_source(Some(camera.start().await.unwrap()));
        camera.push_test_pattern(8, 8, [90, 90, 90, 255]);

        let mut controller = ScanController::new(decoder.clone(), Rc::clone(&settings), events);
        controller.start();

        Harness {
            controller,
            decoder,
            settings,
            surface,
            scans,
            _camera: camera,
        }
    }

    impl Harness {
        fn ticks(&mut self, n: usize) {
            for _ in 0..n {
                self.controller.tick(&self.surface);
            }
        }

        fn texts(&self) -> Vec<String> {
            self.scans.borrow().iter().map(|s| s.text.clone()).collect()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_refractory_scenario() {
        LocalSet::new()
            .run_until(async {
                let mut h = harness(ScanSettings {
                    scan_period: 3,
                    refractory_period: Duration::from_millis(100),
                    ..Default::default()
                })
                .await;

                // First period only sizes the decoder buffer
                h.ticks(3);
                assert_eq!(h.decoder.resize_calls(), 1);
                assert_eq!(h.decoder.decode_calls(), 0);

                h.decoder.push_result(None);
                h.decoder.push_result(None);
                h.decoder.push_result(Some("X"));
                h.decoder.set_fallback(Some("X".to_string()));

                // Three periods, X on the third decode
                h.ticks(9);
                assert_eq!(h.decoder.decode_calls(), 3);
                // Emission is deferred past the tick
                assert!(h.texts().is_empty());
                settle().await;
                assert_eq!(h.texts(), vec!["X"]);

                // Within the refractory window
                h.ticks(3);
                settle().await;
                assert_eq!(h.texts(), vec!["X"]);

                tokio::time::advance(Duration::from_millis(100)).await;
                settle().await;
                h.ticks(3);
                settle().await;
                assert_eq!(h.texts(), vec!["X", "X"]);

                let stats = h.controller.stats();
                assert_eq!(stats.ticks, 18);
                assert_eq!(stats.decode_attempts, 6);
                assert_eq!(stats.accepted, 2);
                assert_eq!(stats.suppressed, 1);
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_capture_image_attaches_still() {
        LocalSet::new()
            .run_until(async {
                let mut h = harness(ScanSettings {
                    capture_image: true,
                    ..Default::default()
                })
                .await;
                h.decoder.set_fallback(Some("payload".to_string()));

                h.ticks(2);
                settle().await;

                let scans = h.scans.borrow();
                assert_eq!(scans.len(), 1);
                let image = scans[0].image.as_ref().unwrap();
                assert_eq!((image.width, image.height), (8, 8));
                assert!(!image.bytes.is_empty());
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_settings_change_applies_next_tick() {
        LocalSet::new()
            .run_until(async {
                let mut h = harness(ScanSettings::default()).await;
                h.ticks(1);

                h.settings.borrow_mut().scan_period = 4;
                h.ticks(3);
                assert_eq!(h.decoder.decode_calls(), 0);
                h.ticks(1);
                assert_eq!(h.decoder.decode_calls(), 1);
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_stopped_controller_ignores_ticks() {
        LocalSet::new()
            .run_until(async {
                let mut h = harness(ScanSettings::default()).await;
                h.controller.stop();
                h.ticks(5);
                assert_eq!(h.controller.stats().ticks, 0);
                assert_eq!(h.decoder.resize_calls(), 0);
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_frame_loop_drives_ticks_until_stopped() {
        LocalSet::new()
            .run_until(async {
                let h = harness(ScanSettings::default()).await;
                let controller = Rc::new(RefCell::new(h.controller));
                let frame_loop = FrameLoop::spawn(
                    Rc::clone(&controller),
                    h.surface.clone(),
                    Duration::from_millis(16),
                );

                tokio::time::sleep(Duration::from_millis(100)).await;
                let ticks = controller.borrow().stats().ticks;
                assert!(ticks >= 5, "expected several ticks, got {ticks}");

                frame_loop.stop();
                settle().await;
                assert!(frame_loop.is_finished());

                tokio::time::sleep(Duration::from_millis(100)).await;
                assert_eq!(controller.borrow().stats().ticks, ticks);
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_does_not_double_tick() {
        LocalSet::new()
            .run_until(async {
                let h = harness(ScanSettings::default()).await;
                let controller = Rc::new(RefCell::new(h.controller));
                let refresh = Duration::from_millis(16);
                let old = FrameLoop::spawn(Rc::clone(&controller), h.surface.clone(), refresh);

                tokio::time::sleep(Duration::from_millis(100)).await;
                // Lands on a refresh boundary, so the old loop has a tick due
                tokio::time::sleep(Duration::from_millis(12)).await;

                let before = controller.borrow().stats().ticks;
                old.stop();
                controller.borrow_mut().stop();
                controller.borrow_mut().start();
                let _new = FrameLoop::spawn(Rc::clone(&controller), h.surface.clone(), refresh);
                settle().await;

                assert!(old.is_finished());
                // Only the new loop's immediate first tick
                assert_eq!(controller.borrow().stats().ticks, before + 1);
            })
            .await;
    }
}
