//! Public scanning session.

use super::activation::{ActivationMachine, ActivationState, Transition};
use crate::capture::{Camera, CameraError, VideoSurface, Visibility, VisibilitySource};
use crate::config::{validate_scan_period, ConfigError, ScanSettings, ScannerConfig};
use crate::decode::DecodePrimitive;
use crate::events::{EventBus, EventKind, ListenerId, ScanEvent};
use crate::scan::{FrameLoop, ScanController, ScanStats};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

/// Errors surfaced by a scanner.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("invalid scanner configuration: {0}")]
    Configuration(#[from] ConfigError),
    #[error("no camera available for activation")]
    CameraUndefined,
    #[error("camera failed: {0}")]
    Camera(#[from] CameraError),
}

struct Shared<C, D> {
    background_scan: bool,
    refresh_interval: Duration,
    settings: Rc<RefCell<ScanSettings>>,
    surface: VideoSurface,
    controller: Rc<RefCell<ScanController<D>>>,
    machine: RefCell<ActivationMachine>,
    camera: RefCell<Option<C>>,
    frame_loop: RefCell<Option<FrameLoop>>,
    /// Last visibility observed, in delivery order.
    visibility: Cell<Visibility>,
    /// Taken by the watcher task on the first start.
    visibility_rx: RefCell<Option<mpsc::UnboundedReceiver<Visibility>>>,
    visibility_task: RefCell<Option<JoinHandle<()>>>,
    /// Serialises transitions, including their asynchronous entry hooks.
    gate: Mutex<()>,
    events: EventBus,
    activations: Cell<u64>,
}

impl<C, D> Drop for Shared<C, D> {
    fn drop(&mut self) {
        if let Some(task) = self.visibility_task.get_mut().take() {
            task.abort();
        }
    }
}

/// A camera scanning session.
///
/// Owns one video surface, the stored camera handle, the scan loop and the
/// activation state machine. Scanning runs only while the session is
/// active: started, and either the page is visible or background scanning
/// is enabled.
///
/// All work is scheduled as local tasks, so `start`, `stop` and visibility
/// handling must run inside a [`tokio::task::LocalSet`].
///
/// Handles are cheap to clone and refer to the same session.
pub struct Scanner<C, D> {
    shared: Rc<Shared<C, D>>,
}

impl<C, D> Clone for Scanner<C, D> {
    fn clone(&self) -> Self {
        Self {
            shared: Rc::clone(&self.shared),
        }
    }
}

impl<C, D> Scanner<C, D>
where
    C: Camera + Clone + 'static,
    D: DecodePrimitive + 'static,
{
    /// Creates a stopped scanner.
    ///
    /// `video` may be an existing surface (for instance one a preview is
    /// already rendering); it must not be bound to a stream yet.
    pub fn new(
        config: ScannerConfig,
        video: Option<VideoSurface>,
        decoder: D,
        visibility: &impl VisibilitySource,
    ) -> Result<Self, ScanError> {
        config.validate()?;

        let surface = match video {
            Some(surface) if surface.has_source() => return Err(ConfigError::SurfaceInUse.into()),
            Some(surface) => {
                surface.set_mirror(config.mirror);
                surface
            }
            None => VideoSurface::new(config.mirror),
        };

        let settings = Rc::new(RefCell::new(config.scan_settings()));
        let events = EventBus::new();
        let controller = ScanController::new(decoder, Rc::clone(&settings), events.clone());

        Ok(Self {
            shared: Rc::new(Shared {
                background_scan: config.background_scan,
                refresh_interval: config.refresh_interval(),
                settings,
                surface,
                controller: Rc::new(RefCell::new(controller)),
                machine: RefCell::new(ActivationMachine::new()),
                camera: RefCell::new(None),
                frame_loop: RefCell::new(None),
                visibility: Cell::new(if visibility.is_visible() {
                    Visibility::Visible
                } else {
                    Visibility::Hidden
                }),
                visibility_rx: RefCell::new(Some(visibility.subscribe())),
                visibility_task: RefCell::new(None),
                gate: Mutex::new(()),
                events,
                activations: Cell::new(0),
            }),
        })
    }

    /// Starts scanning with `camera`, or with the camera of a previous start.
    ///
    /// A scanner that is already started is stopped first. Completes once
    /// the session is active (camera streaming) or inactive (page hidden).
    pub async fn start(&self, camera: Option<C>) -> Result<(), ScanError> {
        self.watch_visibility();
        let _gate = self.shared.gate.lock().await;

        if !self.state().can(Transition::Start) {
            self.stop_locked();
        }
        if let Some(camera) = camera {
            *self.shared.camera.borrow_mut() = Some(camera);
        }

        let engage = self.engaged();
        if self
            .shared
            .machine
            .borrow_mut()
            .apply(Transition::Start, engage)
            .is_none()
        {
            return Ok(());
        }
        self.activate_locked().await
    }

    /// Stops scanning and releases the camera. No-op when already stopped.
    pub async fn stop(&self) {
        let _gate = self.shared.gate.lock().await;
        self.stop_locked();
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ActivationState {
        self.shared.machine.borrow().state()
    }

    /// The surface the camera stream is bound to while active.
    pub fn surface(&self) -> &VideoSurface {
        &self.shared.surface
    }

    /// Whether scanning continues while the page is hidden.
    pub fn background_scan(&self) -> bool {
        self.shared.background_scan
    }

    /// Whether scan results carry a still image.
    pub fn capture_image(&self) -> bool {
        self.shared.settings.borrow().capture_image
    }

    /// Applies to results accepted from now on.
    pub fn set_capture_image(&self, capture_image: bool) {
        self.shared.settings.borrow_mut().capture_image = capture_image;
    }

    /// Decode cadence in display frames.
    pub fn scan_period(&self) -> u32 {
        self.shared.settings.borrow().scan_period
    }

    /// Sets the decode cadence in frames. Takes effect on the next frame.
    pub fn set_scan_period(&self, scan_period: u32) -> Result<(), ConfigError> {
        validate_scan_period(scan_period)?;
        self.shared.settings.borrow_mut().scan_period = scan_period;
        Ok(())
    }

    /// How long a repeated result stays suppressed.
    pub fn refractory_period(&self) -> Duration {
        self.shared.settings.borrow().refractory_period
    }

    /// Applies to results accepted from now on.
    pub fn set_refractory_period(&self, period: Duration) {
        self.shared.settings.borrow_mut().refractory_period = period;
    }

    /// Subscribes to scanner events.
    pub fn on(&self, kind: EventKind, listener: impl Fn(&ScanEvent) + 'static) -> ListenerId {
        self.shared.events.on(kind, listener)
    }

    /// Removes a listener. Returns false if it was not registered.
    pub fn off(&self, id: ListenerId) -> bool {
        self.shared.events.off(id)
    }

    /// Scan loop counters, accumulated across activations.
    pub fn stats(&self) -> ScanStats {
        self.shared.controller.borrow().stats()
    }

    /// Number of times the session entered the active state.
    pub fn activations(&self) -> u64 {
        self.shared.activations.get()
    }

    fn engaged(&self) -> bool {
        self.shared.visibility.get() == Visibility::Visible || self.shared.background_scan
    }

    fn watch_visibility(&self) {
        let Some(mut changes) = self.shared.visibility_rx.borrow_mut().take() else {
            return;
        };
        // Transitions published before the first start only move the baseline
        while let Ok(visibility) = changes.try_recv() {
            self.shared.visibility.set(visibility);
        }
        let session = Rc::downgrade(&self.shared);

        let task = tokio::task::spawn_local(async move {
            while let Some(visibility) = changes.recv().await {
                let Some(shared) = session.upgrade() else {
                    break;
                };
                shared.visibility.set(visibility);
                Scanner { shared }.on_visibility(visibility);
            }
        });
        *self.shared.visibility_task.borrow_mut() = Some(task);
    }

    fn on_visibility(&self, visibility: Visibility) {
        tracing::debug!(?visibility, state = ?self.state(), "Visibility changed");
        match visibility {
            Visibility::Visible => {
                if !self.state().can(Transition::Activate) {
                    return;
                }
                let scanner = self.clone();
                tokio::task::spawn_local(async move {
                    let _gate = scanner.shared.gate.lock().await;
                    if let Err(e) = scanner.activate_locked().await {
                        tracing::warn!(error = %e, "Reactivation after page became visible failed");
                    }
                });
            }
            Visibility::Hidden => {
                if self.shared.background_scan || !self.state().can(Transition::Deactivate) {
                    return;
                }
                match self.shared.gate.try_lock() {
                    Ok(_gate) => self.deactivate_locked(),
                    Err(_) => {
                        // A transition is in flight; deactivate once it settles
                        let scanner = self.clone();
                        tokio::task::spawn_local(async move {
                            let _gate = scanner.shared.gate.lock().await;
                            if !scanner.engaged() {
                                scanner.deactivate_locked();
                            }
                        });
                    }
                }
            }
        }
    }

    async fn activate_locked(&self) -> Result<(), ScanError> {
        let engage = self.engaged();
        let Some(change) = self
            .shared
            .machine
            .borrow_mut()
            .apply(Transition::Activate, engage)
        else {
            return Ok(());
        };

        if change.enters(ActivationState::Active) {
            if let Err(e) = self.enter_active().await {
                self.shared.machine.borrow_mut().force(ActivationState::Stopped);
                tracing::warn!(error = %e, "Activation failed, scanner stopped");
                return Err(e);
            }
        }
        Ok(())
    }

    fn deactivate_locked(&self) {
        let change = self
            .shared
            .machine
            .borrow_mut()
            .apply(Transition::Deactivate, false);
        if change.is_some_and(|c| c.leaves(ActivationState::Active)) {
            self.leave_active();
        }
    }

    fn stop_locked(&self) {
        let change = self.shared.machine.borrow_mut().apply(Transition::Stop, false);
        if change.is_some_and(|c| c.leaves(ActivationState::Active)) {
            self.leave_active();
        }
    }

    async fn enter_active(&self) -> Result<(), ScanError> {
        let camera = self
            .shared
            .camera
            .borrow()
            .clone()
            .ok_or(ScanError::CameraUndefined)?;
        let stream = camera.start().await?;

        self.shared.surface.set_source(Some(stream));
        self.shared.controller.borrow_mut().start();
        let frame_loop = FrameLoop::spawn(
            Rc::clone(&self.shared.controller),
            self.shared.surface.clone(),
            self.shared.refresh_interval,
        );
        *self.shared.frame_loop.borrow_mut() = Some(frame_loop);
        self.shared.activations.set(self.shared.activations.get() + 1);

        tracing::info!(camera = camera.name(), "Scanner active");
        self.shared.events.emit(&ScanEvent::Active);
        Ok(())
    }

    fn leave_active(&self) {
        self.shared.surface.set_source(None);
        self.shared.controller.borrow_mut().stop();
        if let Some(frame_loop) = self.shared.frame_loop.borrow_mut().take() {
            frame_loop.stop();
        }
        let camera = self.shared.camera.borrow().clone();
        if let Some(camera) = camera {
            camera.stop();
        }

        tracing::info!("Scanner inactive");
        self.shared.events.emit(&ScanEvent::Inactive);
    }
}
