//! Scanner event subscription.
//!
//! Listeners register per [`EventKind`] and are invoked in registration
//! order. Scan results are delivered on a later scheduling turn than the
//! frame tick that decoded them; lifecycle events are delivered as soon as
//! the transition's setup or teardown has finished.

use crate::scan::StillImage;
use chrono::{DateTime, Utc};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

/// A reported scan.
#[derive(Debug, Clone)]
pub struct ScanResult {
    /// Decoded payload.
    pub text: String,
    /// Still of the frame, when image capture is enabled.
    pub image: Option<StillImage>,
    /// Wall-clock time the result was accepted.
    pub scanned_at: DateTime<Utc>,
}

/// Events published by a scanner.
#[derive(Debug, Clone)]
pub enum ScanEvent {
    /// A result passed duplicate suppression.
    Scan(ScanResult),
    /// The camera is streaming and the scan loop is running.
    Active,
    /// The camera was released.
    Inactive,
}

impl ScanEvent {
    /// The kind listeners subscribe to for this event.
    pub fn kind(&self) -> EventKind {
        match self {
            ScanEvent::Scan(_) => EventKind::Scan,
            ScanEvent::Active => EventKind::Active,
            ScanEvent::Inactive => EventKind::Inactive,
        }
    }
}

/// Event names listeners subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// [`ScanEvent::Scan`]
    Scan,
    /// [`ScanEvent::Active`]
    Active,
    /// [`ScanEvent::Inactive`]
    Inactive,
}

/// Token returned by [`EventBus::on`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener = Rc<dyn Fn(&ScanEvent)>;

/// Ordered listener lists keyed by event kind.
#[derive(Clone, Default)]
pub struct EventBus {
    listeners: Rc<RefCell<HashMap<EventKind, Vec<(ListenerId, Listener)>>>>,
    next_id: Rc<Cell<u64>>,
}

impl EventBus {
    /// Creates a bus with no listeners.
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes `listener` to events of `kind`.
    pub fn on(&self, kind: EventKind, listener: impl Fn(&ScanEvent) + 'static) -> ListenerId {
        let id = ListenerId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.listeners
            .borrow_mut()
            .entry(kind)
            .or_default()
            .push((id, Rc::new(listener)));
        id
    }

    /// Removes a listener. Returns false if it was not registered.
    pub fn off(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.borrow_mut();
        for list in listeners.values_mut() {
            if let Some(pos) = list.iter().position(|(lid, _)| *lid == id) {
                list.remove(pos);
                return true;
            }
        }
        false
    }

    /// Invokes every listener of the event's kind, in order.
    pub fn emit(&self, event: &ScanEvent) {
        // Snapshot so listeners may subscribe or unsubscribe while running
        let targets: Vec<Listener> = self
            .listeners
            .borrow()
            .get(&event.kind())
            .map(|list| list.iter().map(|(_, l)| Rc::clone(l)).collect())
            .unwrap_or_default();

        for listener in targets {
            listener(event);
        }
    }

    /// Emits `event` from a local task on a later scheduling turn.
    pub fn emit_deferred(&self, event: ScanEvent) {
        let bus = self.clone();
        tokio::task::spawn_local(async move {
            bus.emit(&event);
        });
    }

    /// Number of listeners registered for `kind`.
    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.listeners.borrow().get(&kind).map_or(0, Vec::len)
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("scan", &self.listener_count(EventKind::Scan))
            .field("active", &self.listener_count(EventKind::Active))
            .field("inactive", &self.listener_count(EventKind::Inactive))
            .finish()
    }
}
