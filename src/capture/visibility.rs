//! Page visibility signalling.

use std::cell::RefCell;
use std::rc::Rc;
use tokio::sync::mpsc;

/// Visibility of the surface hosting the scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    /// The page is shown.
    Visible,
    /// The page is hidden or minimised.
    Hidden,
}

/// Source of visibility transitions.
pub trait VisibilitySource {
    /// Synchronous query of the current state.
    fn is_visible(&self) -> bool;

    /// Per-subscriber queue receiving every transition in order.
    fn subscribe(&self) -> mpsc::UnboundedReceiver<Visibility>;
}

#[derive(Debug)]
struct PageState {
    current: Visibility,
    subscribers: Vec<mpsc::UnboundedSender<Visibility>>,
}

/// Host-driven visibility source.
///
/// The host calls [`PageVisibility::set`] whenever its window is shown or
/// hidden. Each subscriber gets its own queue, so a hide followed at once by
/// a show reaches every scanner as two transitions.
#[derive(Debug, Clone)]
pub struct PageVisibility {
    state: Rc<RefCell<PageState>>,
}

impl PageVisibility {
    /// Creates a source in the given initial state.
    pub fn new(initial: Visibility) -> Self {
        Self {
            state: Rc::new(RefCell::new(PageState {
                current: initial,
                subscribers: Vec::new(),
            })),
        }
    }

    /// Publishes a new state. Repeating the current state is not a transition.
    pub fn set(&self, visibility: Visibility) {
        let mut state = self.state.borrow_mut();
        if state.current == visibility {
            return;
        }
        state.current = visibility;
        // Dropped subscribers are pruned here
        state.subscribers.retain(|tx| tx.send(visibility).is_ok());
    }

    /// The state most recently published.
    pub fn current(&self) -> Visibility {
        self.state.borrow().current
    }
}

impl Default for PageVisibility {
    fn default() -> Self {
        Self::new(Visibility::Visible)
    }
}

impl VisibilitySource for PageVisibility {
    fn is_visible(&self) -> bool {
        self.current() == Visibility::Visible
    }

    fn subscribe(&self) -> mpsc::UnboundedReceiver<Visibility> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.state.borrow_mut().subscribers.push(tx);
        rx
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeated_state_is_not_a_change() {
        let page = PageVisibility::default();
        let mut rx = page.subscribe();

        page.set(Visibility::Visible);
        assert!(rx.try_recv().is_err());

        page.set(Visibility::Hidden);
        assert_eq!(rx.try_recv().ok(), Some(Visibility::Hidden));
        assert!(!page.is_visible());
    }

    #[test]
    fn test_back_to_back_transitions_are_queued() {
        let page = PageVisibility::default();
        let mut first = page.subscribe();
        let mut second = page.subscribe();

        page.set(Visibility::Hidden);
        page.set(Visibility::Visible);

        for rx in [&mut first, &mut second] {
            assert_eq!(rx.try_recv().ok(), Some(Visibility::Hidden));
            assert_eq!(rx.try_recv().ok(), Some(Visibility::Visible));
            assert!(rx.try_recv().is_err());
        }
    }

    #[test]
    fn test_dropped_subscriber_is_pruned() {
        let page = PageVisibility::default();
        drop(page.subscribe());
        let mut live = page.subscribe();

        page.set(Visibility::Hidden);
        assert_eq!(page.state.borrow().subscribers.len(), 1);
        assert_eq!(live.try_recv().ok(), Some(Visibility::Hidden));
    }
}
