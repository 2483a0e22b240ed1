//! Duplicate suppression with a refractory timer.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Rejects repeats of the last accepted result until its refractory
/// period has elapsed.
///
/// Expiry is a local task that clears the remembered result, so it must be
/// driven from inside a [`tokio::task::LocalSet`]. Even a zero period
/// defers the clear to a later scheduling turn.
#[derive(Debug, Default)]
pub struct DuplicateSuppressor {
    last: Rc<RefCell<Option<String>>>,
    expiry: Option<JoinHandle<()>>,
}

impl DuplicateSuppressor {
    /// A suppressor with nothing remembered.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if `candidate` should be reported.
    pub fn accept(&mut self, candidate: Option<&str>, refractory: Duration) -> bool {
        let Some(candidate) = candidate else {
            return false;
        };
        if self.last.borrow().as_deref() == Some(candidate) {
            return false;
        }

        if let Some(pending) = self.expiry.take() {
            pending.abort();
        }
        let last = Rc::clone(&self.last);
        self.expiry = Some(tokio::task::spawn_local(async move {
            tokio::time::sleep(refractory).await;
            last.borrow_mut().take();
        }));

        *self.last.borrow_mut() = Some(candidate.to_owned());
        true
    }

    /// The result currently inside its refractory window.
    pub fn last_result(&self) -> Option<String> {
        self.last.borrow().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::task::LocalSet;

    async fn settle() {
        for _ in 0..4 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_none_rejected() {
        LocalSet::new()
            .run_until(async {
                let mut suppressor = DuplicateSuppressor::new();
                assert!(!suppressor.accept(None, Duration::from_millis(10)));
                assert!(suppressor.last_result().is_none());
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_repeat_rejected_until_expiry() {
        LocalSet::new()
            .run_until(async {
                let period = Duration::from_millis(100);
                let mut suppressor = DuplicateSuppressor::new();

                assert!(suppressor.accept(Some("A"), period));
                assert!(!suppressor.accept(Some("A"), period));

                tokio::time::advance(Duration::from_millis(50)).await;
                settle().await;
                assert!(!suppressor.accept(Some("A"), period));

                tokio::time::advance(Duration::from_millis(60)).await;
                settle().await;
                assert!(suppressor.last_result().is_none());
                assert!(suppressor.accept(Some("A"), period));
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_result_restarts_timer() {
        LocalSet::new()
            .run_until(async {
                let period = Duration::from_millis(100);
                let mut suppressor = DuplicateSuppressor::new();

                assert!(suppressor.accept(Some("A"), period));
                tokio::time::advance(Duration::from_millis(80)).await;
                assert!(suppressor.accept(Some("B"), period));

                // A's timer was cancelled, B's has not fired yet
                tokio::time::advance(Duration::from_millis(40)).await;
                settle().await;
                assert_eq!(suppressor.last_result().as_deref(), Some("B"));
                assert!(suppressor.accept(Some("A"), period));
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_period_clears_on_next_turn() {
        LocalSet::new()
            .run_until(async {
                let mut suppressor = DuplicateSuppressor::new();

                assert!(suppressor.accept(Some("A"), Duration::ZERO));
                assert!(!suppressor.accept(Some("A"), Duration::ZERO));

                settle().await;
                assert!(suppressor.accept(Some("A"), Duration::ZERO));
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_sequence_within_window() {
        LocalSet::new()
            .run_until(async {
                let period = Duration::from_millis(500);
                let mut suppressor = DuplicateSuppressor::new();
                let mut emitted = Vec::new();

                for text in ["A", "A", "B", "A"] {
                    if suppressor.accept(Some(text), period) {
                        emitted.push(text);
                    }
                    tokio::time::advance(Duration::from_millis(1)).await;
                    settle().await;
                }

                // B replaced A, so the final A is new again
                assert_eq!(emitted, vec!["A", "B", "A"]);
            })
            .await;
    }
}
