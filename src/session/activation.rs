//! Activation lifecycle.
//!
//! ```text
//! transition   from                         to
//! start        stopped                      started
//! activate     started, inactive            active if engaged, else inactive
//! deactivate   started, active              inactive
//! stop         started, active, inactive    stopped
//! ```

/// Lifecycle state of a scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActivationState {
    /// Not started; holds no resources.
    #[default]
    Stopped,
    /// Started, activation pending.
    Started,
    /// Camera streaming and scan loop running.
    Active,
    /// Started but paused while the page is hidden.
    Inactive,
}

/// Events driving the lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Caller requested scanning.
    Start,
    /// Try to engage the camera.
    Activate,
    /// Page hidden.
    Deactivate,
    /// Caller requested stop.
    Stop,
}

impl ActivationState {
    /// Target state of `transition`, or `None` if it is not allowed here.
    ///
    /// `engage` decides where `Activate` lands: true when the page is
    /// visible or background scanning is enabled.
    pub fn next(self, transition: Transition, engage: bool) -> Option<ActivationState> {
        use ActivationState::*;
        match (self, transition) {
            (Stopped, Transition::Start) => Some(Started),
            (Started | Inactive, Transition::Activate) => Some(if engage { Active } else { Inactive }),
            (Started | Active, Transition::Deactivate) => Some(Inactive),
            (Started | Active | Inactive, Transition::Stop) => Some(Stopped),
            _ => None,
        }
    }

    /// Whether `transition` is allowed from this state.
    pub fn can(self, transition: Transition) -> bool {
        self.next(transition, true).is_some()
    }

    /// Camera and scan loop are held only while active.
    pub fn holds_resources(self) -> bool {
        self == ActivationState::Active
    }
}

/// A state change produced by [`ActivationMachine::apply`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateChange {
    /// State before the transition.
    pub from: ActivationState,
    /// State after the transition.
    pub to: ActivationState,
}

impl StateChange {
    /// True if this change moves into `state`.
    pub fn enters(&self, state: ActivationState) -> bool {
        self.to == state && self.from != state
    }

    /// True if this change moves out of `state`.
    pub fn leaves(&self, state: ActivationState) -> bool {
        self.from == state && self.to != state
    }
}

/// Holds the current state and applies transitions to it.
#[derive(Debug, Default)]
pub struct ActivationMachine {
    state: ActivationState,
}

impl ActivationMachine {
    /// A machine in [`ActivationState::Stopped`].
    pub fn new() -> Self {
        Self::default()
    }

    /// The current state.
    pub fn state(&self) -> ActivationState {
        self.state
    }

    /// Whether `transition` is allowed now.
    pub fn can(&self, transition: Transition) -> bool {
        self.state.can(transition)
    }

    /// Updates the state. Returns `None`, leaving the state untouched, for a
    /// transition not allowed from the current state.
    pub fn apply(&mut self, transition: Transition, engage: bool) -> Option<StateChange> {
        let from = self.state;
        let to = from.next(transition, engage)?;
        self.state = to;
        tracing::debug!(?transition, ?from, ?to, "Activation transition");
        Some(StateChange { from, to })
    }

    /// Overrides the state after a failed entry hook.
    pub(crate) fn force(&mut self, state: ActivationState) {
        self.state = state;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ActivationState::*;

    #[test]
    fn test_transition_table() {
        assert_eq!(Stopped.next(Transition::Start, false), Some(Started));
        assert_eq!(Started.next(Transition::Activate, true), Some(Active));
        assert_eq!(Started.next(Transition::Activate, false), Some(Inactive));
        assert_eq!(Inactive.next(Transition::Activate, true), Some(Active));
        assert_eq!(Active.next(Transition::Deactivate, true), Some(Inactive));
        assert_eq!(Started.next(Transition::Deactivate, true), Some(Inactive));
        for state in [Started, Active, Inactive] {
            assert_eq!(state.next(Transition::Stop, false), Some(Stopped));
        }
    }

    #[test]
    fn test_forbidden_transitions() {
        assert!(!Stopped.can(Transition::Stop));
        assert!(!Stopped.can(Transition::Activate));
        assert!(!Stopped.can(Transition::Deactivate));
        assert!(!Active.can(Transition::Activate));
        assert!(!Active.can(Transition::Start));
        assert!(!Inactive.can(Transition::Deactivate));
    }

    #[test]
    fn test_apply_rejects_without_changing_state() {
        let mut machine = ActivationMachine::new();
        assert!(machine.apply(Transition::Stop, true).is_none());
        assert_eq!(machine.state(), Stopped);

        let change = machine.apply(Transition::Start, true).unwrap();
        assert_eq!(change, StateChange { from: Stopped, to: Started });

        let change = machine.apply(Transition::Activate, true).unwrap();
        assert!(change.enters(Active));

        let change = machine.apply(Transition::Stop, true).unwrap();
        assert!(change.leaves(Active));
        assert!(!Stopped.holds_resources());
    }
}
