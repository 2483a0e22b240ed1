//! Scanner lifecycle.
//!
//! The [`Scanner`] ties a camera, a video surface and the scan loop to the
//! activation state machine. Page visibility moves a started scanner
//! between active and inactive; only an active scanner holds the camera.

mod activation;
mod scanner;

pub use activation::{ActivationMachine, ActivationState, StateChange, Transition};
pub use scanner::{ScanError, Scanner};
