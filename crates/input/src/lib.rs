//! Input boundary: continuous movement state plus discrete actions.
//!
//! # Invariants
//! - The simulation consumes `InputFrame`s and `Action`s, never raw device events.
//! - Joystick and keyboard input share one frame type; the integrator picks the path.

pub mod action;
pub mod frame;

pub use action::Action;
pub use frame::{InputFrame, JOYSTICK_DEADZONE};
