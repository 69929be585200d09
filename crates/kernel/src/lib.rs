//! Simulation kernel: the per-frame loop for the local avatar.
//!
//! # Invariants
//! - One [`SimulationContext`] owns all avatar, seat, transition and sync state.
//! - A seated avatar is never integrated; its transform is the seat anchor.
//! - At most one collision policy is active, chosen once per room load.
//! - Host notifications are queued as [`SimEvent`]s and drained by the host.

mod events;
pub mod kinematics;
mod seat;
mod session;
mod sim;

pub use events::SimEvent;
pub use kinematics::{MovementModifiers, Surface, clamp_dt, horizontal_speed, integrate};
pub use seat::{SeatState, SeatStateMachine};
pub use session::RoomSession;
pub use sim::{Collaborators, SimulationContext};
