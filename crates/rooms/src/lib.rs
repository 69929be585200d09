//! Rooms: the room data boundary, access gating and portal transitions.
//!
//! # Invariants
//! - The active room only changes through a committed [`RoomHandoff`].
//! - A gated transition never commits while its entitlement check is pending.
//! - Failure and timeout leave the avatar in the current room with a reason.
//! - Leaving a sub-room returns the avatar to the point it entered from.

mod access;
mod data;
mod transition;

pub use access::{
    AccessPolicy, AllowAll, EntitlementDecision, EntitlementPoll, EntitlementService, RoomAccess,
};
pub use data::{BallSetup, HazardZone, RoomData};
pub use transition::{
    ReturnPoint, RoomHandoff, RoomTransitionManager, TransitionError, TransitionOutcome,
};
