//! Room collision: geometry variants, per-room policies, unified landing and
//! the kickable ball.
//!
//! # Invariants
//! - One policy per room session, selected at load time.
//! - Missing geometry degrades to no collision; it never fails the frame.
//! - The committed landing height is the highest candidate at or above the floor.

pub mod ball;
pub mod geometry;
pub mod landing;
pub mod policy;

pub use ball::{ArenaBounds, BallArena, BallKick, PhysicsBall};
pub use geometry::{Aabb, CircularBounds, Footprint, RectBounds, RoomGeometry};
pub use landing::{FLOOR_Y, LandingCandidates, LandingSurface, clamp_fall, probe_point, settle};
pub use policy::{
    CircularPolicy, ColliderPolicy, CollisionPolicy, Landing, NoCollision, RectPolicy, Resolution,
    select_policy,
};
