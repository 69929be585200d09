//! Shared types for the plaza avatar simulation.
//!
//! # Invariants
//! - Yaw 0 faces +Z; every crate uses the helpers in [`math`] for direction.
//! - Room descriptors are read-only after room load.
//! - Configuration is passed in explicitly; nothing reads ambient global state.

pub mod config;
pub mod math;
pub mod room;
pub mod types;

pub use config::{
    ConfigError, DeviceProfile, InteractionConfig, NetworkConfig, PersistenceConfig,
    PhysicsConfig, ReconcileConfig, SeatConfig, SimConfig, TransitionConfig,
};
pub use room::{InteractionCategory, InteractionSpot, Portal, PortalTarget, SeatDescriptor, YBand};
pub use types::{
    AvatarState, DismountDirection, Emote, EmoteKind, PlayerId, RoomId, SeatAttachment, SeatKind,
};
