//! Static per-room descriptors supplied by the room data boundary.
//!
//! Read-only after room load.

use crate::types::{DismountDirection, RoomId, SeatKind};
use glam::Vec3;
use serde::{Deserialize, Serialize};

/// What a portal does when entered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PortalTarget {
    /// Switch to another room.
    Room(RoomId),
    /// Hand off to a minigame; no room change.
    Minigame(String),
    /// Move to absolute coordinates in the same room.
    RoofTeleport { position: Vec3 },
}

/// A doorway, teleporter or minigame launcher placed in a room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Portal {
    pub id: String,
    pub world_position: Vec3,
    pub radius: f32,
    pub target: PortalTarget,
    /// Offset from the portal where a returning avatar reappears.
    #[serde(default)]
    pub exit_spawn_offset: Vec3,
    /// Walk-through portal: entered on proximity instead of on interact.
    #[serde(default)]
    pub auto_enter: bool,
}

/// Inclusive band of avatar feet heights.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct YBand {
    pub min: f32,
    pub max: f32,
}

impl YBand {
    pub fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, y: f32) -> bool {
        y >= self.min && y <= self.max
    }
}

/// Something the avatar can sit at: a bench, a chair or a DJ booth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeatDescriptor {
    pub id: String,
    #[serde(default)]
    pub kind: SeatKind,
    pub anchor_position: Vec3,
    pub anchor_yaw: f32,
    /// Absolute height of the seated avatar's feet.
    pub seat_height: f32,
    /// Candidate seat points, as offsets in seat space (rotated by `anchor_yaw`).
    #[serde(default)]
    pub snap_points: Vec<Vec3>,
    /// Seat can be used from either side; facing follows the approach.
    #[serde(default)]
    pub bidirectional: bool,
    /// Height the avatar returns to when standing up.
    #[serde(default)]
    pub platform_height: f32,
    #[serde(default)]
    pub dismount_direction: DismountDirection,
    #[serde(default = "default_seat_radius")]
    pub interact_radius: f32,
    /// Prompt gating on the avatar's feet height (e.g. stools only from the floor).
    #[serde(default)]
    pub y_band: Option<YBand>,
}

fn default_seat_radius() -> f32 {
    1.5
}

/// Interaction categories, declared in prompt precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionCategory {
    Portal,
    Slot,
    Table,
    Fishing,
    Lore,
    Wardrobe,
    Arcade,
    Seat,
}

impl InteractionCategory {
    /// Every category, in declaration order.
    pub const ALL: [InteractionCategory; 8] = [
        Self::Portal,
        Self::Slot,
        Self::Table,
        Self::Fishing,
        Self::Lore,
        Self::Wardrobe,
        Self::Arcade,
        Self::Seat,
    ];
}

/// A generic proximity trigger (slot machine, card table, fishing spot, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionSpot {
    pub id: String,
    pub category: InteractionCategory,
    pub position: Vec3,
    pub radius: f32,
    #[serde(default)]
    pub y_band: Option<YBand>,
    /// Optional reference to a seat or portal id this spot fronts for.
    #[serde(default)]
    pub link: Option<String>,
}
