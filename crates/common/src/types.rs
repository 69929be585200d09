use glam::Vec3;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a player (local or remote).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlayerId(pub Uuid);

impl PlayerId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PlayerId {
    fn default() -> Self {
        Self::new()
    }
}

/// Identifier of a room (town, an interior, an igloo).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RoomId(pub String);

impl RoomId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RoomId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Emote catalog shared by the local avatar and remote snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmoteKind {
    Wave,
    Cheer,
    Laugh,
    Dance,
    Sit,
    Dj,
}

impl EmoteKind {
    /// Continuous emotes loop until explicitly cleared.
    pub fn is_continuous(self) -> bool {
        matches!(self, Self::Dance | Self::Sit | Self::Dj)
    }
}

/// An emote in progress, stamped with the simulation clock when it started.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Emote {
    pub kind: EmoteKind,
    pub started_at: f64,
}

impl Emote {
    pub fn new(kind: EmoteKind, started_at: f64) -> Self {
        Self { kind, started_at }
    }

    /// Whether a non-continuous emote has outlived `duration` seconds at `now`.
    pub fn is_expired(&self, now: f64, duration: f64) -> bool {
        !self.kind.is_continuous() && now - self.started_at >= duration
    }
}

/// Ordinary furniture or a DJ booth.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeatKind {
    #[default]
    Seat,
    DjBooth,
}

/// Which way the avatar steps off a seat, relative to the way it faces.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DismountDirection {
    #[default]
    Forward,
    Backward,
}

impl DismountDirection {
    pub fn sign(self) -> f32 {
        match self {
            Self::Forward => 1.0,
            Self::Backward => -1.0,
        }
    }
}

/// Binding between the avatar and a seat anchor.
///
/// While attached, the avatar's velocity is zero and its transform is the
/// committed seat point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeatAttachment {
    pub seat_id: String,
    pub kind: SeatKind,
    /// Committed seat point (snap point in world space, y = seat height).
    pub anchor_position: Vec3,
    pub seat_height: f32,
    /// Committed facing, after any bidirectional flip.
    pub anchor_yaw: f32,
    /// Height restored on dismount.
    pub platform_height: f32,
    pub dismount_direction: DismountDirection,
}

/// Local avatar simulation state.
///
/// Owned by the simulation context; mutated only inside the frame loop or
/// explicit interaction handlers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvatarState {
    pub position: Vec3,
    pub velocity: Vec3,
    pub yaw: f32,
    pub grounded: bool,
    pub seated: Option<SeatAttachment>,
    pub emote: Option<Emote>,
}

impl AvatarState {
    pub fn at(position: Vec3) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }

    /// True while attached to a seat or booth.
    pub fn is_seated(&self) -> bool {
        self.seated.is_some()
    }
}

impl Default for AvatarState {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            velocity: Vec3::ZERO,
            yaw: 0.0,
            grounded: true,
            seated: None,
            emote: None,
        }
    }
}
