use crate::policy::CollisionPolicy;
use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle on the XZ plane.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RectBounds {
    pub min_x: f32,
    pub max_x: f32,
    pub min_z: f32,
    pub max_z: f32,
}

impl RectBounds {
    pub fn new(min_x: f32, max_x: f32, min_z: f32, max_z: f32) -> Self {
        Self {
            min_x,
            max_x,
            min_z,
            max_z,
        }
    }

    pub fn is_degenerate(&self) -> bool {
        !(self.min_x < self.max_x && self.min_z < self.max_z)
    }

    /// Inclusive test on the horizontal plane.
    pub fn contains(&self, p: Vec3) -> bool {
        p.x >= self.min_x && p.x <= self.max_x && p.z >= self.min_z && p.z <= self.max_z
    }

    /// Bounds grown (or shrunk, for negative `by`) on every side.
    pub fn inflate(&self, by: f32) -> Self {
        Self::new(
            self.min_x - by,
            self.max_x + by,
            self.min_z - by,
            self.max_z + by,
        )
    }
}

/// Circle centered on the room origin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CircularBounds {
    pub radius: f32,
}

/// Solid box: an XZ footprint with a vertical band `[y_offset, y_offset + height]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub footprint: RectBounds,
    pub y_offset: f32,
    pub height: f32,
}

impl Aabb {
    pub fn new(footprint: RectBounds, y_offset: f32, height: f32) -> Self {
        Self {
            footprint,
            y_offset,
            height,
        }
    }

    /// Box centered at `(x, z)` with the given half extents, resting on `y_offset`.
    pub fn centered(x: f32, z: f32, half_x: f32, half_z: f32, y_offset: f32, height: f32) -> Self {
        Self::new(
            RectBounds::new(x - half_x, x + half_x, z - half_z, z + half_z),
            y_offset,
            height,
        )
    }

    pub fn bottom(&self) -> f32 {
        self.y_offset
    }

    pub fn top(&self) -> f32 {
        self.y_offset + self.height
    }
}

/// Horizontal area of a landing surface or hazard zone.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Footprint {
    Rect(RectBounds),
    Circle { center: Vec2, radius: f32 },
}

impl Footprint {
    pub fn contains(&self, p: Vec3) -> bool {
        match self {
            Self::Rect(r) => r.contains(p),
            Self::Circle { center, radius } => {
                Vec2::new(p.x, p.z).distance_squared(*center) <= radius * radius
            }
        }
    }
}

/// Collision geometry of the active room. Exactly one variant per room session.
pub enum RoomGeometry {
    Rect(RectBounds),
    Circular(CircularBounds),
    Colliders(Vec<Aabb>),
    /// The room resolves moves itself; the core forwards and trusts the result.
    Delegated(Box<dyn CollisionPolicy>),
}

impl RoomGeometry {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Rect(_) => "rect",
            Self::Circular(_) => "circular",
            Self::Colliders(_) => "colliders",
            Self::Delegated(_) => "delegated",
        }
    }
}

impl std::fmt::Debug for RoomGeometry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rect(r) => f.debug_tuple("Rect").field(r).finish(),
            Self::Circular(c) => f.debug_tuple("Circular").field(c).finish(),
            Self::Colliders(c) => f.debug_tuple("Colliders").field(&c.len()).finish(),
            Self::Delegated(p) => f.debug_tuple("Delegated").field(&p.name()).finish(),
        }
    }
}
