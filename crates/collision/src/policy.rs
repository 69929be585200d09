//! Per-room collision strategies.
//!
//! A policy is chosen once per room session by [`select_policy`] and then
//! called every frame without re-dispatching on the room type.

use crate::geometry::{Aabb, CircularBounds, RectBounds, RoomGeometry};
use glam::{Vec2, Vec3};

/// Outcome of resolving a proposed move.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Resolution {
    pub position: Vec3,
    pub collided: bool,
}

impl Resolution {
    pub fn free(position: Vec3) -> Self {
        Self {
            position,
            collided: false,
        }
    }
}

/// Landing candidate proposed by a surface source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Landing {
    pub can_land: bool,
    pub landing_y: f32,
}

impl Landing {
    pub const NONE: Landing = Landing {
        can_land: false,
        landing_y: 0.0,
    };

    pub fn at(landing_y: f32) -> Self {
        Self {
            can_land: true,
            landing_y,
        }
    }
}

/// Resolves avatar moves against one room's geometry.
pub trait CollisionPolicy {
    /// Resolve a move from `previous` to `tentative` for an avatar of the given
    /// radius whose feet are at `current_height`.
    fn resolve(&self, previous: Vec3, tentative: Vec3, radius: f32, current_height: f32)
    -> Resolution;

    /// Highest surface this policy offers at or below `position.y` under `position`.
    fn check_landing(&self, _position: Vec3, _descending: bool) -> Landing {
        Landing::NONE
    }

    fn name(&self) -> &'static str;
}

/// Used when room data has no usable geometry.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCollision;

impl CollisionPolicy for NoCollision {
    fn resolve(&self, _previous: Vec3, tentative: Vec3, _radius: f32, _height: f32) -> Resolution {
        Resolution::free(tentative)
    }

    fn name(&self) -> &'static str {
        "none"
    }
}

/// Axis-aligned rectangular room.
///
/// Clamps the avatar's center to the bounds shrunk by its radius, so the
/// body never crosses a wall. Heights are left alone.
#[derive(Debug, Clone, Copy)]
pub struct RectPolicy {
    pub bounds: RectBounds,
}

impl CollisionPolicy for RectPolicy {
    fn resolve(&self, _previous: Vec3, tentative: Vec3, radius: f32, _height: f32) -> Resolution {
        let inner = self.bounds.inflate(-radius);
        // A room narrower than the avatar collapses to its center line.
        let clamp = |v: f32, lo: f32, hi: f32| {
            if lo > hi {
                (lo + hi) * 0.5
            } else {
                v.clamp(lo, hi)
            }
        };
        let x = clamp(tentative.x, inner.min_x, inner.max_x);
        let z = clamp(tentative.z, inner.min_z, inner.max_z);
        let position = Vec3::new(x, tentative.y, z);
        Resolution {
            position,
            collided: x != tentative.x || z != tentative.z,
        }
    }

    fn name(&self) -> &'static str {
        "rect"
    }
}

/// Round room centered on the origin.
///
/// Positions past `radius - avatar radius` are pulled back along the same
/// angle onto that circle.
#[derive(Debug, Clone, Copy)]
pub struct CircularPolicy {
    pub bounds: CircularBounds,
}

impl CollisionPolicy for CircularPolicy {
    fn resolve(&self, _previous: Vec3, tentative: Vec3, radius: f32, _height: f32) -> Resolution {
        let limit = (self.bounds.radius - radius).max(0.0);
        let flat = Vec2::new(tentative.x, tentative.z);
        let dist = flat.length();
        if dist <= limit {
            return Resolution::free(tentative);
        }
        // Same angle, pulled back onto the circle.
        let on_circle = if dist > 0.0 {
            flat * (limit / dist)
        } else {
            Vec2::ZERO
        };
        Resolution {
            position: Vec3::new(on_circle.x, tentative.y, on_circle.y),
            collided: true,
        }
    }

    fn name(&self) -> &'static str {
        "circular"
    }
}

/// Static boxes with height bands.
///
/// Feet below a box top (minus `step_height`) push out along the axis of
/// least penetration; feet at or above the top stand on it.
#[derive(Debug, Clone)]
pub struct ColliderPolicy {
    pub colliders: Vec<Aabb>,
    /// Avatar body height, so boxes floating above the head do not block.
    pub body_height: f32,
    /// Tops this close above the feet are stepped onto instead of blocking.
    pub step_height: f32,
}

impl ColliderPolicy {
    /// `step_height` is usually the landing tolerance.
    pub fn new(colliders: Vec<Aabb>, body_height: f32, step_height: f32) -> Self {
        Self {
            colliders,
            body_height,
            step_height,
        }
    }
}

impl CollisionPolicy for ColliderPolicy {
    fn resolve(&self, _previous: Vec3, tentative: Vec3, radius: f32, current_height: f32) -> Resolution {
        let mut position = tentative;
        let mut collided = false;
        for c in &self.colliders {
            let feet = current_height;
            if feet >= c.top() - self.step_height || feet + self.body_height <= c.bottom() {
                continue;
            }
            let grown = c.footprint.inflate(radius);
            if !(position.x > grown.min_x
                && position.x < grown.max_x
                && position.z > grown.min_z
                && position.z < grown.max_z)
            {
                continue;
            }
            let pushes = [
                (position.x - grown.min_x, Vec3::new(grown.min_x, position.y, position.z)),
                (grown.max_x - position.x, Vec3::new(grown.max_x, position.y, position.z)),
                (position.z - grown.min_z, Vec3::new(position.x, position.y, grown.min_z)),
                (grown.max_z - position.z, Vec3::new(position.x, position.y, grown.max_z)),
            ];
            if let Some((_, pushed)) = pushes
                .iter()
                .min_by(|a, b| a.0.total_cmp(&b.0))
            {
                position = *pushed;
                collided = true;
            }
        }
        Resolution { position, collided }
    }

    fn check_landing(&self, position: Vec3, descending: bool) -> Landing {
        let best = self
            .colliders
            .iter()
            .filter(|c| c.footprint.contains(position) && c.top() <= position.y)
            .map(|c| c.top())
            .reduce(f32::max);
        match best {
            Some(y) if descending => Landing::at(y),
            Some(y) => Landing {
                can_land: false,
                landing_y: y,
            },
            None => Landing::NONE,
        }
    }

    fn name(&self) -> &'static str {
        "colliders"
    }
}

/// Build the policy for a room, once, at load time.
///
/// Missing or degenerate geometry degrades to [`NoCollision`] with a warning.
pub fn select_policy(
    geometry: Option<RoomGeometry>,
    body_height: f32,
    step_height: f32,
) -> Box<dyn CollisionPolicy> {
    match geometry {
        None => {
            tracing::warn!("room has no collision geometry; collisions disabled");
            Box::new(NoCollision)
        }
        Some(RoomGeometry::Rect(bounds)) if bounds.is_degenerate() => {
            tracing::warn!(?bounds, "degenerate rect bounds; collisions disabled");
            Box::new(NoCollision)
        }
        Some(RoomGeometry::Rect(bounds)) => Box::new(RectPolicy { bounds }),
        Some(RoomGeometry::Circular(bounds)) if bounds.radius <= 0.0 => {
            tracing::warn!(radius = bounds.radius, "non-positive room radius; collisions disabled");
            Box::new(NoCollision)
        }
        Some(RoomGeometry::Circular(bounds)) => Box::new(CircularPolicy { bounds }),
        Some(RoomGeometry::Colliders(colliders)) => {
            if colliders.is_empty() {
                tracing::warn!("collider list is empty; collisions disabled");
            }
            Box::new(ColliderPolicy::new(colliders, body_height, step_height))
        }
        Some(RoomGeometry::Delegated(policy)) => {
            tracing::debug!(policy = policy.name(), "using room-supplied collision policy");
            policy
        }
    }
}
