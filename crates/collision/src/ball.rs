//! Kickable physics ball shared by everyone in a room.
//!
//! The ball is mutated only by the owning room's update step. Cross-client
//! agreement comes from republishing kicks and periodic syncs, not from
//! locking: the last sync received overwrites local state.

use crate::geometry::{Aabb, CircularBounds, RectBounds};
use crate::policy::Landing;
use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

/// Approach speed below which touching the ball does not kick it.
pub const MIN_KICK_SPEED: f32 = 0.5;
/// Multiplier from the player's approach speed to the ball's launch speed.
pub const KICK_TRANSFER: f32 = 1.6;
/// Upward velocity added by a kick.
pub const KICK_LIFT: f32 = 2.0;
/// Seconds before the same ball can be kicked again.
pub const KICK_COOLDOWN: f32 = 0.25;
/// Speeds below this are treated as at rest.
const REST_SPEED: f32 = 0.05;

/// Outer wall of the ball arena.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArenaBounds {
    Rect(RectBounds),
    Circular(CircularBounds),
}

/// Walls and obstacles the ball bounces off.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BallArena {
    pub bounds: Option<ArenaBounds>,
    #[serde(default)]
    pub obstacles: Vec<Aabb>,
}

/// A kick to publish to other clients.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BallKick {
    pub position: Vec3,
    pub velocity: Vec3,
}

/// A kickable ball simulated locally and kept in step by remote syncs.
///
/// The kick cooldown is local state and is not serialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhysicsBall {
    pub position: Vec3,
    pub velocity: Vec3,
    pub radius: f32,
    /// Fraction of normal speed kept on a bounce.
    pub bounciness: f32,
    /// Horizontal speed lost per second while rolling.
    pub friction: f32,
    pub gravity: f32,
    #[serde(skip)]
    cooldown: f32,
}

impl PhysicsBall {
    pub fn new(position: Vec3, radius: f32) -> Self {
        Self {
            position,
            velocity: Vec3::ZERO,
            radius,
            bounciness: 0.6,
            friction: 0.8,
            gravity: 30.0,
            cooldown: 0.0,
        }
    }

    pub fn is_moving(&self) -> bool {
        self.velocity.length_squared() > REST_SPEED * REST_SPEED
    }

    /// Height of the ball's top, where an avatar can stand.
    pub fn top(&self) -> f32 {
        self.position.y + self.radius
    }

    /// The ball's top as a landing candidate under `position`.
    pub fn landing(&self, position: Vec3, descending: bool) -> Landing {
        let flat = Vec2::new(position.x - self.position.x, position.z - self.position.z);
        if flat.length_squared() <= self.radius * self.radius && self.top() <= position.y {
            Landing {
                can_land: descending,
                landing_y: self.top(),
            }
        } else {
            Landing::NONE
        }
    }

    /// Transfer the player's approach momentum into the ball on contact.
    pub fn try_kick(
        &mut self,
        player_position: Vec3,
        player_velocity: Vec3,
        player_radius: f32,
    ) -> Option<BallKick> {
        if self.cooldown > 0.0 {
            return None;
        }
        let offset = Vec2::new(
            self.position.x - player_position.x,
            self.position.z - player_position.z,
        );
        let reach = self.radius + player_radius;
        let dist = offset.length();
        if dist > reach || dist <= f32::EPSILON {
            return None;
        }
        if player_position.y > self.top() {
            return None;
        }
        let dir = offset / dist;
        let approach = Vec2::new(player_velocity.x, player_velocity.z).dot(dir);
        if approach < MIN_KICK_SPEED {
            return None;
        }
        let push = dir * approach * KICK_TRANSFER;
        self.velocity = Vec3::new(push.x, KICK_LIFT, push.y);
        // Move the ball clear of the player so it is not kicked twice.
        let clear = dir * reach;
        self.position.x = player_position.x + clear.x;
        self.position.z = player_position.z + clear.y;
        self.cooldown = KICK_COOLDOWN;
        Some(BallKick {
            position: self.position,
            velocity: self.velocity,
        })
    }

    /// Overwrite local state with an authoritative sync.
    pub fn apply_sync(&mut self, position: Vec3, velocity: Vec3) {
        self.position = position;
        self.velocity = velocity;
    }

    /// Integrate one step against the floor, arena walls and obstacles.
    pub fn step(&mut self, dt: f32, arena: &BallArena) {
        self.cooldown = (self.cooldown - dt).max(0.0);
        if !self.is_moving() && self.position.y <= self.radius {
            self.velocity = Vec3::ZERO;
            return;
        }

        self.velocity.y -= self.gravity * dt;
        self.position += self.velocity * dt;

        let on_floor = self.position.y <= self.radius;
        if on_floor {
            self.position.y = self.radius;
            if self.velocity.y < 0.0 {
                self.velocity.y = -self.velocity.y * self.bounciness;
                if self.velocity.y < self.gravity * dt * 2.0 {
                    self.velocity.y = 0.0;
                }
            }
            let keep = (1.0 - self.friction * dt).max(0.0);
            self.velocity.x *= keep;
            self.velocity.z *= keep;
        }

        match arena.bounds {
            Some(ArenaBounds::Rect(bounds)) => self.bounce_rect(&bounds),
            Some(ArenaBounds::Circular(bounds)) => self.bounce_circle(bounds.radius),
            None => {}
        }
        for obstacle in &arena.obstacles {
            self.bounce_obstacle(obstacle);
        }
    }

    fn bounce_rect(&mut self, b: &RectBounds) {
        let r = self.radius;
        if self.position.x - r < b.min_x {
            self.position.x = b.min_x + r;
            self.velocity.x = self.velocity.x.abs() * self.bounciness;
        } else if self.position.x + r > b.max_x {
            self.position.x = b.max_x - r;
            self.velocity.x = -self.velocity.x.abs() * self.bounciness;
        }
        if self.position.z - r < b.min_z {
            self.position.z = b.min_z + r;
            self.velocity.z = self.velocity.z.abs() * self.bounciness;
        } else if self.position.z + r > b.max_z {
            self.position.z = b.max_z - r;
            self.velocity.z = -self.velocity.z.abs() * self.bounciness;
        }
    }

    fn bounce_circle(&mut self, arena_radius: f32) {
        let limit = (arena_radius - self.radius).max(0.0);
        let flat = Vec2::new(self.position.x, self.position.z);
        let dist = flat.length();
        if dist <= limit || dist <= f32::EPSILON {
            return;
        }
        let normal = flat / dist;
        let clamped = normal * limit;
        self.position.x = clamped.x;
        self.position.z = clamped.y;
        let v = Vec2::new(self.velocity.x, self.velocity.z);
        let outward = v.dot(normal);
        if outward > 0.0 {
            let reflected = v - normal * outward * (1.0 + self.bounciness);
            self.velocity.x = reflected.x;
            self.velocity.z = reflected.y;
        }
    }

    fn bounce_obstacle(&mut self, obstacle: &Aabb) {
        if self.position.y - self.radius >= obstacle.top() {
            return;
        }
        let g = obstacle.footprint.inflate(self.radius);
        let p = self.position;
        if !(p.x > g.min_x && p.x < g.max_x && p.z > g.min_z && p.z < g.max_z) {
            return;
        }
        let pen = [p.x - g.min_x, g.max_x - p.x, p.z - g.min_z, g.max_z - p.z];
        let axis = (0..4)
            .min_by(|a, b| pen[*a].total_cmp(&pen[*b]))
            .unwrap_or(0);
        match axis {
            0 => {
                self.position.x = g.min_x;
                self.velocity.x = -self.velocity.x.abs() * self.bounciness;
            }
            1 => {
                self.position.x = g.max_x;
                self.velocity.x = self.velocity.x.abs() * self.bounciness;
            }
            2 => {
                self.position.z = g.min_z;
                self.velocity.z = -self.velocity.z.abs() * self.bounciness;
            }
            _ => {
                self.position.z = g.max_z;
                self.velocity.z = self.velocity.z.abs() * self.bounciness;
            }
        }
    }
}
