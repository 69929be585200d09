//! Yaw conventions and smoothing helpers.
//!
//! Yaw is a rotation about +Y. Yaw 0 faces +Z; `forward(yaw)` is
//! `(sin yaw, 0, cos yaw)`.

use glam::{Quat, Vec2, Vec3};
use std::f32::consts::{PI, TAU};

/// Wrap an angle into `[-PI, PI)`.
pub fn wrap_angle(a: f32) -> f32 {
    (a + PI).rem_euclid(TAU) - PI
}

/// Signed shortest rotation taking `from` to `to`.
pub fn shortest_angle_diff(from: f32, to: f32) -> f32 {
    wrap_angle(to - from)
}

/// Interpolate yaw along the shortest arc.
pub fn lerp_angle(from: f32, to: f32, t: f32) -> f32 {
    wrap_angle(from + shortest_angle_diff(from, to) * t)
}

/// Frame-rate independent exponential smoothing factor.
pub fn smoothing_alpha(rate: f32, dt: f32) -> f32 {
    1.0 - (-rate * dt).exp()
}

/// Unit facing vector for `yaw`; yaw 0 looks down +Z.
pub fn forward(yaw: f32) -> Vec3 {
    Vec3::new(yaw.sin(), 0.0, yaw.cos())
}

pub fn right(yaw: f32) -> Vec3 {
    Vec3::new(-yaw.cos(), 0.0, yaw.sin())
}

/// Rotate a vector about +Y by `yaw` (same convention as `forward`).
pub fn rotate_y(v: Vec3, yaw: f32) -> Vec3 {
    Quat::from_rotation_y(yaw) * v
}

/// Yaw that faces along the horizontal part of `dir`.
pub fn yaw_toward(dir: Vec3) -> f32 {
    dir.x.atan2(dir.z)
}

/// Drop the height component.
pub fn horizontal(v: Vec3) -> Vec2 {
    Vec2::new(v.x, v.z)
}

pub fn horizontal_distance_squared(a: Vec3, b: Vec3) -> f32 {
    horizontal(a).distance_squared(horizontal(b))
}
