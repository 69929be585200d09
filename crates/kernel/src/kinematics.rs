//! Local avatar kinematics.
//!
//! [`integrate`] is pure: it maps the current state, one input frame and a
//! clamped delta time to a tentative state. Collision and landing are applied
//! afterwards by the simulation context.

use glam::Vec3;
use plaza_common::math::{forward, lerp_angle, right, wrap_angle, yaw_toward};
use plaza_common::{AvatarState, PhysicsConfig};
use plaza_input::InputFrame;

/// Ground the avatar is standing on.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub enum Surface {
    #[default]
    Normal,
    /// Velocity retained per 60 Hz frame while coasting.
    Slippery { decay: f32 },
}

/// Per-frame context that scales or alters movement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MovementModifiers {
    /// Mount or power-up speed scale.
    pub speed_multiplier: f32,
    pub surface: Surface,
}

impl Default for MovementModifiers {
    fn default() -> Self {
        Self {
            speed_multiplier: 1.0,
            surface: Surface::Normal,
        }
    }
}

/// Clamp a raw frame delta into `[0, max_dt]`.
pub fn clamp_dt(dt: f32, max_dt: f32) -> f32 {
    if dt.is_finite() { dt.clamp(0.0, max_dt) } else { 0.0 }
}

/// Advance the avatar by one frame, ignoring collisions.
///
/// Seated avatars are returned unchanged. The returned `grounded` flag is
/// only cleared by a jump; landing decides the rest.
pub fn integrate(
    state: &AvatarState,
    input: &InputFrame,
    dt: f32,
    modifiers: MovementModifiers,
    config: &PhysicsConfig,
) -> AvatarState {
    let mut next = state.clone();
    if state.is_seated() {
        return next;
    }
    let dt = clamp_dt(dt, config.max_dt);
    let speed = config.walk_speed * modifiers.speed_multiplier;

    // Rotate first, then translate along the new facing.
    next.yaw = wrap_angle(next.yaw + input.turn_axis() * config.turn_speed * dt);

    let desired = if let Some(stick) = input.active_joystick() {
        let dir = forward(input.camera_yaw) * stick.y + right(input.camera_yaw) * stick.x;
        next.yaw = lerp_angle(next.yaw, yaw_toward(dir), config.auto_face_fraction);
        Some(dir * speed)
    } else {
        let axes = input.digital_axes();
        (axes != glam::Vec2::ZERO).then(|| {
            (forward(next.yaw) * axes.y + right(next.yaw) * axes.x).normalize_or_zero() * speed
        })
    };

    match desired {
        Some(v) => {
            next.velocity.x = v.x;
            next.velocity.z = v.z;
        }
        None if !state.grounded => {}
        None => match modifiers.surface {
            Surface::Normal => {
                next.velocity.x = 0.0;
                next.velocity.z = 0.0;
            }
            Surface::Slippery { decay } => {
                let keep = decay.powf(dt * 60.0);
                next.velocity.x *= keep;
                next.velocity.z *= keep;
            }
        },
    }

    if input.jump && state.grounded {
        next.velocity.y = config.jump_velocity;
        next.grounded = false;
    }
    next.velocity.y = (next.velocity.y - config.gravity * dt).max(-config.terminal_velocity);

    next.position += next.velocity * dt;
    tracing::trace!(position = ?next.position, velocity = ?next.velocity, "integrated");
    next
}

/// Horizontal speed of a state, for kick and slide checks.
pub fn horizontal_speed(velocity: Vec3) -> f32 {
    Vec3::new(velocity.x, 0.0, velocity.z).length()
}
