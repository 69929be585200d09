use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Joystick magnitudes below this are treated as no input.
pub const JOYSTICK_DEADZONE: f32 = 0.1;

/// Continuous input state sampled once per frame.
///
/// `forward`/`back` translate along the avatar's facing, `left`/`right`
/// strafe, `turn_left`/`turn_right` rotate. The joystick, when present,
/// is camera-relative: `x` is screen-right, `y` is screen-up.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputFrame {
    pub forward: bool,
    pub back: bool,
    pub left: bool,
    pub right: bool,
    pub turn_left: bool,
    pub turn_right: bool,
    pub jump: bool,
    pub joystick: Option<Vec2>,
    /// Camera yaw used to map the joystick into world space.
    pub camera_yaw: f32,
}

impl InputFrame {
    pub fn idle() -> Self {
        Self::default()
    }

    pub fn forward() -> Self {
        Self {
            forward: true,
            ..Self::default()
        }
    }

    pub fn jump() -> Self {
        Self {
            jump: true,
            ..Self::default()
        }
    }

    /// Joystick vector, if it is outside the deadzone. Clamped to unit length.
    pub fn active_joystick(&self) -> Option<Vec2> {
        self.joystick
            .filter(|j| j.length() > JOYSTICK_DEADZONE)
            .map(|j| j.clamp_length_max(1.0))
    }

    /// Digital movement axes: `x` strafes right, `y` moves forward.
    pub fn digital_axes(&self) -> Vec2 {
        let axis = |pos: bool, neg: bool| (pos as i8 - neg as i8) as f32;
        Vec2::new(axis(self.right, self.left), axis(self.forward, self.back))
    }

    /// -1, 0 or 1 from the digital turn keys.
    pub fn turn_axis(&self) -> f32 {
        (self.turn_left as i8 - self.turn_right as i8) as f32
    }

    /// Translation input on either path. Turning alone does not count.
    pub fn has_translation(&self) -> bool {
        self.digital_axes() != Vec2::ZERO || self.active_joystick().is_some()
    }

    /// Any input that should break a seat or a looping emote.
    pub fn has_movement(&self) -> bool {
        self.has_translation() || self.jump
    }
}
