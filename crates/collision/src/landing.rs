//! Unified landing resolution.
//!
//! Every surface source (floor, collider tops, room landing surfaces, the
//! ball) proposes a height; the highest one at or below the reference height
//! wins, and it is only committed while descending inside the tolerance band.

use crate::geometry::Footprint;
use crate::policy::Landing;
use glam::Vec3;
use serde::{Deserialize, Serialize};

/// The ground plane every room stands on.
pub const FLOOR_Y: f32 = 0.0;

/// A walkable surface declared by room data (stage, roof, pier).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LandingSurface {
    pub footprint: Footprint,
    pub height: f32,
}

impl LandingSurface {
    /// Landing offered at `position`, whose y is the reference height.
    pub fn probe(&self, position: Vec3, descending: bool) -> Landing {
        if self.footprint.contains(position) && self.height <= position.y {
            Landing {
                can_land: descending,
                landing_y: self.height,
            }
        } else {
            Landing::NONE
        }
    }
}

/// Keeps the highest landing candidate that is not below the floor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LandingCandidates {
    floor: f32,
    highest: f32,
}

impl LandingCandidates {
    pub fn new(floor: f32) -> Self {
        Self {
            floor,
            highest: floor,
        }
    }

    pub fn offer(&mut self, landing_y: f32) {
        if landing_y >= self.floor && landing_y > self.highest {
            self.highest = landing_y;
        }
    }

    pub fn offer_landing(&mut self, landing: Landing) {
        if landing.can_land {
            self.offer(landing.landing_y);
        }
    }

    /// Best landing height offered so far; the floor if nothing beat it.
    pub fn highest(&self) -> f32 {
        self.highest
    }
}

impl Default for LandingCandidates {
    fn default() -> Self {
        Self::new(FLOOR_Y)
    }
}

/// Reference point for landing probes this frame.
///
/// Uses the higher of the previous and new heights (plus tolerance) so a
/// surface passed through during a single frame is still found.
pub fn probe_point(previous: Vec3, resolved: Vec3, tolerance: f32) -> Vec3 {
    Vec3::new(resolved.x, previous.y.max(resolved.y) + tolerance, resolved.z)
}

/// Limit how far the avatar may drop in one frame.
pub fn clamp_fall(previous_y: f32, new_y: f32, max_fall: f32) -> f32 {
    new_y.max(previous_y - max_fall)
}

/// Height to commit as grounded, if the avatar lands this frame.
pub fn settle(new_y: f32, vertical_velocity: f32, candidates: &LandingCandidates, tolerance: f32) -> Option<f32> {
    if vertical_velocity > 0.0 {
        return None;
    }
    let target = candidates.highest();
    (new_y <= target + tolerance).then_some(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::RectBounds;

    const TOL: f32 = 0.25;

    fn stack() -> Vec<LandingSurface> {
        [0.0, 2.0, 5.0]
            .into_iter()
            .map(|height| LandingSurface {
                footprint: Footprint::Rect(RectBounds::new(-1.0, 1.0, -1.0, 1.0)),
                height,
            })
            .collect()
    }

    fn candidates_at(surfaces: &[LandingSurface], probe: Vec3) -> LandingCandidates {
        let mut c = LandingCandidates::default();
        for s in surfaces {
            c.offer_landing(s.probe(probe, true));
        }
        c
    }

    #[test]
    fn highest_surface_below_descending_avatar_wins() {
        let surfaces = stack();
        let gravity = 30.0;
        let dt = 1.0 / 60.0;
        let mut y = 6.0;
        let mut vy = -1.0;
        let mut landed = None;
        for _ in 0..600 {
            vy -= gravity * dt;
            let new_y = clamp_fall(y, y + vy * dt, 2.0);
            let probe = probe_point(Vec3::new(0.0, y, 0.0), Vec3::new(0.0, new_y, 0.0), TOL);
            let c = candidates_at(&surfaces, probe);
            if let Some(h) = settle(new_y, vy, &c, TOL) {
                landed = Some(h);
                break;
            }
            y = new_y;
        }
        assert_eq!(landed, Some(5.0));
    }

    #[test]
    fn surface_crossed_within_one_frame_still_catches() {
        let surfaces = stack();
        let probe = probe_point(Vec3::new(0.0, 5.1, 0.0), Vec3::new(0.0, 4.0, 0.0), TOL);
        let c = candidates_at(&surfaces, probe);
        assert_eq!(settle(4.0, -40.0, &c, TOL), Some(5.0));
    }

    #[test]
    fn airborne_above_higher_surface_does_not_snap_lower() {
        let surfaces = stack();
        // At 5.6 the 5.0 surface is outside the tolerance band, so nothing commits.
        let probe = probe_point(Vec3::new(0.0, 5.7, 0.0), Vec3::new(0.0, 5.6, 0.0), TOL);
        let c = candidates_at(&surfaces, probe);
        assert_eq!(c.highest(), 5.0);
        assert_eq!(settle(5.6, -1.0, &c, TOL), None);
    }

    #[test]
    fn rising_avatar_never_lands() {
        let c = LandingCandidates::default();
        assert_eq!(settle(0.0, 5.0, &c, TOL), None);
    }

    #[test]
    fn candidates_below_floor_ignored() {
        let mut c = LandingCandidates::default();
        c.offer(-3.0);
        assert_eq!(c.highest(), FLOOR_Y);
    }

    #[test]
    fn fall_clamp_limits_drop() {
        assert_eq!(clamp_fall(10.0, 4.0, 2.0), 8.0);
        assert_eq!(clamp_fall(10.0, 9.5, 2.0), 9.5);
    }

    #[test]
    fn surface_outside_footprint_not_offered() {
        let s = stack()[2];
        assert!(!s.probe(Vec3::new(3.0, 6.0, 0.0), true).can_land);
    }
}
