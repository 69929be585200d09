use crate::kinematics::Surface;
use glam::Vec3;
use plaza_collision::{
    BallArena, CollisionPolicy, LandingCandidates, LandingSurface, PhysicsBall, select_policy,
};
use plaza_common::math::horizontal_distance_squared;
use plaza_common::{PhysicsConfig, Portal, RoomId, SeatDescriptor};
use plaza_interact::InteractionIndex;
use plaza_rooms::{HazardZone, RoomData};

/// Per-room state built once at load and dropped on leave.
///
/// The collision policy is selected here and never re-dispatched.
pub struct RoomSession {
    id: RoomId,
    policy: Box<dyn CollisionPolicy>,
    index: InteractionIndex,
    seats: Vec<SeatDescriptor>,
    portals: Vec<Portal>,
    surfaces: Vec<LandingSurface>,
    hazards: Vec<HazardZone>,
    ball: Option<PhysicsBall>,
    arena: BallArena,
    spawn: Vec3,
    spawn_yaw: f32,
    /// Set on load; auto-enter portals stay inert until the avatar has
    /// left every auto-enter radius once.
    arrival_guard: bool,
}

impl RoomSession {
    /// Build the per-room state: collision policy, interaction index and ball.
    /// The arrival guard starts armed.
    pub fn load(data: RoomData, physics: &PhysicsConfig) -> Self {
        let _span = tracing::info_span!("room_load", room = %data.id).entered();
        let policy = select_policy(data.geometry, physics.avatar_height, physics.landing_tolerance);
        let index = InteractionIndex::build(&data.portals, &data.seats, &data.spots);
        let (ball, arena) = match data.ball {
            Some(setup) => (Some(setup.ball), setup.arena),
            None => (None, BallArena::default()),
        };
        tracing::info!(
            policy = policy.name(),
            candidates = index.len(),
            seats = data.seats.len(),
            portals = data.portals.len(),
            ball = ball.is_some(),
            "room loaded"
        );
        Self {
            id: data.id,
            policy,
            index,
            seats: data.seats,
            portals: data.portals,
            surfaces: data.landing_surfaces,
            hazards: data.hazards,
            ball,
            arena,
            spawn: data.spawn,
            spawn_yaw: data.spawn_yaw,
            arrival_guard: true,
        }
    }

    pub fn id(&self) -> &RoomId {
        &self.id
    }

    /// Collision policy chosen for this room's geometry at load.
    pub fn policy(&self) -> &dyn CollisionPolicy {
        self.policy.as_ref()
    }

    pub fn index(&self) -> &InteractionIndex {
        &self.index
    }

    /// Default spawn position and yaw.
    pub fn spawn(&self) -> (Vec3, f32) {
        (self.spawn, self.spawn_yaw)
    }

    pub fn seat(&self, id: &str) -> Option<&SeatDescriptor> {
        self.seats.iter().find(|s| s.id == id)
    }

    pub fn portal(&self, id: &str) -> Option<&Portal> {
        self.portals.iter().find(|p| p.id == id)
    }

    pub fn ball(&self) -> Option<&PhysicsBall> {
        self.ball.as_ref()
    }

    pub fn ball_mut(&mut self) -> Option<&mut PhysicsBall> {
        self.ball.as_mut()
    }

    /// Advance the ball, if the room has one.
    pub fn step_ball(&mut self, dt: f32) {
        if let Some(ball) = &mut self.ball {
            ball.step(dt, &self.arena);
        }
    }

    /// Surface under `position`; hazards with a decay outside `(0, 1)` use `default_decay`.
    pub fn surface_at(&self, position: Vec3, default_decay: f32) -> Surface {
        self.hazards
            .iter()
            .find(|h| h.footprint.contains(position))
            .map_or(Surface::Normal, |h| {
                let decay = if h.decay > 0.0 && h.decay < 1.0 {
                    h.decay
                } else {
                    default_decay
                };
                Surface::Slippery { decay }
            })
    }

    /// Every landing source for this frame: floor, policy, room surfaces, ball.
    pub fn landing_candidates(&self, probe: Vec3, descending: bool) -> LandingCandidates {
        let mut candidates = LandingCandidates::default();
        candidates.offer_landing(self.policy.check_landing(probe, descending));
        for surface in &self.surfaces {
            candidates.offer_landing(surface.probe(probe, descending));
        }
        if let Some(ball) = &self.ball {
            candidates.offer_landing(ball.landing(probe, descending));
        }
        candidates
    }

    pub fn arrival_guard(&self) -> bool {
        self.arrival_guard
    }

    /// Drop the arrival guard once the avatar is clear of every auto-enter portal.
    pub fn update_arrival_guard(&mut self, position: Vec3) {
        if self.arrival_guard && self.auto_portal_at(position).is_none() {
            tracing::debug!(room = %self.id, "arrival guard released");
            self.arrival_guard = false;
        }
    }

    /// Auto-enter portal whose radius contains `position`, ignoring the guard.
    pub fn auto_portal_at(&self, position: Vec3) -> Option<&Portal> {
        self.portals.iter().find(|p| {
            p.auto_enter
                && horizontal_distance_squared(p.world_position, position) <= p.radius * p.radius
        })
    }
}

impl std::fmt::Debug for RoomSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoomSession")
            .field("id", &self.id)
            .field("policy", &self.policy.name())
            .field("candidates", &self.index.len())
            .field("ball", &self.ball.is_some())
            .field("arrival_guard", &self.arrival_guard)
            .finish()
    }
}
