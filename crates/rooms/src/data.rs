use glam::Vec3;
use plaza_collision::{BallArena, Footprint, LandingSurface, PhysicsBall, RoomGeometry};
use plaza_common::{InteractionSpot, Portal, RoomId, SeatDescriptor};
use serde::{Deserialize, Serialize};

/// Slippery ground (ice, oil) inside a footprint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HazardZone {
    pub footprint: Footprint,
    /// Per-60Hz-frame velocity retention while coasting.
    pub decay: f32,
}

/// Initial state of a room's kickable ball.
#[derive(Debug, Clone, PartialEq)]
pub struct BallSetup {
    pub ball: PhysicsBall,
    pub arena: BallArena,
}

/// Everything the room data boundary supplies when a room loads.
#[derive(Debug)]
pub struct RoomData {
    pub id: RoomId,
    pub geometry: Option<RoomGeometry>,
    pub landing_surfaces: Vec<LandingSurface>,
    pub hazards: Vec<HazardZone>,
    pub seats: Vec<SeatDescriptor>,
    pub portals: Vec<Portal>,
    pub spots: Vec<InteractionSpot>,
    pub ball: Option<BallSetup>,
    pub spawn: Vec3,
    pub spawn_yaw: f32,
}

impl RoomData {
    /// Empty room with no geometry, spawning at the origin.
    pub fn new(id: RoomId) -> Self {
        Self {
            id,
            geometry: None,
            landing_surfaces: Vec::new(),
            hazards: Vec::new(),
            seats: Vec::new(),
            portals: Vec::new(),
            spots: Vec::new(),
            ball: None,
            spawn: Vec3::ZERO,
            spawn_yaw: 0.0,
        }
    }

    /// Replace the room's collision geometry.
    pub fn with_geometry(mut self, geometry: RoomGeometry) -> Self {
        self.geometry = Some(geometry);
        self
    }

    pub fn with_spawn(mut self, spawn: Vec3, yaw: f32) -> Self {
        self.spawn = spawn;
        self.spawn_yaw = yaw;
        self
    }

    pub fn with_landing_surface(mut self, surface: LandingSurface) -> Self {
        self.landing_surfaces.push(surface);
        self
    }

    pub fn with_hazard(mut self, hazard: HazardZone) -> Self {
        self.hazards.push(hazard);
        self
    }

    pub fn with_seat(mut self, seat: SeatDescriptor) -> Self {
        self.seats.push(seat);
        self
    }

    pub fn with_portal(mut self, portal: Portal) -> Self {
        self.portals.push(portal);
        self
    }

    pub fn with_spot(mut self, spot: InteractionSpot) -> Self {
        self.spots.push(spot);
        self
    }

    pub fn with_ball(mut self, ball: PhysicsBall, arena: BallArena) -> Self {
        self.ball = Some(BallSetup { ball, arena });
        self
    }

    pub fn seat(&self, id: &str) -> Option<&SeatDescriptor> {
        self.seats.iter().find(|s| s.id == id)
    }

    pub fn portal(&self, id: &str) -> Option<&Portal> {
        self.portals.iter().find(|p| p.id == id)
    }
}
