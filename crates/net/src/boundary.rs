use glam::Vec3;
use plaza_common::{EmoteKind, PlayerId, RoomId};
use serde::{Deserialize, Serialize};

/// Auxiliary flags sent along with a position update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionAux {
    pub seated: bool,
    pub grounded: bool,
}

/// Outbound half of the network boundary. Implementations must not block.
pub trait NetworkSink {
    fn publish_position(&mut self, position: Vec3, yaw: f32, aux: PositionAux);
    /// `None` clears the current emote.
    fn publish_emote(&mut self, emote: Option<EmoteKind>, continuous: bool);
    fn publish_ball_kick(&mut self, position: Vec3, velocity: Vec3);
}

/// Authoritative, timestamped state of a remote player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemotePlayerSnapshot {
    pub player_id: PlayerId,
    pub position: Vec3,
    pub yaw: f32,
    #[serde(default)]
    pub emote: Option<EmoteKind>,
    #[serde(default)]
    pub seated: bool,
    #[serde(default)]
    pub appearance_version: u32,
    pub timestamp: f64,
}

impl RemotePlayerSnapshot {
    /// Standing, idle snapshot at `position`.
    pub fn at(player_id: PlayerId, position: Vec3, timestamp: f64) -> Self {
        Self {
            player_id,
            position,
            yaw: 0.0,
            emote: None,
            seated: false,
            appearance_version: 0,
            timestamp,
        }
    }
}

/// Room-level broadcast events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RoomBroadcast {
    BallSync { position: Vec3, velocity: Vec3 },
    Occupancy { room: RoomId, count: u32 },
}

/// One recorded outbound message.
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    Position {
        position: Vec3,
        yaw: f32,
        aux: PositionAux,
    },
    Emote {
        emote: Option<EmoteKind>,
        continuous: bool,
    },
    BallKick {
        position: Vec3,
        velocity: Vec3,
    },
}

/// Sink that keeps everything it is given, for tests and headless runs.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    pub sent: Vec<Outbound>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn positions(&self) -> usize {
        self.sent
            .iter()
            .filter(|m| matches!(m, Outbound::Position { .. }))
            .count()
    }

    pub fn emotes(&self) -> Vec<(Option<EmoteKind>, bool)> {
        self.sent
            .iter()
            .filter_map(|m| match m {
                Outbound::Emote { emote, continuous } => Some((*emote, *continuous)),
                _ => None,
            })
            .collect()
    }

    pub fn ball_kicks(&self) -> usize {
        self.sent
            .iter()
            .filter(|m| matches!(m, Outbound::BallKick { .. }))
            .count()
    }

    pub fn clear(&mut self) {
        self.sent.clear();
    }
}

impl NetworkSink for RecordingSink {
    fn publish_position(&mut self, position: Vec3, yaw: f32, aux: PositionAux) {
        self.sent.push(Outbound::Position { position, yaw, aux });
    }

    fn publish_emote(&mut self, emote: Option<EmoteKind>, continuous: bool) {
        self.sent.push(Outbound::Emote { emote, continuous });
    }

    fn publish_ball_kick(&mut self, position: Vec3, velocity: Vec3) {
        self.sent.push(Outbound::BallKick { position, velocity });
    }
}
