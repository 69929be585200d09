use crate::seat::SeatState;
use glam::Vec3;
use plaza_common::{EmoteKind, InteractionCategory, RoomId};
use plaza_interact::PromptEvent;
use plaza_rooms::{RoomHandoff, TransitionError};

/// Notifications for the host, accumulated during a frame and drained by it.
#[derive(Debug, Clone, PartialEq)]
pub enum SimEvent {
    Prompt(PromptEvent),
    Seated { seat_id: String, state: SeatState },
    Stood { seat_id: String },
    EmoteStarted(EmoteKind),
    EmoteEnded,
    Teleported { position: Vec3 },
    /// The host should load `handoff.to`.
    RoomHandoff(RoomHandoff),
    TransitionPending { room: RoomId },
    TransitionRejected(TransitionError),
    MinigameLaunch(String),
    /// Interact on a prompt the core does not handle itself.
    InteractionRequested {
        category: InteractionCategory,
        id: String,
    },
    BallKicked { position: Vec3, velocity: Vec3 },
    Landed { height: f32 },
}
