use plaza_common::EmoteKind;
use serde::{Deserialize, Serialize};

/// A discrete action raised by the host between frames.
///
/// Keyboard, pointer and touch front-ends all map onto the same actions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Use the active prompt (enter a portal, take a seat, open a minigame).
    Interact,
    /// Stand up if seated.
    Stand,
    /// Start an emote.
    Emote(EmoteKind),
    /// Stop the current emote.
    ClearEmote,
    /// No-op (used for input mapping that hasn't been bound yet).
    Noop,
}
