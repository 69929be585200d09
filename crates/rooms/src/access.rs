use plaza_common::{PlayerId, RoomId};
use serde::{Deserialize, Serialize};

/// Who may enter a room.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessPolicy {
    /// Anyone may enter.
    #[default]
    Public,
    /// Only the owner; everyone else is sent to the requirements view.
    Private,
    /// Token- or fee-gated; the entitlement service decides.
    Gated,
}

/// Access rules of a destination room.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomAccess {
    pub policy: AccessPolicy,
    #[serde(default)]
    pub owner: Option<PlayerId>,
}

impl RoomAccess {
    pub fn public() -> Self {
        Self::default()
    }

    pub fn private(owner: PlayerId) -> Self {
        Self {
            policy: AccessPolicy::Private,
            owner: Some(owner),
        }
    }

    /// Gated room; the owner, if any, skips the entitlement check.
    pub fn gated(owner: Option<PlayerId>) -> Self {
        Self {
            policy: AccessPolicy::Gated,
            owner,
        }
    }

    pub fn is_owner(&self, player: PlayerId) -> bool {
        self.owner == Some(player)
    }
}

/// Answer from the entitlement boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntitlementDecision {
    pub allowed: bool,
    pub reason: Option<String>,
}

impl EntitlementDecision {
    pub fn allow() -> Self {
        Self {
            allowed: true,
            reason: None,
        }
    }

    pub fn deny(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: Some(reason.into()),
        }
    }
}

/// Progress of an entitlement check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntitlementPoll {
    Pending,
    Ready(EntitlementDecision),
}

/// Entitlement boundary for gated rooms.
///
/// `can_enter` is polled once per frame while a transition is pending; the
/// first call for a room starts the check.
pub trait EntitlementService {
    fn can_enter(&mut self, room: &RoomId) -> EntitlementPoll;

    /// The transition stopped waiting (timeout or room teardown).
    fn cancel(&mut self, _room: &RoomId) {}
}

/// Entitlement service that allows everything immediately.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl EntitlementService for AllowAll {
    fn can_enter(&mut self, _room: &RoomId) -> EntitlementPoll {
        EntitlementPoll::Ready(EntitlementDecision::allow())
    }
}
