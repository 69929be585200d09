use crate::access::{AccessPolicy, EntitlementPoll, EntitlementService, RoomAccess};
use glam::Vec3;
use plaza_common::{PlayerId, Portal, PortalTarget, RoomId};
use std::collections::BTreeMap;

/// Why a portal traversal did not happen.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TransitionError {
    /// Private room entered by a non-owner; the host shows the requirements view.
    #[error("room {room} is private; view requirements")]
    Private { room: RoomId },
    #[error("entry to {room} denied: {reason}")]
    Denied { room: RoomId, reason: String },
    #[error("entitlement check for {room} timed out")]
    TimedOut { room: RoomId },
    #[error("a transition to {room} is already pending")]
    AlreadyPending { room: RoomId },
    #[error("portal {portal} has no usable target")]
    InvalidTarget { portal: String },
}

impl TransitionError {
    pub fn room(&self) -> Option<&RoomId> {
        match self {
            Self::Private { room }
            | Self::Denied { room, .. }
            | Self::TimedOut { room }
            | Self::AlreadyPending { room } => Some(room),
            Self::InvalidTarget { .. } => None,
        }
    }
}

/// Destination room plus where to spawn in it, for the host to load.
#[derive(Debug, Clone, PartialEq)]
pub struct RoomHandoff {
    pub from: Option<RoomId>,
    pub to: RoomId,
    /// Stored return coordinates; `None` means the room's own spawn point.
    pub spawn: Option<Vec3>,
}

/// What entering a portal led to.
#[derive(Debug, Clone, PartialEq)]
pub enum TransitionOutcome {
    /// Same-room teleport to absolute coordinates.
    Teleported { position: Vec3 },
    Minigame(String),
    Committed(RoomHandoff),
    /// Waiting on the entitlement service.
    Pending { room: RoomId },
}

/// Where to put the avatar when it comes back to `room`.
#[derive(Debug, Clone, PartialEq)]
pub struct ReturnPoint {
    pub room: RoomId,
    pub position: Vec3,
}

#[derive(Debug, Clone)]
struct PendingTransition {
    room: RoomId,
    return_position: Vec3,
    started_at: f64,
}

/// Validates and executes portal traversal.
///
/// Room changes are never applied here: a committed transition produces a
/// [`RoomHandoff`] and the host loads the destination. While an entitlement
/// check is pending, the current room stays active.
#[derive(Debug, Clone)]
pub struct RoomTransitionManager {
    local_player: PlayerId,
    current: Option<RoomId>,
    access: BTreeMap<RoomId, RoomAccess>,
    return_points: Vec<ReturnPoint>,
    pending: Option<PendingTransition>,
    timeout: f64,
}

impl RoomTransitionManager {
    pub fn new(local_player: PlayerId, timeout: f64) -> Self {
        Self {
            local_player,
            current: None,
            access: BTreeMap::new(),
            return_points: Vec::new(),
            pending: None,
            timeout,
        }
    }

    pub fn set_access(&mut self, room: RoomId, access: RoomAccess) {
        self.access.insert(room, access);
    }

    pub fn access(&self, room: &RoomId) -> RoomAccess {
        self.access.get(room).cloned().unwrap_or_default()
    }

    /// Active room. A committed handoff moves it to the destination.
    pub fn current(&self) -> Option<&RoomId> {
        self.current.as_ref()
    }

    /// Mark `room` as the active room without a portal (initial load, resume).
    ///
    /// Returns the destination of a pending transition that was dropped on
    /// the way; the caller owes the entitlement service a `cancel` for it.
    #[must_use = "a dropped pending transition must be cancelled with the entitlement service"]
    pub fn arrive(&mut self, room: RoomId) -> Option<RoomId> {
        tracing::debug!(%room, "arrived");
        let abandoned = self.abandon_pending();
        self.current = Some(room);
        self.return_points.clear();
        abandoned
    }

    /// Drop a pending transition without talking to the entitlement service.
    /// Returns its destination so the cancel can be forwarded later.
    pub fn abandon_pending(&mut self) -> Option<RoomId> {
        let pending = self.pending.take()?;
        tracing::debug!(room = %pending.room, "pending transition abandoned");
        Some(pending.room)
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn pending_room(&self) -> Option<&RoomId> {
        self.pending.as_ref().map(|p| &p.room)
    }

    /// Stack of places to reappear when walking back out.
    pub fn return_points(&self) -> &[ReturnPoint] {
        &self.return_points
    }

    /// Traverse `portal` at time `now`.
    pub fn enter(
        &mut self,
        portal: &Portal,
        now: f64,
        entitlement: &mut dyn EntitlementService,
    ) -> Result<TransitionOutcome, TransitionError> {
        let room = match &portal.target {
            PortalTarget::RoofTeleport { position } => {
                tracing::debug!(portal = %portal.id, ?position, "roof teleport");
                return Ok(TransitionOutcome::Teleported {
                    position: *position,
                });
            }
            PortalTarget::Minigame(id) if !id.is_empty() => {
                return Ok(TransitionOutcome::Minigame(id.clone()));
            }
            PortalTarget::Room(room) if !room.as_str().is_empty() => room.clone(),
            _ => {
                return Err(TransitionError::InvalidTarget {
                    portal: portal.id.clone(),
                });
            }
        };

        if let Some(pending) = &self.pending {
            return Err(TransitionError::AlreadyPending {
                room: pending.room.clone(),
            });
        }

        let return_position = portal.world_position + portal.exit_spawn_offset;
        let access = self.access(&room);
        if access.is_owner(self.local_player) || access.policy == AccessPolicy::Public {
            return Ok(TransitionOutcome::Committed(self.commit(room, return_position)));
        }
        if access.policy == AccessPolicy::Private {
            tracing::debug!(%room, "private room; redirecting to requirements");
            return Err(TransitionError::Private { room });
        }

        match entitlement.can_enter(&room) {
            EntitlementPoll::Ready(decision) if decision.allowed => {
                Ok(TransitionOutcome::Committed(self.commit(room, return_position)))
            }
            EntitlementPoll::Ready(decision) => Err(denied(room, decision.reason)),
            EntitlementPoll::Pending => {
                tracing::debug!(%room, "entitlement pending");
                self.pending = Some(PendingTransition {
                    room: room.clone(),
                    return_position,
                    started_at: now,
                });
                Ok(TransitionOutcome::Pending { room })
            }
        }
    }

    /// Advance a pending transition. `None` while still waiting or when idle.
    pub fn poll(
        &mut self,
        now: f64,
        entitlement: &mut dyn EntitlementService,
    ) -> Option<Result<TransitionOutcome, TransitionError>> {
        let pending = self.pending.take()?;
        if now - pending.started_at >= self.timeout {
            tracing::warn!(room = %pending.room, "entitlement check timed out");
            entitlement.cancel(&pending.room);
            return Some(Err(TransitionError::TimedOut { room: pending.room }));
        }
        match entitlement.can_enter(&pending.room) {
            EntitlementPoll::Pending => {
                self.pending = Some(pending);
                None
            }
            EntitlementPoll::Ready(decision) if decision.allowed => {
                let handoff = self.commit(pending.room, pending.return_position);
                Some(Ok(TransitionOutcome::Committed(handoff)))
            }
            EntitlementPoll::Ready(decision) => Some(Err(denied(pending.room, decision.reason))),
        }
    }

    /// Abandon a pending transition, e.g. when the current room is torn down.
    pub fn cancel_pending(&mut self, entitlement: &mut dyn EntitlementService) {
        if let Some(pending) = self.pending.take() {
            tracing::debug!(room = %pending.room, "pending transition cancelled");
            entitlement.cancel(&pending.room);
        }
    }

    fn commit(&mut self, to: RoomId, return_position: Vec3) -> RoomHandoff {
        let from = self.current.take();
        let spawn = match self.return_points.iter().rposition(|p| p.room == to) {
            // Going back: unwind to the point recorded when we left `to`.
            Some(idx) => {
                self.return_points.truncate(idx + 1);
                self.return_points.pop().map(|p| p.position)
            }
            None => {
                if let Some(room) = &from {
                    self.return_points.push(ReturnPoint {
                        room: room.clone(),
                        position: return_position,
                    });
                }
                None
            }
        };
        tracing::debug!(from = ?from.as_ref().map(RoomId::as_str), %to, ?spawn, "transition committed");
        self.current = Some(to.clone());
        RoomHandoff { from, to, spawn }
    }
}

fn denied(room: RoomId, reason: Option<String>) -> TransitionError {
    TransitionError::Denied {
        room,
        reason: reason.unwrap_or_else(|| "not entitled".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::{AllowAll, EntitlementDecision};
    use std::collections::VecDeque;

    /// Replays a fixed sequence of answers, then stays pending.
    #[derive(Default)]
    struct Scripted {
        answers: VecDeque<EntitlementPoll>,
        cancelled: Vec<RoomId>,
    }

    impl Scripted {
        fn new(answers: impl IntoIterator<Item = EntitlementPoll>) -> Self {
            Self {
                answers: answers.into_iter().collect(),
                cancelled: Vec::new(),
            }
        }
    }

    impl EntitlementService for Scripted {
        fn can_enter(&mut self, _room: &RoomId) -> EntitlementPoll {
            self.answers.pop_front().unwrap_or(EntitlementPoll::Pending)
        }

        fn cancel(&mut self, room: &RoomId) {
            self.cancelled.push(room.clone());
        }
    }

    fn door(id: &str, x: f32, target: PortalTarget) -> Portal {
        Portal {
            id: id.into(),
            world_position: Vec3::new(x, 0.0, 0.0),
            radius: 1.5,
            target,
            exit_spawn_offset: Vec3::new(0.0, 0.0, 2.0),
            auto_enter: false,
        }
    }

    fn to_room(id: &str, x: f32, room: &str) -> Portal {
        door(id, x, PortalTarget::Room(RoomId::new(room)))
    }

    fn manager_in(room: &str) -> RoomTransitionManager {
        let mut m = RoomTransitionManager::new(PlayerId::new(), 10.0);
        assert!(m.arrive(RoomId::new(room)).is_none());
        m
    }

    fn committed(outcome: Result<TransitionOutcome, TransitionError>) -> RoomHandoff {
        match outcome {
            Ok(TransitionOutcome::Committed(h)) => h,
            other => panic!("expected commit, got {other:?}"),
        }
    }

    #[test]
    fn roof_teleport_does_not_change_room() {
        let mut m = manager_in("town");
        let target = Vec3::new(3.0, 12.0, -4.0);
        let out = m
            .enter(&door("ladder", 0.0, PortalTarget::RoofTeleport { position: target }), 0.0, &mut AllowAll)
            .unwrap();
        assert_eq!(out, TransitionOutcome::Teleported { position: target });
        assert_eq!(m.current(), Some(&RoomId::new("town")));
    }

    #[test]
    fn public_room_commits_immediately() {
        let mut m = manager_in("town");
        let h = committed(m.enter(&to_room("dojo-door", 5.0, "dojo"), 0.0, &mut AllowAll));
        assert_eq!(h.from, Some(RoomId::new("town")));
        assert_eq!(h.to, RoomId::new("dojo"));
        assert_eq!(h.spawn, None);
        assert_eq!(m.current(), Some(&RoomId::new("dojo")));
    }

    #[test]
    fn leaving_sub_room_returns_to_entry_coordinates() {
        let mut m = manager_in("town");
        committed(m.enter(&to_room("dojo-door", 5.0, "dojo"), 0.0, &mut AllowAll));
        let back = committed(m.enter(&to_room("exit", 0.0, "town"), 1.0, &mut AllowAll));
        assert_eq!(back.spawn, Some(Vec3::new(5.0, 0.0, 2.0)));
        assert!(m.return_points().is_empty());
    }

    #[test]
    fn nested_rooms_unwind_in_order() {
        let mut m = manager_in("town");
        committed(m.enter(&to_room("a", 1.0, "mall"), 0.0, &mut AllowAll));
        committed(m.enter(&to_room("b", 2.0, "shop"), 0.0, &mut AllowAll));
        assert_eq!(m.return_points().len(), 2);
        // Jumping straight back to town skips the mall entry.
        let h = committed(m.enter(&to_room("c", 0.0, "town"), 0.0, &mut AllowAll));
        assert_eq!(h.spawn, Some(Vec3::new(1.0, 0.0, 2.0)));
        assert!(m.return_points().is_empty());
    }

    #[test]
    fn private_room_redirects_non_owner() {
        let mut m = manager_in("town");
        m.set_access(RoomId::new("igloo"), RoomAccess::private(PlayerId::new()));
        let err = m
            .enter(&to_room("igloo-door", 0.0, "igloo"), 0.0, &mut AllowAll)
            .unwrap_err();
        assert!(matches!(err, TransitionError::Private { .. }));
        assert_eq!(m.current(), Some(&RoomId::new("town")));
    }

    #[test]
    fn owner_bypasses_gate() {
        let me = PlayerId::new();
        let mut m = RoomTransitionManager::new(me, 10.0);
        let _ = m.arrive(RoomId::new("town"));
        m.set_access(RoomId::new("igloo"), RoomAccess::private(me));
        let mut never = Scripted::default();
        committed(m.enter(&to_room("igloo-door", 0.0, "igloo"), 0.0, &mut never));
    }

    #[test]
    fn gated_room_waits_then_commits() {
        let mut m = manager_in("town");
        m.set_access(RoomId::new("vip"), RoomAccess::gated(None));
        let mut svc = Scripted::new([
            EntitlementPoll::Pending,
            EntitlementPoll::Pending,
            EntitlementPoll::Ready(EntitlementDecision::allow()),
        ]);
        let out = m.enter(&to_room("vip-door", 0.0, "vip"), 0.0, &mut svc).unwrap();
        assert_eq!(out, TransitionOutcome::Pending { room: RoomId::new("vip") });
        assert_eq!(m.current(), Some(&RoomId::new("town")));
        assert!(m.poll(0.1, &mut svc).is_none());
        let h = committed(m.poll(0.2, &mut svc).unwrap());
        assert_eq!(h.to, RoomId::new("vip"));
        assert!(!m.is_pending());
    }

    #[test]
    fn gated_room_denial_keeps_current_room() {
        let mut m = manager_in("town");
        m.set_access(RoomId::new("vip"), RoomAccess::gated(None));
        let mut svc = Scripted::new([EntitlementPoll::Ready(EntitlementDecision::deny("needs token"))]);
        let err = m.enter(&to_room("vip-door", 0.0, "vip"), 0.0, &mut svc).unwrap_err();
        assert_eq!(
            err,
            TransitionError::Denied {
                room: RoomId::new("vip"),
                reason: "needs token".into()
            }
        );
        assert_eq!(m.current(), Some(&RoomId::new("town")));
    }

    #[test]
    fn pending_check_times_out() {
        let mut m = manager_in("town");
        m.set_access(RoomId::new("vip"), RoomAccess::gated(None));
        let mut svc = Scripted::default();
        m.enter(&to_room("vip-door", 0.0, "vip"), 0.0, &mut svc).unwrap();
        assert!(m.poll(9.0, &mut svc).is_none());
        let err = m.poll(10.0, &mut svc).unwrap().unwrap_err();
        assert_eq!(err, TransitionError::TimedOut { room: RoomId::new("vip") });
        assert_eq!(svc.cancelled, vec![RoomId::new("vip")]);
        assert_eq!(m.current(), Some(&RoomId::new("town")));
    }

    #[test]
    fn arriving_hands_back_the_pending_room() {
        let mut m = manager_in("town");
        m.set_access(RoomId::new("vip"), RoomAccess::gated(None));
        let mut svc = Scripted::default();
        m.enter(&to_room("vip-door", 0.0, "vip"), 0.0, &mut svc).unwrap();
        assert_eq!(m.arrive(RoomId::new("town")), Some(RoomId::new("vip")));
        assert!(!m.is_pending());
        assert!(m.poll(1.0, &mut svc).is_none());
        assert!(m.abandon_pending().is_none());
    }

    #[test]
    fn second_gated_entry_while_pending_is_rejected() {
        let mut m = manager_in("town");
        m.set_access(RoomId::new("vip"), RoomAccess::gated(None));
        let mut svc = Scripted::default();
        m.enter(&to_room("vip-door", 0.0, "vip"), 0.0, &mut svc).unwrap();
        let err = m.enter(&to_room("dojo-door", 0.0, "dojo"), 0.1, &mut svc).unwrap_err();
        assert!(matches!(err, TransitionError::AlreadyPending { .. }));
    }

    #[test]
    fn empty_target_is_invalid() {
        let mut m = manager_in("town");
        let err = m.enter(&to_room("broken", 0.0, ""), 0.0, &mut AllowAll).unwrap_err();
        assert!(matches!(err, TransitionError::InvalidTarget { .. }));
        assert!(err.room().is_none());
    }

    #[test]
    fn minigame_portal_hands_off_id() {
        let mut m = manager_in("town");
        let out = m
            .enter(&door("arcade", 0.0, PortalTarget::Minigame("sled-race".into())), 0.0, &mut AllowAll)
            .unwrap();
        assert_eq!(out, TransitionOutcome::Minigame("sled-race".into()));
    }
}
