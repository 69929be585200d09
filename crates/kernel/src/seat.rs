use glam::Vec3;
use plaza_common::math::{forward, horizontal, horizontal_distance_squared, rotate_y, wrap_angle};
use plaza_common::{
    AvatarState, Emote, EmoteKind, SeatAttachment, SeatConfig, SeatDescriptor, SeatKind,
};

/// What the avatar is attached to, as the host UI sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeatState {
    Standing,
    Seated,
    /// Behind a DJ booth.
    Piloting,
}

impl SeatState {
    /// Derived from the avatar's seat attachment; there is no separate state
    /// to keep in sync.
    pub fn of(avatar: &AvatarState) -> Self {
        match avatar.seated.as_ref().map(|s| s.kind) {
            None => Self::Standing,
            Some(SeatKind::Seat) => Self::Seated,
            Some(SeatKind::DjBooth) => Self::Piloting,
        }
    }
}

/// Sit/stand transitions and the seated-state override.
#[derive(Debug, Clone)]
pub struct SeatStateMachine {
    dismount_distance: f32,
}

impl SeatStateMachine {
    pub fn new(config: &SeatConfig) -> Self {
        Self {
            dismount_distance: config.dismount_distance,
        }
    }

    /// Attach the avatar to `seat`. Returns the continuous emote to publish,
    /// or `None` if the avatar is already seated.
    pub fn sit(&self, avatar: &mut AvatarState, seat: &SeatDescriptor, now: f64) -> Option<EmoteKind> {
        if avatar.is_seated() {
            return None;
        }
        let point = nearest_snap_point(seat, avatar.position);

        let mut yaw = seat.anchor_yaw;
        if seat.bidirectional {
            let approach = horizontal(avatar.position - point);
            if approach.dot(horizontal(forward(seat.anchor_yaw))) < 0.0 {
                yaw = wrap_angle(yaw + std::f32::consts::PI);
            }
        }

        let emote = match seat.kind {
            SeatKind::Seat => EmoteKind::Sit,
            SeatKind::DjBooth => EmoteKind::Dj,
        };
        let anchor = Vec3::new(point.x, seat.seat_height, point.z);
        avatar.position = anchor;
        avatar.yaw = yaw;
        avatar.velocity = Vec3::ZERO;
        avatar.grounded = true;
        avatar.emote = Some(Emote::new(emote, now));
        avatar.seated = Some(SeatAttachment {
            seat_id: seat.id.clone(),
            kind: seat.kind,
            anchor_position: anchor,
            seat_height: seat.seat_height,
            anchor_yaw: yaw,
            platform_height: seat.platform_height,
            dismount_direction: seat.dismount_direction,
        });
        tracing::debug!(seat = %seat.id, ?anchor, yaw, "seated");
        Some(emote)
    }

    /// Detach and step off the seat. Returns the released attachment.
    pub fn stand(&self, avatar: &mut AvatarState) -> Option<SeatAttachment> {
        let attachment = avatar.seated.take()?;
        let step = forward(attachment.anchor_yaw)
            * attachment.dismount_direction.sign()
            * self.dismount_distance;
        avatar.position = Vec3::new(
            attachment.anchor_position.x + step.x,
            attachment.platform_height,
            attachment.anchor_position.z + step.z,
        );
        avatar.velocity = Vec3::ZERO;
        avatar.grounded = true;
        avatar.emote = None;
        tracing::debug!(seat = %attachment.seat_id, position = ?avatar.position, "stood up");
        Some(attachment)
    }

    /// Re-assert the seated transform for this frame.
    pub fn hold(&self, avatar: &mut AvatarState) {
        if let Some(attachment) = &avatar.seated {
            avatar.position = attachment.anchor_position;
            avatar.yaw = attachment.anchor_yaw;
            avatar.velocity = Vec3::ZERO;
            avatar.grounded = true;
        }
    }

    pub fn dismount_distance(&self) -> f32 {
        self.dismount_distance
    }
}

/// World-space snap point closest to `position`; the anchor when none are declared.
fn nearest_snap_point(seat: &SeatDescriptor, position: Vec3) -> Vec3 {
    seat.snap_points
        .iter()
        .map(|offset| seat.anchor_position + rotate_y(*offset, seat.anchor_yaw))
        .reduce(|best, p| {
            if horizontal_distance_squared(p, position) < horizontal_distance_squared(best, position) {
                p
            } else {
                best
            }
        })
        .unwrap_or(seat.anchor_position)
}

#[cfg(test)]
mod tests {
    use super::*;
    use plaza_collision::{Aabb, ColliderPolicy, CollisionPolicy};
    use plaza_common::DismountDirection;
    use std::f32::consts::PI;

    fn bench() -> SeatDescriptor {
        SeatDescriptor {
            id: "bench".into(),
            kind: SeatKind::Seat,
            anchor_position: Vec3::new(0.0, 0.0, 0.0),
            anchor_yaw: 0.0,
            seat_height: 0.5,
            snap_points: vec![Vec3::new(-1.0, 0.0, 0.0), Vec3::new(1.0, 0.0, 0.0)],
            bidirectional: false,
            platform_height: 0.0,
            dismount_direction: DismountDirection::Forward,
            interact_radius: 2.0,
            y_band: None,
        }
    }

    fn machine() -> SeatStateMachine {
        SeatStateMachine::new(&SeatConfig::default())
    }

    #[test]
    fn sit_picks_nearest_snap_point() {
        let mut avatar = AvatarState::at(Vec3::new(-1.4, 0.0, 1.0));
        avatar.velocity = Vec3::new(3.0, 0.0, 3.0);
        let emote = machine().sit(&mut avatar, &bench(), 2.0);
        assert_eq!(emote, Some(EmoteKind::Sit));
        assert_eq!(avatar.position, Vec3::new(-1.0, 0.5, 0.0));
        assert_eq!(avatar.velocity, Vec3::ZERO);
        assert_eq!(SeatState::of(&avatar), SeatState::Seated);
        assert_eq!(avatar.emote, Some(Emote::new(EmoteKind::Sit, 2.0)));
    }

    #[test]
    fn snap_points_rotate_with_the_seat() {
        let mut seat = bench();
        seat.anchor_yaw = PI / 2.0;
        // The +x offset now points along -z.
        let mut avatar = AvatarState::at(Vec3::new(0.0, 0.0, -1.2));
        machine().sit(&mut avatar, &seat, 0.0);
        assert!(avatar.position.distance(Vec3::new(0.0, 0.5, -1.0)) < 1e-5);
    }

    #[test]
    fn bidirectional_seat_faces_the_approach_side() {
        let mut seat = bench();
        seat.bidirectional = true;

        let mut front = AvatarState::at(Vec3::new(1.0, 0.0, 2.0));
        machine().sit(&mut front, &seat, 0.0);
        assert_eq!(front.yaw, 0.0);

        let mut back = AvatarState::at(Vec3::new(1.0, 0.0, -2.0));
        machine().sit(&mut back, &seat, 0.0);
        assert!((back.yaw.abs() - PI).abs() < 1e-5);
    }

    #[test]
    fn dj_booth_is_piloting() {
        let mut seat = bench();
        seat.kind = SeatKind::DjBooth;
        let mut avatar = AvatarState::default();
        assert_eq!(machine().sit(&mut avatar, &seat, 0.0), Some(EmoteKind::Dj));
        assert_eq!(SeatState::of(&avatar), SeatState::Piloting);
    }

    #[test]
    fn sitting_twice_is_a_no_op() {
        let m = machine();
        let mut avatar = AvatarState::default();
        m.sit(&mut avatar, &bench(), 0.0);
        let before = avatar.clone();
        assert!(m.sit(&mut avatar, &bench(), 1.0).is_none());
        assert_eq!(avatar, before);
    }

    #[test]
    fn seat_round_trip_dismounts_by_exact_distance() {
        let m = machine();
        let seat = bench();
        let mut avatar = AvatarState::at(Vec3::new(1.2, 0.0, 0.8));
        m.sit(&mut avatar, &seat, 0.0);
        let anchor = avatar.position;
        let released = m.stand(&mut avatar).unwrap();
        assert_eq!(released.seat_id, "bench");

        let moved = horizontal(avatar.position - anchor);
        assert!((moved.length() - m.dismount_distance()).abs() < 1e-5);
        // Along the seat's facing axis.
        assert!(moved.x.abs() < 1e-5 && moved.y > 0.0);
        assert_eq!(avatar.position.y, seat.platform_height);
        assert!(avatar.emote.is_none());
        assert_eq!(SeatState::of(&avatar), SeatState::Standing);

        // The seat body (0.4 deep around the seat line) does not hold the avatar.
        let seat_body = ColliderPolicy::new(
            vec![Aabb::centered(0.0, 0.0, 1.6, 0.2, 0.0, 0.5)],
            1.8,
            0.25,
        );
        let r = seat_body.resolve(avatar.position, avatar.position, 0.5, avatar.position.y);
        assert!(!r.collided);
    }

    #[test]
    fn dismount_backward_steps_behind() {
        let m = machine();
        let mut seat = bench();
        seat.dismount_direction = DismountDirection::Backward;
        seat.platform_height = 1.0;
        let mut avatar = AvatarState::at(Vec3::new(1.0, 0.0, 0.5));
        m.sit(&mut avatar, &seat, 0.0);
        m.stand(&mut avatar);
        assert!((avatar.position.z + 1.2).abs() < 1e-5);
        assert_eq!(avatar.position.y, 1.0);
    }

    #[test]
    fn standing_when_not_seated_does_nothing() {
        let mut avatar = AvatarState::at(Vec3::X);
        assert!(machine().stand(&mut avatar).is_none());
        assert_eq!(avatar.position, Vec3::X);
    }

    #[test]
    fn hold_pins_the_avatar_to_the_anchor() {
        let m = machine();
        let mut avatar = AvatarState::default();
        m.sit(&mut avatar, &bench(), 0.0);
        let anchor = avatar.position;
        avatar.position += Vec3::new(0.3, -0.2, 0.1);
        avatar.velocity = Vec3::new(1.0, -5.0, 0.0);
        m.hold(&mut avatar);
        assert_eq!(avatar.position, anchor);
        assert_eq!(avatar.velocity, Vec3::ZERO);
    }
}
