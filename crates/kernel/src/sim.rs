use crate::events::SimEvent;
use crate::kinematics::{MovementModifiers, clamp_dt, integrate};
use crate::seat::{SeatState, SeatStateMachine};
use crate::session::RoomSession;
use glam::Vec3;
use plaza_collision::{clamp_fall, probe_point, settle};
use plaza_common::{AvatarState, Emote, EmoteKind, InteractionCategory, PlayerId, RoomId, SimConfig};
use plaza_input::{Action, InputFrame};
use plaza_interact::{InteractionScanner, Prompt};
use plaza_net::{
    BallRepublisher, NetworkSink, OccupancyBoard, PositionAux, PositionPublisher,
    RemotePlayerReconciler, RemotePlayerSnapshot, RoomBroadcast, SnapshotMailbox,
};
use plaza_persist::{KeyValueStore, ResumeRecord, ResumeWriter};
use plaza_rooms::{
    EntitlementService, RoomAccess, RoomData, RoomTransitionManager, TransitionError,
    TransitionOutcome,
};

/// External collaborators the frame talks to. None of them may block.
pub struct Collaborators<'a> {
    pub network: &'a mut dyn NetworkSink,
    pub entitlement: &'a mut dyn EntitlementService,
    pub store: &'a mut dyn KeyValueStore,
}

/// All simulation state for the local player, owned in one place and
/// advanced by [`SimulationContext::step`] once per rendered frame.
pub struct SimulationContext {
    config: SimConfig,
    local_player: PlayerId,
    avatar: AvatarState,
    session: Option<RoomSession>,
    scanner: InteractionScanner,
    seats: SeatStateMachine,
    transitions: RoomTransitionManager,
    mailbox: SnapshotMailbox,
    reconciler: RemotePlayerReconciler,
    publisher: PositionPublisher,
    ball_republisher: BallRepublisher,
    occupancy: OccupancyBoard,
    resume: ResumeWriter,
    /// Spawn override for the next room load (return point or resume record).
    pending_spawn: Option<Vec3>,
    /// Gated rooms whose pending check was dropped outside a frame; the next
    /// step tells the entitlement service.
    abandoned: Vec<RoomId>,
    mount_multiplier: f32,
    clock: f64,
    frame: u64,
    events: Vec<SimEvent>,
}

impl SimulationContext {
    /// Starts outside any room until [`load_room`](Self::load_room).
    pub fn new(config: SimConfig, local_player: PlayerId) -> Self {
        let lod_distance = config.animation_lod_distance();
        Self {
            scanner: InteractionScanner::new(config.interaction.scan_interval_frames),
            seats: SeatStateMachine::new(&config.seat),
            transitions: RoomTransitionManager::new(
                local_player,
                config.transition.entitlement_timeout,
            ),
            mailbox: SnapshotMailbox::new(local_player),
            reconciler: RemotePlayerReconciler::new(&config.reconcile, lod_distance),
            publisher: PositionPublisher::new(&config.network),
            ball_republisher: BallRepublisher::new(&config.network),
            occupancy: OccupancyBoard::new(),
            resume: ResumeWriter::new(config.persistence.interval),
            local_player,
            avatar: AvatarState::default(),
            session: None,
            pending_spawn: None,
            abandoned: Vec::new(),
            mount_multiplier: 1.0,
            clock: 0.0,
            frame: 0,
            events: Vec::new(),
            config,
        }
    }

    // ---- room lifecycle ----

    /// Install a room delivered by the room data boundary and place the avatar.
    ///
    /// Any pending gated transition is abandoned, including when `data` is
    /// the room already active; its entitlement check is cancelled on the
    /// next [`step`](Self::step).
    pub fn load_room(&mut self, data: RoomData) {
        if self.session.is_some() {
            self.teardown();
        }
        let abandoned = if self.transitions.current() == Some(&data.id) {
            self.transitions.abandon_pending()
        } else {
            self.transitions.arrive(data.id.clone())
        };
        self.abandoned.extend(abandoned);
        let session = RoomSession::load(data, &self.config.physics);
        let (spawn, yaw) = session.spawn();
        let position = self.pending_spawn.take().unwrap_or(spawn);
        self.avatar = AvatarState {
            yaw,
            emote: None,
            ..AvatarState::at(position)
        };
        self.session = Some(session);
    }

    /// Leave the current room unconditionally.
    pub fn leave_room(&mut self, entitlement: &mut dyn EntitlementService) {
        self.forward_cancels(entitlement);
        self.transitions.cancel_pending(entitlement);
        self.teardown();
    }

    fn forward_cancels(&mut self, entitlement: &mut dyn EntitlementService) {
        for room in self.abandoned.drain(..) {
            tracing::debug!(%room, "cancelling abandoned entitlement check");
            entitlement.cancel(&room);
        }
    }

    fn teardown(&mut self) {
        if let Some(session) = self.session.take() {
            tracing::debug!(room = %session.id(), "room torn down");
        }
        self.scanner.reset();
        self.mailbox.clear();
        self.reconciler.clear();
        self.publisher.reset();
        self.ball_republisher.on_remote_sync();
        self.avatar.seated = None;
        self.avatar.emote = None;
    }

    /// Spawn the next loaded room at a stored resume position.
    pub fn resume_from(&mut self, record: &ResumeRecord) -> RoomId {
        self.pending_spawn = Some(record.position());
        record.room_id()
    }

    /// Tell the simulation the current wall time so resume records carry
    /// Unix timestamps instead of session seconds.
    pub fn set_wall_clock(&mut self, unix_seconds: f64) {
        self.resume.set_epoch(unix_seconds - self.clock);
    }

    /// Register how entry to `room` is gated. Rooms never registered are open.
    pub fn set_access(&mut self, room: RoomId, access: RoomAccess) {
        self.transitions.set_access(room, access);
    }

    /// Speed multiplier while mounted; 1.0 on foot. Negative values clamp to zero.
    pub fn set_mount_multiplier(&mut self, multiplier: f32) {
        self.mount_multiplier = multiplier.max(0.0);
    }

    // ---- inbound network ----

    /// Queue a remote player's state for the next reconcile pass.
    pub fn ingest_snapshot(&mut self, snapshot: RemotePlayerSnapshot) {
        self.mailbox.deliver(snapshot);
    }

    /// Replace the whole remote roster, as sent on room join.
    pub fn ingest_roster(&mut self, roster: impl IntoIterator<Item = RemotePlayerSnapshot>) {
        self.mailbox.replace_roster(roster);
    }

    /// Queue a room-wide broadcast; applied at the start of the next step.
    pub fn ingest_broadcast(&mut self, broadcast: RoomBroadcast) {
        self.mailbox.push_broadcast(broadcast);
    }

    // ---- frame ----

    /// Advance one frame: integrate, collide, seat override, scan,
    /// reconcile remotes, publish, offer the resume record.
    pub fn step(&mut self, input: &InputFrame, dt: f32, io: &mut Collaborators<'_>) {
        let dt = clamp_dt(dt, self.config.physics.max_dt);
        self.frame += 1;
        self.clock += f64::from(dt);
        let now = self.clock;
        let _span = tracing::info_span!("sim_step", frame = self.frame).entered();

        self.forward_cancels(io.entitlement);
        if let Some(result) = self.transitions.poll(now, io.entitlement) {
            self.apply_transition(result, io.network);
        }
        self.apply_broadcasts();

        if self.session.is_some() {
            self.step_avatar(input, dt, now, io.network);
            self.step_ball(dt, now, io.network);
            self.scan(now, io);
        }

        self.reconciler
            .update(&self.mailbox, self.avatar.position, now, dt);

        if self.session.is_some() {
            let aux = PositionAux {
                seated: self.avatar.is_seated(),
                grounded: self.avatar.grounded,
            };
            self.publisher
                .tick(now, self.avatar.position, self.avatar.yaw, aux, io.network);
        }
        self.resume.tick(
            now,
            self.avatar.position,
            self.session.as_ref().map(RoomSession::id),
            io.store,
        );

        if self
            .avatar
            .emote
            .is_some_and(|e| e.is_expired(now, self.config.reconcile.emote_duration))
        {
            self.avatar.emote = None;
            io.network.publish_emote(None, false);
            self.events.push(SimEvent::EmoteEnded);
        }
    }

    fn step_avatar(&mut self, input: &InputFrame, dt: f32, now: f64, network: &mut dyn NetworkSink) {
        if self.avatar.is_seated() {
            if input.has_movement() {
                // The dismount is this frame's movement.
                self.stand(network);
            } else {
                self.seats.hold(&mut self.avatar);
            }
            return;
        }
        if self.avatar.emote.is_some() && input.has_movement() {
            self.avatar.emote = None;
            network.publish_emote(None, false);
            self.events.push(SimEvent::EmoteEnded);
        }

        let Some(session) = &self.session else {
            return;
        };
        let physics = &self.config.physics;
        let previous = self.avatar.position;
        let modifiers = MovementModifiers {
            speed_multiplier: self.mount_multiplier,
            surface: session.surface_at(previous, physics.slippery_decay),
        };
        let mut next = integrate(&self.avatar, input, dt, modifiers, physics);

        next.position.y = clamp_fall(previous.y, next.position.y, physics.max_fall_per_frame);
        let resolution =
            session
                .policy()
                .resolve(previous, next.position, physics.avatar_radius, previous.y);
        next.position = resolution.position;

        let descending = next.velocity.y <= 0.0;
        let probe = probe_point(previous, next.position, physics.landing_tolerance);
        let candidates = session.landing_candidates(probe, descending);
        match settle(
            next.position.y,
            next.velocity.y,
            &candidates,
            physics.landing_tolerance,
        ) {
            Some(height) => {
                if !self.avatar.grounded {
                    self.events.push(SimEvent::Landed { height });
                }
                next.position.y = height;
                next.velocity.y = 0.0;
                next.grounded = true;
            }
            None => next.grounded = false,
        }
        tracing::trace!(
            position = ?next.position,
            collided = resolution.collided,
            grounded = next.grounded,
            t = now,
            "avatar stepped"
        );
        self.avatar = next;
    }

    fn step_ball(&mut self, dt: f32, now: f64, network: &mut dyn NetworkSink) {
        let standing = !self.avatar.is_seated();
        let (position, velocity, radius) = (
            self.avatar.position,
            self.avatar.velocity,
            self.config.physics.avatar_radius,
        );
        let Some(session) = &mut self.session else {
            return;
        };
        session.step_ball(dt);
        let Some(ball) = session.ball_mut() else {
            return;
        };
        if standing {
            if let Some(kick) = ball.try_kick(position, velocity, radius) {
                network.publish_ball_kick(kick.position, kick.velocity);
                self.ball_republisher.on_kick(now);
                self.events.push(SimEvent::BallKicked {
                    position: kick.position,
                    velocity: kick.velocity,
                });
                return;
            }
        }
        self.ball_republisher
            .tick(now, ball.position, ball.velocity, ball.is_moving(), network);
    }

    fn scan(&mut self, now: f64, io: &mut Collaborators<'_>) {
        let Some(session) = &mut self.session else {
            return;
        };
        if self.avatar.is_seated() {
            if let Some(event) = self.scanner.clear() {
                self.events.push(SimEvent::Prompt(event));
            }
            return;
        }
        session.update_arrival_guard(self.avatar.position);

        let scans = self.scanner.scan_count();
        if let Some(event) = self.scanner.tick(session.index(), self.avatar.position) {
            self.events.push(SimEvent::Prompt(event));
        }
        if self.scanner.scan_count() == scans || session.arrival_guard() {
            return;
        }
        let Some(portal) = session.auto_portal_at(self.avatar.position).cloned() else {
            return;
        };
        if self.transitions.is_pending() {
            return;
        }
        tracing::debug!(portal = %portal.id, "auto-entering portal");
        let result = self.transitions.enter(&portal, now, io.entitlement);
        self.apply_transition(result, io.network);
    }

    fn apply_broadcasts(&mut self) {
        for broadcast in self.mailbox.drain_broadcasts() {
            match broadcast {
                RoomBroadcast::BallSync { position, velocity } => {
                    if let Some(ball) = self.session.as_mut().and_then(RoomSession::ball_mut) {
                        ball.apply_sync(position, velocity);
                        self.ball_republisher.on_remote_sync();
                    }
                }
                RoomBroadcast::Occupancy { room, count } => self.occupancy.apply(room, count),
            }
        }
    }

    // ---- discrete actions ----

    /// Apply a host action between frames.
    pub fn handle_action(&mut self, action: Action, io: &mut Collaborators<'_>) {
        tracing::debug!(?action, "action");
        match action {
            Action::Interact => self.interact(io),
            Action::Stand => self.stand(io.network),
            Action::Emote(kind) => self.start_emote(kind, io.network),
            Action::ClearEmote => {
                if !self.avatar.is_seated() && self.avatar.emote.take().is_some() {
                    io.network.publish_emote(None, false);
                    self.events.push(SimEvent::EmoteEnded);
                }
            }
            Action::Noop => {}
        }
    }

    fn interact(&mut self, io: &mut Collaborators<'_>) {
        if self.avatar.is_seated() {
            self.stand(io.network);
            return;
        }
        let (Some(session), Some(prompt)) = (&self.session, self.scanner.active().cloned()) else {
            return;
        };
        match prompt.category {
            InteractionCategory::Portal => {
                if let Some(portal) = session.portal(&prompt.id).cloned() {
                    let result = self.transitions.enter(&portal, self.clock, io.entitlement);
                    self.apply_transition(result, io.network);
                }
            }
            InteractionCategory::Seat => {
                if let Some(seat) = session.seat(&prompt.id).cloned() {
                    if let Some(emote) = self.seats.sit(&mut self.avatar, &seat, self.clock) {
                        io.network.publish_emote(Some(emote), true);
                        self.events.push(SimEvent::Seated {
                            seat_id: seat.id,
                            state: SeatState::of(&self.avatar),
                        });
                        if let Some(event) = self.scanner.clear() {
                            self.events.push(SimEvent::Prompt(event));
                        }
                    }
                }
            }
            category => {
                let Prompt { id, .. } = prompt;
                self.events
                    .push(SimEvent::InteractionRequested { category, id });
            }
        }
    }

    fn stand(&mut self, network: &mut dyn NetworkSink) {
        if let Some(released) = self.seats.stand(&mut self.avatar) {
            network.publish_emote(None, false);
            self.publisher.reset();
            self.events.push(SimEvent::Stood {
                seat_id: released.seat_id,
            });
        }
    }

    fn start_emote(&mut self, kind: EmoteKind, network: &mut dyn NetworkSink) {
        if self.avatar.is_seated() || self.session.is_none() {
            return;
        }
        self.avatar.emote = Some(Emote::new(kind, self.clock));
        network.publish_emote(Some(kind), kind.is_continuous());
        self.events.push(SimEvent::EmoteStarted(kind));
    }

    fn apply_transition(
        &mut self,
        result: Result<TransitionOutcome, TransitionError>,
        network: &mut dyn NetworkSink,
    ) {
        match result {
            Ok(TransitionOutcome::Teleported { position }) => {
                self.avatar.position = position;
                self.avatar.velocity.y = 0.0;
                self.avatar.grounded = false;
                self.publisher.reset();
                self.events.push(SimEvent::Teleported { position });
            }
            Ok(TransitionOutcome::Minigame(id)) => {
                self.events.push(SimEvent::MinigameLaunch(id));
            }
            Ok(TransitionOutcome::Pending { room }) => {
                self.events.push(SimEvent::TransitionPending { room });
            }
            Ok(TransitionOutcome::Committed(handoff)) => {
                if self.avatar.emote.is_some() {
                    network.publish_emote(None, false);
                }
                self.pending_spawn = handoff.spawn;
                self.teardown();
                self.events.push(SimEvent::RoomHandoff(handoff));
            }
            Err(e) => {
                tracing::debug!(error = %e, "transition rejected");
                self.events.push(SimEvent::TransitionRejected(e));
            }
        }
    }

    // ---- read access ----

    /// The local avatar as of the last step or action.
    pub fn avatar(&self) -> &AvatarState {
        &self.avatar
    }

    pub fn local_player(&self) -> PlayerId {
        self.local_player
    }

    /// Derived from the avatar's seat attachment.
    pub fn seat_state(&self) -> SeatState {
        SeatState::of(&self.avatar)
    }

    /// The loaded room, or `None` between a handoff and the next load.
    pub fn session(&self) -> Option<&RoomSession> {
        self.session.as_ref()
    }

    /// Room the transition manager considers active. After a handoff commits
    /// this is already the destination, while [`session`](Self::session) is
    /// still empty.
    pub fn current_room(&self) -> Option<&RoomId> {
        self.transitions.current()
    }

    /// Room transition state, including a pending gated check.
    pub fn transitions(&self) -> &RoomTransitionManager {
        &self.transitions
    }

    /// Prompt currently shown to the player, if any.
    pub fn active_prompt(&self) -> Option<&Prompt> {
        self.scanner.active()
    }

    pub fn reconciler(&self) -> &RemotePlayerReconciler {
        &self.reconciler
    }

    /// Latest per-room player counts from broadcasts.
    pub fn occupancy(&self) -> &OccupancyBoard {
        &self.occupancy
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Frames stepped since construction.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Session clock in seconds, the sum of clamped frame deltas.
    pub fn clock(&self) -> f64 {
        self.clock
    }

    /// Events emitted since the last drain.
    pub fn events(&self) -> &[SimEvent] {
        &self.events
    }

    /// Take every event emitted since the last drain.
    pub fn drain_events(&mut self) -> Vec<SimEvent> {
        std::mem::take(&mut self.events)
    }

    /// Acknowledge a remote avatar's new appearance.
    pub fn acknowledge_appearance(&mut self, player: PlayerId) {
        self.reconciler.acknowledge_appearance(player);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plaza_collision::{Aabb, BallArena, CircularBounds, PhysicsBall, RoomGeometry};
    use plaza_common::{Portal, PortalTarget, SeatDescriptor, SeatKind};
    use plaza_interact::PromptEvent;
    use plaza_net::{Outbound, RecordingSink};
    use plaza_persist::MemoryStore;
    use plaza_rooms::{AllowAll, EntitlementDecision, EntitlementPoll};

    const DT: f32 = 1.0 / 60.0;

    struct Harness {
        sink: RecordingSink,
        entitlement: Box<dyn EntitlementService>,
        store: MemoryStore,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                sink: RecordingSink::new(),
                entitlement: Box::new(AllowAll),
                store: MemoryStore::new(),
            }
        }

        fn io(&mut self) -> Collaborators<'_> {
            Collaborators {
                network: &mut self.sink,
                entitlement: self.entitlement.as_mut(),
                store: &mut self.store,
            }
        }
    }

    /// Never answers.
    struct Stalled;

    impl EntitlementService for Stalled {
        fn can_enter(&mut self, _room: &RoomId) -> EntitlementPoll {
            EntitlementPoll::Pending
        }
    }

    fn bench() -> SeatDescriptor {
        SeatDescriptor {
            id: "bench".into(),
            kind: SeatKind::Seat,
            anchor_position: Vec3::new(0.0, 0.0, 3.0),
            anchor_yaw: 0.0,
            seat_height: 0.5,
            snap_points: Vec::new(),
            bidirectional: false,
            platform_height: 0.0,
            dismount_direction: Default::default(),
            interact_radius: 1.5,
            y_band: None,
        }
    }

    fn door(id: &str, at: Vec3, room: &str, auto_enter: bool) -> Portal {
        Portal {
            id: id.into(),
            world_position: at,
            radius: 1.5,
            target: PortalTarget::Room(RoomId::new(room)),
            exit_spawn_offset: Vec3::new(0.0, 0.0, -2.5),
            auto_enter,
        }
    }

    fn town() -> RoomData {
        RoomData::new(RoomId::new("town"))
            .with_geometry(RoomGeometry::Circular(CircularBounds { radius: 20.0 }))
            .with_seat(bench())
            .with_portal(door("dojo-door", Vec3::new(10.0, 0.0, 0.0), "dojo", false))
    }

    fn context() -> SimulationContext {
        let mut ctx = SimulationContext::new(SimConfig::default(), PlayerId::new());
        ctx.load_room(town());
        ctx
    }

    fn run(ctx: &mut SimulationContext, h: &mut Harness, input: InputFrame, frames: usize) {
        for _ in 0..frames {
            ctx.step(&input, DT, &mut h.io());
        }
    }

    #[test]
    fn walking_into_the_wall_stays_inside() {
        let mut ctx = context();
        let mut h = Harness::new();
        run(&mut ctx, &mut h, InputFrame::forward(), 600);
        let p = ctx.avatar().position;
        assert!(Vec3::new(p.x, 0.0, p.z).length() <= 19.5 + 1e-3);
        assert!(ctx.avatar().grounded);
        assert_eq!(p.y, 0.0);
    }

    #[test]
    fn jump_leaves_ground_and_lands() {
        let mut ctx = context();
        let mut h = Harness::new();
        ctx.step(&InputFrame::jump(), DT, &mut h.io());
        assert!(!ctx.avatar().grounded);
        assert!(ctx.avatar().position.y > 0.0);
        run(&mut ctx, &mut h, InputFrame::idle(), 120);
        assert!(ctx.avatar().grounded);
        assert!(ctx
            .drain_events()
            .iter()
            .any(|e| matches!(e, SimEvent::Landed { height } if *height == 0.0)));
    }

    #[test]
    fn lands_on_collider_top() {
        let mut ctx = SimulationContext::new(SimConfig::default(), PlayerId::new());
        ctx.load_room(
            RoomData::new(RoomId::new("stage"))
                .with_geometry(RoomGeometry::Colliders(vec![Aabb::centered(
                    0.0, 0.0, 2.0, 2.0, 0.0, 1.0,
                )]))
                .with_spawn(Vec3::new(0.0, 4.0, 0.0), 0.0),
        );
        let mut h = Harness::new();
        run(&mut ctx, &mut h, InputFrame::idle(), 180);
        assert!(ctx.avatar().grounded);
        assert_eq!(ctx.avatar().position.y, 1.0);
    }

    #[test]
    fn scanner_runs_every_nth_frame_and_sits() {
        let mut ctx = context();
        let mut h = Harness::new();
        ctx.step(&InputFrame::idle(), DT, &mut h.io());
        // Spawn at origin is outside every radius.
        assert!(ctx.active_prompt().is_none());

        ctx.avatar.position = Vec3::new(0.0, 0.0, 2.5);
        run(&mut ctx, &mut h, InputFrame::idle(), 10);
        assert_eq!(ctx.active_prompt().map(|p| p.id.as_str()), Some("bench"));

        ctx.handle_action(Action::Interact, &mut h.io());
        assert_eq!(ctx.seat_state(), SeatState::Seated);
        assert_eq!(ctx.avatar().position, Vec3::new(0.0, 0.5, 3.0));
        assert!(h.sink.emotes().contains(&(Some(EmoteKind::Sit), true)));
        assert!(ctx.active_prompt().is_none());
    }

    #[test]
    fn seated_avatar_ignores_gravity_and_stands_on_movement() {
        let mut ctx = context();
        let mut h = Harness::new();
        ctx.avatar.position = Vec3::new(0.0, 0.0, 2.5);
        run(&mut ctx, &mut h, InputFrame::idle(), 1);
        ctx.handle_action(Action::Interact, &mut h.io());

        run(&mut ctx, &mut h, InputFrame::idle(), 30);
        assert_eq!(ctx.avatar().position, Vec3::new(0.0, 0.5, 3.0));

        ctx.step(&InputFrame::forward(), DT, &mut h.io());
        assert_eq!(ctx.seat_state(), SeatState::Standing);
        let p = ctx.avatar().position;
        assert!((p.z - 4.2).abs() < 1e-5);
        assert_eq!(p.y, 0.0);
        assert!(h.sink.emotes().contains(&(None, false)));

        // Standing hands control back: the next forward frame walks.
        ctx.step(&InputFrame::forward(), DT, &mut h.io());
        let walk_speed = ctx.config().physics.walk_speed;
        assert_eq!(walk_speed, 6.0);
        assert!((ctx.avatar().velocity.z - walk_speed).abs() < 1e-5);
        assert!(ctx.avatar().position.z > p.z);
        assert_eq!(ctx.seat_state(), SeatState::Standing);
    }

    #[test]
    fn interact_on_portal_hands_off_and_returns() {
        let mut ctx = context();
        let mut h = Harness::new();
        ctx.avatar.position = Vec3::new(9.5, 0.0, 0.0);
        run(&mut ctx, &mut h, InputFrame::idle(), 1);
        ctx.handle_action(Action::Interact, &mut h.io());

        let handoff = ctx
            .drain_events()
            .into_iter()
            .find_map(|e| match e {
                SimEvent::RoomHandoff(handoff) => Some(handoff),
                _ => None,
            })
            .unwrap();
        assert_eq!(handoff.to, RoomId::new("dojo"));
        assert!(ctx.session().is_none());

        ctx.load_room(
            RoomData::new(RoomId::new("dojo"))
                .with_portal(door("exit", Vec3::new(0.0, 0.0, 5.0), "town", true))
                .with_spawn(Vec3::new(0.0, 0.0, 5.0), 0.0),
        );
        assert_eq!(ctx.current_room(), Some(&RoomId::new("dojo")));

        // Spawned on an auto-enter portal: the arrival guard holds.
        run(&mut ctx, &mut h, InputFrame::idle(), 30);
        assert_eq!(ctx.current_room(), Some(&RoomId::new("dojo")));
        assert!(ctx.session().is_some());

        // Walk away, then back in.
        ctx.avatar.position = Vec3::new(0.0, 0.0, 0.0);
        run(&mut ctx, &mut h, InputFrame::idle(), 10);
        ctx.avatar.position = Vec3::new(0.0, 0.0, 5.0);
        run(&mut ctx, &mut h, InputFrame::idle(), 10);
        assert!(ctx.session().is_none());

        ctx.load_room(town());
        assert_eq!(ctx.avatar().position, Vec3::new(10.0, 0.0, -2.5));
    }

    #[test]
    fn gated_room_stays_pending_then_times_out() {
        let mut ctx = context();
        let mut h = Harness::new();
        h.entitlement = Box::new(Stalled);
        ctx.set_access(RoomId::new("dojo"), RoomAccess::gated(None));
        ctx.avatar.position = Vec3::new(9.5, 0.0, 0.0);
        run(&mut ctx, &mut h, InputFrame::idle(), 1);
        ctx.handle_action(Action::Interact, &mut h.io());
        assert!(ctx.transitions().is_pending());

        // Movement input still applies while pending.
        let z_before = ctx.avatar().position.z;
        run(&mut ctx, &mut h, InputFrame::forward(), 10);
        assert!(ctx.avatar().position.z > z_before);

        // Default timeout is 10 s; frames are clamped to 0.1 s.
        for _ in 0..110 {
            ctx.step(&InputFrame::idle(), 0.1, &mut h.io());
        }
        assert!(!ctx.transitions().is_pending());
        assert_eq!(ctx.current_room(), Some(&RoomId::new("town")));
        assert!(ctx.drain_events().iter().any(|e| matches!(
            e,
            SimEvent::TransitionRejected(TransitionError::TimedOut { .. })
        )));
    }

    #[test]
    fn gated_room_commits_when_entitled() {
        struct AllowLater(u32);
        impl EntitlementService for AllowLater {
            fn can_enter(&mut self, _room: &RoomId) -> EntitlementPoll {
                if self.0 == 0 {
                    EntitlementPoll::Ready(EntitlementDecision::allow())
                } else {
                    self.0 -= 1;
                    EntitlementPoll::Pending
                }
            }
        }
        let mut ctx = context();
        let mut h = Harness::new();
        h.entitlement = Box::new(AllowLater(3));
        ctx.set_access(RoomId::new("dojo"), RoomAccess::gated(None));
        ctx.avatar.position = Vec3::new(9.5, 0.0, 0.0);
        run(&mut ctx, &mut h, InputFrame::idle(), 1);
        ctx.handle_action(Action::Interact, &mut h.io());
        assert!(ctx.session().is_some());
        run(&mut ctx, &mut h, InputFrame::idle(), 5);
        assert!(ctx.session().is_none());
        assert_eq!(ctx.current_room(), Some(&RoomId::new("dojo")));
    }

    #[derive(Default)]
    struct CancelLog(std::rc::Rc<std::cell::RefCell<Vec<RoomId>>>);

    /// Allows after `remaining` polls and records every cancel.
    struct SlowGate {
        remaining: u32,
        cancelled: CancelLog,
    }

    impl EntitlementService for SlowGate {
        fn can_enter(&mut self, _room: &RoomId) -> EntitlementPoll {
            if self.remaining == 0 {
                EntitlementPoll::Ready(EntitlementDecision::allow())
            } else {
                self.remaining -= 1;
                EntitlementPoll::Pending
            }
        }

        fn cancel(&mut self, room: &RoomId) {
            self.cancelled.0.borrow_mut().push(room.clone());
        }
    }

    #[test]
    fn reloading_the_current_room_abandons_a_pending_check() {
        let mut ctx = context();
        let mut h = Harness::new();
        let log = CancelLog::default();
        h.entitlement = Box::new(SlowGate {
            remaining: 3,
            cancelled: CancelLog(log.0.clone()),
        });
        ctx.set_access(RoomId::new("dojo"), RoomAccess::gated(None));
        ctx.avatar.position = Vec3::new(9.5, 0.0, 0.0);
        run(&mut ctx, &mut h, InputFrame::idle(), 1);
        ctx.handle_action(Action::Interact, &mut h.io());
        assert!(ctx.transitions().is_pending());

        ctx.load_room(town());
        assert!(!ctx.transitions().is_pending());
        run(&mut ctx, &mut h, InputFrame::idle(), 5);

        assert!(ctx.session().is_some());
        assert_eq!(ctx.current_room(), Some(&RoomId::new("town")));
        assert_eq!(*log.0.borrow(), vec![RoomId::new("dojo")]);
        assert!(!ctx.drain_events().iter().any(|e| matches!(e, SimEvent::RoomHandoff(_))));
    }

    #[test]
    fn loading_another_room_abandons_a_pending_check() {
        let mut ctx = context();
        let mut h = Harness::new();
        let log = CancelLog::default();
        h.entitlement = Box::new(SlowGate {
            remaining: 3,
            cancelled: CancelLog(log.0.clone()),
        });
        ctx.set_access(RoomId::new("dojo"), RoomAccess::gated(None));
        ctx.avatar.position = Vec3::new(9.5, 0.0, 0.0);
        run(&mut ctx, &mut h, InputFrame::idle(), 1);
        ctx.handle_action(Action::Interact, &mut h.io());

        ctx.load_room(RoomData::new(RoomId::new("lodge")));
        // Leaving before the next frame still forwards the queued cancel once.
        ctx.leave_room(h.entitlement.as_mut());
        run(&mut ctx, &mut h, InputFrame::idle(), 5);
        assert_eq!(*log.0.borrow(), vec![RoomId::new("dojo")]);
        assert_eq!(ctx.current_room(), Some(&RoomId::new("lodge")));
    }

    #[test]
    fn resume_records_use_the_host_wall_clock() {
        let mut ctx = context();
        let mut h = Harness::new();
        run(&mut ctx, &mut h, InputFrame::idle(), 1);
        let first = ResumeRecord::load(&h.store).unwrap().unwrap();
        assert!(first.timestamp < 1.0);

        ctx.set_wall_clock(1_700_000_000.0);
        for _ in 0..60 {
            ctx.step(&InputFrame::idle(), 0.1, &mut h.io());
        }
        let later = ResumeRecord::load(&h.store).unwrap().unwrap();
        assert!(later.timestamp >= 1_700_000_000.0);
        assert!(later.timestamp <= 1_700_000_000.0 + 6.0);
    }

    #[test]
    fn roof_teleport_moves_without_room_change() {
        let mut ctx = SimulationContext::new(SimConfig::default(), PlayerId::new());
        let mut ladder = door("ladder", Vec3::ZERO, "", false);
        ladder.target = PortalTarget::RoofTeleport {
            position: Vec3::new(3.0, 6.0, 3.0),
        };
        ctx.load_room(RoomData::new(RoomId::new("town")).with_portal(ladder));
        let mut h = Harness::new();
        run(&mut ctx, &mut h, InputFrame::idle(), 1);
        ctx.handle_action(Action::Interact, &mut h.io());
        assert_eq!(ctx.avatar().position, Vec3::new(3.0, 6.0, 3.0));
        assert_eq!(ctx.avatar().velocity.y, 0.0);
        assert_eq!(ctx.current_room(), Some(&RoomId::new("town")));
    }

    #[test]
    fn other_prompts_are_forwarded_to_host() {
        let mut ctx = SimulationContext::new(SimConfig::default(), PlayerId::new());
        ctx.load_room(RoomData::new(RoomId::new("lodge")).with_spot(plaza_common::InteractionSpot {
            id: "pond".into(),
            category: InteractionCategory::Fishing,
            position: Vec3::ZERO,
            radius: 2.0,
            y_band: None,
            link: None,
        }));
        let mut h = Harness::new();
        run(&mut ctx, &mut h, InputFrame::idle(), 1);
        ctx.handle_action(Action::Interact, &mut h.io());
        let events = ctx.drain_events();
        assert!(events.contains(&SimEvent::Prompt(PromptEvent::Entered(Prompt::new(
            InteractionCategory::Fishing,
            "pond"
        )))));
        assert!(events.contains(&SimEvent::InteractionRequested {
            category: InteractionCategory::Fishing,
            id: "pond".into(),
        }));
    }

    #[test]
    fn emotes_expire_or_break_on_movement() {
        let mut ctx = context();
        let mut h = Harness::new();
        ctx.handle_action(Action::Emote(EmoteKind::Wave), &mut h.io());
        assert!(h.sink.emotes().contains(&(Some(EmoteKind::Wave), false)));
        run(&mut ctx, &mut h, InputFrame::idle(), 200);
        assert!(ctx.avatar().emote.is_none());

        ctx.handle_action(Action::Emote(EmoteKind::Dance), &mut h.io());
        run(&mut ctx, &mut h, InputFrame::idle(), 400);
        assert!(ctx.avatar().emote.is_some());
        ctx.step(&InputFrame::forward(), DT, &mut h.io());
        assert!(ctx.avatar().emote.is_none());
    }

    #[test]
    fn position_publish_is_throttled() {
        let mut ctx = context();
        let mut h = Harness::new();
        run(&mut ctx, &mut h, InputFrame::forward(), 60);
        let sent = h.sink.positions();
        assert!((9..=11).contains(&sent), "sent {sent}");
    }

    #[test]
    fn remote_players_are_reconciled_each_frame() {
        let mut ctx = context();
        let mut h = Harness::new();
        let other = PlayerId::new();
        let mut snap = RemotePlayerSnapshot::at(other, Vec3::new(5.0, 1.0, 5.0), 0.0);
        snap.seated = true;
        ctx.ingest_snapshot(snap);
        ctx.step(&InputFrame::idle(), DT, &mut h.io());
        assert_eq!(
            ctx.reconciler().avatar(other).unwrap().position,
            Vec3::new(5.0, 1.0, 5.0)
        );

        ctx.ingest_broadcast(RoomBroadcast::Occupancy {
            room: RoomId::new("town"),
            count: 7,
        });
        ctx.step(&InputFrame::idle(), DT, &mut h.io());
        assert_eq!(ctx.occupancy().count(&RoomId::new("town")), Some(7));
    }

    #[test]
    fn leaving_a_room_tears_everything_down() {
        let mut ctx = context();
        let mut h = Harness::new();
        ctx.ingest_snapshot(RemotePlayerSnapshot::at(PlayerId::new(), Vec3::X, 0.0));
        ctx.avatar.position = Vec3::new(0.0, 0.0, 2.5);
        run(&mut ctx, &mut h, InputFrame::idle(), 1);
        assert!(ctx.active_prompt().is_some());
        ctx.leave_room(h.entitlement.as_mut());
        assert!(ctx.session().is_none());
        assert!(ctx.active_prompt().is_none());
        ctx.step(&InputFrame::idle(), DT, &mut h.io());
        assert!(ctx.reconciler().is_empty());
    }

    #[test]
    fn walking_into_the_ball_kicks_it() {
        let mut ctx = SimulationContext::new(SimConfig::default(), PlayerId::new());
        ctx.load_room(
            RoomData::new(RoomId::new("pitch"))
                .with_ball(PhysicsBall::new(Vec3::new(0.0, 0.5, 1.5), 0.5), BallArena::default()),
        );
        let mut h = Harness::new();
        run(&mut ctx, &mut h, InputFrame::forward(), 30);
        assert!(h.sink.ball_kicks() >= 1);
        assert!(ctx.drain_events().iter().any(|e| matches!(e, SimEvent::BallKicked { .. })));
        assert!(ctx.session().unwrap().ball().unwrap().position.z > 1.5);
    }

    #[test]
    fn ball_sync_overwrites_local_ball() {
        let mut ctx = SimulationContext::new(SimConfig::default(), PlayerId::new());
        ctx.load_room(
            RoomData::new(RoomId::new("pitch"))
                .with_ball(PhysicsBall::new(Vec3::new(0.0, 0.5, 8.0), 0.5), BallArena::default()),
        );
        let mut h = Harness::new();
        ctx.ingest_broadcast(RoomBroadcast::BallSync {
            position: Vec3::new(4.0, 0.5, 4.0),
            velocity: Vec3::ZERO,
        });
        ctx.step(&InputFrame::idle(), DT, &mut h.io());
        let ball = ctx.session().unwrap().ball().unwrap();
        assert!(ball.position.distance(Vec3::new(4.0, 0.5, 4.0)) < 1e-3);
    }

    #[test]
    fn resume_record_is_offered_and_restored() {
        let mut ctx = context();
        let mut h = Harness::new();
        ctx.avatar.position = Vec3::new(2.0, 0.0, -1.0);
        ctx.step(&InputFrame::idle(), DT, &mut h.io());
        let record = ResumeRecord::load(&h.store).unwrap().unwrap();
        assert_eq!(record.room, "town");

        let mut fresh = SimulationContext::new(SimConfig::default(), PlayerId::new());
        let room = fresh.resume_from(&record);
        assert_eq!(room, RoomId::new("town"));
        fresh.load_room(town());
        assert_eq!(fresh.avatar().position, record.position());
    }

    #[test]
    fn sitting_publishes_the_seated_flag_once() {
        let mut ctx = context();
        let mut h = Harness::new();
        ctx.avatar.position = Vec3::new(0.0, 0.0, 2.5);
        run(&mut ctx, &mut h, InputFrame::idle(), 1);
        ctx.handle_action(Action::Interact, &mut h.io());
        h.sink.clear();
        run(&mut ctx, &mut h, InputFrame::idle(), 10);
        let seated_updates = h
            .sink
            .sent
            .iter()
            .filter(|m| matches!(m, Outbound::Position { aux, .. } if aux.seated))
            .count();
        assert_eq!(seated_updates, 1);
    }
}
