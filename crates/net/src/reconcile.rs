use crate::boundary::RemotePlayerSnapshot;
use crate::mailbox::SnapshotMailbox;
use glam::Vec3;
use plaza_common::math::{lerp_angle, smoothing_alpha};
use plaza_common::{Emote, EmoteKind, PlayerId, ReconcileConfig};
use std::collections::BTreeMap;

/// What the host renders for one remote player.
///
/// Distinct from the snapshot: it trails the snapshot by the smoothing and
/// is the only remote state ever shown.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedAvatar {
    pub player_id: PlayerId,
    pub position: Vec3,
    pub yaw: f32,
    pub seated: bool,
    pub emote: Option<Emote>,
    pub appearance_version: u32,
    /// Set when the appearance version changed; cleared by the host.
    pub appearance_dirty: bool,
    /// Accumulated animation time, advanced at the LOD cadence.
    pub animation_time: f32,
    last_snapshot_emote: Option<EmoteKind>,
    unapplied_animation_dt: f32,
}

impl RenderedAvatar {
    fn spawn(snapshot: &RemotePlayerSnapshot, now: f64) -> Self {
        Self {
            player_id: snapshot.player_id,
            position: snapshot.position,
            yaw: snapshot.yaw,
            seated: snapshot.seated,
            emote: snapshot.emote.map(|kind| Emote::new(kind, now)),
            appearance_version: snapshot.appearance_version,
            appearance_dirty: true,
            animation_time: 0.0,
            last_snapshot_emote: snapshot.emote,
            unapplied_animation_dt: 0.0,
        }
    }
}

/// Counters from one reconcile pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileStats {
    pub smoothed: usize,
    pub snapped: usize,
    pub animated: usize,
    pub spawned: usize,
    pub pruned: usize,
}

/// Smooths rendered remote avatars toward their latest snapshots.
#[derive(Debug, Clone)]
pub struct RemotePlayerReconciler {
    config: ReconcileConfig,
    lod_distance: f32,
    avatars: BTreeMap<PlayerId, RenderedAvatar>,
    frame: u64,
}

impl RemotePlayerReconciler {
    /// `lod_distance` is the device-adjusted animation LOD distance.
    pub fn new(config: &ReconcileConfig, lod_distance: f32) -> Self {
        Self {
            config: config.clone(),
            lod_distance,
            avatars: BTreeMap::new(),
            frame: 0,
        }
    }

    /// One frame of reconciliation against the mailbox.
    ///
    /// `viewer` is the local avatar position used for animation LOD.
    pub fn update(
        &mut self,
        mailbox: &SnapshotMailbox,
        viewer: Vec3,
        now: f64,
        dt: f32,
    ) -> ReconcileStats {
        let _span = tracing::trace_span!("reconcile", remotes = mailbox.len()).entered();
        let mut stats = ReconcileStats::default();
        self.frame = self.frame.wrapping_add(1);

        let before = self.avatars.len();
        self.avatars.retain(|id, _| mailbox.contains(*id));
        stats.pruned = before - self.avatars.len();

        let animate_far = self.frame % u64::from(self.config.animation_lod_interval.max(1)) == 0;
        let lod_sq = self.lod_distance * self.lod_distance;
        let snap_sq = self.config.snap_distance * self.config.snap_distance;
        let ah = smoothing_alpha(self.config.horizontal_rate, dt);
        let av = smoothing_alpha(self.config.vertical_rate, dt);
        let ar = smoothing_alpha(self.config.rotation_rate, dt);

        for snapshot in mailbox.snapshots() {
            let avatar = match self.avatars.entry(snapshot.player_id) {
                std::collections::btree_map::Entry::Occupied(e) => e.into_mut(),
                std::collections::btree_map::Entry::Vacant(e) => {
                    tracing::debug!(player = ?snapshot.player_id, "remote avatar spawned");
                    stats.spawned += 1;
                    e.insert(RenderedAvatar::spawn(snapshot, now))
                }
            };

            // Transform.
            avatar.seated = snapshot.seated;
            if snapshot.seated || avatar.position.distance_squared(snapshot.position) > snap_sq {
                avatar.position = snapshot.position;
                avatar.yaw = snapshot.yaw;
                stats.snapped += 1;
            } else {
                let d = snapshot.position - avatar.position;
                avatar.position += Vec3::new(d.x * ah, d.y * av, d.z * ah);
                avatar.yaw = lerp_angle(avatar.yaw, snapshot.yaw, ar);
                stats.smoothed += 1;
            }

            // Emotes follow changes of the snapshot's emote id only.
            if snapshot.emote != avatar.last_snapshot_emote {
                avatar.last_snapshot_emote = snapshot.emote;
                avatar.emote = snapshot.emote.map(|kind| Emote::new(kind, now));
            }
            if avatar
                .emote
                .is_some_and(|e| e.is_expired(now, self.config.emote_duration))
            {
                avatar.emote = None;
            }

            if snapshot.appearance_version != avatar.appearance_version {
                avatar.appearance_version = snapshot.appearance_version;
                avatar.appearance_dirty = true;
            }

            // Animation LOD.
            avatar.unapplied_animation_dt += dt;
            let far = avatar.position.distance_squared(viewer) > lod_sq;
            if !far || animate_far {
                avatar.animation_time += avatar.unapplied_animation_dt;
                avatar.unapplied_animation_dt = 0.0;
                stats.animated += 1;
            }
        }
        tracing::trace!(?stats, "reconciled");
        stats
    }

    /// Rendered state of one remote player.
    pub fn avatar(&self, player: PlayerId) -> Option<&RenderedAvatar> {
        self.avatars.get(&player)
    }

    pub fn avatars(&self) -> impl Iterator<Item = &RenderedAvatar> {
        self.avatars.values()
    }

    pub fn len(&self) -> usize {
        self.avatars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.avatars.is_empty()
    }

    /// The host applied the new appearance.
    pub fn acknowledge_appearance(&mut self, player: PlayerId) {
        if let Some(avatar) = self.avatars.get_mut(&player) {
            avatar.appearance_dirty = false;
        }
    }

    /// Room teardown.
    pub fn clear(&mut self) {
        self.avatars.clear();
    }
}
