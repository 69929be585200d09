use crate::boundary::{RemotePlayerSnapshot, RoomBroadcast};
use plaza_common::{PlayerId, RoomId};
use std::collections::{BTreeMap, BTreeSet};

/// Latest snapshot per remote player, plus queued room broadcasts.
///
/// Last snapshot wins: a newer arrival overwrites whatever was there, with
/// no ordering check on timestamps. The local player's own echo is ignored.
#[derive(Debug, Clone)]
pub struct SnapshotMailbox {
    local: PlayerId,
    latest: BTreeMap<PlayerId, RemotePlayerSnapshot>,
    broadcasts: Vec<RoomBroadcast>,
    overwritten: u64,
}

impl SnapshotMailbox {
    pub fn new(local: PlayerId) -> Self {
        Self {
            local,
            latest: BTreeMap::new(),
            broadcasts: Vec::new(),
            overwritten: 0,
        }
    }

    /// Store `snapshot` as the player's latest state.
    pub fn deliver(&mut self, snapshot: RemotePlayerSnapshot) {
        if snapshot.player_id == self.local {
            return;
        }
        if self.latest.insert(snapshot.player_id, snapshot).is_some() {
            self.overwritten += 1;
        }
    }

    /// Replace the whole roster: players missing from `snapshots` are gone.
    pub fn replace_roster(&mut self, snapshots: impl IntoIterator<Item = RemotePlayerSnapshot>) {
        let mut present = BTreeSet::new();
        for snapshot in snapshots {
            present.insert(snapshot.player_id);
            self.deliver(snapshot);
        }
        self.latest.retain(|id, _| present.contains(id));
    }

    pub fn remove(&mut self, player: PlayerId) -> Option<RemotePlayerSnapshot> {
        self.latest.remove(&player)
    }

    /// Latest snapshot for `player`, if one arrived since the last teardown.
    pub fn latest(&self, player: PlayerId) -> Option<&RemotePlayerSnapshot> {
        self.latest.get(&player)
    }

    pub fn contains(&self, player: PlayerId) -> bool {
        self.latest.contains_key(&player)
    }

    pub fn snapshots(&self) -> impl Iterator<Item = &RemotePlayerSnapshot> {
        self.latest.values()
    }

    pub fn len(&self) -> usize {
        self.latest.len()
    }

    pub fn is_empty(&self) -> bool {
        self.latest.is_empty()
    }

    /// Snapshots replaced before they were ever consumed.
    pub fn overwritten(&self) -> u64 {
        self.overwritten
    }

    /// Queue a broadcast for the next frame.
    pub fn push_broadcast(&mut self, broadcast: RoomBroadcast) {
        self.broadcasts.push(broadcast);
    }

    /// Take queued broadcasts in arrival order.
    pub fn drain_broadcasts(&mut self) -> Vec<RoomBroadcast> {
        std::mem::take(&mut self.broadcasts)
    }

    /// Room teardown: forget every remote player and pending broadcast.
    pub fn clear(&mut self) {
        self.latest.clear();
        self.broadcasts.clear();
    }
}

/// Player counts per room, fed by occupancy broadcasts.
///
/// Each broadcast replaces the room's previous count. Rooms never reported
/// have no entry rather than a zero.
#[derive(Debug, Clone, Default)]
pub struct OccupancyBoard {
    counts: BTreeMap<RoomId, u32>,
}

impl OccupancyBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the latest count for `room`.
    pub fn apply(&mut self, room: RoomId, count: u32) {
        self.counts.insert(room, count);
    }

    /// `None` until a broadcast reports `room`.
    pub fn count(&self, room: &RoomId) -> Option<u32> {
        self.counts.get(room).copied()
    }

    /// Sum over every reported room, saturating at `u32::MAX`.
    pub fn total(&self) -> u32 {
        self.counts
            .values()
            .fold(0u32, |acc, &count| acc.saturating_add(count))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&RoomId, u32)> {
        self.counts.iter().map(|(room, count)| (room, *count))
    }
}
