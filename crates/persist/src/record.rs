use crate::store::{KeyValueStore, StoreError};
use glam::Vec3;
use plaza_common::RoomId;
use serde::{Deserialize, Serialize};

/// Store key for the local player's resume record.
pub const RESUME_KEY: &str = "plaza.resume";

/// Last known local position, offered for resume-on-reload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResumeRecord {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub room: String,
    /// Unix seconds when the host supplied a wall clock through
    /// [`ResumeWriter::set_epoch`]; otherwise seconds on the session clock,
    /// which restarts at zero every run.
    pub timestamp: f64,
}

impl ResumeRecord {
    pub fn new(position: Vec3, room: &RoomId, timestamp: f64) -> Self {
        Self {
            x: position.x,
            y: position.y,
            z: position.z,
            room: room.as_str().to_string(),
            timestamp,
        }
    }

    /// Stored position as a vector.
    pub fn position(&self) -> Vec3 {
        Vec3::new(self.x, self.y, self.z)
    }

    /// Stored room name as an id.
    pub fn room_id(&self) -> RoomId {
        RoomId::new(self.room.clone())
    }

    /// Serialize under [`RESUME_KEY`], replacing any earlier record.
    pub fn save(&self, store: &mut dyn KeyValueStore) -> Result<(), StoreError> {
        store.put(RESUME_KEY, &serde_json::to_string(self)?)
    }

    /// Read the stored record, if any. A malformed value is an error.
    pub fn load(store: &dyn KeyValueStore) -> Result<Option<Self>, StoreError> {
        match store.get(RESUME_KEY)? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }
}

/// Offers the resume record on a fixed cadence.
///
/// Store failures are logged and retried at the next interval; they never
/// interrupt the frame.
#[derive(Debug, Clone)]
pub struct ResumeWriter {
    interval: f64,
    /// Added to the session clock when stamping records.
    epoch: f64,
    last_offer: Option<f64>,
    offers: u64,
}

impl ResumeWriter {
    pub fn new(interval: f64) -> Self {
        Self {
            interval,
            epoch: 0.0,
            last_offer: None,
            offers: 0,
        }
    }

    /// Anchor record timestamps to a wall clock: `epoch` is the wall time,
    /// in Unix seconds, at which the session clock read zero. The offer
    /// cadence keeps running on the session clock.
    pub fn set_epoch(&mut self, epoch: f64) {
        self.epoch = epoch;
    }

    /// True before the first offer and once `interval` has elapsed since.
    pub fn is_due(&self, now: f64) -> bool {
        self.last_offer.is_none_or(|last| now - last >= self.interval)
    }

    /// Write a record if the interval elapsed and the avatar is in a room.
    /// Returns whether a record was stored.
    pub fn tick(
        &mut self,
        now: f64,
        position: Vec3,
        room: Option<&RoomId>,
        store: &mut dyn KeyValueStore,
    ) -> bool {
        let Some(room) = room else {
            return false;
        };
        if !self.is_due(now) {
            return false;
        }
        self.flush(now, position, room, store)
    }

    /// Write a record now, regardless of the cadence.
    pub fn flush(
        &mut self,
        now: f64,
        position: Vec3,
        room: &RoomId,
        store: &mut dyn KeyValueStore,
    ) -> bool {
        self.last_offer = Some(now);
        match ResumeRecord::new(position, room, self.epoch + now).save(store) {
            Ok(()) => {
                self.offers += 1;
                tracing::trace!(%room, ?position, "resume record stored");
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to store resume record");
                false
            }
        }
    }

    /// Records successfully stored so far.
    pub fn offers(&self) -> u64 {
        self.offers
    }
}
