//! Persistence boundary: resume-on-reload record and key-value stores.
//!
//! # Invariants
//! - The resume record is a flat `{x, y, z, room, timestamp}` JSON object.
//! - Stored values are verifiable; corrupted values are rejected on read.
//! - Store failures are never fatal to the simulation.

mod record;
mod store;

pub use record::{RESUME_KEY, ResumeRecord, ResumeWriter};
pub use store::{FileStore, KeyValueStore, MemoryStore, StoreError};
