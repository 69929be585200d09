//! Network sync: outbound publishing, inbound mailbox, remote reconciliation.
//!
//! # Invariants
//! - Remote players are never integrated; they only follow snapshots.
//! - The mailbox holds at most one snapshot per remote id (last wins).
//! - Outbound position traffic is throttled; local simulation never waits on it.

mod boundary;
mod mailbox;
mod publisher;
mod reconcile;

pub use boundary::{
    NetworkSink, Outbound, PositionAux, RecordingSink, RemotePlayerSnapshot, RoomBroadcast,
};
pub use mailbox::{OccupancyBoard, SnapshotMailbox};
pub use publisher::{BallRepublisher, PositionPublisher};
pub use reconcile::{ReconcileStats, RemotePlayerReconciler, RenderedAvatar};
