//! Developer tooling: read-only views over a running simulation.
//!
//! # Invariants
//! - Inspectors never mutate the simulation they look at.

mod inspector;

pub use inspector::{RemoteInfo, SimInspector, SimSummary};
