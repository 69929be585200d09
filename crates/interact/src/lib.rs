//! Interaction detection: proximity index and throttled prompt scanner.
//!
//! # Invariants
//! - At most one active prompt; precedence follows `InteractionCategory` order.
//! - Prompt events fire only when the active id changes (enter, change, clear).
//! - Dangling references are dropped at index build time, never at scan time.

mod index;
mod scanner;

pub use index::{Candidate, InteractionIndex};
pub use scanner::{InteractionScanner, Prompt, PromptEvent};
