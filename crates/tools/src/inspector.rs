use plaza_common::{EmoteKind, PlayerId};
use plaza_kernel::{SeatState, SimulationContext};

/// Simulation inspector for developer tooling.
///
/// Read-only queries against a [`SimulationContext`] for debugging and
/// headless runs.
pub struct SimInspector;

impl SimInspector {
    /// One-line view of the local player and frame.
    pub fn summary(ctx: &SimulationContext) -> SimSummary {
        let avatar = ctx.avatar();
        SimSummary {
            frame: ctx.frame(),
            clock: ctx.clock(),
            room: ctx.current_room().map(|r| r.as_str().to_string()),
            position: avatar.position.to_array(),
            yaw: avatar.yaw,
            grounded: avatar.grounded,
            seat: ctx.seat_state(),
            emote: avatar.emote.map(|e| e.kind),
            prompt: ctx.active_prompt().map(|p| p.id.clone()),
            transition_pending: ctx.transitions().is_pending(),
            remote_count: ctx.reconciler().len(),
            pending_events: ctx.events().len(),
        }
    }

    /// Details of one remote avatar, if it is in the room.
    pub fn inspect_remote(ctx: &SimulationContext, id: PlayerId) -> Option<RemoteInfo> {
        ctx.reconciler().avatar(id).map(|a| RemoteInfo {
            id,
            position: a.position.to_array(),
            yaw: a.yaw,
            seated: a.seated,
            emote: a.emote.map(|e| e.kind),
            appearance_dirty: a.appearance_dirty,
        })
    }

    /// Remote ids in the order the reconciler keeps them.
    pub fn list_remotes(ctx: &SimulationContext) -> Vec<PlayerId> {
        ctx.reconciler().avatars().map(|a| a.player_id).collect()
    }
}

/// Snapshot returned by [`SimInspector::summary`].
#[derive(Debug, Clone)]
pub struct SimSummary {
    pub frame: u64,
    pub clock: f64,
    pub room: Option<String>,
    pub position: [f32; 3],
    pub yaw: f32,
    pub grounded: bool,
    pub seat: SeatState,
    pub emote: Option<EmoteKind>,
    pub prompt: Option<String>,
    pub transition_pending: bool,
    pub remote_count: usize,
    pub pending_events: usize,
}

impl std::fmt::Display for SimSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Sim: frame={} t={:.2}s room={} pos=({:.2}, {:.2}, {:.2}) yaw={:.2} grounded={} seat={:?} prompt={} remotes={}",
            self.frame,
            self.clock,
            self.room.as_deref().unwrap_or("-"),
            self.position[0],
            self.position[1],
            self.position[2],
            self.yaw,
            self.grounded,
            self.seat,
            self.prompt.as_deref().unwrap_or("-"),
            self.remote_count,
        )?;
        if self.transition_pending {
            write!(f, " (transition pending)")?;
        }
        Ok(())
    }
}

/// One reconciled remote avatar.
#[derive(Debug, Clone)]
pub struct RemoteInfo {
    pub id: PlayerId,
    pub position: [f32; 3],
    pub yaw: f32,
    pub seated: bool,
    pub emote: Option<EmoteKind>,
    pub appearance_dirty: bool,
}

impl std::fmt::Display for RemoteInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Remote [{:.8}] pos=({:.2}, {:.2}, {:.2}) seated={}",
            &self.id.0.to_string()[..8],
            self.position[0],
            self.position[1],
            self.position[2],
            self.seated,
        )?;
        if let Some(emote) = self.emote {
            write!(f, " emote={emote:?}")?;
        }
        Ok(())
    }
}
