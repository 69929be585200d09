use crate::index::InteractionIndex;
use glam::Vec3;
use plaza_common::InteractionCategory;
use std::collections::BTreeMap;

/// The prompt currently offered to the player.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Prompt {
    pub category: InteractionCategory,
    pub id: String,
}

impl Prompt {
    pub fn new(category: InteractionCategory, id: impl Into<String>) -> Self {
        Self {
            category,
            id: id.into(),
        }
    }
}

/// Edge-triggered prompt transitions for the host UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptEvent {
    Entered(Prompt),
    Changed { from: Prompt, to: Prompt },
    Cleared(Prompt),
}

/// Low-frequency proximity scanner.
///
/// Tracks the nearest candidate per category and exposes the single active
/// prompt, chosen by category precedence. Events are only produced when the
/// active prompt id changes, so repeated scans of an unchanged world are silent.
#[derive(Debug, Clone)]
pub struct InteractionScanner {
    interval_frames: u32,
    countdown: u32,
    nearest: BTreeMap<InteractionCategory, String>,
    active: Option<Prompt>,
    scans: u64,
}

impl InteractionScanner {
    /// Scans on the first tick, then every `interval_frames` ticks.
    pub fn new(interval_frames: u32) -> Self {
        Self {
            interval_frames: interval_frames.max(1),
            countdown: 0,
            nearest: BTreeMap::new(),
            active: None,
            scans: 0,
        }
    }

    /// Called every frame; scans only every `interval_frames` frames.
    pub fn tick(&mut self, index: &InteractionIndex, position: Vec3) -> Option<PromptEvent> {
        if self.countdown > 0 {
            self.countdown -= 1;
            return None;
        }
        self.countdown = self.interval_frames - 1;
        self.scan(index, position)
    }

    /// Scan immediately, regardless of the frame schedule.
    pub fn scan(&mut self, index: &InteractionIndex, position: Vec3) -> Option<PromptEvent> {
        let _span = tracing::trace_span!("interaction_scan").entered();
        self.scans += 1;

        self.nearest.clear();
        for category in InteractionCategory::ALL {
            if let Some(c) = index.nearest(category, position) {
                self.nearest.insert(category, c.id.clone());
            }
        }

        // BTreeMap iterates in precedence order; the first entry wins.
        let next = self
            .nearest
            .iter()
            .next()
            .map(|(category, id)| Prompt::new(*category, id.clone()));
        self.transition(next)
    }

    /// Drop the active prompt (seated, leaving the room).
    pub fn clear(&mut self) -> Option<PromptEvent> {
        self.nearest.clear();
        self.transition(None)
    }

    /// Forget everything, including the schedule, as on a fresh room load.
    pub fn reset(&mut self) {
        self.nearest.clear();
        self.active = None;
        self.countdown = 0;
    }

    /// Prompt shown since the last `Entered` event.
    pub fn active(&self) -> Option<&Prompt> {
        self.active.as_ref()
    }

    /// Nearest in-range candidate id for a category, as of the last scan.
    pub fn nearest(&self, category: InteractionCategory) -> Option<&str> {
        self.nearest.get(&category).map(String::as_str)
    }

    pub fn scan_count(&self) -> u64 {
        self.scans
    }

    fn transition(&mut self, next: Option<Prompt>) -> Option<PromptEvent> {
        if self.active == next {
            return None;
        }
        let prev = std::mem::replace(&mut self.active, next.clone());
        let event = match (prev, next) {
            (None, Some(to)) => PromptEvent::Entered(to),
            (Some(from), Some(to)) => PromptEvent::Changed { from, to },
            (Some(from), None) => PromptEvent::Cleared(from),
            (None, None) => return None,
        };
        tracing::debug!(?event, "prompt changed");
        Some(event)
    }
}
