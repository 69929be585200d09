use glam::Vec3;
use plaza_common::math::horizontal_distance_squared;
use plaza_common::{InteractionCategory, InteractionSpot, Portal, PortalTarget, SeatDescriptor, YBand};
use std::collections::{BTreeMap, BTreeSet};

/// One proximity trigger, flattened from room data.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub id: String,
    pub category: InteractionCategory,
    pub position: Vec3,
    pub radius: f32,
    pub y_band: Option<YBand>,
}

impl Candidate {
    /// Squared horizontal distance if `position` is in range and inside the Y band.
    fn reach(&self, position: Vec3) -> Option<f32> {
        if let Some(band) = self.y_band {
            if !band.contains(position.y) {
                return None;
            }
        }
        let d2 = horizontal_distance_squared(self.position, position);
        (d2 <= self.radius * self.radius).then_some(d2)
    }
}

/// Candidates for every category in the active room.
///
/// Built once at room load. Entries that reference unknown seats or portals,
/// and portals without a usable target, are left out.
#[derive(Debug, Clone, Default)]
pub struct InteractionIndex {
    by_category: BTreeMap<InteractionCategory, Vec<Candidate>>,
}

impl InteractionIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index everything a room offers for prompts.
    ///
    /// Seat and portal entries must resolve to a descriptor; spots whose link
    /// or id resolves to nothing are skipped. Portal prompts use the portal id,
    /// seat prompts the seat id.
    pub fn build(portals: &[Portal], seats: &[SeatDescriptor], spots: &[InteractionSpot]) -> Self {
        let mut index = Self::new();
        let mut portal_ids: BTreeSet<&str> = BTreeSet::new();
        let mut seat_ids: BTreeSet<&str> = BTreeSet::new();

        for portal in portals {
            if matches!(&portal.target, PortalTarget::Room(room) if room.as_str().is_empty())
                || matches!(&portal.target, PortalTarget::Minigame(id) if id.is_empty())
            {
                tracing::debug!(portal = %portal.id, "portal has no target; skipped");
                continue;
            }
            portal_ids.insert(&portal.id);
            index.insert(Candidate {
                id: portal.id.clone(),
                category: InteractionCategory::Portal,
                position: portal.world_position,
                radius: portal.radius,
                y_band: None,
            });
        }

        for seat in seats {
            seat_ids.insert(&seat.id);
            index.insert(Candidate {
                id: seat.id.clone(),
                category: InteractionCategory::Seat,
                position: seat.anchor_position,
                radius: seat.interact_radius,
                y_band: seat.y_band,
            });
        }

        for spot in spots {
            let target = spot.link.as_deref().unwrap_or(&spot.id);
            let resolves = match spot.category {
                InteractionCategory::Seat => seat_ids.contains(target),
                InteractionCategory::Portal => portal_ids.contains(target),
                _ => {
                    spot.link.is_none()
                        || seat_ids.contains(target)
                        || portal_ids.contains(target)
                }
            };
            if !resolves {
                tracing::debug!(spot = %spot.id, %target, "spot references unknown id; skipped");
                continue;
            }
            // Seat and portal prompts carry the descriptor id that Interact acts on.
            let id = match spot.category {
                InteractionCategory::Seat | InteractionCategory::Portal => target.to_string(),
                _ => spot.id.clone(),
            };
            index.insert(Candidate {
                id,
                category: spot.category,
                position: spot.position,
                radius: spot.radius,
                y_band: spot.y_band,
            });
        }
        index
    }

    pub fn insert(&mut self, candidate: Candidate) {
        self.by_category
            .entry(candidate.category)
            .or_default()
            .push(candidate);
    }

    /// Nearest in-range candidate of one category. Ties go to the first declared.
    pub fn nearest(&self, category: InteractionCategory, position: Vec3) -> Option<&Candidate> {
        let mut best: Option<(f32, &Candidate)> = None;
        for c in self.by_category.get(&category).into_iter().flatten() {
            if let Some(d2) = c.reach(position) {
                if best.is_none_or(|(b, _)| d2 < b) {
                    best = Some((d2, c));
                }
            }
        }
        best.map(|(_, c)| c)
    }

    pub fn len(&self) -> usize {
        self.by_category.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Candidates of one category.
    pub fn count(&self, category: InteractionCategory) -> usize {
        self.by_category.get(&category).map_or(0, Vec::len)
    }
}
