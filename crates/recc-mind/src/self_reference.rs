//! The append-only log of thoughts about thoughts.
//!
//! Depth is derived, never supplied: referencing a raw experience is
//! depth 0, referencing another reference event is 1 + its depth. The
//! maximum depth ever reached only grows. A periodically re-derived
//! self-model aggregates statistics over the log.

use recc_core::{RefTarget, ReferenceId, SelfReferenceEvent};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Aggregate statistics re-derived from the event log.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SelfModel {
    pub total_events: usize,
    pub experience_targets: usize,
    pub reference_targets: usize,
    pub average_depth: f64,
    /// Depth gained per 10 events, over the recent tail.
    pub depth_growth_rate: f64,
    pub events_by_source: BTreeMap<String, usize>,
    pub last_updated_cycle: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SelfReferenceSystem {
    events: Vec<SelfReferenceEvent>,
    next_id: u64,
    max_depth: u32,
    model: SelfModel,
}

impl SelfReferenceSystem {
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
            next_id: 0,
            max_depth: 0,
            model: SelfModel::default(),
        }
    }

    pub fn events(&self) -> &[SelfReferenceEvent] {
        &self.events
    }

    pub fn event(&self, id: ReferenceId) -> Option<&SelfReferenceEvent> {
        self.events.iter().find(|e| e.id == id)
    }

    pub fn max_depth(&self) -> u32 {
        self.max_depth
    }

    pub fn model(&self) -> &SelfModel {
        &self.model
    }

    pub fn last_event_id(&self) -> Option<ReferenceId> {
        self.events.last().map(|e| e.id)
    }

    /// Append a reference event. Depth is derived from the target:
    /// 0 for an experience, 1 + target depth for a reference.
    /// `insight` flags whether the referencing thought produced one.
    pub fn reference(
        &mut self,
        cycle: u64,
        source: impl Into<String>,
        target: RefTarget,
        insight: bool,
        energy_impact: f64,
    ) -> ReferenceId {
        let depth = match target {
            RefTarget::Experience(_) => 0,
            RefTarget::Reference(id) => {
                1 + self.event(id).map(|e| e.depth).unwrap_or(0)
            }
        };
        let id = ReferenceId(self.next_id);
        self.next_id += 1;
        self.max_depth = self.max_depth.max(depth);
        self.events.push(SelfReferenceEvent {
            id,
            cycle,
            source: source.into(),
            target,
            depth,
            insight,
            energy_impact,
        });
        debug!(%id, depth, max_depth = self.max_depth, "self-reference recorded");
        id
    }

    /// Build a reference to an existing reference. How depths 2, 3, …
    /// come into being.
    pub fn recursive_reference(
        &mut self,
        cycle: u64,
        source: impl Into<String>,
        base: ReferenceId,
        insight: bool,
        energy_impact: f64,
    ) -> ReferenceId {
        self.reference(cycle, source, RefTarget::Reference(base), insight, energy_impact)
    }

    /// Re-derive the aggregate self-model from the log.
    pub fn update_self_model(&mut self, cycle: u64) -> &SelfModel {
        let total = self.events.len();
        let mut experience_targets = 0;
        let mut reference_targets = 0;
        let mut by_source: BTreeMap<String, usize> = BTreeMap::new();
        let mut depth_sum = 0u64;
        for event in &self.events {
            match event.target {
                RefTarget::Experience(_) => experience_targets += 1,
                RefTarget::Reference(_) => reference_targets += 1,
            }
            *by_source.entry(event.source.clone()).or_insert(0) += 1;
            depth_sum += event.depth as u64;
        }

        // Growth rate: depth difference over the last 10 events.
        let tail = &self.events[total.saturating_sub(10)..];
        let depth_growth_rate = match (tail.first(), tail.last()) {
            (Some(first), Some(last)) if tail.len() > 1 => {
                last.depth as f64 - first.depth as f64
            }
            _ => 0.0,
        };

        self.model = SelfModel {
            total_events: total,
            experience_targets,
            reference_targets,
            average_depth: if total == 0 {
                0.0
            } else {
                depth_sum as f64 / total as f64
            },
            depth_growth_rate,
            events_by_source: by_source,
            last_updated_cycle: cycle,
        };
        &self.model
    }
}

impl Default for SelfReferenceSystem {
    fn default() -> Self {
        Self::new()
    }
}
