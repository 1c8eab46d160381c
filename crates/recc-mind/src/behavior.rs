//! Emotion-weighted action selection.
//!
//! A fixed catalogue: internal behaviors run without the collaborator,
//! external ones engage it. Pending external input always wins with
//! Respond. Otherwise external engagement is gated on energy plus a
//! curiosity-proportional draw, and the final pick is a weighted
//! selection over the eligible catalogue half.

use crate::rng::SeededRng;
use recc_core::EmotionVector;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Behavior {
    // Internal
    Contemplate,
    Reorganize,
    Simulate,
    Create,
    // External
    Observe,
    Respond,
    Request,
}

impl Behavior {
    pub fn is_external(&self) -> bool {
        matches!(self, Self::Observe | Self::Respond | Self::Request)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Contemplate => "contemplate",
            Self::Reorganize => "reorganize",
            Self::Simulate => "simulate",
            Self::Create => "create",
            Self::Observe => "observe",
            Self::Respond => "respond",
            Self::Request => "request",
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct BehaviorSystem {
    /// How often each behavior has run this session.
    counts: BTreeMap<Behavior, u32>,
    last: Option<Behavior>,
}

impl BehaviorSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last(&self) -> Option<Behavior> {
        self.last
    }

    pub fn count(&self, behavior: Behavior) -> u32 {
        self.counts.get(&behavior).copied().unwrap_or(0)
    }

    /// Pick this cycle's behavior. `has_external_input` forces Respond;
    /// otherwise external behaviors require energy above `external_gate`
    /// and a draw under half the current curiosity.
    pub fn select(
        &mut self,
        has_external_input: bool,
        emotions: &EmotionVector,
        energy_level: f64,
        external_gate: f64,
        rng: &mut SeededRng,
    ) -> Behavior {
        let chosen = if has_external_input {
            Behavior::Respond
        } else {
            let engage_external =
                energy_level >= external_gate && rng.next_f64() < emotions.curiosity * 0.5;
            if engage_external {
                weighted_pick(
                    &[
                        (Behavior::Observe, 0.2 + emotions.uncertainty),
                        (Behavior::Request, 0.1 + emotions.curiosity * 0.5),
                    ],
                    rng,
                )
            } else {
                weighted_pick(
                    &[
                        (Behavior::Contemplate, 0.2 + emotions.uncertainty),
                        (Behavior::Reorganize, 0.1 + emotions.frustration),
                        (Behavior::Simulate, 0.1 + emotions.curiosity * 0.5),
                        (Behavior::Create, 0.1 + emotions.satisfaction * 0.5),
                    ],
                    rng,
                )
            }
        };

        *self.counts.entry(chosen).or_insert(0) += 1;
        self.last = Some(chosen);
        debug!(behavior = chosen.name(), "behavior selected");
        chosen
    }

    /// Force a specific behavior (used when an external attempt must
    /// degrade to an internal substitute).
    pub fn record_forced(&mut self, behavior: Behavior) {
        *self.counts.entry(behavior).or_insert(0) += 1;
        self.last = Some(behavior);
    }
}

fn weighted_pick(candidates: &[(Behavior, f64)], rng: &mut SeededRng) -> Behavior {
    let total: f64 = candidates.iter().map(|(_, w)| w.max(0.0)).sum();
    if total <= 0.0 {
        return candidates[0].0;
    }
    let mut draw = rng.next_f64() * total;
    for (behavior, weight) in candidates {
        draw -= weight.max(0.0);
        if draw <= 0.0 {
            return *behavior;
        }
    }
    candidates[candidates.len() - 1].0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn external_input_always_selects_respond() {
        let mut system = BehaviorSystem::new();
        let mut rng = SeededRng::new(0);
        let emotions = EmotionVector::default();
        for _ in 0..10 {
            assert_eq!(
                system.select(true, &emotions, 0.9, 0.3, &mut rng),
                Behavior::Respond
            );
        }
    }

    #[test]
    fn low_energy_blocks_external_behaviors() {
        let mut system = BehaviorSystem::new();
        let mut rng = SeededRng::new(7);
        let mut emotions = EmotionVector::default();
        emotions.curiosity = 1.0;
        for _ in 0..100 {
            let behavior = system.select(false, &emotions, 0.1, 0.3, &mut rng);
            assert!(!behavior.is_external(), "got {:?} at low energy", behavior);
        }
    }

    #[test]
    fn high_curiosity_eventually_engages_external() {
        let mut system = BehaviorSystem::new();
        let mut rng = SeededRng::new(3);
        let mut emotions = EmotionVector::default();
        emotions.curiosity = 1.0;
        let engaged = (0..100)
            .any(|_| system.select(false, &emotions, 0.9, 0.3, &mut rng).is_external());
        assert!(engaged);
    }

    #[test]
    fn selection_is_deterministic_per_seed() {
        let run = |seed| {
            let mut system = BehaviorSystem::new();
            let mut rng = SeededRng::new(seed);
            let emotions = EmotionVector::default();
            (0..50)
                .map(|_| system.select(false, &emotions, 0.7, 0.3, &mut rng))
                .collect::<Vec<_>>()
        };
        assert_eq!(run(11), run(11));
    }
}
