//! Bounded affect scalars with momentum.
//!
//! Each cycle, every scalar is nudged by a small signed delta derived
//! from the energy level and memory gradients, then clamped to [0,1].
//! Momentum is the exponentially-weighted delta history. Blended
//! composite states are fixed nonlinear combinations of the scalars.

use recc_core::{BlendedState, EmotionVector};
use serde::{Deserialize, Serialize};

/// Per-cycle signals out of hybrid memory that emotion reacts to.
/// Both gradients are in [0,1].
#[derive(Clone, Copy, Debug, Default)]
pub struct MemorySignals {
    /// How unfamiliar this cycle's content was (1 = entirely novel).
    pub novelty: f64,
    /// How much existing memory was exercised (1 = heavy reuse).
    pub reuse: f64,
}

/// Caps the per-cycle movement of any one scalar.
const MAX_STEP: f64 = 0.1;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EmotionalSystem {
    vector: EmotionVector,
    /// EWMA weight for momentum; higher = slower-moving momentum.
    momentum_alpha: f64,
}

impl EmotionalSystem {
    pub fn new() -> Self {
        Self {
            vector: EmotionVector::default(),
            momentum_alpha: 0.8,
        }
    }

    pub fn vector(&self) -> &EmotionVector {
        &self.vector
    }

    /// Run one emotional update. Deterministic, no stochastic term.
    pub fn update(
        &mut self,
        energy_level: f64,
        energy_delta: f64,
        signals: &MemorySignals,
    ) -> EmotionVector {
        let d_curiosity = 0.08 * signals.novelty + 0.02 * (energy_level - 0.5);
        let d_frustration = 0.06 * (0.5 - signals.reuse) + 0.03 * (0.3 - energy_level);
        let d_satisfaction = 0.08 * signals.reuse + 0.04 * energy_delta.max(0.0)
            - 0.02 * (1.0 - signals.reuse);
        let d_uncertainty = 0.06 * (signals.novelty - signals.reuse);

        let deltas = [d_curiosity, d_frustration, d_satisfaction, d_uncertainty];
        let v = &mut self.vector;
        let scalars = [
            &mut v.curiosity,
            &mut v.frustration,
            &mut v.satisfaction,
            &mut v.uncertainty,
        ];
        let momenta = [
            &mut v.momentum.curiosity,
            &mut v.momentum.frustration,
            &mut v.momentum.satisfaction,
            &mut v.momentum.uncertainty,
        ];

        for ((scalar, momentum), delta) in scalars.into_iter().zip(momenta).zip(deltas) {
            let step = delta.clamp(-MAX_STEP, MAX_STEP);
            *scalar = (*scalar + step).clamp(0.0, 1.0);
            *momentum = self.momentum_alpha * *momentum + (1.0 - self.momentum_alpha) * step;
        }

        v.blended = blend(v);
        self.vector.clone()
    }
}

impl Default for EmotionalSystem {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixed nonlinear combinations. The order here is the reporting order.
fn blend(v: &EmotionVector) -> Vec<BlendedState> {
    let mut blended = Vec::new();
    if v.curiosity > 0.6 && v.satisfaction < 0.4 {
        blended.push(BlendedState::RestlessExploration);
    }
    if v.frustration > 0.5 && v.uncertainty > 0.5 {
        blended.push(BlendedState::AnxiousVigilance);
    }
    if v.satisfaction > 0.6 && v.uncertainty < 0.3 {
        blended.push(BlendedState::ContentMastery);
    }
    let flat = v.scalars().iter().all(|s| (0.35..=0.65).contains(s));
    let still = [
        v.momentum.curiosity,
        v.momentum.frustration,
        v.momentum.satisfaction,
        v.momentum.uncertainty,
    ]
    .iter()
    .all(|m| m.abs() < 0.005);
    if flat && still {
        blended.push(BlendedState::Stagnation);
    }
    blended
}
