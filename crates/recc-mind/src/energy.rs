//! A bounded internal resource that gates activity.
//!
//! Energy decays with activity cost and regenerates a little every
//! cycle. External behaviors are gated on a minimum level; the gate
//! threshold lives in AgentConfig.

use serde::{Deserialize, Serialize};

/// Per-behavior activity costs, in energy units.
pub const COST_INTERNAL: f64 = 0.03;
pub const COST_EXTERNAL: f64 = 0.08;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EnergySystem {
    /// Current level in [0,1].
    level: f64,
    /// Regeneration added each cycle before cost is applied.
    regen_rate: f64,
    /// Signed change applied on the most recent update.
    last_delta: f64,
}

impl EnergySystem {
    pub fn new(initial: f64, regen_rate: f64) -> Self {
        Self {
            level: initial.clamp(0.0, 1.0),
            regen_rate,
            last_delta: 0.0,
        }
    }

    pub fn level(&self) -> f64 {
        self.level
    }

    pub fn last_delta(&self) -> f64 {
        self.last_delta
    }

    /// Apply one cycle of regeneration and activity cost. Returns the
    /// signed delta actually applied after clamping.
    pub fn update(&mut self, activity_cost: f64) -> f64 {
        let before = self.level;
        self.level = (self.level + self.regen_rate - activity_cost).clamp(0.0, 1.0);
        self.last_delta = self.level - before;
        self.last_delta
    }

    pub fn can_engage_external(&self, gate: f64) -> bool {
        self.level >= gate
    }
}

impl Default for EnergySystem {
    fn default() -> Self {
        Self::new(0.8, 0.02)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_stays_in_bounds_under_heavy_cost() {
        let mut energy = EnergySystem::new(0.1, 0.01);
        for _ in 0..50 {
            energy.update(0.3);
            assert!((0.0..=1.0).contains(&energy.level()));
        }
        assert_eq!(energy.level(), 0.0);
    }

    #[test]
    fn regeneration_recovers_when_idle() {
        let mut energy = EnergySystem::new(0.0, 0.05);
        for _ in 0..10 {
            energy.update(0.0);
        }
        assert!((energy.level() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn external_gate_respects_threshold() {
        let energy = EnergySystem::new(0.25, 0.02);
        assert!(!energy.can_engage_external(0.3));
        assert!(energy.can_engage_external(0.2));
    }

    #[test]
    fn delta_reflects_clamping() {
        let mut energy = EnergySystem::new(1.0, 0.1);
        let delta = energy.update(0.0);
        // Already full; regeneration clamps away to zero delta.
        assert_eq!(delta, 0.0);
    }
}
