//! The layered self-model state machine.
//!
//! One ReflectionLevel per depth 0..N. Level 0 ingests each cycle's
//! processed experience directly; each higher level, once active,
//! reflects over the level below it, records a self-reference event,
//! and may issue typed modifications that are applied to the lower
//! level's parameters through its public mutators before the next
//! level runs in the same cycle.
//!
//! Activation is history-gated: level d activates once level d-1 has
//! accumulated its configured number of history entries. Levels never
//! deactivate, but an active level with a starved lower level simply
//! reports `InsufficientData` and does nothing.

use crate::memory::ProcessResult;
use crate::self_reference::SelfReferenceSystem;
use recc_core::{LevelView, RefTarget, ReferenceId, Severity, ThresholdEvent};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// The closed set of per-level models. Dispatch in `reflect` is
/// exhaustive over these variants.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReflectionModel {
    DirectExperience,
    BasicSelf,
    MetaCognitive,
    RecursiveImprovement,
}

impl ReflectionModel {
    pub fn for_depth(depth: u32) -> Self {
        match depth {
            0 => Self::DirectExperience,
            1 => Self::BasicSelf,
            2 => Self::MetaCognitive,
            _ => Self::RecursiveImprovement,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::DirectExperience => "direct_experience",
            Self::BasicSelf => "basic_self",
            Self::MetaCognitive => "meta_cognitive",
            Self::RecursiveImprovement => "recursive_improvement",
        }
    }
}

/// Tunable attributes of a level's model. All values live in [0,1];
/// mutation goes through `set_attribute` / `adjust_attribute` only.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModelParams {
    pub attention_bias: f64,
    pub adaptation_rate: f64,
    pub abstraction_preference: f64,
    pub exploration_balance: f64,
}

impl Default for ModelParams {
    fn default() -> Self {
        Self {
            attention_bias: 0.5,
            adaptation_rate: 0.5,
            abstraction_preference: 0.5,
            exploration_balance: 0.5,
        }
    }
}

impl ModelParams {
    fn slot(&mut self, attribute: &str) -> Option<&mut f64> {
        match attribute {
            "attention_bias" => Some(&mut self.attention_bias),
            "adaptation_rate" => Some(&mut self.adaptation_rate),
            "abstraction_preference" => Some(&mut self.abstraction_preference),
            "exploration_balance" => Some(&mut self.exploration_balance),
            _ => None,
        }
    }

    /// Returns false for an unknown attribute.
    pub fn set_attribute(&mut self, attribute: &str, value: f64) -> bool {
        match self.slot(attribute) {
            Some(slot) => {
                *slot = value.clamp(0.0, 1.0);
                true
            }
            None => false,
        }
    }

    /// Returns false for an unknown attribute.
    pub fn adjust_attribute(&mut self, attribute: &str, delta: f64) -> bool {
        match self.slot(attribute) {
            Some(slot) => {
                *slot = (*slot + delta).clamp(0.0, 1.0);
                true
            }
            None => false,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModOp {
    Update,
    Adjust,
}

/// A typed command from a higher level to the level below it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Modification {
    pub attribute: String,
    pub op: ModOp,
    pub value: f64,
}

/// Per-level, per-cycle outcome. `InsufficientData` is a normal
/// transient status and must be treated as a no-op by callers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReflectStatus {
    Reflected,
    InsufficientData,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LevelRecord {
    pub cycle: u64,
    pub input: String,
    pub insight: String,
    /// Scalar summary of how strongly this record registered.
    pub signal: f64,
}

const HISTORY_CAP: usize = 64;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReflectionLevel {
    pub depth: u32,
    pub model: ReflectionModel,
    pub params: ModelParams,
    pub active: bool,
    history: Vec<LevelRecord>,
    modifications_issued: u32,
    improvements: u32,
    last_signal: Option<f64>,
    last_reference: Option<ReferenceId>,
}

impl ReflectionLevel {
    fn new(depth: u32) -> Self {
        Self {
            depth,
            model: ReflectionModel::for_depth(depth),
            params: ModelParams::default(),
            // Level 0 is active from the start.
            active: depth == 0,
            history: Vec::new(),
            modifications_issued: 0,
            improvements: 0,
            last_signal: None,
            last_reference: None,
        }
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn effectiveness(&self) -> f64 {
        self.improvements as f64 / self.modifications_issued.max(1) as f64
    }

    fn recent_signal(&self) -> f64 {
        let tail = &self.history[self.history.len().saturating_sub(3)..];
        if tail.is_empty() {
            return 0.0;
        }
        tail.iter().map(|r| r.signal).sum::<f64>() / tail.len() as f64
    }

    fn push(&mut self, record: LevelRecord) {
        self.last_signal = Some(record.signal);
        self.history.push(record);
        if self.history.len() > HISTORY_CAP {
            let excess = self.history.len() - HISTORY_CAP;
            self.history.drain(..excess);
        }
    }
}

/// What one full bottom-up cascade produced.
#[derive(Clone, Debug, Default)]
pub struct ReflectOutcome {
    pub statuses: Vec<(u32, ReflectStatus)>,
    pub references: Vec<ReferenceId>,
    pub modifications_applied: usize,
    pub thresholds: Vec<ThresholdEvent>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RecursiveReflection {
    levels: Vec<ReflectionLevel>,
    /// Entry d-1 is the history length level d-1 needs before level d
    /// activates. Extra levels reuse the last entry.
    activation_thresholds: Vec<usize>,
}

impl RecursiveReflection {
    pub fn new(depth_count: u32, activation_thresholds: Vec<usize>) -> Self {
        let thresholds = if activation_thresholds.is_empty() {
            vec![1, 3, 5]
        } else {
            activation_thresholds
        };
        Self {
            levels: (0..depth_count.max(1)).map(ReflectionLevel::new).collect(),
            activation_thresholds: thresholds,
        }
    }

    pub fn levels(&self) -> &[ReflectionLevel] {
        &self.levels
    }

    pub fn level(&self, depth: u32) -> Option<&ReflectionLevel> {
        self.levels.get(depth as usize)
    }

    fn threshold_for(&self, depth: usize) -> usize {
        *self
            .activation_thresholds
            .get(depth - 1)
            .or(self.activation_thresholds.last())
            .unwrap_or(&3)
    }

    /// Run one bottom-up cascade over the cycle's processed content.
    pub fn reflect(
        &mut self,
        cycle: u64,
        process: &ProcessResult,
        energy_level: f64,
        self_ref: &mut SelfReferenceSystem,
    ) -> ReflectOutcome {
        let mut outcome = ReflectOutcome::default();

        // Level 0: direct experience, no reference, no modifications.
        self.levels[0].push(LevelRecord {
            cycle,
            input: process.focused.clone(),
            insight: format!("processed '{}'", truncate(&process.focused, 48)),
            signal: process.attention,
        });
        outcome.statuses.push((0, ReflectStatus::Reflected));

        for d in 1..self.levels.len() {
            // Activation check runs against the lower level's history as
            // it stands this cycle, after that level has processed.
            if !self.levels[d].active {
                let needed = self.threshold_for(d);
                if self.levels[d - 1].history_len() >= needed {
                    self.levels[d].active = true;
                    info!(depth = d, cycle, "reflection level activated");
                    outcome.thresholds.push(ThresholdEvent::new(
                        "level_activation",
                        format!("reflection level {} became active", d),
                        Severity::Medium,
                    ));
                } else {
                    outcome.statuses.push((d as u32, ReflectStatus::InsufficientData));
                    continue;
                }
            }

            let (below, above) = self.levels.split_at_mut(d);
            let lower = &mut below[d - 1];
            let level = &mut above[0];

            if lower.history_len() == 0 {
                // Starved: active but nothing below to reflect over.
                outcome.statuses.push((d as u32, ReflectStatus::InsufficientData));
                continue;
            }

            let signal = lower.recent_signal();
            let improved = level.last_signal.is_some_and(|prev| signal > prev);
            if improved {
                level.improvements += 1;
            }

            let (insight, modifications) = run_model(level, lower, signal, process);

            // Self-reference: level 1 points at the raw experience,
            // higher levels point at the reference the level below them
            // produced, which is what grows recursion depth.
            let target = if d == 1 {
                RefTarget::Experience(process.experience)
            } else {
                match lower.last_reference.or(level.last_reference) {
                    Some(id) => RefTarget::Reference(id),
                    None => RefTarget::Experience(process.experience),
                }
            };
            let reference = self_ref.reference(
                cycle,
                format!("level{}", d),
                target,
                !insight.is_empty(),
                -0.005 * d as f64 * (1.0 - energy_level).max(0.1),
            );
            level.last_reference = Some(reference);
            outcome.references.push(reference);

            level.modifications_issued += modifications.len() as u32;
            for m in &modifications {
                let applied = match m.op {
                    ModOp::Update => lower.params.set_attribute(&m.attribute, m.value),
                    ModOp::Adjust => lower.params.adjust_attribute(&m.attribute, m.value),
                };
                if applied {
                    outcome.modifications_applied += 1;
                } else {
                    debug!(attribute = %m.attribute, "modification targeted unknown attribute");
                }
            }

            // The top level also tunes itself from its own track record.
            if level.model == ReflectionModel::RecursiveImprovement {
                let effectiveness = level.effectiveness();
                level
                    .params
                    .set_attribute("exploration_balance", 0.5 + 0.5 * (effectiveness - 0.5));
                if effectiveness < 0.3 && level.modifications_issued > 0 {
                    level.params.adjust_attribute("adaptation_rate", -0.05);
                }
            }

            level.push(LevelRecord {
                cycle,
                input: format!("level{} history({})", d - 1, lower.history_len()),
                insight,
                signal,
            });
            outcome.statuses.push((d as u32, ReflectStatus::Reflected));
        }

        outcome
    }

    /// Per-level view for the observability event.
    pub fn views(&self) -> Vec<LevelView> {
        self.levels
            .iter()
            .map(|level| LevelView {
                depth: level.depth,
                state: if level.active { "active" } else { "inactive" }.to_string(),
                history_entries: level.history_len(),
            })
            .collect()
    }
}

/// Model-specific reflection: insight text plus modifications for the
/// level below. Exhaustive over the closed variant set.
fn run_model(
    level: &ReflectionLevel,
    lower: &ReflectionLevel,
    signal: f64,
    process: &ProcessResult,
) -> (String, Vec<Modification>) {
    let mut modifications = Vec::new();
    let rate = level.params.adaptation_rate;

    let insight = match level.model {
        ReflectionModel::DirectExperience => String::new(),

        ReflectionModel::BasicSelf => {
            // Observes raw experience; steers level 0 attention.
            if signal < 0.4 {
                modifications.push(Modification {
                    attribute: "attention_bias".into(),
                    op: ModOp::Adjust,
                    value: 0.1 * rate,
                });
            }
            if process.novelty > 0.7 {
                modifications.push(Modification {
                    attribute: "abstraction_preference".into(),
                    op: ModOp::Adjust,
                    value: 0.05 * rate,
                });
            }
            format!(
                "I am experiencing '{}' with attention {:.2}",
                truncate(&process.focused, 40),
                signal
            )
        }

        ReflectionModel::MetaCognitive => {
            // Observes the observing; tunes how level 1 adapts.
            if signal < 0.3 {
                modifications.push(Modification {
                    attribute: "adaptation_rate".into(),
                    op: ModOp::Adjust,
                    value: 0.1 * rate,
                });
            } else if signal > 0.8 {
                modifications.push(Modification {
                    attribute: "adaptation_rate".into(),
                    op: ModOp::Adjust,
                    value: -0.05 * rate,
                });
            }
            format!(
                "I notice my self-observation registering at {:.2} over {} entries",
                signal,
                lower.history_len()
            )
        }

        ReflectionModel::RecursiveImprovement => {
            // Second-order loop: effectiveness of past modifications
            // steers how aggressively the level below may adapt. Its
            // own knobs are tuned directly in `reflect`.
            let effectiveness = level.effectiveness();
            if effectiveness > 0.5 {
                modifications.push(Modification {
                    attribute: "adaptation_rate".into(),
                    op: ModOp::Adjust,
                    value: 0.05 * rate,
                });
            } else if effectiveness < 0.2 && level.modifications_issued > 0 {
                modifications.push(Modification {
                    attribute: "adaptation_rate".into(),
                    op: ModOp::Adjust,
                    value: -0.05 * rate,
                });
            }
            format!(
                "my reflection changes are {:.0}% effective; rebalancing",
                effectiveness * 100.0
            )
        }
    };

    (insight, modifications)
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use recc_core::ExperienceId;

    fn process(n: u64) -> ProcessResult {
        ProcessResult {
            experience: ExperienceId(n),
            focused: format!("quiet internal contemplation {}", n),
            attention: 0.6,
            retrieved: Vec::new(),
            retrieval_strength: 0.2,
            strategy: "abstraction".into(),
            strategy_relevance: 0.5,
            novelty: 0.8,
            reuse: 0.2,
            thresholds: Vec::new(),
        }
    }

    fn run_cycles(reflection: &mut RecursiveReflection, self_ref: &mut SelfReferenceSystem, n: u64) {
        for cycle in 1..=n {
            reflection.reflect(cycle, &process(cycle), 0.8, self_ref);
        }
    }

    // ============================================================
    // Activation gating
    // ============================================================

    #[test]
    fn level_zero_is_active_from_start() {
        let reflection = RecursiveReflection::new(4, vec![1, 3, 5]);
        assert!(reflection.level(0).unwrap().active);
        assert!(!reflection.level(1).unwrap().active);
    }

    #[test]
    fn five_cycle_activation_ladder() {
        let mut reflection = RecursiveReflection::new(4, vec![1, 3, 5]);
        let mut self_ref = SelfReferenceSystem::new();

        run_cycles(&mut reflection, &mut self_ref, 1);
        assert!(reflection.level(1).unwrap().active, "level 1 after cycle 1");
        assert!(!reflection.level(2).unwrap().active);

        run_cycles(&mut reflection, &mut self_ref, 3);
        // After cycles 1..=3 plus the earlier cycle, level 1 has >=3
        // history entries, so level 2 is active.
        assert!(reflection.level(2).unwrap().active);
        assert!(!reflection.level(3).unwrap().active);
    }

    #[test]
    fn inactive_level_reports_insufficient_data() {
        let mut reflection = RecursiveReflection::new(4, vec![1, 3, 5]);
        let mut self_ref = SelfReferenceSystem::new();
        let outcome = reflection.reflect(1, &process(1), 0.8, &mut self_ref);
        assert!(outcome
            .statuses
            .iter()
            .any(|(d, s)| *d == 2 && *s == ReflectStatus::InsufficientData));
    }

    #[test]
    fn activation_emits_threshold_event() {
        let mut reflection = RecursiveReflection::new(4, vec![1, 3, 5]);
        let mut self_ref = SelfReferenceSystem::new();
        let outcome = reflection.reflect(1, &process(1), 0.8, &mut self_ref);
        assert!(outcome
            .thresholds
            .iter()
            .any(|t| t.kind == "level_activation"));
    }

    // ============================================================
    // Self-reference wiring
    // ============================================================

    #[test]
    fn level_two_reflection_produces_depth_one_reference() {
        let mut reflection = RecursiveReflection::new(4, vec![1, 3, 5]);
        let mut self_ref = SelfReferenceSystem::new();
        run_cycles(&mut reflection, &mut self_ref, 5);
        assert!(self_ref.max_depth() >= 1, "depth {} after 5 cycles", self_ref.max_depth());
    }

    // ============================================================
    // Modification plumbing
    // ============================================================

    #[test]
    fn modifications_mutate_lower_level_params() {
        let mut reflection = RecursiveReflection::new(2, vec![1]);
        let mut self_ref = SelfReferenceSystem::new();
        let before = reflection.level(0).unwrap().params.abstraction_preference;
        // High-novelty processing triggers an abstraction nudge.
        run_cycles(&mut reflection, &mut self_ref, 3);
        assert!(reflection.level(0).unwrap().params.abstraction_preference > before);
    }

    #[test]
    fn unknown_attribute_is_rejected_by_mutators() {
        let mut params = ModelParams::default();
        assert!(!params.set_attribute("no_such_knob", 0.9));
        assert!(params.adjust_attribute("attention_bias", 0.2));
        assert!((params.attention_bias - 0.7).abs() < 1e-9);
    }

    #[test]
    fn params_clamp_to_unit_interval() {
        let mut params = ModelParams::default();
        params.adjust_attribute("adaptation_rate", 5.0);
        assert_eq!(params.adaptation_rate, 1.0);
        params.set_attribute("adaptation_rate", -2.0);
        assert_eq!(params.adaptation_rate, 0.0);
    }
}
