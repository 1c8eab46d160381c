//! Three memory sub-stores plus emergent-property tracking.
//!
//! Each cycle's (prompt, response, context) flows working → reference →
//! procedural; every stage's output feeds the next, and the strength of
//! each hand-off is recorded as an edge in the interaction log. The
//! meta level (`meta`) watches that log and recommends adaptations.

pub mod meta;
pub mod procedural;
pub mod reference;
pub mod working;

use crate::rng::SeededRng;
use recc_core::{
    ConceptId, EmotionVector, Experience, ExperienceId, MemoryMetrics, MemoryTier, Origin,
    Severity, ThresholdEvent,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

/// Split text into lowercase alphanumeric terms. The common currency of
/// all overlap scoring in the memory stores.
pub fn terms(text: &str) -> BTreeSet<String> {
    text.split_whitespace()
        .map(|w| {
            w.trim_matches(|c: char| !c.is_alphanumeric())
                .to_lowercase()
        })
        .filter(|w| w.len() > 2)
        .collect()
}

/// Jaccard similarity of two term sets.
pub fn overlap(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(b).count();
    let union = a.union(b).count();
    intersection as f64 / union as f64
}

/// Tunable memory thresholds. Mirrors fields of AgentConfig; defaults
/// are the documented ones.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MemoryParams {
    /// Base working-memory capacity.
    pub working_capacity: usize,
    /// Recent-utilization level that triggers capacity growth.
    pub high_utilization: f64,
    /// Abstract/concrete ratio below which promotion runs.
    pub abstraction_ratio: f64,
    /// Fraction of cold experiences kept active on consolidation.
    pub retention_ratio: f64,
    /// Experiences younger than this many cycles are never demoted.
    pub consolidation_window: u64,
}

impl Default for MemoryParams {
    fn default() -> Self {
        Self {
            working_capacity: 7,
            high_utilization: 0.8,
            abstraction_ratio: 0.5,
            retention_ratio: 0.5,
            consolidation_window: 10,
        }
    }
}

/// Pipeline stages, for the interaction log.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Input,
    Working,
    Reference,
    Procedural,
}

/// One hand-off between stages and how strongly it carried.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Interaction {
    pub cycle: u64,
    pub from: Stage,
    pub to: Stage,
    pub strength: f64,
}

/// Everything the caller provides about the cycle being ingested.
pub struct CycleContext<'a> {
    pub cycle: u64,
    pub emotions: &'a EmotionVector,
    pub energy_delta: f64,
    pub origin: Origin,
    pub parents: Vec<ExperienceId>,
    pub reflection_depth: u32,
}

/// What one `process` call produced, stage by stage.
#[derive(Clone, Debug)]
pub struct ProcessResult {
    pub experience: ExperienceId,
    pub focused: String,
    pub attention: f64,
    pub retrieved: Vec<ConceptId>,
    pub retrieval_strength: f64,
    pub strategy: String,
    pub strategy_relevance: f64,
    /// Gradient in [0,1]: how unfamiliar the content was.
    pub novelty: f64,
    /// Gradient in [0,1]: how much existing memory was exercised.
    pub reuse: f64,
    pub thresholds: Vec<ThresholdEvent>,
}

/// Slow-adapting derived parameters, adjusted by observed usage rather
/// than set directly.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EmergentProperties {
    pub capacity_growth_events: u32,
    pub hierarchy_depth: u32,
}

const INTERACTION_LOG_CAP: usize = 512;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HybridMemory {
    pub working: working::WorkingMemory,
    pub reference: reference::ReferenceMemory,
    pub procedural: procedural::ProceduralMemory,
    pub meta: meta::MetaMemory,
    experiences: BTreeMap<ExperienceId, Experience>,
    next_experience: u64,
    interactions: Vec<Interaction>,
    pub emergent: EmergentProperties,
    params: MemoryParams,
}

impl HybridMemory {
    pub fn new(params: MemoryParams, meta_fan_in: usize) -> Self {
        Self {
            working: working::WorkingMemory::new(params.working_capacity),
            reference: reference::ReferenceMemory::new(),
            procedural: procedural::ProceduralMemory::with_defaults(),
            meta: meta::MetaMemory::new(meta_fan_in),
            experiences: BTreeMap::new(),
            next_experience: 0,
            interactions: Vec::new(),
            emergent: EmergentProperties::default(),
            params,
        }
    }

    pub fn experience(&self, id: ExperienceId) -> Option<&Experience> {
        self.experiences.get(&id)
    }

    pub fn latest_experience(&self) -> Option<&Experience> {
        self.experiences.values().next_back()
    }

    pub fn experience_count(&self) -> usize {
        self.experiences.len()
    }

    pub fn active_experience_count(&self) -> usize {
        self.experiences.values().filter(|e| e.is_active()).count()
    }

    pub fn interactions(&self) -> &[Interaction] {
        &self.interactions
    }

    /// Run one cycle's content through all three stores.
    pub fn process(&mut self, input: &str, output: &str, ctx: CycleContext<'_>) -> ProcessResult {
        let mut thresholds = Vec::new();
        let combined = format!("{} {}", input, output);

        // Stage 1: working memory, attention-weighted filtering.
        let focused = self
            .working
            .attend(&combined, ctx.emotions.curiosity, ctx.cycle);
        self.log_interaction(ctx.cycle, Stage::Input, Stage::Working, focused.attention);

        // Stage 2: reference memory, concept retrieval over the
        // focused reduction. Empty store yields strength 0, not an error.
        let id = ExperienceId(self.next_experience);
        let retrieval =
            self.reference
                .retrieve_and_update(&focused.content, ctx.emotions, id, ctx.cycle);
        self.log_interaction(
            ctx.cycle,
            Stage::Working,
            Stage::Reference,
            retrieval.strength,
        );

        // Stage 3: procedural strategies against focused + retrieved.
        let outcome = self
            .procedural
            .apply(&focused.content, retrieval.concepts.len());
        self.log_interaction(
            ctx.cycle,
            Stage::Reference,
            Stage::Procedural,
            outcome.relevance,
        );

        // Reuse marking: exercising a concept exercises the experiences
        // behind it.
        let mut touched = 0usize;
        for concept_id in &retrieval.concepts {
            if let Some(node) = self.reference.concept(*concept_id) {
                for exp_id in node.experiences.iter().rev().take(3).copied().collect::<Vec<_>>() {
                    if let Some(exp) = self.experiences.get_mut(&exp_id) {
                        exp.reuse_count += 1;
                        touched += 1;
                    }
                }
            }
        }
        debug!(cycle = ctx.cycle, touched, "reuse marking complete");

        // Record the experience itself.
        self.next_experience += 1;
        let mut experience = Experience::new(id, ctx.cycle, input, output);
        experience.emotions = ctx.emotions.clone();
        experience.energy_delta = ctx.energy_delta;
        experience.origin = ctx.origin;
        experience.parents = ctx.parents;
        experience.reflection_depth = ctx.reflection_depth;
        experience.tags.insert(outcome.strategy.clone());
        experience.tags.insert(
            match ctx.origin {
                Origin::Internal => "internal",
                Origin::External => "external",
            }
            .to_string(),
        );
        self.experiences.insert(id, experience);

        // Emergent property: capacity grows under sustained pressure.
        if self.working.recent_utilization() > self.params.high_utilization {
            let new_capacity = self.working.grow(1);
            self.emergent.capacity_growth_events += 1;
            info!(new_capacity, "working memory capacity grew");
            thresholds.push(ThresholdEvent::new(
                "capacity_growth",
                format!("working memory capacity grew to {}", new_capacity),
                Severity::Medium,
            ));
        }

        // Emergent property: hierarchy deepens when concrete concepts
        // pile up faster than abstract ones.
        if let Some(depth) = self
            .reference
            .maybe_promote(self.params.abstraction_ratio, ctx.cycle)
        {
            if depth > self.emergent.hierarchy_depth {
                self.emergent.hierarchy_depth = depth;
                thresholds.push(ThresholdEvent::new(
                    "hierarchy_growth",
                    format!("concept hierarchy deepened to {}", depth),
                    Severity::Medium,
                ));
            }
        }

        let retrieval_strength = retrieval.strength;
        let result = ProcessResult {
            experience: id,
            focused: focused.content,
            attention: focused.attention,
            retrieved: retrieval.concepts,
            retrieval_strength,
            strategy: outcome.strategy,
            strategy_relevance: outcome.relevance,
            novelty: (1.0 - retrieval_strength).clamp(0.0, 1.0),
            reuse: retrieval_strength.clamp(0.0, 1.0),
            thresholds,
        };

        self.meta.observe_process(&result);
        result
    }

    /// Demote cold experiences to the archive tier. A seeded sample of
    /// the cold set survives; nothing is ever hard-deleted. Returns the
    /// number demoted.
    pub fn consolidate(&mut self, rng: &mut SeededRng, cycle: u64) -> usize {
        let cold: Vec<ExperienceId> = self
            .experiences
            .values()
            .filter(|e| {
                e.is_active()
                    && e.reuse_count < 2
                    && cycle.saturating_sub(e.cycle) >= self.params.consolidation_window
            })
            .map(|e| e.id)
            .collect();

        if cold.is_empty() {
            return 0;
        }

        let keep = ((self.params.retention_ratio * cold.len() as f64).ceil()) as usize;
        let mut survivors: BTreeSet<ExperienceId> = BTreeSet::new();
        let mut pool = cold.clone();
        for _ in 0..keep.min(pool.len()) {
            let idx = rng.next_index(pool.len());
            survivors.insert(pool.swap_remove(idx));
        }

        let mut demoted = 0;
        for id in &cold {
            if !survivors.contains(id) {
                if let Some(exp) = self.experiences.get_mut(id) {
                    exp.tier = MemoryTier::Archived;
                    demoted += 1;
                }
            }
        }
        info!(cycle, demoted, kept = survivors.len(), "consolidation pass");
        demoted
    }

    /// Apply a meta-memory adaptation to the stores it targets.
    pub fn apply_adaptation(&mut self, adaptation: &meta::Adaptation, cycle: u64) {
        use meta::AdaptationAction::*;
        match adaptation.action {
            IncreaseChunking => self.procedural.boost("chunking", 0.1),
            ReweightStrategies => self.procedural.normalize(),
            ExpandWorkingCapacity => {
                let capacity = self.working.grow(1);
                self.emergent.capacity_growth_events += 1;
                debug!(capacity, "capacity expanded by adaptation");
            }
            PromoteAbstraction | AddHierarchyLayer => {
                if let Some(depth) = self.reference.force_promote(cycle) {
                    self.emergent.hierarchy_depth = self.emergent.hierarchy_depth.max(depth);
                }
            }
        }
    }

    pub fn metrics(&self) -> MemoryMetrics {
        let concept_count = self.reference.active_concept_count();
        let relation_count = self.reference.relation_count();
        MemoryMetrics {
            size: self.active_experience_count(),
            concept_count,
            relation_count,
            density: relation_count as f64 / concept_count.max(1) as f64,
        }
    }

    fn log_interaction(&mut self, cycle: u64, from: Stage, to: Stage, strength: f64) {
        self.interactions.push(Interaction {
            cycle,
            from,
            to,
            strength,
        });
        if self.interactions.len() > INTERACTION_LOG_CAP {
            let excess = self.interactions.len() - INTERACTION_LOG_CAP;
            self.interactions.drain(..excess);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(cycle: u64, emotions: &EmotionVector) -> CycleContext<'_> {
        CycleContext {
            cycle,
            emotions,
            energy_delta: 0.0,
            origin: Origin::Internal,
            parents: Vec::new(),
            reflection_depth: 0,
        }
    }

    // ============================================================
    // terms / overlap
    // ============================================================

    #[test]
    fn terms_lowercase_and_strip_punctuation() {
        let set = terms("The Quick, brown FOX!");
        assert!(set.contains("quick"));
        assert!(set.contains("fox"));
        assert!(!set.contains("The"));
    }

    #[test]
    fn overlap_of_disjoint_sets_is_zero() {
        assert_eq!(overlap(&terms("alpha bravo"), &terms("charlie delta")), 0.0);
    }

    #[test]
    fn overlap_of_identical_sets_is_one() {
        let a = terms("alpha bravo charlie");
        assert_eq!(overlap(&a, &a.clone()), 1.0);
    }

    // ============================================================
    // process: staging and edge policies
    // ============================================================

    #[test]
    fn first_process_has_zero_retrieval_strength() {
        // Empty reference memory is defined as strength 0, not an error.
        let mut memory = HybridMemory::new(MemoryParams::default(), 5);
        let emotions = EmotionVector::default();
        let result = memory.process("hello world patterns", "observing quietly", ctx(0, &emotions));
        assert_eq!(result.retrieval_strength, 0.0);
        assert_eq!(result.novelty, 1.0);
    }

    #[test]
    fn repeated_content_raises_reuse_and_lowers_novelty() {
        let mut memory = HybridMemory::new(MemoryParams::default(), 5);
        let emotions = EmotionVector::default();
        let mut last = None;
        for cycle in 0..6 {
            last = Some(memory.process(
                "recurring structural pattern in sensory noise",
                "the pattern holds steady",
                ctx(cycle, &emotions),
            ));
        }
        let last = last.unwrap();
        assert!(last.reuse > 0.0, "reuse stayed zero: {:?}", last);
        assert!(last.novelty < 1.0);
    }

    #[test]
    fn interaction_log_records_three_edges_per_cycle() {
        let mut memory = HybridMemory::new(MemoryParams::default(), 5);
        let emotions = EmotionVector::default();
        memory.process("input text here", "output text here", ctx(0, &emotions));
        assert_eq!(memory.interactions().len(), 3);
        assert_eq!(memory.interactions()[0].from, Stage::Input);
        assert_eq!(memory.interactions()[2].to, Stage::Procedural);
    }

    #[test]
    fn experiences_accumulate_one_per_cycle() {
        let mut memory = HybridMemory::new(MemoryParams::default(), 5);
        let emotions = EmotionVector::default();
        for cycle in 0..4 {
            memory.process("some input", "some output", ctx(cycle, &emotions));
        }
        assert_eq!(memory.experience_count(), 4);
    }

    // ============================================================
    // consolidation: demotes, never deletes
    // ============================================================

    #[test]
    fn consolidation_archives_but_keeps_records() {
        let params = MemoryParams {
            consolidation_window: 2,
            retention_ratio: 0.5,
            ..MemoryParams::default()
        };
        let mut memory = HybridMemory::new(params, 5);
        let emotions = EmotionVector::default();
        for cycle in 0..8 {
            // Distinct content so nothing gets reused.
            memory.process(
                &format!("unique topic number {}", cycle),
                &format!("unique answer number {}", cycle),
                ctx(cycle, &emotions),
            );
        }
        let before = memory.experience_count();
        let mut rng = SeededRng::new(9);
        let demoted = memory.consolidate(&mut rng, 20);
        assert!(demoted > 0);
        assert_eq!(memory.experience_count(), before, "nothing hard-deleted");
        assert!(memory.active_experience_count() < before);
    }

    #[test]
    fn consolidation_is_deterministic_for_same_seed() {
        let build = || {
            let params = MemoryParams {
                consolidation_window: 1,
                ..MemoryParams::default()
            };
            let mut memory = HybridMemory::new(params, 5);
            let emotions = EmotionVector::default();
            for cycle in 0..10 {
                memory.process(
                    &format!("topic {}", cycle),
                    &format!("answer {}", cycle),
                    ctx(cycle, &emotions),
                );
            }
            memory
        };
        let mut a = build();
        let mut b = build();
        let mut rng_a = SeededRng::new(3);
        let mut rng_b = SeededRng::new(3);
        assert_eq!(a.consolidate(&mut rng_a, 30), b.consolidate(&mut rng_b, 30));
        let active_a: Vec<_> = a_ids(&a);
        let active_b: Vec<_> = a_ids(&b);
        assert_eq!(active_a, active_b);

        fn a_ids(m: &HybridMemory) -> Vec<ExperienceId> {
            (0..m.experience_count() as u64)
                .map(ExperienceId)
                .filter(|id| m.experience(*id).is_some_and(|e| e.is_active()))
                .collect()
        }
    }
}
