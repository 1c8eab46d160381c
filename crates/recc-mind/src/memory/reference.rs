//! Reference memory: the long-term concept graph.
//!
//! Concepts are term-labelled nodes with strength, emotional tags, and
//! links back to the experiences that built them. Retrieval reinforces
//! what matched and decays what did not; relations grow between
//! concepts retrieved together. Abstraction promotion merges strong
//! related concepts into a parent one level up.

use super::{overlap, terms};
use recc_core::{ConceptId, ConceptNode, EmotionVector, ExperienceId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

/// Minimum Jaccard overlap for a concept to count as retrieved.
const MATCH_THRESHOLD: f64 = 0.2;
/// Concrete concepts needed before promotion is considered.
const MIN_CLUSTER: usize = 4;
/// Terms kept in a concept label.
const LABEL_TERM_CAP: usize = 4;
/// EWMA weight for merging emotional tags into a concept.
const TAG_ALPHA: f64 = 0.7;

/// Outcome of one retrieval pass.
#[derive(Clone, Debug)]
pub struct Retrieval {
    pub concepts: Vec<ConceptId>,
    /// Aggregate match strength in [0,1]. Zero over an empty store.
    pub strength: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReferenceMemory {
    concepts: BTreeMap<ConceptId, ConceptNode>,
    /// Undirected edges stored as ordered id pairs.
    relations: BTreeSet<(ConceptId, ConceptId)>,
    next_concept: u64,
}

impl ReferenceMemory {
    pub fn new() -> Self {
        Self {
            concepts: BTreeMap::new(),
            relations: BTreeSet::new(),
            next_concept: 0,
        }
    }

    pub fn concept(&self, id: ConceptId) -> Option<&ConceptNode> {
        self.concepts.get(&id)
    }

    pub fn concept_mut(&mut self, id: ConceptId) -> Option<&mut ConceptNode> {
        self.concepts.get_mut(&id)
    }

    /// Concepts not merged away.
    pub fn active_concept_count(&self) -> usize {
        self.concepts
            .values()
            .filter(|c| c.merged_into.is_none())
            .count()
    }

    pub fn relation_count(&self) -> usize {
        self.relations.len()
    }

    pub fn max_abstraction_level(&self) -> u32 {
        self.concepts
            .values()
            .filter(|c| c.merged_into.is_none())
            .map(|c| c.abstraction_level)
            .max()
            .unwrap_or(0)
    }

    /// Match focused content against the graph, reinforcing hits and
    /// decaying misses. A miss over a nonempty store creates a new
    /// concept; an empty store returns strength 0 without error.
    pub fn retrieve_and_update(
        &mut self,
        focused: &str,
        emotions: &EmotionVector,
        experience: ExperienceId,
        cycle: u64,
    ) -> Retrieval {
        let incoming = terms(focused);
        if incoming.is_empty() {
            return Retrieval {
                concepts: Vec::new(),
                strength: 0.0,
            };
        }

        let mut matched: Vec<(ConceptId, f64)> = Vec::new();
        for (id, node) in &self.concepts {
            if node.merged_into.is_some() {
                continue;
            }
            let score = overlap(&incoming, &terms(&node.label));
            if score > MATCH_THRESHOLD {
                matched.push((*id, score));
            }
        }

        if matched.is_empty() {
            let id = self.create_concept(&incoming, emotions, experience, cycle, 0);
            debug!(cycle, concept = %id, "novel pattern, concept created");
            return Retrieval {
                concepts: Vec::new(),
                strength: 0.0,
            };
        }

        let mut strength_sum = 0.0;
        for (id, score) in &matched {
            if let Some(node) = self.concepts.get_mut(id) {
                node.reinforce(0.05 + 0.05 * score);
                node.experiences.push(experience);
                merge_emotional_tags(node, emotions);
                strength_sum += score * node.strength;
            }
        }

        // Misses fade a little.
        let matched_ids: BTreeSet<ConceptId> = matched.iter().map(|(id, _)| *id).collect();
        for (id, node) in self.concepts.iter_mut() {
            if node.merged_into.is_none() && !matched_ids.contains(id) {
                node.decay(0.01);
            }
        }

        // Co-retrieval creates relations.
        let ids: Vec<ConceptId> = matched.iter().map(|(id, _)| *id).collect();
        for i in 0..ids.len() {
            for j in (i + 1)..ids.len() {
                self.relations.insert(edge(ids[i], ids[j]));
            }
        }

        let strength = (strength_sum / matched.len() as f64).clamp(0.0, 1.0);
        Retrieval {
            concepts: ids,
            strength,
        }
    }

    /// Record that a self-reference event touched this concept.
    pub fn mark_self_reference(&mut self, id: ConceptId) {
        if let Some(node) = self.concepts.get_mut(&id) {
            node.self_reference_count += 1;
        }
    }

    /// Promote when concrete concepts dominate: if the abstract to
    /// concrete ratio is below `ratio_threshold`, merge the two
    /// strongest related same-level concepts into a parent. Returns the
    /// new hierarchy depth if promotion ran.
    pub fn maybe_promote(&mut self, ratio_threshold: f64, cycle: u64) -> Option<u32> {
        let concrete = self
            .concepts
            .values()
            .filter(|c| c.merged_into.is_none() && c.abstraction_level == 0)
            .count();
        if concrete < MIN_CLUSTER {
            return None;
        }
        let abstract_count = self
            .concepts
            .values()
            .filter(|c| c.merged_into.is_none() && c.abstraction_level > 0)
            .count();
        if abstract_count as f64 / concrete as f64 >= ratio_threshold {
            return None;
        }
        self.force_promote(cycle)
    }

    /// Unconditionally attempt one promotion. Picks the strongest
    /// related pair at the deepest populated level.
    pub fn force_promote(&mut self, cycle: u64) -> Option<u32> {
        let (a, b) = self.strongest_related_pair()?;
        let level = self.concepts[&a].abstraction_level.max(self.concepts[&b].abstraction_level) + 1;

        let label = {
            let mut combined = terms(&self.concepts[&a].label);
            combined.extend(terms(&self.concepts[&b].label));
            combined
                .into_iter()
                .take(LABEL_TERM_CAP)
                .collect::<Vec<_>>()
                .join(" ")
        };

        let parent = ConceptId(self.next_concept);
        self.next_concept += 1;

        let mut node = ConceptNode::new(parent, &label, cycle);
        node.abstraction_level = level;
        node.strength = (self.concepts[&a].strength + self.concepts[&b].strength) / 2.0;
        node.experiences = {
            let mut experiences = self.concepts[&a].experiences.clone();
            experiences.extend(self.concepts[&b].experiences.iter().copied());
            experiences
        };
        for child in [a, b] {
            for (tag, weight) in self.concepts[&child].emotional_tags.clone() {
                let entry = node.emotional_tags.entry(tag).or_insert(0.0);
                *entry = entry.max(weight);
            }
        }
        self.concepts.insert(parent, node);

        for child in [a, b] {
            if let Some(c) = self.concepts.get_mut(&child) {
                c.merged_into = Some(parent);
            }
        }
        info!(cycle, %parent, level, "concepts promoted into abstraction");
        Some(self.max_abstraction_level())
    }

    fn strongest_related_pair(&self) -> Option<(ConceptId, ConceptId)> {
        self.relations
            .iter()
            .filter(|(a, b)| {
                let live = |id: &ConceptId| {
                    self.concepts
                        .get(id)
                        .is_some_and(|c| c.merged_into.is_none())
                };
                live(a) && live(b) && self.concepts[a].abstraction_level == self.concepts[b].abstraction_level
            })
            .max_by(|x, y| {
                let sx = self.concepts[&x.0].strength + self.concepts[&x.1].strength;
                let sy = self.concepts[&y.0].strength + self.concepts[&y.1].strength;
                sx.partial_cmp(&sy).unwrap_or(std::cmp::Ordering::Equal)
            })
            .copied()
    }

    fn create_concept(
        &mut self,
        incoming: &BTreeSet<String>,
        emotions: &EmotionVector,
        experience: ExperienceId,
        cycle: u64,
        level: u32,
    ) -> ConceptId {
        let id = ConceptId(self.next_concept);
        self.next_concept += 1;
        let label = incoming
            .iter()
            .take(LABEL_TERM_CAP)
            .cloned()
            .collect::<Vec<_>>()
            .join(" ");
        let mut node = ConceptNode::new(id, &label, cycle);
        node.abstraction_level = level;
        node.experiences.push(experience);
        merge_emotional_tags(&mut node, emotions);
        self.concepts.insert(id, node);
        id
    }
}

impl Default for ReferenceMemory {
    fn default() -> Self {
        Self::new()
    }
}

fn edge(a: ConceptId, b: ConceptId) -> (ConceptId, ConceptId) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Fold the current emotional scalars into a concept's tag map.
fn merge_emotional_tags(node: &mut ConceptNode, emotions: &EmotionVector) {
    for (tag, value) in [
        ("curiosity", emotions.curiosity),
        ("frustration", emotions.frustration),
        ("satisfaction", emotions.satisfaction),
        ("uncertainty", emotions.uncertainty),
    ] {
        let entry = node.emotional_tags.entry(tag.to_string()).or_insert(value);
        *entry = TAG_ALPHA * *entry + (1.0 - TAG_ALPHA) * value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn emotions() -> EmotionVector {
        EmotionVector::default()
    }

    // ============================================================
    // Retrieval
    // ============================================================

    #[test]
    fn empty_store_returns_zero_strength() {
        let mut memory = ReferenceMemory::new();
        let r = memory.retrieve_and_update("structural patterns", &emotions(), ExperienceId(0), 0);
        assert!(r.concepts.is_empty());
        assert_eq!(r.strength, 0.0);
        // The miss still seeded a concept for next time.
        assert_eq!(memory.active_concept_count(), 1);
    }

    #[test]
    fn repeated_retrieval_reinforces() {
        let mut memory = ReferenceMemory::new();
        memory.retrieve_and_update("recursive pattern analysis", &emotions(), ExperienceId(0), 0);
        let before = memory.concept(ConceptId(0)).unwrap().strength;
        memory.retrieve_and_update("recursive pattern analysis", &emotions(), ExperienceId(1), 1);
        assert!(memory.concept(ConceptId(0)).unwrap().strength > before);
    }

    #[test]
    fn unmatched_concepts_decay() {
        let mut memory = ReferenceMemory::new();
        memory.retrieve_and_update("oceanic tidal rhythms", &emotions(), ExperienceId(0), 0);
        let before = memory.concept(ConceptId(0)).unwrap().strength;
        memory.retrieve_and_update("volcanic rock formations", &emotions(), ExperienceId(1), 1);
        memory.retrieve_and_update("volcanic rock formations", &emotions(), ExperienceId(2), 2);
        assert!(memory.concept(ConceptId(0)).unwrap().strength < before);
    }

    #[test]
    fn co_retrieval_creates_relations() {
        let mut memory = ReferenceMemory::new();
        memory.retrieve_and_update("alpha omega cluster", &emotions(), ExperienceId(0), 0);
        memory.retrieve_and_update("beta gamma cluster", &emotions(), ExperienceId(1), 1);
        // Both concepts match this probe.
        memory.retrieve_and_update(
            "alpha omega beta gamma cluster",
            &emotions(),
            ExperienceId(2),
            2,
        );
        assert!(memory.relation_count() >= 1);
    }

    // ============================================================
    // Abstraction promotion
    // ============================================================

    #[test]
    fn promotion_requires_cluster_and_low_ratio() {
        let mut memory = ReferenceMemory::new();
        memory.retrieve_and_update("alpha topic", &emotions(), ExperienceId(0), 0);
        assert_eq!(memory.maybe_promote(0.5, 1), None);
    }

    #[test]
    fn force_promote_creates_parent_and_merges_children() {
        let mut memory = ReferenceMemory::new();
        memory.retrieve_and_update("alpha omega cluster", &emotions(), ExperienceId(0), 0);
        memory.retrieve_and_update("beta gamma cluster", &emotions(), ExperienceId(1), 1);
        memory.retrieve_and_update(
            "alpha omega beta gamma cluster",
            &emotions(),
            ExperienceId(2),
            2,
        );

        let depth = memory.force_promote(3);
        assert_eq!(depth, Some(1));
        let merged: Vec<_> = (0..2)
            .map(ConceptId)
            .filter(|id| memory.concept(*id).unwrap().merged_into.is_some())
            .collect();
        assert_eq!(merged.len(), 2);
    }
}
