//! The RECC data model: experiences, concepts, self-reference events,
//! and the emotion vector.
//!
//! All identifiers are sequential integers allocated from counters held
//! in agent state, and all timestamps inside the model are logical cycle
//! indices. This keeps two agents fed the same inputs bit-identical:
//! wall-clock time appears only in snapshot envelopes and bus events.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Identifier of a raw experience record.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct ExperienceId(pub u64);

/// Identifier of a concept node in reference memory.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct ConceptId(pub u64);

/// Identifier of a self-reference event.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct ReferenceId(pub u64);

/// Ids are serialized as plain u64s, but when they appear as JSON map
/// keys serde_json renders them as strings, and flattened snapshots
/// hand those keys back as strings. Accept both spellings on the way
/// in so a serialized state always round-trips.
macro_rules! id_deserialize {
    ($ty:ident) => {
        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                struct IdVisitor;
                impl<'de> serde::de::Visitor<'de> for IdVisitor {
                    type Value = $ty;

                    fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                        write!(f, "a u64 id or its string form")
                    }

                    fn visit_u64<E: serde::de::Error>(self, v: u64) -> Result<$ty, E> {
                        Ok($ty(v))
                    }

                    fn visit_i64<E: serde::de::Error>(self, v: i64) -> Result<$ty, E> {
                        u64::try_from(v)
                            .map($ty)
                            .map_err(|_| E::custom("negative id"))
                    }

                    fn visit_str<E: serde::de::Error>(self, v: &str) -> Result<$ty, E> {
                        v.parse::<u64>().map($ty).map_err(E::custom)
                    }
                }
                deserializer.deserialize_any(IdVisitor)
            }
        }
    };
}

id_deserialize!(ExperienceId);
id_deserialize!(ConceptId);
id_deserialize!(ReferenceId);

impl std::fmt::Display for ExperienceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "exp-{}", self.0)
    }
}

impl std::fmt::Display for ConceptId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "concept-{}", self.0)
    }
}

impl std::fmt::Display for ReferenceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ref-{}", self.0)
    }
}

/// Whether an experience came from inside the agent or from the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    Internal,
    External,
}

/// Retrieval tier. Experiences are never hard-deleted; consolidation
/// demotes low-value entries to `Archived`, which excludes them from
/// retrieval but keeps the record.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemoryTier {
    #[default]
    Active,
    Archived,
}

/// One cycle's record: what came in, what went out, and the internal
/// conditions at the time. Immutable once written except for
/// `reuse_count` increments and tier demotion.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Experience {
    pub id: ExperienceId,
    /// Logical timestamp: the cycle this experience was created on.
    pub cycle: u64,
    pub input: String,
    pub output: String,
    pub emotions: EmotionVector,
    pub energy_delta: f64,
    pub tags: BTreeSet<String>,
    pub reuse_count: u32,
    /// Max recursion depth reached at creation time.
    pub reflection_depth: u32,
    pub origin: Origin,
    /// Causal parents. An experience may have several; the experience
    /// log is a DAG, not a tree.
    pub parents: Vec<ExperienceId>,
    #[serde(default)]
    pub tier: MemoryTier,
}

impl Experience {
    pub fn new(id: ExperienceId, cycle: u64, input: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            id,
            cycle,
            input: input.into(),
            output: output.into(),
            emotions: EmotionVector::default(),
            energy_delta: 0.0,
            tags: BTreeSet::new(),
            reuse_count: 0,
            reflection_depth: 0,
            origin: Origin::Internal,
            parents: Vec::new(),
            tier: MemoryTier::Active,
        }
    }

    pub fn is_active(&self) -> bool {
        self.tier == MemoryTier::Active
    }
}

/// A node in the concept graph. Strength rises with reuse and decays
/// otherwise; promotion merges a node into a more abstract parent.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConceptNode {
    pub id: ConceptId,
    pub label: String,
    /// Salience in [0,1].
    pub strength: f64,
    /// Cycle the concept was first extracted on.
    pub first_seen: u64,
    /// Distribution of emotional context at extraction time.
    pub emotional_tags: BTreeMap<String, f64>,
    pub experiences: Vec<ExperienceId>,
    pub abstraction_level: u32,
    pub self_reference_count: u32,
    /// Set when abstraction promotion folded this node into a parent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merged_into: Option<ConceptId>,
}

impl ConceptNode {
    pub fn new(id: ConceptId, label: impl Into<String>, first_seen: u64) -> Self {
        Self {
            id,
            label: label.into(),
            strength: 0.1,
            first_seen,
            emotional_tags: BTreeMap::new(),
            experiences: Vec::new(),
            abstraction_level: 0,
            self_reference_count: 0,
            merged_into: None,
        }
    }

    pub fn reinforce(&mut self, amount: f64) {
        self.strength = (self.strength + amount).clamp(0.0, 1.0);
    }

    pub fn decay(&mut self, rate: f64) {
        self.strength = (self.strength * (1.0 - rate)).clamp(0.0, 1.0);
    }
}

/// What a self-reference event points at. Depth is 0 when the target is
/// a raw experience, 1 + target depth when it is another reference.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum RefTarget {
    Experience(ExperienceId),
    Reference(ReferenceId),
}

/// One entry in the append-only self-reference log: a thought pointing
/// at a prior thought or memory.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SelfReferenceEvent {
    pub id: ReferenceId,
    pub cycle: u64,
    pub source: String,
    pub target: RefTarget,
    pub depth: u32,
    pub insight: bool,
    pub energy_impact: f64,
}

// ============================================================
// Emotion vector
// ============================================================

/// A fixed set of affect scalars in [0,1] plus per-scalar momentum and
/// derived blends. Owned exclusively by the emotional system; everyone
/// else gets read-only snapshots.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EmotionVector {
    pub curiosity: f64,
    pub frustration: f64,
    pub satisfaction: f64,
    pub uncertainty: f64,
    pub momentum: EmotionMomentum,
    #[serde(default)]
    pub blended: Vec<BlendedState>,
}

/// Exponentially-weighted delta history per scalar.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EmotionMomentum {
    pub curiosity: f64,
    pub frustration: f64,
    pub satisfaction: f64,
    pub uncertainty: f64,
}

/// Composite states computed as fixed nonlinear combinations of the
/// base scalars.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlendedState {
    /// High curiosity, low satisfaction.
    RestlessExploration,
    /// High frustration, high uncertainty.
    AnxiousVigilance,
    /// High satisfaction, low uncertainty.
    ContentMastery,
    /// Everything flat, no scalar dominating.
    Stagnation,
}

impl Default for EmotionVector {
    fn default() -> Self {
        Self {
            curiosity: 0.5,
            frustration: 0.1,
            satisfaction: 0.3,
            uncertainty: 0.4,
            momentum: EmotionMomentum::default(),
            blended: Vec::new(),
        }
    }
}

impl EmotionVector {
    /// All four scalars in a fixed order, for bounds checks and metrics.
    pub fn scalars(&self) -> [f64; 4] {
        [
            self.curiosity,
            self.frustration,
            self.satisfaction,
            self.uncertainty,
        ]
    }

    pub fn in_bounds(&self) -> bool {
        self.scalars().iter().all(|v| (0.0..=1.0).contains(v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ============================================================
    // Identifiers: display and ordering
    // ============================================================

    #[test]
    fn id_display_is_stable() {
        assert_eq!(ExperienceId(7).to_string(), "exp-7");
        assert_eq!(ConceptId(3).to_string(), "concept-3");
        assert_eq!(ReferenceId(0).to_string(), "ref-0");
    }

    #[test]
    fn ids_order_by_allocation() {
        assert!(ExperienceId(1) < ExperienceId(2));
        assert!(ReferenceId(10) > ReferenceId(9));
    }

    // ============================================================
    // Experience: defaults and serialization
    // ============================================================

    #[test]
    fn new_experience_starts_active_with_zero_reuse() {
        let exp = Experience::new(ExperienceId(0), 4, "in", "out");
        assert!(exp.is_active());
        assert_eq!(exp.reuse_count, 0);
        assert_eq!(exp.cycle, 4);
        assert!(exp.parents.is_empty());
    }

    #[test]
    fn experience_roundtrips_through_json() {
        let mut exp = Experience::new(ExperienceId(5), 12, "prompt", "response");
        exp.origin = Origin::External;
        exp.parents = vec![ExperienceId(1), ExperienceId(3)];
        exp.tags.insert("novel".to_string());

        let json = serde_json::to_string(&exp).unwrap();
        let restored: Experience = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.id, ExperienceId(5));
        assert_eq!(restored.origin, Origin::External);
        assert_eq!(restored.parents, vec![ExperienceId(1), ExperienceId(3)]);
        assert!(restored.tags.contains("novel"));
    }

    // ============================================================
    // ConceptNode: strength bounds
    // ============================================================

    #[test]
    fn concept_reinforce_saturates_at_one() {
        let mut node = ConceptNode::new(ConceptId(0), "pattern", 1);
        for _ in 0..100 {
            node.reinforce(0.2);
        }
        assert!(node.strength <= 1.0);
        assert!(node.strength > 0.9);
    }

    #[test]
    fn concept_decay_never_goes_negative() {
        let mut node = ConceptNode::new(ConceptId(0), "pattern", 1);
        for _ in 0..100 {
            node.decay(0.5);
        }
        assert!(node.strength >= 0.0);
    }

    // ============================================================
    // RefTarget: tagged serialization
    // ============================================================

    #[test]
    fn ref_target_serializes_with_kind_tag() {
        let target = RefTarget::Experience(ExperienceId(9));
        let json = serde_json::to_value(&target).unwrap();
        assert_eq!(json["kind"], "experience");
        assert_eq!(json["id"], 9);

        let nested = RefTarget::Reference(ReferenceId(2));
        let json = serde_json::to_value(&nested).unwrap();
        assert_eq!(json["kind"], "reference");
    }

    // ============================================================
    // EmotionVector: bounds
    // ============================================================

    #[test]
    fn default_emotions_are_in_bounds() {
        assert!(EmotionVector::default().in_bounds());
    }

    #[test]
    fn out_of_range_scalar_is_detected() {
        let mut v = EmotionVector::default();
        v.frustration = 1.3;
        assert!(!v.in_bounds());
    }
}
