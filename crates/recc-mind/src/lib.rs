//! Cognitive subsystems: energy, emotion, hybrid memory, meta-memory,
//! self-reference, recursive reflection, and behavior selection.
//!
//! Everything here is synchronous and deterministic given a seed; the
//! agent crate owns the cycle loop that wires these together.

pub mod behavior;
pub mod emotion;
pub mod energy;
pub mod memory;
pub mod reflection;
pub mod rng;
pub mod self_reference;

pub use behavior::{Behavior, BehaviorSystem};
pub use emotion::{EmotionalSystem, MemorySignals};
pub use energy::{EnergySystem, COST_EXTERNAL, COST_INTERNAL};
pub use memory::meta::{Adaptation, AdaptationAction, MetaMemory};
pub use memory::{CycleContext, HybridMemory, MemoryParams, ProcessResult};
pub use reflection::{
    ModOp, ModelParams, Modification, RecursiveReflection, ReflectOutcome, ReflectStatus,
    ReflectionModel,
};
pub use rng::SeededRng;
pub use self_reference::{SelfModel, SelfReferenceSystem};
