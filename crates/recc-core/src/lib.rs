//! Core types for RECC: the shared data model, error taxonomy,
//! and observability event schema.

pub mod error;
pub mod event;
pub mod types;

pub use error::{Error, Result};
pub use event::{
    LevelView, MemoryMetrics, ObservabilityEvent, Severity, ThresholdEvent,
};
pub use types::{
    BlendedState, ConceptId, ConceptNode, EmotionVector, Experience, ExperienceId, MemoryTier,
    Origin, ReferenceId, RefTarget, SelfReferenceEvent,
};
