//! Versioned, atomic snapshot persistence.
//!
//! Snapshots are flat JSON objects: an envelope (version, timestamp,
//! session_id) plus every mutable store at the top level. Writes go to
//! a temp file first and are renamed into place, and the `latest`
//! pointer is updated only after the snapshot itself is durable.

use crate::config::AgentConfig;
use recc_core::{Error, Result};
use recc_mind::{
    BehaviorSystem, EmotionalSystem, EnergySystem, HybridMemory, RecursiveReflection, SeededRng,
    SelfReferenceSystem,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const STATE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Loop bookkeeping that has to survive a save/load round trip.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct InternalState {
    pub cycle: u64,
    pub last_consolidation: u64,
    pub last_autosave: u64,
    /// External input waiting for the next cycle.
    pub pending_input: Option<String>,
}

/// Every mutable store of the agent. Serializing this (without the
/// envelope) is the unit of determinism comparison: two agents with the
/// same seed and inputs produce identical `AgentState` JSON.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AgentState {
    pub energy: EnergySystem,
    pub emotional_state: EmotionalSystem,
    pub memory: HybridMemory,
    pub self_reference: SelfReferenceSystem,
    pub reflection_levels: RecursiveReflection,
    pub behavior: BehaviorSystem,
    pub internal_state: InternalState,
    pub rng: SeededRng,
}

impl AgentState {
    pub fn fresh(config: &AgentConfig) -> Self {
        Self {
            energy: EnergySystem::new(config.energy.initial, config.energy.regen_rate),
            emotional_state: EmotionalSystem::new(),
            memory: HybridMemory::new(config.memory_params(), config.memory.meta_fan_in),
            self_reference: SelfReferenceSystem::new(),
            reflection_levels: RecursiveReflection::new(
                config.reflection.levels,
                config.reflection.activation_thresholds.clone(),
            ),
            behavior: BehaviorSystem::new(),
            internal_state: InternalState::default(),
            rng: SeededRng::new(config.seed),
        }
    }
}

/// The full on-disk snapshot. State fields are flattened so the file's
/// top level carries `memory`, `self_reference`, etc. directly.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: String,
    pub timestamp: String,
    pub session_id: String,
    #[serde(flatten)]
    pub state: AgentState,
}

/// Top-level keys a well-formed snapshot must carry. Unknown extra
/// keys are ignored for forward compatibility.
const EXPECTED_KEYS: &[&str] = &[
    "version",
    "timestamp",
    "session_id",
    "energy",
    "memory",
    "self_reference",
    "emotional_state",
    "reflection_levels",
    "behavior",
    "internal_state",
    "rng",
];

#[derive(Clone, Debug)]
pub struct StateManager {
    dir: PathBuf,
}

impl StateManager {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write a snapshot atomically; returns its id. The `latest`
    /// pointer moves only after the snapshot file is in place.
    pub fn save(&self, snapshot: &Snapshot) -> Result<String> {
        fs::create_dir_all(&self.dir)?;
        let id = format!("snapshot-{}", snapshot.state.internal_state.cycle);
        let path = self.dir.join(format!("{}.json", id));

        let json = serde_json::to_string_pretty(snapshot)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, &json)?;
        fs::rename(&tmp, &path)?;

        let pointer = self.dir.join("latest");
        let pointer_tmp = self.dir.join("latest.tmp");
        fs::write(&pointer_tmp, &id)?;
        fs::rename(&pointer_tmp, &pointer)?;

        info!(%id, path = %path.display(), "snapshot saved");
        Ok(id)
    }

    /// Load by id or by the literal reference "latest".
    pub fn load(&self, reference: &str) -> Result<Snapshot> {
        let id = if reference == "latest" {
            let pointer = self.dir.join("latest");
            fs::read_to_string(&pointer)
                .map(|s| s.trim().to_string())
                .map_err(|_| Error::StateNotFound("latest".to_string()))?
        } else {
            reference.to_string()
        };

        let path = self.dir.join(format!("{}.json", id));
        let content =
            fs::read_to_string(&path).map_err(|_| Error::StateNotFound(id.clone()))?;

        let value: serde_json::Value = serde_json::from_str(&content)?;
        let object = value
            .as_object()
            .ok_or_else(|| Error::malformed("root"))?;
        for key in EXPECTED_KEYS {
            if !object.contains_key(*key) {
                return Err(Error::malformed(*key));
            }
        }

        let snapshot: Snapshot = serde_json::from_value(value)?;
        check_version(&snapshot.version);
        info!(%id, "snapshot loaded");
        Ok(snapshot)
    }
}

/// Major-version mismatch is a warning, never a failure.
fn check_version(found: &str) {
    let major = |v: &str| v.split('.').next().unwrap_or("").to_string();
    if major(found) != major(STATE_VERSION) {
        warn!(
            found,
            current = STATE_VERSION,
            "snapshot major version differs; loading anyway"
        );
    }
}
