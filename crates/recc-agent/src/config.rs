//! Agent configuration
//!
//! All tunable parameters in one place. Loaded from TOML at startup,
//! falls back to defaults if no config file exists.

use recc_mind::MemoryParams;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level agent configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// RNG seed for the whole session.
    pub seed: u64,
    /// Energy parameters.
    pub energy: EnergyConfig,
    /// Memory thresholds.
    pub memory: MemoryConfig,
    /// Reflection hierarchy parameters.
    pub reflection: ReflectionConfig,
    /// Persistence parameters.
    pub persistence: PersistenceConfig,
    /// Collaborator parameters.
    pub collaborator: CollaboratorConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnergyConfig {
    /// Starting level in [0,1].
    pub initial: f64,
    /// Regeneration added per cycle.
    pub regen_rate: f64,
    /// Minimum level for external behaviors.
    pub external_gate: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
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
    /// Cycles between consolidation passes.
    pub consolidation_interval: u64,
    /// Level-1 records per level-2 pattern (and patterns per trend).
    pub meta_fan_in: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReflectionConfig {
    /// Number of levels, depth 0 included.
    pub levels: u32,
    /// History entries level d-1 needs before level d activates.
    pub activation_thresholds: Vec<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistenceConfig {
    /// Snapshot directory.
    pub snapshot_dir: String,
    /// Cycles between automatic saves. 0 disables autosave.
    pub autosave_interval: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CollaboratorConfig {
    /// Anthropic model id for the live collaborator.
    pub model: String,
    /// Max tokens per response.
    pub max_tokens: u32,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            energy: EnergyConfig::default(),
            memory: MemoryConfig::default(),
            reflection: ReflectionConfig::default(),
            persistence: PersistenceConfig::default(),
            collaborator: CollaboratorConfig::default(),
        }
    }
}

impl Default for EnergyConfig {
    fn default() -> Self {
        Self {
            initial: 0.8,
            regen_rate: 0.02,
            external_gate: 0.3,
        }
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            working_capacity: 7,
            high_utilization: 0.8,
            abstraction_ratio: 0.5,
            retention_ratio: 0.5,
            consolidation_window: 10,
            consolidation_interval: 25,
            meta_fan_in: 5,
        }
    }
}

impl Default for ReflectionConfig {
    fn default() -> Self {
        Self {
            levels: 4,
            activation_thresholds: vec![1, 3, 5],
        }
    }
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            snapshot_dir: "snapshots".to_string(),
            autosave_interval: 10,
        }
    }
}

impl Default for CollaboratorConfig {
    fn default() -> Self {
        Self {
            model: "claude-haiku-4-5-20251001".to_string(),
            max_tokens: 1024,
        }
    }
}

impl AgentConfig {
    /// Load config from a TOML file, falling back to defaults.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => {
                    tracing::info!("Loaded config from {}", path.display());
                    config
                }
                Err(e) => {
                    tracing::warn!("Failed to parse {}: {}, using defaults", path.display(), e);
                    Self::default()
                }
            },
            Err(_) => {
                tracing::info!("No config at {}, using defaults", path.display());
                Self::default()
            }
        }
    }

    /// Write the current config as TOML (for generating a default config file).
    pub fn to_toml(&self) -> String {
        toml::to_string_pretty(self).unwrap_or_default()
    }

    pub fn memory_params(&self) -> MemoryParams {
        MemoryParams {
            working_capacity: self.memory.working_capacity,
            high_utilization: self.memory.high_utilization,
            abstraction_ratio: self.memory.abstraction_ratio,
            retention_ratio: self.memory.retention_ratio,
            consolidation_window: self.memory.consolidation_window,
        }
    }
}
