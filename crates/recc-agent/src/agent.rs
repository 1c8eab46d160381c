//! The single-threaded cooperative cycle loop.
//!
//! One cycle: energy update → behavior selection → behavior execution
//! (internal, or external through the collaborator) → hybrid memory
//! ingestion → recursive reflection cascade → emotional update → meta
//! adaptations → periodic consolidation and autosave → one bus event.
//! Because the emotional update runs at the tail, behavior selection
//! reads the previous cycle's emotion vector.
//! Nothing in here terminates the loop; the policy is log, degrade,
//! continue. Cancellation is checked at cycle boundaries only.

use crate::bus::ObservabilityBus;
use crate::config::AgentConfig;
use crate::state::{AgentState, Snapshot, StateManager, STATE_VERSION};
use chrono::Utc;
use recc_core::{
    ObservabilityEvent, Origin, Result, Severity, ThresholdEvent,
};
use recc_llm::Collaborator;
use recc_mind::{Behavior, CycleContext, MemorySignals, COST_EXTERNAL, COST_INTERNAL};
use serde::Serialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Cheap status view for the control surface.
#[derive(Clone, Debug, Serialize)]
pub struct AgentStatus {
    pub session_id: String,
    pub cycle: u64,
    pub energy: f64,
    pub max_recursion_depth: u32,
    pub experiences: usize,
    pub last_behavior: Option<String>,
}

pub struct ReccAgent {
    config: AgentConfig,
    session_id: String,
    state: AgentState,
    collaborator: Arc<dyn Collaborator>,
    bus: ObservabilityBus,
    state_manager: StateManager,
    cancel: CancellationToken,
}

impl ReccAgent {
    pub fn new(config: AgentConfig, collaborator: Arc<dyn Collaborator>) -> Self {
        let state = AgentState::fresh(&config);
        let state_manager = StateManager::new(&config.persistence.snapshot_dir);
        Self {
            config,
            session_id: Uuid::new_v4().to_string(),
            state,
            collaborator,
            bus: ObservabilityBus::default(),
            state_manager,
            cancel: CancellationToken::new(),
        }
    }

    pub fn bus(&self) -> &ObservabilityBus {
        &self.bus
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn state(&self) -> &AgentState {
        &self.state
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn status(&self) -> AgentStatus {
        AgentStatus {
            session_id: self.session_id.clone(),
            cycle: self.state.internal_state.cycle,
            energy: self.state.energy.level(),
            max_recursion_depth: self.state.self_reference.max_depth(),
            experiences: self.state.memory.experience_count(),
            last_behavior: self.state.behavior.last().map(|b| b.name().to_string()),
        }
    }

    /// Queue text for the next cycle; that cycle will Respond to it.
    pub fn send_external_input(&mut self, text: impl Into<String>) {
        self.state.internal_state.pending_input = Some(text.into());
    }

    /// Run up to `cycles` cycles, stopping early on cancellation.
    pub async fn run(&mut self, cycles: u64) -> Result<()> {
        for _ in 0..cycles {
            if self.cancel.is_cancelled() {
                info!("cancellation observed at cycle boundary");
                break;
            }
            self.step().await?;
        }
        Ok(())
    }

    /// Execute exactly one cycle.
    pub async fn step(&mut self) -> Result<ObservabilityEvent> {
        self.state.internal_state.cycle += 1;
        let cycle = self.state.internal_state.cycle;
        let mut thresholds: Vec<ThresholdEvent> = Vec::new();

        // Behavior selection against the current affect and energy.
        let pending_input = self.state.internal_state.pending_input.take();
        let emotions_before = self.state.emotional_state.vector().clone();
        let mut behavior = self.state.behavior.select(
            pending_input.is_some(),
            &emotions_before,
            self.state.energy.level(),
            self.config.energy.external_gate,
            &mut self.state.rng,
        );

        // Execute. A collaborator failure degrades to contemplation.
        let prompt = self.compose_prompt(behavior, pending_input.as_deref());
        let (output, origin) = if behavior.is_external() {
            match self
                .collaborator
                .generate(&prompt, cycle == 1)
                .await
            {
                Ok(text) => (text, Origin::External),
                Err(e) => {
                    warn!(error = %e, "collaborator failed; degrading to internal behavior");
                    thresholds.push(ThresholdEvent::new(
                        "collaborator_failure",
                        format!("external behavior {} degraded: {}", behavior.name(), e),
                        Severity::Low,
                    ));
                    behavior = Behavior::Contemplate;
                    self.state.behavior.record_forced(behavior);
                    (self.internal_output(behavior, &prompt), Origin::Internal)
                }
            }
        } else {
            (self.internal_output(behavior, &prompt), Origin::Internal)
        };

        // Energy pays for what actually ran.
        let cost = if origin == Origin::External {
            COST_EXTERNAL
        } else {
            COST_INTERNAL
        };
        let energy_delta = self.state.energy.update(cost);

        // Memory ingestion.
        let parents = self
            .state
            .memory
            .latest_experience()
            .map(|e| vec![e.id])
            .unwrap_or_default();
        let result = self.state.memory.process(
            &prompt,
            &output,
            CycleContext {
                cycle,
                emotions: &emotions_before,
                energy_delta,
                origin,
                parents,
                reflection_depth: self.state.self_reference.max_depth(),
            },
        );
        thresholds.extend(result.thresholds.iter().cloned());

        // Reflection cascade over this cycle's processed content.
        let reflect_outcome = self.state.reflection_levels.reflect(
            cycle,
            &result,
            self.state.energy.level(),
            &mut self.state.self_reference,
        );
        thresholds.extend(reflect_outcome.thresholds.iter().cloned());
        self.state.self_reference.update_self_model(cycle);

        // Affect reacts to what memory reported.
        self.state.emotional_state.update(
            self.state.energy.level(),
            energy_delta,
            &MemorySignals {
                novelty: result.novelty,
                reuse: result.reuse,
            },
        );

        // Highest-priority meta adaptation, if any, is applied now.
        if let Some(adaptation) = self.state.memory.meta.recommend_adaptations().into_iter().next()
        {
            debug!(level = adaptation.level, action = ?adaptation.action, "applying adaptation");
            self.state.memory.apply_adaptation(&adaptation, cycle);
        }

        // Periodic consolidation.
        let interval = self.config.memory.consolidation_interval;
        if interval > 0 && cycle.saturating_sub(self.state.internal_state.last_consolidation) >= interval
        {
            self.state.internal_state.last_consolidation = cycle;
            let demoted = self.state.memory.consolidate(&mut self.state.rng, cycle);
            if demoted > 0 {
                thresholds.push(ThresholdEvent::new(
                    "consolidation",
                    format!("{} experiences archived", demoted),
                    Severity::Low,
                ));
            }
        }

        // Autosave.
        let autosave = self.config.persistence.autosave_interval;
        if autosave > 0 && cycle.saturating_sub(self.state.internal_state.last_autosave) >= autosave
        {
            self.state.internal_state.last_autosave = cycle;
            if let Err(e) = self.save() {
                warn!(error = %e, "autosave failed; continuing");
            }
        }

        let event = ObservabilityEvent {
            cycle,
            timestamp: Utc::now().to_rfc3339(),
            prompt: (origin == Origin::External).then(|| prompt.clone()),
            response: Some(output),
            emotional_state: self.state.emotional_state.vector().clone(),
            memory_metrics: self.state.memory.metrics(),
            reflection_snapshot: self.state.reflection_levels.views(),
            thresholds,
        };
        self.bus.publish(event.clone());
        Ok(event)
    }

    /// Persist the current state; returns the snapshot id.
    pub fn save(&self) -> Result<String> {
        self.state_manager.save(&Snapshot {
            version: STATE_VERSION.to_string(),
            timestamp: Utc::now().to_rfc3339(),
            session_id: self.session_id.clone(),
            state: self.state.clone(),
        })
    }

    /// Load a snapshot ("latest" or a specific id) and apply it.
    pub fn load(&mut self, reference: &str) -> Result<()> {
        let snapshot = self.state_manager.load(reference)?;
        self.session_id = snapshot.session_id.clone();
        self.apply(snapshot.state);
        Ok(())
    }

    /// Overwrite every mutable store field-by-field. Applying the same
    /// state twice leaves the agent in the same observable state.
    pub fn apply(&mut self, state: AgentState) {
        self.state = state;
    }

    fn compose_prompt(&self, behavior: Behavior, external_input: Option<&str>) -> String {
        if let Some(input) = external_input {
            return input.to_string();
        }
        let v = self.state.emotional_state.vector();
        let recent = self
            .state
            .memory
            .latest_experience()
            .map(|e| e.output.clone())
            .unwrap_or_else(|| "the beginning of this session".to_string());
        format!(
            "[{}] curiosity {:.2}, uncertainty {:.2}; continuing from: {}",
            behavior.name(),
            v.curiosity,
            v.uncertainty,
            truncate(&recent, 120),
        )
    }

    /// Deterministic text for internal behaviors; no collaborator call.
    fn internal_output(&self, behavior: Behavior, prompt: &str) -> String {
        let depth = self.state.self_reference.max_depth();
        match behavior {
            Behavior::Contemplate => format!(
                "contemplating at recursion depth {}: {}",
                depth,
                truncate(prompt, 80)
            ),
            Behavior::Reorganize => format!(
                "reorganizing {} concepts across {} relations",
                self.state.memory.metrics().concept_count,
                self.state.memory.metrics().relation_count
            ),
            Behavior::Simulate => format!("simulating a variation of: {}", truncate(prompt, 80)),
            Behavior::Create => format!(
                "composing a new idea from {} stored experiences",
                self.state.memory.experience_count()
            ),
            // External behaviors only reach here via degradation.
            _ => format!("quietly holding: {}", truncate(prompt, 80)),
        }
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
