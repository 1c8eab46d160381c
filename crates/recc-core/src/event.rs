//! Observability event schema: the one structured event the agent loop
//! publishes per cycle. Consumers (dashboard, logger, test harness) get
//! it over the bus; the publisher never blocks on them.

use crate::types::EmotionVector;
use serde::{Deserialize, Serialize};

/// Snapshot of the whole agent surface at the end of one cycle.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ObservabilityEvent {
    pub cycle: u64,
    /// Wall-clock RFC 3339, outside the determinism contract.
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    pub emotional_state: EmotionVector,
    pub memory_metrics: MemoryMetrics,
    pub reflection_snapshot: Vec<LevelView>,
    #[serde(default)]
    pub thresholds: Vec<ThresholdEvent>,
}

/// Coarse memory health numbers for the dashboard.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct MemoryMetrics {
    /// Active (non-archived) experience count.
    pub size: usize,
    pub concept_count: usize,
    pub relation_count: usize,
    /// relation_count / max(1, concept_count).
    pub density: f64,
}

/// Per-level reflection state as seen from outside.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LevelView {
    pub depth: u32,
    /// "active" or "inactive".
    pub state: String,
    pub history_entries: usize,
}

/// A noteworthy boundary crossed during the cycle.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ThresholdEvent {
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
    pub severity: Severity,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl ThresholdEvent {
    pub fn new(kind: impl Into<String>, description: impl Into<String>, severity: Severity) -> Self {
        Self {
            kind: kind.into(),
            description: description.into(),
            severity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threshold_event_uses_type_key_on_the_wire() {
        let evt = ThresholdEvent::new("collaborator_failure", "fell back to contemplate", Severity::Low);
        let json = serde_json::to_value(&evt).unwrap();
        assert_eq!(json["type"], "collaborator_failure");
        assert_eq!(json["severity"], "low");
    }

    #[test]
    fn event_omits_absent_prompt_and_response() {
        let evt = ObservabilityEvent {
            cycle: 1,
            timestamp: "2026-08-25T00:00:00Z".into(),
            prompt: None,
            response: None,
            emotional_state: EmotionVector::default(),
            memory_metrics: MemoryMetrics::default(),
            reflection_snapshot: vec![],
            thresholds: vec![],
        };
        let json = serde_json::to_value(&evt).unwrap();
        assert!(json.get("prompt").is_none());
        assert!(json.get("response").is_none());
        assert_eq!(json["cycle"], 1);
    }

    #[test]
    fn unknown_keys_are_ignored_on_decode() {
        let json = r#"{
            "cycle": 3,
            "timestamp": "2026-08-25T00:00:00Z",
            "emotional_state": {
                "curiosity": 0.5, "frustration": 0.1,
                "satisfaction": 0.3, "uncertainty": 0.4,
                "momentum": {"curiosity":0,"frustration":0,"satisfaction":0,"uncertainty":0}
            },
            "memory_metrics": {"size":0,"concept_count":0,"relation_count":0,"density":0.0},
            "reflection_snapshot": [],
            "some_future_field": {"nested": true}
        }"#;
        let evt: ObservabilityEvent = serde_json::from_str(json).unwrap();
        assert_eq!(evt.cycle, 3);
    }
}
