//! End-to-end properties of the agent loop: determinism, persistence
//! round trips, and the two reference scenarios.

use recc_agent::{AgentConfig, ReccAgent};
use recc_llm::ScriptedCollaborator;
use std::sync::Arc;
use tempfile::TempDir;

fn test_config(dir: &TempDir, seed: u64) -> AgentConfig {
    let mut config = AgentConfig::default();
    config.seed = seed;
    config.persistence.snapshot_dir = dir.path().to_string_lossy().to_string();
    config.persistence.autosave_interval = 0;
    config
}

fn scripted_agent(dir: &TempDir, seed: u64) -> ReccAgent {
    ReccAgent::new(
        test_config(dir, seed),
        Arc::new(ScriptedCollaborator::echoing("a steady reply")),
    )
}

// ================================================================
// Determinism
// ================================================================

#[tokio::test]
async fn same_seed_same_inputs_bit_identical_state() {
    let dir_a = TempDir::new().unwrap();
    let dir_b = TempDir::new().unwrap();
    let mut a = scripted_agent(&dir_a, 42);
    let mut b = scripted_agent(&dir_b, 42);

    for _ in 0..15 {
        a.step().await.unwrap();
        b.step().await.unwrap();
    }

    let state_a = serde_json::to_string(a.state()).unwrap();
    let state_b = serde_json::to_string(b.state()).unwrap();
    assert_eq!(state_a, state_b);
}

#[tokio::test]
async fn restored_agent_continues_identically() {
    let dir = TempDir::new().unwrap();
    let mut original = scripted_agent(&dir, 7);
    for _ in 0..8 {
        original.step().await.unwrap();
    }
    let id = original.save().unwrap();

    let mut restored = scripted_agent(&dir, 7);
    restored.load(&id).unwrap();
    assert_eq!(
        serde_json::to_string(original.state()).unwrap(),
        serde_json::to_string(restored.state()).unwrap()
    );

    // Both continue and stay in lockstep.
    for _ in 0..5 {
        original.step().await.unwrap();
        restored.step().await.unwrap();
    }
    assert_eq!(
        serde_json::to_string(original.state()).unwrap(),
        serde_json::to_string(restored.state()).unwrap()
    );
}

// ================================================================
// Round trip and idempotent apply
// ================================================================

#[tokio::test]
async fn apply_load_save_round_trip_preserves_state() {
    let dir = TempDir::new().unwrap();
    let mut agent = scripted_agent(&dir, 3);
    for _ in 0..6 {
        agent.step().await.unwrap();
    }
    let before = serde_json::to_string(agent.state()).unwrap();
    let id = agent.save().unwrap();
    agent.load(&id).unwrap();
    assert_eq!(before, serde_json::to_string(agent.state()).unwrap());
}

#[tokio::test]
async fn applying_the_same_state_twice_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let mut agent = scripted_agent(&dir, 5);
    for _ in 0..4 {
        agent.step().await.unwrap();
    }
    agent.save().unwrap();

    let mut target = scripted_agent(&dir, 5);
    target.load("latest").unwrap();
    let once = serde_json::to_string(target.state()).unwrap();
    target.load("latest").unwrap();
    let twice = serde_json::to_string(target.state()).unwrap();
    assert_eq!(once, twice);
}

// ================================================================
// Scenario: five internal cycles from zero history
// ================================================================

#[tokio::test]
async fn five_cycle_contemplation_ladder() {
    let dir = TempDir::new().unwrap();
    // Zero curiosity draw risk is irrelevant: no external input, and
    // the collaborator is scripted anyway.
    let mut agent = scripted_agent(&dir, 0);

    let mut last_event = None;
    for _ in 0..5 {
        last_event = Some(agent.step().await.unwrap());
    }
    let event = last_event.unwrap();

    let view = |depth: usize| &event.reflection_snapshot[depth];
    assert_eq!(view(1).state, "active", "level 1 active after cycle 1");
    assert_eq!(view(2).state, "active", "level 2 active by cycle 3");
    assert_eq!(view(3).state, "inactive", "level 3 starved at cycle 5");

    assert!(
        agent.state().self_reference.max_depth() >= 1,
        "a depth>=1 reference exists by cycle 5"
    );
}

// ================================================================
// Scenario: collaborator failure degrades, never propagates
// ================================================================

#[tokio::test]
async fn collaborator_failure_degrades_to_internal() {
    let dir = TempDir::new().unwrap();
    let mut config = test_config(&dir, 11);
    // Guarantee external engagement attempts.
    config.energy.external_gate = 0.0;

    let collab = Arc::new(ScriptedCollaborator::new());
    let mut agent = ReccAgent::new(config, collab.clone());
    agent.send_external_input("hello agent");

    // Respond is forced by the pending input; the scripted collaborator
    // has no turns queued, so the call fails.
    let event = agent.step().await.unwrap();

    assert!(event
        .thresholds
        .iter()
        .any(|t| t.kind == "collaborator_failure"));
    assert_eq!(
        agent.state().behavior.last().map(|b| b.name()),
        Some("contemplate"),
        "cycle completed via an internal substitute"
    );
    assert!(event.response.is_some());
}

// ================================================================
// Observability
// ================================================================

#[tokio::test]
async fn one_event_per_cycle_in_order() {
    let dir = TempDir::new().unwrap();
    let mut agent = scripted_agent(&dir, 1);
    let mut rx = agent.bus().subscribe();

    for _ in 0..4 {
        agent.step().await.unwrap();
    }
    for expected in 1..=4 {
        assert_eq!(rx.recv().await.unwrap().cycle, expected);
    }
}

#[tokio::test]
async fn depth_watermark_survives_save_load() {
    let dir = TempDir::new().unwrap();
    let mut agent = scripted_agent(&dir, 2);
    for _ in 0..12 {
        agent.step().await.unwrap();
    }
    let depth = agent.state().self_reference.max_depth();
    assert!(depth >= 1);
    let id = agent.save().unwrap();

    let mut restored = scripted_agent(&dir, 2);
    restored.load(&id).unwrap();
    assert_eq!(restored.state().self_reference.max_depth(), depth);
}
