// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use paseo_core::{test_support::test_agent_record, PairedHost, ProviderKind, ServerId};
use std::time::SystemTime;

#[test]
fn insert_and_get_agent_exact() {
    let mut state = MaterializedState::default();
    state.insert_agent(test_agent_record("agent-abc123", ProviderKind::Claude, "/work/repo"));

    assert!(state.get_agent("agent-abc123").is_some());
}

#[test]
fn get_agent_prefix_match() {
    let mut state = MaterializedState::default();
    state.insert_agent(test_agent_record("agent-abc123", ProviderKind::Claude, "/work/repo"));

    assert_eq!(
        state.get_agent("agent-abc").unwrap().id.as_str(),
        "agent-abc123"
    );
}

#[test]
fn get_agent_ambiguous_prefix_returns_none() {
    let mut state = MaterializedState::default();
    state.insert_agent(test_agent_record("agent-abc111", ProviderKind::Claude, "/work/repo"));
    state.insert_agent(test_agent_record("agent-abc222", ProviderKind::Codex, "/work/repo"));

    assert!(state.get_agent("agent-abc").is_none());
}

#[test]
fn remove_agent_drops_it() {
    let mut state = MaterializedState::default();
    let id = AgentId::new("agent-1");
    state.insert_agent(test_agent_record(id.as_str(), ProviderKind::Claude, "/repo"));
    state.remove_agent(&id);
    assert!(state.get_agent("agent-1").is_none());
}

#[test]
fn apply_item_updates_last_activity() {
    let mut state = MaterializedState::default();
    let id = AgentId::new("agent-1");
    state.insert_agent(test_agent_record(id.as_str(), ProviderKind::Claude, "/repo"));

    let before = state.agents[id.as_str()].last_activity_at;
    let later = before + std::time::Duration::from_secs(5);
    state.apply_item(
        &id,
        &paseo_core::TimelineItem::UserMessage {
            text: "hi".to_string(),
            images: None,
        },
        later,
    );

    assert_eq!(state.agents[id.as_str()].last_activity_at, later);
}

#[test]
fn apply_item_on_unknown_agent_is_noop() {
    let mut state = MaterializedState::default();
    state.apply_item(
        &AgentId::new("ghost"),
        &paseo_core::TimelineItem::UserMessage {
            text: "hi".to_string(),
            images: None,
        },
        SystemTime::now(),
    );
    assert!(state.agents.is_empty());
}

#[test]
fn apply_item_error_sets_lifecycle_error() {
    let mut state = MaterializedState::default();
    let id = AgentId::new("agent-1");
    state.insert_agent(test_agent_record(id.as_str(), ProviderKind::Claude, "/repo"));

    state.apply_item(
        &id,
        &paseo_core::TimelineItem::Error {
            message: "provider crashed".to_string(),
        },
        SystemTime::now(),
    );

    match &state.agents[id.as_str()].state {
        LifecycleState::Error { message } => assert_eq!(message, "provider crashed"),
        other => panic!("expected Error state, got {other:?}"),
    }
}

#[test]
fn apply_item_mode_update_changes_mode_id() {
    let mut state = MaterializedState::default();
    let id = AgentId::new("agent-1");
    let mut record = test_agent_record(id.as_str(), ProviderKind::Claude, "/repo");
    record.available_modes = vec!["default".to_string(), "plan".to_string()];
    state.insert_agent(record);

    state.apply_item(
        &id,
        &paseo_core::TimelineItem::ModeUpdate {
            mode_id: "plan".to_string(),
        },
        SystemTime::now(),
    );

    assert_eq!(state.agents[id.as_str()].mode_id, "plan");
}

#[test]
fn state_serde_roundtrip_preserves_agents_and_pairings() {
    let mut state = MaterializedState::default();
    state.insert_agent(test_agent_record("agent-1", ProviderKind::Claude, "/repo"));
    state.pairings.push(PairedHost {
        server_id: ServerId::new("srv-1"),
        daemon_public_key: vec![9, 9, 9],
        label: Some("laptop".to_string()),
        last_seen: SystemTime::now(),
    });

    let json = serde_json::to_string(&state).unwrap();
    let restored: MaterializedState = serde_json::from_str(&json).unwrap();

    assert_eq!(restored.agents.len(), 1);
    assert_eq!(restored.pairings.len(), 1);
    assert_eq!(restored.pairings[0].label.as_deref(), Some("laptop"));
}

#[test]
fn state_deserializes_without_pairings_field() {
    let json = r#"{"agents": {}}"#;
    let state: MaterializedState = serde_json::from_str(json).unwrap();
    assert!(state.pairings.is_empty());
}
