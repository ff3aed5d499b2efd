// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::test_config;
use crate::lifecycle::startup;
use paseo_core::{AgentId, AgentRecord, Capabilities, LifecycleState, ProviderKind};
use std::time::SystemTime;
use tempfile::tempdir;

fn test_record(id: &str, state: LifecycleState) -> AgentRecord {
    AgentRecord {
        id: AgentId::new(id.to_string()),
        provider: ProviderKind::Claude,
        cwd: "/tmp".to_string(),
        title: None,
        mode_id: "default".to_string(),
        model: "test-model".to_string(),
        provider_config: serde_json::json!({}),
        state,
        capabilities: Capabilities {
            streaming: true,
            persistence: true,
            dynamic_modes: false,
            tool_invocations: true,
            reasoning_stream: false,
        },
        available_modes: vec!["default".to_string()],
        created_at: SystemTime::now(),
        last_activity_at: SystemTime::now(),
        archived_at: None,
        labels: Default::default(),
        persistence: None,
    }
}

#[tokio::test]
async fn idle_agent_survives_restart_unchanged() {
    let dir = tempdir().unwrap();
    let config = test_config(dir.path());

    let mut first = startup(&config).await.unwrap();
    first
        .daemon
        .state
        .lock()
        .agents
        .insert("agent-1".to_string(), test_record("agent-1", LifecycleState::Idle));
    first.daemon.shutdown().unwrap();

    let second = startup(&config).await.unwrap();
    let state = second.daemon.state.lock();
    assert_eq!(state.agents.len(), 1);
    assert_eq!(state.agents["agent-1"].state, LifecycleState::Idle);
}

#[tokio::test]
async fn running_agent_becomes_errored_across_restart() {
    let dir = tempdir().unwrap();
    let config = test_config(dir.path());

    let mut first = startup(&config).await.unwrap();
    first.daemon.state.lock().agents.insert(
        "agent-1".to_string(),
        test_record("agent-1", LifecycleState::Running),
    );
    first.daemon.shutdown().unwrap();

    let second = startup(&config).await.unwrap();
    let state = second.daemon.state.lock();
    assert!(matches!(
        state.agents["agent-1"].state,
        LifecycleState::Error { .. }
    ));
}
