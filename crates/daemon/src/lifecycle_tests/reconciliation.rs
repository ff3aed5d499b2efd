// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;

use parking_lot::Mutex;
use paseo_adapters::FakeProviderAdapter;
use paseo_core::{
    AgentId, AgentRecord, Capabilities, FakeClock, LifecycleState, PermissionRequestId,
    ProviderKind, SequentialIdGen,
};
use paseo_engine::{AgentManager, ProviderResolver};
use paseo_storage::MaterializedState;
use tempfile::tempdir;

use crate::lifecycle::reconcile_agents;

#[derive(Clone)]
struct SingleProviderResolver {
    provider: FakeProviderAdapter,
}

impl ProviderResolver for SingleProviderResolver {
    type Provider = FakeProviderAdapter;

    fn resolve(&self, _kind: ProviderKind) -> FakeProviderAdapter {
        self.provider.clone()
    }
}

type TestManager = AgentManager<SingleProviderResolver, SequentialIdGen, FakeClock>;

fn test_record(id: &str, state: LifecycleState) -> AgentRecord {
    use std::time::SystemTime;
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

struct TestHarness {
    manager: TestManager,
    state: Arc<Mutex<MaterializedState>>,
    _timeline_dir: tempfile::TempDir,
}

fn setup(state: MaterializedState) -> TestHarness {
    let timeline_dir = tempdir().unwrap();
    let state = Arc::new(Mutex::new(state));
    let resolver = SingleProviderResolver {
        provider: FakeProviderAdapter::new(),
    };
    let (manager, _attention_rx) = AgentManager::new(
        resolver,
        SequentialIdGen::new("agent"),
        FakeClock::default(),
        timeline_dir.path().to_path_buf(),
        state.clone(),
        timeline_dir.path().join("snapshot.json"),
    );
    TestHarness {
        manager,
        state,
        _timeline_dir: timeline_dir,
    }
}

#[tokio::test]
async fn idle_agent_is_left_alone() {
    let mut state = MaterializedState::default();
    state
        .agents
        .insert("agent-1".to_string(), test_record("agent-1", LifecycleState::Idle));
    let h = setup(state);

    let count = reconcile_agents(&h.manager, &h.state).await;

    assert_eq!(count, 1);
    assert_eq!(h.state.lock().agents["agent-1"].state, LifecycleState::Idle);
}

#[tokio::test]
async fn running_agent_is_marked_errored() {
    let mut state = MaterializedState::default();
    state
        .agents
        .insert("agent-1".to_string(), test_record("agent-1", LifecycleState::Running));
    let h = setup(state);

    reconcile_agents(&h.manager, &h.state).await;

    assert!(matches!(
        h.state.lock().agents["agent-1"].state,
        LifecycleState::Error { .. }
    ));
}

#[tokio::test]
async fn permission_pending_agent_is_marked_errored() {
    let mut state = MaterializedState::default();
    state.agents.insert(
        "agent-1".to_string(),
        test_record(
            "agent-1",
            LifecycleState::Permission {
                request_id: PermissionRequestId::new("perm-1"),
            },
        ),
    );
    let h = setup(state);

    reconcile_agents(&h.manager, &h.state).await;

    assert!(matches!(
        h.state.lock().agents["agent-1"].state,
        LifecycleState::Error { .. }
    ));
}

#[tokio::test]
async fn closed_agent_is_left_alone() {
    let mut state = MaterializedState::default();
    state
        .agents
        .insert("agent-1".to_string(), test_record("agent-1", LifecycleState::Closed));
    let h = setup(state);

    reconcile_agents(&h.manager, &h.state).await;

    assert_eq!(h.state.lock().agents["agent-1"].state, LifecycleState::Closed);
}

#[tokio::test]
async fn reconciles_every_agent_in_state() {
    let mut state = MaterializedState::default();
    for i in 0..3 {
        let id = format!("agent-{i}");
        state.agents.insert(id.clone(), test_record(&id, LifecycleState::Running));
    }
    let h = setup(state);

    let count = reconcile_agents(&h.manager, &h.state).await;

    assert_eq!(count, 3);
    for i in 0..3 {
        let id = format!("agent-{i}");
        assert!(matches!(
            h.state.lock().agents[&id].state,
            LifecycleState::Error { .. }
        ));
    }
}
