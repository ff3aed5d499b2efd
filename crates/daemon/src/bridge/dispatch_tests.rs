// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::bridge::outbound::OutboundQueue;
use paseo_adapters::FakeProviderAdapter;
use paseo_core::{ClientId, DeviceType, ProviderKind, SequentialIdGen};
use paseo_core::{FakeClock, SubscriptionId};
use std::collections::HashMap;
use tempfile::tempdir;

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

struct Harness {
    ctx: DispatchContext<SingleProviderResolver, SequentialIdGen, FakeClock>,
    session: Arc<SessionHandle>,
    _timeline_dir: tempfile::TempDir,
    _cwd_dir: tempfile::TempDir,
}

fn setup() -> Harness {
    let timeline_dir = tempdir().unwrap();
    let cwd_dir = tempdir().unwrap();
    let state = Arc::new(Mutex::new(MaterializedState::default()));
    let resolver = SingleProviderResolver {
        provider: FakeProviderAdapter::new(),
    };
    let snapshot_path = timeline_dir.path().join("snapshot.json");
    let (manager, _attention_rx): (TestManager, _) = AgentManager::new(
        resolver,
        SequentialIdGen::new("agent"),
        FakeClock::default(),
        timeline_dir.path().to_path_buf(),
        state.clone(),
        snapshot_path,
    );
    let registry = Arc::new(SessionRegistry::new());
    let session = Arc::new(SessionHandle::new(
        ClientId::new("client-1"),
        DeviceType::Desktop,
        OutboundQueue::new(),
    ));
    registry.insert(session.clone());
    Harness {
        ctx: DispatchContext { manager, state, registry },
        session,
        _timeline_dir: timeline_dir,
        _cwd_dir: cwd_dir,
    }
}

#[tokio::test]
async fn ping_responds_with_pong() {
    let h = setup();
    dispatch(&h.ctx, &h.session, ClientMessage::Ping).await;
    assert!(matches!(h.session.outbound.recv_now(), Some(ServerMessage::Pong)));
}

#[tokio::test]
async fn heartbeat_is_recorded_without_a_response() {
    let h = setup();
    dispatch(
        &h.ctx,
        &h.session,
        ClientMessage::Heartbeat {
            focused_agent_id: None,
            last_activity_at: std::time::SystemTime::now(),
            app_visible: true,
            device_type: DeviceType::Desktop,
        },
    )
    .await;
    assert!(h.session.heartbeat().is_some());
    assert!(h.session.outbound.recv_now().is_none());
}

#[tokio::test]
async fn create_agent_broadcasts_roster_to_subscribers() {
    let h = setup();
    dispatch(
        &h.ctx,
        &h.session,
        ClientMessage::SubscribeAgentUpdates {
            request_id: "sub-req".to_string(),
            subscription_id: SubscriptionId::new("updates-1"),
        },
    )
    .await;
    assert!(matches!(
        h.session.outbound.recv_now(),
        Some(ServerMessage::SubscribeAgentUpdatesResponse { .. })
    ));
    assert!(matches!(
        h.session.outbound.recv_now(),
        Some(ServerMessage::AgentUpdates { agents, .. }) if agents.is_empty()
    ));

    let cwd = h._cwd_dir.path().display().to_string();
    dispatch(
        &h.ctx,
        &h.session,
        ClientMessage::CreateAgentRequest {
            request_id: "create-1".to_string(),
            provider: ProviderKind::Claude,
            cwd,
            mode_id: "default".to_string(),
            model: "test-model".to_string(),
            extra: serde_json::json!({}),
            title: None,
            labels: HashMap::new(),
        },
    )
    .await;

    assert!(matches!(
        h.session.outbound.recv_now(),
        Some(ServerMessage::CreateAgentResponse { outcome: Outcome::Ok(_), .. })
    ));
    assert!(matches!(
        h.session.outbound.recv_now(),
        Some(ServerMessage::AgentUpdates { agents, .. }) if agents.len() == 1
    ));
}

#[tokio::test]
async fn fetch_timeline_before_direction_is_unsupported() {
    let h = setup();
    dispatch(
        &h.ctx,
        &h.session,
        ClientMessage::FetchAgentTimelineRequest {
            request_id: "fetch-1".to_string(),
            agent_id: paseo_core::AgentId::new("missing"),
            direction: FetchDirection::Before,
            cursor: None,
            limit: 10,
            projection: paseo_core::Projection::Canonical,
        },
    )
    .await;
    assert!(matches!(
        h.session.outbound.recv_now(),
        Some(ServerMessage::FetchAgentTimelineResponse {
            outcome: Outcome::Error { code: paseo_core::ErrorCode::Unsupported, .. },
            ..
        })
    ));
}
