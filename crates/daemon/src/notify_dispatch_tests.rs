// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::bridge::{OutboundQueue, SessionHandle};
use paseo_core::{ClientId, DeviceType, FakeClock};
use std::time::SystemTime;

const KEEPALIVE: Duration = Duration::from_secs(20);

fn heartbeat(focused: &AgentId, app_visible: bool, at: SystemTime) -> Heartbeat {
    Heartbeat {
        focused_agent_id: Some(focused.clone()),
        last_activity_at: at,
        app_visible,
        device_type: DeviceType::Desktop,
    }
}

#[test]
fn notifies_when_nobody_is_watching() {
    let now = SystemTime::now();
    let agent = AgentId::new("agent-1");
    let other = AgentId::new("agent-2");
    let sessions = vec![SessionSnapshot {
        client_id: ClientId::new("client-1"),
        device_type: DeviceType::Desktop,
        heartbeat: Some(heartbeat(&other, true, now)),
    }];
    assert!(!any_session_watching(&sessions, &agent, KEEPALIVE, now));
}

#[test]
fn suppresses_notification_when_a_session_is_watching() {
    let now = SystemTime::now();
    let agent = AgentId::new("agent-1");
    let sessions = vec![SessionSnapshot {
        client_id: ClientId::new("client-1"),
        device_type: DeviceType::Desktop,
        heartbeat: Some(heartbeat(&agent, true, now)),
    }];
    assert!(any_session_watching(&sessions, &agent, KEEPALIVE, now));
}

#[test]
fn stale_heartbeat_does_not_count_as_watching() {
    let now = SystemTime::now();
    let agent = AgentId::new("agent-1");
    let stale_at = now - KEEPALIVE * 3;
    let sessions = vec![SessionSnapshot {
        client_id: ClientId::new("client-1"),
        device_type: DeviceType::Desktop,
        heartbeat: Some(heartbeat(&agent, true, stale_at)),
    }];
    assert!(!any_session_watching(&sessions, &agent, KEEPALIVE, now));
}

#[test]
fn no_heartbeat_at_all_should_notify() {
    let now = SystemTime::now();
    let agent = AgentId::new("agent-1");
    assert!(should_notify_client(None, &agent, KEEPALIVE, now));
}

#[tokio::test]
async fn dispatcher_broadcasts_attention_to_connected_sessions() {
    let registry = Arc::new(SessionRegistry::new());
    let session = Arc::new(SessionHandle::new(
        ClientId::new("client-1"),
        DeviceType::Desktop,
        OutboundQueue::new(),
    ));
    registry.insert(session.clone());

    let dispatcher = NotificationDispatcher::new(registry, FakeClock::default(), KEEPALIVE);
    let (tx, rx) = mpsc::channel(4);
    tx.send(AttentionEvent {
        agent_id: AgentId::new("agent-1"),
        reason: AttentionReason::Finished,
        at: SystemTime::now(),
    })
    .await
    .unwrap();
    drop(tx);

    dispatcher.run(rx).await;

    let message = session.outbound.recv_now().expect("a message was pushed");
    match message {
        crate::protocol::ServerMessage::AttentionRequired { agent_id, should_notify, .. } => {
            assert_eq!(agent_id, AgentId::new("agent-1"));
            assert!(should_notify);
        }
        other => panic!("unexpected message: {other:?}"),
    }
}
