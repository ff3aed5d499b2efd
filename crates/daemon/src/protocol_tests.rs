// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use paseo_core::{AgentId, ErrorCode};

#[test]
fn create_agent_request_round_trips() {
    let json = r#"{
        "type": "create_agent_request",
        "request_id": "r1",
        "provider": "claude",
        "cwd": "/tmp/x",
        "mode_id": "full-access",
        "model": "sonnet"
    }"#;
    let msg = decode_client_message(json).unwrap();
    match msg {
        ClientMessage::CreateAgentRequest {
            request_id,
            provider,
            cwd,
            mode_id,
            ..
        } => {
            assert_eq!(request_id, "r1");
            assert_eq!(provider, ProviderKind::Claude);
            assert_eq!(cwd, "/tmp/x");
            assert_eq!(mode_id, "full-access");
        }
        other => panic!("unexpected message: {other:?}"),
    }
}

#[test]
fn unknown_type_fails_but_request_id_is_recovered() {
    let json = r#"{"type":"not_a_real_message","request_id":"r2"}"#;
    let err = decode_client_message(json).unwrap_err();
    match err {
        ProtocolError::Malformed { request_id, .. } => assert_eq!(request_id.as_deref(), Some("r2")),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn malformed_json_has_no_recoverable_request_id() {
    let err = decode_client_message("not json at all").unwrap_err();
    match err {
        ProtocolError::Malformed { request_id, .. } => assert_eq!(request_id, None),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn success_outcome_flattens_status_and_payload() {
    let msg = ServerMessage::SetModeResponse {
        request_id: "r3".to_string(),
        outcome: Outcome::ok(EmptyPayload {}),
    };
    let encoded = encode_server_message(&msg).unwrap();
    let value: serde_json::Value = serde_json::from_str(&encoded).unwrap();
    assert_eq!(value["type"], "set_mode_response");
    assert_eq!(value["request_id"], "r3");
    assert_eq!(value["status"], "ok");
}

#[test]
fn error_outcome_carries_code_and_message() {
    let msg = ServerMessage::CancelResponse {
        request_id: "r4".to_string(),
        outcome: Outcome::err(ErrorCode::AgentNotFound, "no such agent"),
    };
    let encoded = encode_server_message(&msg).unwrap();
    let value: serde_json::Value = serde_json::from_str(&encoded).unwrap();
    assert_eq!(value["status"], "error");
    assert_eq!(value["code"], "agent_not_found");
    assert_eq!(value["message"], "no such agent");
}

#[test]
fn agent_stream_append_event_round_trips() {
    use paseo_core::{Cursor, TimelineEntry, TimelineItem};
    use std::time::SystemTime;

    let entry = TimelineEntry {
        cursor: Cursor::new(1, 1),
        timestamp: SystemTime::UNIX_EPOCH,
        item: TimelineItem::AssistantMessage {
            text: "hi".to_string(),
        },
    };
    let msg = ServerMessage::AgentStream {
        subscription_id: paseo_core::SubscriptionId::new("sub-1"),
        agent_id: AgentId::new("agent-1"),
        event: AgentStreamEvent::Append { entry },
    };
    let encoded = encode_server_message(&msg).unwrap();
    let decoded: serde_json::Value = serde_json::from_str(&encoded).unwrap();
    assert_eq!(decoded["type"], "agent_stream");
    assert_eq!(decoded["event"]["kind"], "append");
}

#[test]
fn welcome_is_a_flat_top_level_type() {
    let msg = ServerMessage::Welcome {
        server_id: "srv-1".to_string(),
        hostname: "box".to_string(),
        version: "0.1.0".to_string(),
        resumed: false,
    };
    let encoded = encode_server_message(&msg).unwrap();
    let value: serde_json::Value = serde_json::from_str(&encoded).unwrap();
    assert_eq!(value["type"], "welcome");
    assert_eq!(value["server_id"], "srv-1");
}

#[test]
fn heartbeat_decodes_device_type() {
    let json = r#"{
        "type": "heartbeat",
        "last_activity_at": {"secs_since_epoch": 1, "nanos_since_epoch": 0},
        "app_visible": true,
        "device_type": "mobile"
    }"#;
    let msg = decode_client_message(json).unwrap();
    match msg {
        ClientMessage::Heartbeat { device_type, app_visible, .. } => {
            assert_eq!(device_type, DeviceType::Mobile);
            assert!(app_visible);
        }
        other => panic!("unexpected message: {other:?}"),
    }
}
