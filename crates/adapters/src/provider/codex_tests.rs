// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::path::PathBuf;

#[tokio::test]
async fn spawn_rejects_missing_cwd() {
    let adapter = CodexProviderAdapter::new();
    let (tx, _rx) = mpsc::channel(1);
    let config = ProviderSpawnConfig {
        agent_id: AgentId::new("agent-1"),
        cwd: PathBuf::from("/does/not/exist"),
        mode_id: "on-request".to_string(),
        model: "gpt-5".to_string(),
        extra: serde_json::Value::Null,
    };

    let result = adapter.spawn(config, tx).await;
    assert!(matches!(result, Err(ProviderError::BadCwd(_))));
}

#[tokio::test]
async fn spawn_rejects_unknown_mode() {
    let adapter = CodexProviderAdapter::new();
    let (tx, _rx) = mpsc::channel(1);
    let config = ProviderSpawnConfig {
        agent_id: AgentId::new("agent-1"),
        cwd: std::env::temp_dir(),
        mode_id: "yolo".to_string(),
        model: "gpt-5".to_string(),
        extra: serde_json::Value::Null,
    };

    let result = adapter.spawn(config, tx).await;
    assert!(matches!(result, Err(ProviderError::BadMode(_))));
}

#[test]
fn manifest_lists_approval_policies() {
    let manifest = CodexProviderAdapter::new().manifest();
    assert_eq!(manifest.available_modes, CODEX_MODES.to_vec());
}

#[test]
fn translate_agent_message_emits_assistant_text() {
    let json: serde_json::Value = serde_json::from_str(
        r#"{"id":"sub-1","msg":{"type":"agent_message","message":"hi there"}}"#,
    )
    .unwrap();
    let mut pending = std::collections::HashMap::new();
    let events = translate(&AgentId::new("agent-1"), &json, &mut pending);
    assert_eq!(events.len(), 1);
    assert!(matches!(
        &events[0],
        ProviderEvent::Item(paseo_core::TimelineItem::AssistantMessage { text }) if text == "hi there"
    ));
}

#[test]
fn translate_exec_begin_then_end_completes_call() {
    let mut pending = std::collections::HashMap::new();

    let begin: serde_json::Value = serde_json::from_str(
        r#"{"id":"sub-1","msg":{"type":"exec_command_begin","call_id":"call-1","command":["ls","-la"]}}"#,
    )
    .unwrap();
    let begin_events = translate(&AgentId::new("agent-1"), &begin, &mut pending);
    assert_eq!(begin_events.len(), 1);
    let ProviderEvent::Item(paseo_core::TimelineItem::ToolCall { status, detail, .. }) = &begin_events[0] else {
        panic!("expected tool call");
    };
    assert_eq!(*status, ToolCallStatus::Running);
    assert!(matches!(detail, ToolDetail::Shell { command } if command == "ls -la"));

    let end: serde_json::Value = serde_json::from_str(
        r#"{"id":"sub-1","msg":{"type":"exec_command_end","call_id":"call-1","exit_code":0,"aggregated_output":"total 0"}}"#,
    )
    .unwrap();
    let end_events = translate(&AgentId::new("agent-1"), &end, &mut pending);
    assert_eq!(end_events.len(), 1);
    let ProviderEvent::Item(paseo_core::TimelineItem::ToolCall { status, .. }) = &end_events[0] else {
        panic!("expected tool call");
    };
    assert_eq!(*status, ToolCallStatus::Completed);
    assert!(pending.is_empty());
}

#[test]
fn translate_exec_approval_request_is_namespaced() {
    let json: serde_json::Value = serde_json::from_str(
        r#"{"id":"req-9","msg":{"type":"exec_approval_request","call_id":"call-1","command":["rm","-rf","/"]}}"#,
    )
    .unwrap();
    let mut pending = std::collections::HashMap::new();
    let events = translate(&AgentId::new("agent-1"), &json, &mut pending);
    assert_eq!(events.len(), 1);
    let ProviderEvent::PermissionRequested(request) = &events[0] else {
        panic!("expected permission request");
    };
    assert_eq!(request.id.as_str(), "codex:req-9");
    assert_eq!(request.kind, PermissionKind::Bash);
}

#[test]
fn translate_task_complete_emits_turn_complete() {
    let json: serde_json::Value =
        serde_json::from_str(r#"{"id":"sub-1","msg":{"type":"task_complete"}}"#).unwrap();
    let mut pending = std::collections::HashMap::new();
    let events = translate(&AgentId::new("agent-1"), &json, &mut pending);
    assert_eq!(events.len(), 1);
    assert!(matches!(&events[0], ProviderEvent::TurnComplete));
}
