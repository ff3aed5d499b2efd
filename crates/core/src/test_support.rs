// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for use across crates.
//!
//! Gated behind `#[cfg(any(test, feature = "test-support"))]`.

use std::collections::HashMap;
use std::time::SystemTime;

use crate::{
    AgentId, AgentRecord, Capabilities, CallId, IdGen, LifecycleState, ProviderKind,
    ToolCallStatus, ToolDetail,
};
use crate::{TimelineItem, UuidIdGen};

/// A ready-to-use `Capabilities` value for a typical streaming provider.
pub fn streaming_capabilities() -> Capabilities {
    Capabilities {
        streaming: true,
        persistence: true,
        dynamic_modes: true,
        tool_invocations: true,
        reasoning_stream: true,
    }
}

/// Build a minimal, valid `AgentRecord` for tests.
pub fn test_agent_record(id: &str, provider: ProviderKind, cwd: &str) -> AgentRecord {
    let now = SystemTime::now();
    AgentRecord {
        id: AgentId::new(id),
        provider,
        cwd: cwd.to_string(),
        title: None,
        mode_id: "default".to_string(),
        model: "test-model".to_string(),
        provider_config: serde_json::json!({}),
        state: LifecycleState::Idle,
        capabilities: streaming_capabilities(),
        available_modes: vec!["default".to_string()],
        created_at: now,
        last_activity_at: now,
        archived_at: None,
        labels: HashMap::new(),
        persistence: None,
    }
}

pub fn user_message_item(text: &str) -> TimelineItem {
    TimelineItem::UserMessage {
        text: text.to_string(),
        images: None,
    }
}

pub fn assistant_message_item(text: &str) -> TimelineItem {
    TimelineItem::AssistantMessage {
        text: text.to_string(),
    }
}

pub fn running_shell_call_item(command: &str) -> TimelineItem {
    TimelineItem::ToolCall {
        call_id: CallId::new(UuidIdGen.next()),
        name: "Bash".to_string(),
        status: ToolCallStatus::Running,
        detail: ToolDetail::Shell {
            command: command.to_string(),
        },
        error: None,
    }
}
