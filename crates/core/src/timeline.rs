// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Canonical timeline items and cursor/epoch bookkeeping.
//!
//! Modeled on the tagged-enum wire taxonomy used elsewhere in this codebase
//! (`#[serde(tag = "type")]` with a `namespace:variant` rename per arm), here
//! applied to the per-agent event timeline rather than the job/worker bus.

use serde::{Deserialize, Serialize};
use std::time::SystemTime;

use crate::AgentId;

/// Monotonic generation counter. Advances on daemon start or provider re-init.
pub type Epoch = u64;

/// Position within a single epoch's timeline.
pub type Seq = u64;

/// `(epoch, seq)` position in an agent's timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Cursor {
    pub epoch: Epoch,
    pub seq: Seq,
}

impl Cursor {
    pub fn new(epoch: Epoch, seq: Seq) -> Self {
        Self { epoch, seq }
    }

    pub fn is_stale_for(&self, current_epoch: Epoch) -> bool {
        self.epoch != current_epoch
    }
}

crate::define_id! {
    /// Identifier for an in-flight provider tool invocation.
    pub struct CallId;
}

/// Status of a `tool_call` timeline item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolCallStatus {
    Running,
    Completed,
    Failed,
    Canceled,
}

/// Status of a `reasoning` timeline item. Canonical appends are always
/// `Loading`; only the projection engine promotes a merged run to `Ready`
/// once a non-reasoning item follows it (SPEC_FULL.md §4.1 rule 2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasoningStatus {
    Loading,
    Ready,
}

fn default_reasoning_status() -> ReasoningStatus {
    ReasoningStatus::Loading
}

/// What kind of tool was invoked, and its provider-specific payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ToolDetail {
    Shell { command: String },
    Read { file_path: String },
    Edit { file_path: String },
    Write { file_path: String },
    Search { query: String },
    SubAgent {
        sub_agent_type: String,
        description: String,
        actions: Vec<String>,
    },
    Unknown {
        raw_input: serde_json::Value,
        raw_output: Option<serde_json::Value>,
    },
}

/// One plan/task-list entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanEntry {
    pub content: String,
    pub status: String,
}

/// How a resolved permission request was decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionBehavior {
    Allow,
    Deny,
}

/// A canonical item appended to an agent's timeline.
///
/// Tagged the way the job/worker event bus elsewhere in this codebase tags
/// its variants, but scoped to `timeline:*` rather than `agent:*`/`job:*`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TimelineItem {
    #[serde(rename = "timeline:user_message")]
    UserMessage {
        text: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        images: Option<Vec<String>>,
    },
    #[serde(rename = "timeline:assistant_message")]
    AssistantMessage { text: String },
    #[serde(rename = "timeline:reasoning")]
    Reasoning {
        text: String,
        #[serde(default = "default_reasoning_status")]
        status: ReasoningStatus,
    },
    #[serde(rename = "timeline:tool_call")]
    ToolCall {
        call_id: CallId,
        name: String,
        status: ToolCallStatus,
        detail: ToolDetail,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    #[serde(rename = "timeline:error")]
    Error { message: String },
    #[serde(rename = "timeline:plan")]
    Plan { entries: Vec<PlanEntry> },
    #[serde(rename = "timeline:mode_update")]
    ModeUpdate { mode_id: String },
    #[serde(rename = "timeline:commands_update")]
    CommandsUpdate { commands: Vec<String> },
    #[serde(rename = "timeline:permission_resolved")]
    PermissionResolved {
        request_id: crate::PermissionRequestId,
        behavior: PermissionBehavior,
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
}

impl TimelineItem {
    /// Invariant check: `completed` status implies no error, `failed` implies one.
    pub fn is_well_formed(&self) -> bool {
        match self {
            TimelineItem::ToolCall { status, error, .. } => match status {
                ToolCallStatus::Completed | ToolCallStatus::Canceled => error.is_none(),
                ToolCallStatus::Failed => error.is_some(),
                ToolCallStatus::Running => true,
            },
            _ => true,
        }
    }
}

/// A timeline item with its assigned cursor and wall-clock timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEntry {
    pub cursor: Cursor,
    pub timestamp: SystemTime,
    pub item: TimelineItem,
}

/// Which reading shape a timeline fetch/subscribe should serve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Projection {
    Canonical,
    Projected,
}

/// Result of a `fetchTail`/`fetchBefore`/`fetchAfter` call. See SPEC_FULL.md §4.1.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelinePage {
    pub agent_id: AgentId,
    pub entries: Vec<TimelineEntry>,
    pub start_cursor: Option<Cursor>,
    pub end_cursor: Option<Cursor>,
    pub has_older: bool,
    pub has_newer: bool,
    pub epoch: Epoch,
    pub reset: bool,
    pub stale_cursor: bool,
    pub gap: bool,
}

#[cfg(test)]
#[path = "timeline_tests.rs"]
mod tests;
