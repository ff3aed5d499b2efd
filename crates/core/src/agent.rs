// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent identity, the durable agent record, and lifecycle state.
//!
//! An agent is a supervised external coding-assistant process bound to a
//! working directory. `AgentId` is stable across daemon restarts; the
//! underlying provider session id is opaque and lives inside
//! `PersistenceHandle`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::time::SystemTime;

use crate::PersistenceHandle;

crate::define_id! {
    /// Unique identifier for an agent instance. Stable across restarts.
    pub struct AgentId;
}

/// Coding-agent provider kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    Claude,
    Codex,
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderKind::Claude => write!(f, "claude"),
            ProviderKind::Codex => write!(f, "codex"),
        }
    }
}

/// What a provider adapter can do for a given agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    pub streaming: bool,
    pub persistence: bool,
    pub dynamic_modes: bool,
    pub tool_invocations: bool,
    pub reasoning_stream: bool,
}

/// Lifecycle state of an agent. See SPEC_FULL.md §4.2 for the transition table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum LifecycleState {
    Idle,
    Running,
    Permission { request_id: crate::PermissionRequestId },
    Error { message: String },
    Closed,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecycleState::Idle => write!(f, "idle"),
            LifecycleState::Running => write!(f, "running"),
            LifecycleState::Permission { request_id } => {
                write!(f, "permission({})", request_id)
            }
            LifecycleState::Error { message } => write!(f, "error: {message}"),
            LifecycleState::Closed => write!(f, "closed"),
        }
    }
}

impl LifecycleState {
    /// Whether `sendMessage` may be called directly from this state.
    pub fn accepts_message(&self) -> bool {
        matches!(self, LifecycleState::Idle | LifecycleState::Error { .. })
    }
}

/// The durable record for one agent. Immutable fields: `provider`, `cwd`, `created_at`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentRecord {
    pub id: AgentId,
    pub provider: ProviderKind,
    pub cwd: String,
    pub title: Option<String>,
    pub mode_id: String,
    pub model: String,
    pub provider_config: serde_json::Value,
    pub state: LifecycleState,
    pub capabilities: Capabilities,
    pub available_modes: Vec<String>,
    pub created_at: SystemTime,
    pub last_activity_at: SystemTime,
    pub archived_at: Option<SystemTime>,
    pub labels: HashMap<String, String>,
    pub persistence: Option<PersistenceHandle>,
}

impl AgentRecord {
    /// Whether this record still accepts mutating operations.
    pub fn is_archived(&self) -> bool {
        self.archived_at.is_some()
    }

    /// Validate the invariant that `mode_id` is one of `available_modes`.
    pub fn has_valid_mode(&self) -> bool {
        self.available_modes.iter().any(|m| m == &self.mode_id)
    }
}

#[cfg(test)]
#[path = "agent_tests.rs"]
mod tests;
