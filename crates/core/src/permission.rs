// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Permission requests solicited by a provider mid-run.
//!
//! Adapted from the teacher's `AgentPrompt { prompt_type, question_data }`
//! event shape, narrowed to Paseo's simpler allow/deny model.

use serde::{Deserialize, Serialize};
use std::time::SystemTime;

use crate::{AgentId, PermissionBehavior};

crate::define_id! {
    /// Identifier for one outstanding or resolved permission request.
    pub struct PermissionRequestId;
}

/// Category of thing a provider is asking permission for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionKind {
    Tool,
    Bash,
}

/// A permission request solicited by a provider, awaiting a client decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermissionRequest {
    pub id: PermissionRequestId,
    pub agent_id: AgentId,
    pub kind: PermissionKind,
    pub name: String,
    pub payload: serde_json::Value,
    pub created_at: SystemTime,
}

/// A client's decision on a `PermissionRequest`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermissionResolution {
    pub behavior: PermissionBehavior,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[cfg(test)]
#[path = "permission_tests.rs"]
mod tests;
