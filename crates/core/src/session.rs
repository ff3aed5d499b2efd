// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Client session identity and heartbeat tracking.
//!
//! A `ClientSession` is one connected client (mobile app, desktop app, CLI).
//! It is distinct from `AgentId`: sessions come and go independently of the
//! agents they observe.

use serde::{Deserialize, Serialize};
use std::time::SystemTime;

use crate::AgentId;

crate::define_id! {
    /// Unique identifier for a connected client. Client-supplied if present,
    /// otherwise server-issued on connect.
    pub struct ClientId;
}

crate::define_id! {
    /// Identifier for a client-chosen subscription (agent stream, diff stream, etc.).
    pub struct SubscriptionId;
}

/// Kind of client connecting, carried for notification tie-break purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceType {
    Mobile,
    Desktop,
    Cli,
}

/// Latest activity snapshot reported by a client via `heartbeat`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Heartbeat {
    pub focused_agent_id: Option<AgentId>,
    pub last_activity_at: SystemTime,
    pub app_visible: bool,
    pub device_type: DeviceType,
}

impl Heartbeat {
    /// Whether this heartbeat is older than twice the keepalive interval.
    pub fn is_stale(&self, keepalive: std::time::Duration, now: SystemTime) -> bool {
        match now.duration_since(self.last_activity_at) {
            Ok(age) => age > keepalive * 2,
            Err(_) => false,
        }
    }

    /// Whether this heartbeat implies the user is actively watching `agent_id`.
    pub fn is_watching(&self, agent_id: &AgentId, keepalive: std::time::Duration, now: SystemTime) -> bool {
        self.app_visible
            && !self.is_stale(keepalive, now)
            && self.focused_agent_id.as_ref() == Some(agent_id)
    }
}

/// Per-connection client session state tracked by the session bridge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientSession {
    pub client_id: ClientId,
    pub device_type: DeviceType,
    pub protocol_version: String,
    pub heartbeat: Option<Heartbeat>,
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
