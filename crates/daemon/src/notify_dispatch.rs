// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Notification dispatcher: turns each [`AttentionEvent`] the agent manager
//! emits into an `attention_required` push to every connected session, with
//! a single server-decided `should_notify` bit (SPEC_FULL.md §4.4) so a
//! client already watching the agent that needs attention doesn't also get
//! buzzed by its own system notification tray.

use std::sync::Arc;
use std::time::Duration;

use paseo_core::{AgentId, Clock, Heartbeat};
use paseo_engine::{AttentionEvent, AttentionReason};
use tokio::sync::mpsc;
use tracing::info;

use crate::bridge::{SessionRegistry, SessionSnapshot};
use crate::protocol::AttentionReasonWire;

fn wire_reason(reason: AttentionReason) -> AttentionReasonWire {
    match reason {
        AttentionReason::Finished => AttentionReasonWire::Finished,
        AttentionReason::Error => AttentionReasonWire::Error,
        AttentionReason::Permission => AttentionReasonWire::Permission,
    }
}

/// Whether a single session, considered alone, should be notified about
/// `agent_id` needing attention: yes unless it is actively watching that
/// agent right now.
fn should_notify_client(heartbeat: Option<&Heartbeat>, agent_id: &AgentId, keepalive: Duration, now: std::time::SystemTime) -> bool {
    match heartbeat {
        Some(heartbeat) => !heartbeat.is_watching(agent_id, keepalive, now),
        None => true,
    }
}

/// The server-wide notify decision: notify unless some session is already
/// watching the agent (it already sees the update live, a push would be
/// redundant).
fn any_session_watching(sessions: &[SessionSnapshot], agent_id: &AgentId, keepalive: Duration, now: std::time::SystemTime) -> bool {
    sessions
        .iter()
        .any(|session| !should_notify_client(session.heartbeat.as_ref(), agent_id, keepalive, now))
}

/// Consumes [`AttentionEvent`]s from the agent manager and broadcasts them
/// as `attention_required` pushes.
pub struct NotificationDispatcher<C: Clock> {
    registry: Arc<SessionRegistry>,
    clock: C,
    keepalive: Duration,
}

impl<C: Clock> NotificationDispatcher<C> {
    pub fn new(registry: Arc<SessionRegistry>, clock: C, keepalive: Duration) -> Self {
        Self { registry, clock, keepalive }
    }

    /// Run until `attention_rx` closes (the agent manager, and with it its
    /// sender half, was dropped — only happens at daemon shutdown).
    pub async fn run(self, mut attention_rx: mpsc::Receiver<AttentionEvent>) {
        while let Some(event) = attention_rx.recv().await {
            let sessions = self.registry.snapshot();
            let now = self.clock.now();
            let notify = !any_session_watching(&sessions, &event.agent_id, self.keepalive, now);
            info!(
                agent = %event.agent_id,
                reason = ?event.reason,
                notify,
                "dispatching attention event"
            );
            self.registry
                .broadcast_attention(&event.agent_id, wire_reason(event.reason), notify);
        }
    }
}

#[cfg(test)]
#[path = "notify_dispatch_tests.rs"]
mod tests;
