// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tracks every connected client session: its outbound queue, its active
//! subscriptions, and the heartbeat it last reported (SPEC_FULL.md §4.3,
//! §4.4). One [`SessionHandle`] per WebSocket connection, held both by that
//! connection's dispatch loop and by the registry for cross-session
//! broadcast (`agent_updates`) and the notification dispatcher's watch
//! check.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::Mutex;
use paseo_core::{AgentId, ClientId, DeviceType, Heartbeat, SubscriptionId};

use super::outbound::OutboundQueue;
use crate::protocol::ServerMessage;

/// A subset of a session's state visible outside the bridge, used by the
/// notification dispatcher to decide whether to notify.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub client_id: ClientId,
    pub device_type: DeviceType,
    pub heartbeat: Option<Heartbeat>,
}

pub struct SessionHandle {
    pub client_id: ClientId,
    pub device_type: DeviceType,
    pub outbound: Arc<OutboundQueue>,
    heartbeat: Mutex<Option<Heartbeat>>,
    agent_updates_subs: Mutex<HashSet<SubscriptionId>>,
    agent_stream_subs: Mutex<HashMap<SubscriptionId, (AgentId, tokio::task::JoinHandle<()>)>>,
}

impl SessionHandle {
    pub fn new(client_id: ClientId, device_type: DeviceType, outbound: Arc<OutboundQueue>) -> Self {
        Self {
            client_id,
            device_type,
            outbound,
            heartbeat: Mutex::new(None),
            agent_updates_subs: Mutex::new(HashSet::new()),
            agent_stream_subs: Mutex::new(HashMap::new()),
        }
    }

    pub fn record_heartbeat(&self, heartbeat: Heartbeat) {
        *self.heartbeat.lock() = Some(heartbeat);
    }

    pub fn heartbeat(&self) -> Option<Heartbeat> {
        self.heartbeat.lock().clone()
    }

    pub fn subscribe_agent_updates(&self, subscription_id: SubscriptionId) {
        self.agent_updates_subs.lock().insert(subscription_id);
    }

    pub fn unsubscribe_agent_updates(&self, subscription_id: &SubscriptionId) {
        self.agent_updates_subs.lock().remove(subscription_id);
    }

    pub fn watches_agent_updates(&self) -> Vec<SubscriptionId> {
        self.agent_updates_subs.lock().iter().cloned().collect()
    }

    pub fn track_agent_stream(
        &self,
        subscription_id: SubscriptionId,
        agent_id: AgentId,
        task: tokio::task::JoinHandle<()>,
    ) {
        self.agent_stream_subs.lock().insert(subscription_id, (agent_id, task));
    }

    /// Stop forwarding an `agent_stream` subscription, aborting its
    /// forwarder task if one is still registered.
    pub fn untrack_agent_stream(&self, subscription_id: &SubscriptionId) {
        if let Some((_, task)) = self.agent_stream_subs.lock().remove(subscription_id) {
            task.abort();
        }
    }
}

/// Registry of every live client session, keyed by [`ClientId`].
#[derive(Default)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<ClientId, Arc<SessionHandle>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, handle: Arc<SessionHandle>) {
        self.sessions.lock().insert(handle.client_id.clone(), handle);
    }

    pub fn remove(&self, client_id: &ClientId) {
        if let Some(handle) = self.sessions.lock().remove(client_id) {
            handle.outbound.close();
        }
    }

    /// Push `agents` to every session with an active `agent_updates`
    /// subscription.
    pub fn broadcast_agent_updates(&self, agents: Vec<paseo_core::AgentRecord>) {
        for handle in self.sessions.lock().values() {
            for subscription_id in handle.watches_agent_updates() {
                handle.outbound.push(ServerMessage::AgentUpdates {
                    subscription_id,
                    agents: agents.clone(),
                });
            }
        }
    }

    /// A point-in-time view of every session's heartbeat state, for the
    /// notification dispatcher's pure predicates.
    pub fn snapshot(&self) -> Vec<SessionSnapshot> {
        self.sessions
            .lock()
            .values()
            .map(|handle| SessionSnapshot {
                client_id: handle.client_id.clone(),
                device_type: handle.device_type,
                heartbeat: handle.heartbeat(),
            })
            .collect()
    }

    /// Deliver an `attention_required` notice to every connected session;
    /// `should_notify` has already been decided per the dispatcher's rules
    /// and is carried through unchanged so each client can decide locally
    /// whether to surface a system notification.
    pub fn broadcast_attention(
        &self,
        agent_id: &AgentId,
        reason: crate::protocol::AttentionReasonWire,
        should_notify: bool,
    ) {
        for handle in self.sessions.lock().values() {
            handle.outbound.push(ServerMessage::AttentionRequired {
                agent_id: agent_id.clone(),
                reason,
                should_notify,
            });
        }
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
