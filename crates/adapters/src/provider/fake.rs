// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake provider adapter for deterministic testing.
#![cfg_attr(coverage_nightly, coverage(off))]

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use paseo_core::{
    AgentId, Capabilities, PermissionRequestId, PermissionResolution, PersistenceHandle,
};
use tokio::sync::mpsc;

use super::{
    ProviderAdapter, ProviderError, ProviderEvent, ProviderHandle, ProviderManifest,
    ProviderReconnectConfig, ProviderSpawnConfig,
};

/// Recorded call to [`FakeProviderAdapter`].
#[derive(Debug, Clone)]
pub enum ProviderCall {
    Spawn { agent_id: AgentId, mode_id: String, model: String },
    Reconnect { agent_id: AgentId, session_id: String },
    Send { agent_id: AgentId, text: String },
    RespondPermission { agent_id: AgentId, request_id: PermissionRequestId },
    Cancel { agent_id: AgentId },
    Kill { agent_id: AgentId },
}

struct FakeAgent {
    event_tx: mpsc::Sender<ProviderEvent>,
    persistence: PersistenceHandle,
}

struct Inner {
    agents: HashMap<AgentId, FakeAgent>,
    calls: Vec<ProviderCall>,
    manifest: ProviderManifest,
    spawn_error: Option<String>,
    send_error: Option<String>,
}

/// Fake provider adapter for testing the agent manager without a real CLI.
///
/// Records every call and lets tests push [`ProviderEvent`]s onto a spawned
/// agent's channel to simulate provider output.
#[derive(Clone)]
pub struct FakeProviderAdapter {
    inner: Arc<Mutex<Inner>>,
}

impl Default for FakeProviderAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeProviderAdapter {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                agents: HashMap::new(),
                calls: Vec::new(),
                manifest: ProviderManifest {
                    capabilities: Capabilities {
                        streaming: true,
                        persistence: true,
                        dynamic_modes: true,
                        tool_invocations: true,
                        reasoning_stream: true,
                    },
                    available_modes: vec!["default".to_string()],
                },
                spawn_error: None,
                send_error: None,
            })),
        }
    }

    pub fn with_manifest(manifest: ProviderManifest) -> Self {
        let adapter = Self::new();
        adapter.inner.lock().manifest = manifest;
        adapter
    }

    pub fn calls(&self) -> Vec<ProviderCall> {
        self.inner.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.inner.lock().calls.clear();
    }

    pub fn set_spawn_error(&self, message: impl Into<String>) {
        self.inner.lock().spawn_error = Some(message.into());
    }

    pub fn set_send_error(&self, message: impl Into<String>) {
        self.inner.lock().send_error = Some(message.into());
    }

    pub fn has_agent(&self, agent_id: &AgentId) -> bool {
        self.inner.lock().agents.contains_key(agent_id)
    }

    /// Push a provider event onto a spawned agent's channel, as if the
    /// subprocess had produced it.
    pub async fn push_event(&self, agent_id: &AgentId, event: ProviderEvent) {
        let tx = self.inner.lock().agents.get(agent_id).map(|a| a.event_tx.clone());
        if let Some(tx) = tx {
            let _ = tx.send(event).await;
        }
    }
}

#[async_trait]
impl ProviderAdapter for FakeProviderAdapter {
    fn manifest(&self) -> ProviderManifest {
        self.inner.lock().manifest.clone()
    }

    async fn spawn(
        &self,
        config: ProviderSpawnConfig,
        event_tx: mpsc::Sender<ProviderEvent>,
    ) -> Result<ProviderHandle, ProviderError> {
        let mut inner = self.inner.lock();
        inner.calls.push(ProviderCall::Spawn {
            agent_id: config.agent_id.clone(),
            mode_id: config.mode_id.clone(),
            model: config.model.clone(),
        });
        if let Some(message) = inner.spawn_error.take() {
            return Err(ProviderError::Unavailable(message));
        }
        let persistence = PersistenceHandle {
            provider: paseo_core::ProviderKind::Claude,
            session_id: config.agent_id.to_string(),
            metadata: config.extra,
        };
        inner.agents.insert(
            config.agent_id.clone(),
            FakeAgent { event_tx, persistence: persistence.clone() },
        );
        Ok(ProviderHandle { agent_id: config.agent_id, persistence })
    }

    async fn reconnect(
        &self,
        config: ProviderReconnectConfig,
        event_tx: mpsc::Sender<ProviderEvent>,
    ) -> Result<ProviderHandle, ProviderError> {
        let mut inner = self.inner.lock();
        inner.calls.push(ProviderCall::Reconnect {
            agent_id: config.agent_id.clone(),
            session_id: config.persistence.session_id.clone(),
        });
        if let Some(message) = inner.spawn_error.take() {
            return Err(ProviderError::ResumeFailed(message));
        }
        inner.agents.insert(
            config.agent_id.clone(),
            FakeAgent { event_tx, persistence: config.persistence.clone() },
        );
        Ok(ProviderHandle { agent_id: config.agent_id, persistence: config.persistence })
    }

    async fn send(&self, agent_id: &AgentId, text: &str, _images: &[String]) -> Result<(), ProviderError> {
        let mut inner = self.inner.lock();
        inner.calls.push(ProviderCall::Send { agent_id: agent_id.clone(), text: text.to_string() });
        if let Some(message) = inner.send_error.take() {
            return Err(ProviderError::Io(std::io::Error::other(message)));
        }
        if !inner.agents.contains_key(agent_id) {
            return Err(ProviderError::NotFound(agent_id.clone()));
        }
        Ok(())
    }

    async fn respond_permission(
        &self,
        agent_id: &AgentId,
        request_id: &PermissionRequestId,
        _resolution: &PermissionResolution,
    ) -> Result<(), ProviderError> {
        let mut inner = self.inner.lock();
        inner.calls.push(ProviderCall::RespondPermission {
            agent_id: agent_id.clone(),
            request_id: request_id.clone(),
        });
        if !inner.agents.contains_key(agent_id) {
            return Err(ProviderError::NotFound(agent_id.clone()));
        }
        Ok(())
    }

    async fn cancel(&self, agent_id: &AgentId) -> Result<(), ProviderError> {
        let mut inner = self.inner.lock();
        inner.calls.push(ProviderCall::Cancel { agent_id: agent_id.clone() });
        if !inner.agents.contains_key(agent_id) {
            return Err(ProviderError::NotFound(agent_id.clone()));
        }
        Ok(())
    }

    async fn kill(&self, agent_id: &AgentId) -> Result<(), ProviderError> {
        let mut inner = self.inner.lock();
        inner.calls.push(ProviderCall::Kill { agent_id: agent_id.clone() });
        inner
            .agents
            .remove(agent_id)
            .map(|_| ())
            .ok_or_else(|| ProviderError::NotFound(agent_id.clone()))
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
