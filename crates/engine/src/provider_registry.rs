// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Ties `ProviderKind` to a concrete provider adapter.
//!
//! The agent manager (`manager.rs`) is generic over a single
//! `P: ProviderAdapter`, the same shape as the teacher's
//! `Runtime<S, A, N, C>` being generic over one `AgentAdapter`. Since a
//! daemon must run Claude and Codex agents side by side, `AnyProvider`
//! plays the role a single concrete `A` played for the teacher: production
//! code instantiates the manager as `AgentManager<AnyProvider, _, _>`, and
//! `ProviderRegistry` hands out the already-correct variant for a given
//! `ProviderKind` so call sites never have to match on it themselves.

use async_trait::async_trait;
use paseo_adapters::{
    ClaudeProviderAdapter, CodexProviderAdapter, ProviderAdapter, ProviderError, ProviderEvent,
    ProviderHandle, ProviderManifest, ProviderReconnectConfig, ProviderSpawnConfig,
};
use paseo_core::{AgentId, PermissionRequestId, PermissionResolution, ProviderKind};
use tokio::sync::mpsc;

/// Enum-dispatch over the two concrete provider adapters this daemon ships.
#[derive(Clone)]
pub enum AnyProvider {
    Claude(ClaudeProviderAdapter),
    Codex(CodexProviderAdapter),
}

#[async_trait]
impl ProviderAdapter for AnyProvider {
    fn manifest(&self) -> ProviderManifest {
        match self {
            AnyProvider::Claude(a) => a.manifest(),
            AnyProvider::Codex(a) => a.manifest(),
        }
    }

    async fn spawn(
        &self,
        config: ProviderSpawnConfig,
        event_tx: mpsc::Sender<ProviderEvent>,
    ) -> Result<ProviderHandle, ProviderError> {
        match self {
            AnyProvider::Claude(a) => a.spawn(config, event_tx).await,
            AnyProvider::Codex(a) => a.spawn(config, event_tx).await,
        }
    }

    async fn reconnect(
        &self,
        config: ProviderReconnectConfig,
        event_tx: mpsc::Sender<ProviderEvent>,
    ) -> Result<ProviderHandle, ProviderError> {
        match self {
            AnyProvider::Claude(a) => a.reconnect(config, event_tx).await,
            AnyProvider::Codex(a) => a.reconnect(config, event_tx).await,
        }
    }

    async fn send(
        &self,
        agent_id: &AgentId,
        text: &str,
        images: &[String],
    ) -> Result<(), ProviderError> {
        match self {
            AnyProvider::Claude(a) => a.send(agent_id, text, images).await,
            AnyProvider::Codex(a) => a.send(agent_id, text, images).await,
        }
    }

    async fn respond_permission(
        &self,
        agent_id: &AgentId,
        request_id: &PermissionRequestId,
        resolution: &PermissionResolution,
    ) -> Result<(), ProviderError> {
        match self {
            AnyProvider::Claude(a) => a.respond_permission(agent_id, request_id, resolution).await,
            AnyProvider::Codex(a) => a.respond_permission(agent_id, request_id, resolution).await,
        }
    }

    async fn cancel(&self, agent_id: &AgentId) -> Result<(), ProviderError> {
        match self {
            AnyProvider::Claude(a) => a.cancel(agent_id).await,
            AnyProvider::Codex(a) => a.cancel(agent_id).await,
        }
    }

    async fn kill(&self, agent_id: &AgentId) -> Result<(), ProviderError> {
        match self {
            AnyProvider::Claude(a) => a.kill(agent_id).await,
            AnyProvider::Codex(a) => a.kill(agent_id).await,
        }
    }
}

/// Looks up the provider adapter to use for a given `ProviderKind`.
///
/// The agent manager is generic over this rather than over a concrete
/// adapter type, since one manager instance runs agents of more than one
/// provider kind side by side; `ProviderRegistry` is the production
/// implementation, `manager_tests.rs` supplies a single-adapter test double.
pub trait ProviderResolver: Send + Sync + 'static {
    type Provider: ProviderAdapter;

    fn resolve(&self, kind: ProviderKind) -> Self::Provider;
}

/// Owns one adapter instance per provider kind this daemon supports.
#[derive(Clone)]
pub struct ProviderRegistry {
    claude: ClaudeProviderAdapter,
    codex: CodexProviderAdapter,
}

impl ProviderResolver for ProviderRegistry {
    type Provider = AnyProvider;

    fn resolve(&self, kind: ProviderKind) -> AnyProvider {
        self.get(kind)
    }
}

impl ProviderRegistry {
    pub fn new(claude: ClaudeProviderAdapter, codex: CodexProviderAdapter) -> Self {
        Self { claude, codex }
    }

    /// The adapter for `kind`, already wrapped as the variant that kind maps to.
    pub fn get(&self, kind: ProviderKind) -> AnyProvider {
        match kind {
            ProviderKind::Claude => AnyProvider::Claude(self.claude.clone()),
            ProviderKind::Codex => AnyProvider::Codex(self.codex.clone()),
        }
    }

    pub fn manifest(&self, kind: ProviderKind) -> ProviderManifest {
        self.get(kind).manifest()
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new(ClaudeProviderAdapter::new(), CodexProviderAdapter::new())
    }
}
