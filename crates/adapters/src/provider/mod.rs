// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Provider adapters: a uniform interface over external coding-agent CLIs
//! (`claude`, `codex`).
//!
//! Narrowed and retargeted from the teacher's `AgentAdapter`/`SessionAdapter`
//! pair. The teacher ran agents inside a tmux pane and polled pane output for
//! interactive prompts; a provider here is a plain subprocess the daemon
//! owns directly (`tokio::process::Command`), and the watcher tails the
//! provider's own JSONL session/rollout log the same way the teacher's
//! watcher tailed a tmux-spawned session's log. See DESIGN.md.

mod claude;
mod codex;
pub mod log_entry;
mod watcher;

pub use claude::ClaudeProviderAdapter;
pub use codex::CodexProviderAdapter;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeProviderAdapter, ProviderCall};

use async_trait::async_trait;
use paseo_core::{
    AgentId, Capabilities, PermissionRequest, PermissionRequestId, PermissionResolution,
    PersistenceHandle, TimelineItem,
};
use std::path::PathBuf;
use thiserror::Error;
use tokio::sync::mpsc;

/// Errors from provider operations.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("provider CLI unavailable: {0}")]
    Unavailable(String),
    #[error("working directory does not exist: {}", .0.display())]
    BadCwd(PathBuf),
    #[error("agent not found: {0}")]
    NotFound(AgentId),
    #[error("mode {0:?} is not offered by this provider")]
    BadMode(String),
    #[error("resume rejected by provider: {0}")]
    ResumeFailed(String),
    #[error("provider does not support this operation: {0}")]
    Unsupported(&'static str),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed provider output: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration for spawning a new provider-backed agent.
#[derive(Debug, Clone)]
pub struct ProviderSpawnConfig {
    pub agent_id: AgentId,
    pub cwd: PathBuf,
    pub mode_id: String,
    pub model: String,
    /// Provider-specific extra configuration (e.g. permission mode, sandbox flags).
    pub extra: serde_json::Value,
}

/// Configuration for reattaching to a provider session after a daemon restart.
#[derive(Debug, Clone)]
pub struct ProviderReconnectConfig {
    pub agent_id: AgentId,
    pub cwd: PathBuf,
    pub persistence: PersistenceHandle,
}

/// Handle to a spawned or reconnected provider-backed agent.
#[derive(Debug)]
pub struct ProviderHandle {
    pub agent_id: AgentId,
    pub persistence: PersistenceHandle,
}

/// What this provider can do, and which modes it currently offers.
#[derive(Debug, Clone)]
pub struct ProviderManifest {
    pub capabilities: Capabilities,
    pub available_modes: Vec<String>,
}

/// An event translated from provider output. The agent manager folds these
/// into timeline items and lifecycle transitions (SPEC_FULL.md §4.2).
#[derive(Debug, Clone)]
pub enum ProviderEvent {
    /// A canonical timeline item parsed from the provider stream.
    Item(TimelineItem),
    /// The provider is asking for permission to proceed (tool use, bash, etc).
    PermissionRequested(PermissionRequest),
    /// The provider finished its turn and is waiting for more input.
    TurnComplete,
    /// The provider process exited (crash or graceful shutdown).
    Exited { exit_code: Option<i32> },
}

/// Adapter for spawning and driving a provider CLI as a supervised subprocess.
#[async_trait]
pub trait ProviderAdapter: Clone + Send + Sync + 'static {
    /// Static description of what this provider offers, independent of any
    /// running agent.
    fn manifest(&self) -> ProviderManifest;

    /// Spawn a fresh provider process for a new agent.
    ///
    /// `event_tx` receives translated timeline items and lifecycle signals
    /// for the lifetime of the process; the channel closes when the watcher
    /// observes the process has exited.
    async fn spawn(
        &self,
        config: ProviderSpawnConfig,
        event_tx: mpsc::Sender<ProviderEvent>,
    ) -> Result<ProviderHandle, ProviderError>;

    /// Reattach to a provider session described by a previously-persisted
    /// handle, without starting a new conversation.
    async fn reconnect(
        &self,
        config: ProviderReconnectConfig,
        event_tx: mpsc::Sender<ProviderEvent>,
    ) -> Result<ProviderHandle, ProviderError>;

    /// Send a user message to a running agent.
    async fn send(
        &self,
        agent_id: &AgentId,
        text: &str,
        images: &[String],
    ) -> Result<(), ProviderError>;

    /// Resolve an outstanding permission request.
    async fn respond_permission(
        &self,
        agent_id: &AgentId,
        request_id: &PermissionRequestId,
        resolution: &PermissionResolution,
    ) -> Result<(), ProviderError>;

    /// Request cooperative cancellation of the agent's in-flight turn.
    async fn cancel(&self, agent_id: &AgentId) -> Result<(), ProviderError>;

    /// Terminate the provider process and stop its watcher.
    async fn kill(&self, agent_id: &AgentId) -> Result<(), ProviderError>;
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
