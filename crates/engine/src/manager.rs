// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The agent manager: the single writer of `AgentRecord.state` and the
//! owner of each agent's provider-driven run loop (SPEC_FULL.md §4.2).
//!
//! Mirrors the teacher's `Executor<S, A, N, C>` in shape (a handful of
//! `Clone + Send + Sync` generic collaborators plus a `Clock`, guarding
//! shared state behind per-key `parking_lot::Mutex`es) and in texture
//! (`execute()`'s tracing span wraps every operation here too). Unlike the
//! teacher's executor, which only applies effects a caller already decided
//! on, this manager also owns the long-running per-agent task that turns
//! provider output into timeline appends and lifecycle transitions.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;
use paseo_adapters::{
    ProviderAdapter, ProviderError, ProviderEvent, ProviderReconnectConfig, ProviderSpawnConfig,
};
use paseo_core::{
    AgentId, AgentRecord, Clock, IdGen, LifecycleState, PermissionBehavior, PermissionRequest,
    PermissionRequestId, PermissionResolution, PersistenceHandle, ProviderKind, TimelineItem,
    ToolCallStatus,
};
use paseo_storage::{CheckpointError, Checkpointer, MaterializedState};
use std::time::SystemTime;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

use crate::provider_registry::ProviderResolver;
use crate::timeline::{TimelineEngine, TimelineError};

/// Why an agent needs a human's attention. Emitted on the receiver
/// [`AgentManager::new`] returns (the notification dispatcher's input);
/// the manager itself never decides whether a notification is sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttentionReason {
    Finished,
    Error,
    Permission,
}

/// One attention-worthy occurrence for an agent.
#[derive(Debug, Clone)]
pub struct AttentionEvent {
    pub agent_id: AgentId,
    pub reason: AttentionReason,
    pub at: SystemTime,
}

/// Errors from agent manager operations.
#[derive(Debug, Error)]
pub enum ManagerError {
    #[error("agent not found: {0}")]
    NotFound(AgentId),
    #[error("working directory does not exist: {}", .0.display())]
    BadCwd(PathBuf),
    #[error("mode {0:?} is not offered by this provider")]
    BadMode(String),
    #[error("agent is {0}, cannot accept a message")]
    WrongState(LifecycleState),
    #[error("provider does not support this operation: {0}")]
    Unsupported(&'static str),
    #[error("no outstanding permission request for agent {0}")]
    NoPendingPermission(AgentId),
    #[error("permission request {request_id} does not match the outstanding request for agent {agent_id}")]
    PermissionMismatch {
        agent_id: AgentId,
        request_id: PermissionRequestId,
    },
    #[error("agent {0} is running; archive with force to override")]
    StillRunning(AgentId),
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error(transparent)]
    Timeline(#[from] TimelineError),
    #[error("durable checkpoint failed: {0}")]
    Checkpoint(#[from] CheckpointError),
    #[error("checkpoint task panicked")]
    CheckpointPanicked,
}

/// Parameters for `createAgent`.
#[derive(Debug, Clone)]
pub struct CreateAgentConfig {
    pub provider: ProviderKind,
    pub cwd: PathBuf,
    pub mode_id: String,
    pub model: String,
    pub title: Option<String>,
    pub labels: HashMap<String, String>,
    pub extra: serde_json::Value,
}

/// Parameters for `resumeAgent`.
#[derive(Debug, Clone)]
pub struct ResumeAgentConfig {
    pub provider: ProviderKind,
    pub cwd: PathBuf,
    pub persistence: PersistenceHandle,
    pub title: Option<String>,
    pub labels: HashMap<String, String>,
}

struct PendingPermission {
    request: PermissionRequest,
    resolved: oneshot::Sender<()>,
}

struct Shared<R: ProviderResolver, G: IdGen, C: Clock> {
    resolver: R,
    ids: G,
    clock: C,
    timeline: TimelineEngine<C>,
    state: Arc<Mutex<MaterializedState>>,
    pending_permissions: Mutex<HashMap<AgentId, PendingPermission>>,
    running_tools: Mutex<HashMap<AgentId, (paseo_core::CallId, String, paseo_core::ToolDetail)>>,
    attention_tx: mpsc::Sender<AttentionEvent>,
    snapshot_path: PathBuf,
    next_checkpoint_seq: Mutex<u64>,
}

/// Owns agent lifecycle, the provider run loop, and permission brokering.
///
/// Generic the way the teacher's `Executor<S, A, N, C>` is generic: `R`
/// resolves a concrete provider adapter per agent (production uses
/// [`crate::provider_registry::ProviderRegistry`], which hands out
/// [`crate::provider_registry::AnyProvider`]), `G` generates ids
/// deterministically under test, `C` is the clock.
pub struct AgentManager<R: ProviderResolver, G: IdGen, C: Clock> {
    shared: Arc<Shared<R, G, C>>,
}

impl<R: ProviderResolver, G: IdGen, C: Clock> Clone for AgentManager<R, G, C> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<R: ProviderResolver, G: IdGen, C: Clock> AgentManager<R, G, C> {
    pub fn new(
        resolver: R,
        ids: G,
        clock: C,
        timeline_root: PathBuf,
        state: Arc<Mutex<MaterializedState>>,
        snapshot_path: PathBuf,
    ) -> (Self, mpsc::Receiver<AttentionEvent>) {
        let (attention_tx, attention_rx) = mpsc::channel(64);
        let manager = Self {
            shared: Arc::new(Shared {
                timeline: TimelineEngine::new(timeline_root, clock.clone()),
                resolver,
                ids,
                clock,
                state,
                pending_permissions: Mutex::new(HashMap::new()),
                running_tools: Mutex::new(HashMap::new()),
                attention_tx,
                snapshot_path,
                next_checkpoint_seq: Mutex::new(0),
            }),
        };
        (manager, attention_rx)
    }

    /// The agent's canonical timeline engine, for callers (the session
    /// bridge, tests) that need to read or subscribe directly.
    pub fn timeline(&self) -> &TimelineEngine<C> {
        &self.shared.timeline
    }

    /// Block until the current materialized state is durable on disk.
    ///
    /// Called at the end of every operation SPEC_FULL §4.2 lists under
    /// "persistence coupling" (`create_agent`/`resume_agent`/
    /// `respond_permission`) so a client is never told a transition
    /// succeeded before it can survive a crash. Runs the checkpoint's
    /// serialize/compress/fsync work on a blocking thread since it is not
    /// async I/O.
    async fn checkpoint_durable(&self) -> Result<(), ManagerError> {
        let seq = {
            let mut seq = self.shared.next_checkpoint_seq.lock();
            *seq += 1;
            *seq
        };
        let state_clone = self.shared.state.lock().clone();
        let snapshot_path = self.shared.snapshot_path.clone();
        let result = tokio::task::spawn_blocking(move || {
            Checkpointer::new(snapshot_path).checkpoint_sync(seq, &state_clone)
        })
        .await
        .map_err(|_| ManagerError::CheckpointPanicked)?;
        result?;
        Ok(())
    }

    fn record(&self, agent_id: &AgentId) -> Result<AgentRecord, ManagerError> {
        self.shared
            .state
            .lock()
            .get_agent(agent_id.as_str())
            .cloned()
            .ok_or_else(|| ManagerError::NotFound(agent_id.clone()))
    }

    fn with_record_mut<T>(
        &self,
        agent_id: &AgentId,
        f: impl FnOnce(&mut AgentRecord) -> T,
    ) -> Result<T, ManagerError> {
        let mut state = self.shared.state.lock();
        let record = state
            .agents
            .get_mut(agent_id.as_str())
            .ok_or_else(|| ManagerError::NotFound(agent_id.clone()))?;
        Ok(f(record))
    }

    /// Spawn a fresh provider process and register a new agent.
    pub async fn create_agent(
        &self,
        config: CreateAgentConfig,
    ) -> Result<AgentRecord, ManagerError> {
        let span = tracing::info_span!("agent_manager.create_agent", provider = %config.provider);
        let _guard = span.enter();

        if !config.cwd.is_dir() {
            return Err(ManagerError::BadCwd(config.cwd));
        }
        let provider = self.shared.resolver.resolve(config.provider);
        let manifest = provider.manifest();
        if !manifest.available_modes.iter().any(|m| m == &config.mode_id) {
            return Err(ManagerError::BadMode(config.mode_id));
        }

        let agent_id = AgentId::new(self.shared.ids.next());
        let now = self.shared.clock.now();
        self.shared.timeline.open_agent(&agent_id, 0)?;

        let (event_tx, event_rx) = mpsc::channel(32);
        let spawn_config = ProviderSpawnConfig {
            agent_id: agent_id.clone(),
            cwd: config.cwd.clone(),
            mode_id: config.mode_id.clone(),
            model: config.model.clone(),
            extra: config.extra.clone(),
        };
        let handle = provider.spawn(spawn_config, event_tx).await?;

        let record = AgentRecord {
            id: agent_id.clone(),
            provider: config.provider,
            cwd: config.cwd.display().to_string(),
            title: config.title,
            mode_id: config.mode_id,
            model: config.model,
            provider_config: config.extra,
            state: LifecycleState::Idle,
            capabilities: manifest.capabilities,
            available_modes: manifest.available_modes,
            created_at: now,
            last_activity_at: now,
            archived_at: None,
            labels: config.labels,
            persistence: Some(handle.persistence),
        };
        self.shared.state.lock().insert_agent(record.clone());
        self.checkpoint_durable().await?;

        self.spawn_run_loop(agent_id, event_rx);
        Ok(record)
    }

    /// Reattach to a provider session described by a previously persisted
    /// handle.
    pub async fn resume_agent(
        &self,
        config: ResumeAgentConfig,
    ) -> Result<AgentRecord, ManagerError> {
        let span = tracing::info_span!("agent_manager.resume_agent", provider = %config.provider);
        let _guard = span.enter();

        if !config.cwd.is_dir() {
            return Err(ManagerError::BadCwd(config.cwd));
        }
        let provider = self.shared.resolver.resolve(config.provider);
        let manifest = provider.manifest();

        let agent_id = AgentId::new(self.shared.ids.next());
        let now = self.shared.clock.now();
        self.shared.timeline.open_agent(&agent_id, 0)?;

        let (event_tx, event_rx) = mpsc::channel(32);
        let reconnect_config = ProviderReconnectConfig {
            agent_id: agent_id.clone(),
            cwd: config.cwd.clone(),
            persistence: config.persistence.clone(),
        };
        let handle = provider.reconnect(reconnect_config, event_tx).await?;

        let record = AgentRecord {
            id: agent_id.clone(),
            provider: config.provider,
            cwd: config.cwd.display().to_string(),
            title: config.title,
            mode_id: manifest
                .available_modes
                .first()
                .cloned()
                .unwrap_or_default(),
            model: String::new(),
            provider_config: serde_json::Value::Null,
            state: LifecycleState::Idle,
            capabilities: manifest.capabilities,
            available_modes: manifest.available_modes,
            created_at: now,
            last_activity_at: now,
            archived_at: None,
            labels: config.labels,
            persistence: Some(handle.persistence),
        };
        self.shared.state.lock().insert_agent(record.clone());
        self.checkpoint_durable().await?;

        self.spawn_run_loop(agent_id, event_rx);
        Ok(record)
    }

    /// Send a user message. Only valid from `idle`/`error` (`accepts_message`).
    pub async fn send_message(
        &self,
        agent_id: &AgentId,
        text: &str,
        images: Option<Vec<String>>,
    ) -> Result<(), ManagerError> {
        let record = self.record(agent_id)?;
        if !record.state.accepts_message() {
            return Err(ManagerError::WrongState(record.state));
        }
        let provider = self.shared.resolver.resolve(record.provider);

        self.shared.timeline.append(
            agent_id,
            TimelineItem::UserMessage {
                text: text.to_string(),
                images: images.clone(),
            },
        )?;
        self.with_record_mut(agent_id, |r| {
            r.state = LifecycleState::Running;
            r.last_activity_at = self.shared.clock.now();
        })?;

        provider
            .send(agent_id, text, images.as_deref().unwrap_or(&[]))
            .await?;
        Ok(())
    }

    /// Resolve an outstanding permission request. Fails if none is
    /// outstanding or `request_id` does not match it.
    pub async fn respond_permission(
        &self,
        agent_id: &AgentId,
        request_id: &PermissionRequestId,
        resolution: PermissionResolution,
    ) -> Result<(), ManagerError> {
        let pending = {
            let mut pending = self.shared.pending_permissions.lock();
            pending.remove(agent_id)
        };
        let Some(pending) = pending else {
            return Err(ManagerError::NoPendingPermission(agent_id.clone()));
        };
        if pending.request.id != *request_id {
            let reinsert = PendingPermission {
                request: pending.request,
                resolved: pending.resolved,
            };
            self.shared
                .pending_permissions
                .lock()
                .insert(agent_id.clone(), reinsert);
            return Err(ManagerError::PermissionMismatch {
                agent_id: agent_id.clone(),
                request_id: request_id.clone(),
            });
        }

        let record = self.record(agent_id)?;
        let provider = self.shared.resolver.resolve(record.provider);
        provider
            .respond_permission(agent_id, request_id, &resolution)
            .await?;

        self.shared.timeline.append(
            agent_id,
            TimelineItem::PermissionResolved {
                request_id: request_id.clone(),
                behavior: resolution.behavior,
                message: resolution.message,
            },
        )?;
        self.with_record_mut(agent_id, |r| {
            r.state = LifecycleState::Running;
            r.last_activity_at = self.shared.clock.now();
        })?;
        self.checkpoint_durable().await?;
        let _ = pending.resolved.send(());
        Ok(())
    }

    /// Change an agent's mode. Rejected with `Unsupported` unless the
    /// provider advertises `dynamic_modes`.
    pub fn set_mode(&self, agent_id: &AgentId, mode_id: &str) -> Result<(), ManagerError> {
        let record = self.record(agent_id)?;
        if !record.capabilities.dynamic_modes {
            return Err(ManagerError::Unsupported("dynamic_modes"));
        }
        if !record.available_modes.iter().any(|m| m == mode_id) {
            return Err(ManagerError::BadMode(mode_id.to_string()));
        }
        self.shared.timeline.append(
            agent_id,
            TimelineItem::ModeUpdate {
                mode_id: mode_id.to_string(),
            },
        )?;
        self.with_record_mut(agent_id, |r| {
            r.mode_id = mode_id.to_string();
            r.last_activity_at = self.shared.clock.now();
        })?;
        Ok(())
    }

    /// Change an agent's model. Same capability gate as `set_mode`.
    pub fn set_model(&self, agent_id: &AgentId, model: &str) -> Result<(), ManagerError> {
        let record = self.record(agent_id)?;
        if !record.capabilities.dynamic_modes {
            return Err(ManagerError::Unsupported("dynamic_modes"));
        }
        self.with_record_mut(agent_id, |r| {
            r.model = model.to_string();
            r.last_activity_at = self.shared.clock.now();
        })?;
        Ok(())
    }

    /// Request cooperative cancellation of the agent's in-flight turn. Any
    /// tool call the run loop believes is still running is closed out as
    /// `canceled` so the timeline never ends on a dangling `running` status.
    pub async fn cancel(&self, agent_id: &AgentId) -> Result<(), ManagerError> {
        let record = self.record(agent_id)?;
        let provider = self.shared.resolver.resolve(record.provider);

        let running_tool = self.shared.running_tools.lock().remove(agent_id);
        if let Some((call_id, name, detail)) = running_tool {
            self.shared.timeline.append(
                agent_id,
                TimelineItem::ToolCall {
                    call_id,
                    name,
                    status: ToolCallStatus::Canceled,
                    detail,
                    error: None,
                },
            )?;
        }
        provider.cancel(agent_id).await?;
        Ok(())
    }

    /// Archive an agent. Refuses a still-`Running` agent unless `force`.
    pub async fn archive_agent(
        &self,
        agent_id: &AgentId,
        force: bool,
    ) -> Result<SystemTime, ManagerError> {
        let record = self.record(agent_id)?;
        if record.state == LifecycleState::Running && !force {
            return Err(ManagerError::StillRunning(agent_id.clone()));
        }
        let provider = self.shared.resolver.resolve(record.provider);
        if let Err(err) = provider.kill(agent_id).await {
            tracing::warn!(agent = %agent_id, error = %err, "provider kill failed during archive");
        }
        self.shared.timeline.close(agent_id);

        let archived_at = self.shared.clock.now();
        self.with_record_mut(agent_id, |r| {
            r.state = LifecycleState::Closed;
            r.archived_at = Some(archived_at);
        })?;
        Ok(archived_at)
    }

    fn spawn_run_loop(&self, agent_id: AgentId, event_rx: mpsc::Receiver<ProviderEvent>) {
        let shared = self.shared.clone();
        tokio::spawn(async move {
            drive_run_loop(shared, agent_id, event_rx).await;
        });
    }
}

async fn drive_run_loop<R: ProviderResolver, G: IdGen, C: Clock>(
    shared: Arc<Shared<R, G, C>>,
    agent_id: AgentId,
    mut event_rx: mpsc::Receiver<ProviderEvent>,
) {
    while let Some(event) = event_rx.recv().await {
        match event {
            ProviderEvent::Item(item) => {
                if let TimelineItem::ToolCall {
                    call_id,
                    name,
                    status: ToolCallStatus::Running,
                    detail,
                    ..
                } = &item
                {
                    shared
                        .running_tools
                        .lock()
                        .insert(agent_id.clone(), (call_id.clone(), name.clone(), detail.clone()));
                }
                if let TimelineItem::ToolCall {
                    status: ToolCallStatus::Completed | ToolCallStatus::Failed | ToolCallStatus::Canceled,
                    ..
                } = &item
                {
                    shared.running_tools.lock().remove(&agent_id);
                }
                let at = shared.clock.now();
                if let Err(err) = shared.timeline.append(&agent_id, item) {
                    tracing::error!(agent = %agent_id, error = %err, "failed to append timeline item");
                }
                let mut state = shared.state.lock();
                if let Some(record) = state.agents.get_mut(agent_id.as_str()) {
                    record.last_activity_at = at;
                }
            }
            ProviderEvent::PermissionRequested(request) => {
                let (tx, rx) = oneshot::channel();
                let request_id = request.id.clone();
                shared.pending_permissions.lock().insert(
                    agent_id.clone(),
                    PendingPermission {
                        request,
                        resolved: tx,
                    },
                );
                {
                    let mut state = shared.state.lock();
                    if let Some(record) = state.agents.get_mut(agent_id.as_str()) {
                        record.state = LifecycleState::Permission { request_id };
                    }
                }
                let _ = shared
                    .attention_tx
                    .send(AttentionEvent {
                        agent_id: agent_id.clone(),
                        reason: AttentionReason::Permission,
                        at: shared.clock.now(),
                    })
                    .await;
                let _ = rx.await;
            }
            ProviderEvent::TurnComplete => {
                {
                    let mut state = shared.state.lock();
                    if let Some(record) = state.agents.get_mut(agent_id.as_str()) {
                        record.state = LifecycleState::Idle;
                    }
                }
                let _ = shared
                    .attention_tx
                    .send(AttentionEvent {
                        agent_id: agent_id.clone(),
                        reason: AttentionReason::Finished,
                        at: shared.clock.now(),
                    })
                    .await;
            }
            ProviderEvent::Exited { exit_code } => {
                let unexpected = !matches!(exit_code, Some(0) | None);
                if unexpected {
                    let message = format!("provider exited with code {exit_code:?}");
                    let _ = shared
                        .timeline
                        .append(&agent_id, TimelineItem::Error { message: message.clone() });
                    let mut state = shared.state.lock();
                    if let Some(record) = state.agents.get_mut(agent_id.as_str()) {
                        record.state = LifecycleState::Error { message };
                    }
                    drop(state);
                    let _ = shared
                        .attention_tx
                        .send(AttentionEvent {
                            agent_id: agent_id.clone(),
                            reason: AttentionReason::Error,
                            at: shared.clock.now(),
                        })
                        .await;
                }
                break;
            }
        }
    }
}

/// Convenience for constructing an `allow` resolution.
pub fn allow() -> PermissionResolution {
    PermissionResolution {
        behavior: PermissionBehavior::Allow,
        message: None,
    }
}

/// Convenience for constructing a `deny` resolution.
pub fn deny(message: impl Into<String>) -> PermissionResolution {
    PermissionResolution {
        behavior: PermissionBehavior::Deny,
        message: Some(message.into()),
    }
}

#[cfg(test)]
#[path = "manager_tests.rs"]
mod tests;
