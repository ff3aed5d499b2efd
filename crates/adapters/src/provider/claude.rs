// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Claude Code provider adapter.
//!
//! Spawns `claude` as a directly-owned subprocess (`tokio::process::Command`)
//! rather than inside a tmux pane: the teacher's `ClaudeAgentAdapter` needed
//! tmux because it shared sessions with interactive human use; a Paseo
//! provider is daemon-owned end to end, so stdin is a pipe this adapter
//! writes to directly. The process still writes its own JSONL transcript
//! under `~/.claude/projects/<dir>/<session-id>.jsonl`, which the watcher
//! tails exactly as the teacher's watcher tailed a tmux session's log.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use paseo_core::{
    AgentId, Capabilities, PermissionRequestId, PermissionResolution, PersistenceHandle,
    ProviderKind,
};
use tokio::io::AsyncWriteExt;
use tokio::process::{Child, ChildStdin, Command};
use tokio::sync::{mpsc, oneshot, Mutex as AsyncMutex};

use super::{
    ProviderAdapter, ProviderError, ProviderEvent, ProviderHandle, ProviderManifest,
    ProviderReconnectConfig, ProviderSpawnConfig,
};

/// Claude Code's fixed permission-mode vocabulary, surfaced as Paseo "modes".
pub const CLAUDE_MODES: &[&str] = &["default", "acceptEdits", "bypassPermissions", "plan"];

struct RunningProcess {
    stdin: Arc<AsyncMutex<ChildStdin>>,
    shutdown: oneshot::Sender<()>,
    persistence: PersistenceHandle,
}

/// Provider adapter driving the `claude` CLI as a supervised subprocess.
#[derive(Clone)]
pub struct ClaudeProviderAdapter {
    binary: String,
    processes: Arc<Mutex<HashMap<AgentId, RunningProcess>>>,
}

impl ClaudeProviderAdapter {
    pub fn new() -> Self {
        let binary = std::env::var("PASEO_CLAUDE_BIN").unwrap_or_else(|_| "claude".to_string());
        Self {
            binary,
            processes: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn spawn_process(
        &self,
        cwd: &Path,
        session_id: &str,
        mode_id: &str,
        model: &str,
        resume: bool,
    ) -> std::io::Result<Child> {
        let mut cmd = Command::new(&self.binary);
        cmd.current_dir(cwd)
            .arg("--print")
            .arg("--input-format")
            .arg("stream-json")
            .arg("--output-format")
            .arg("stream-json")
            .arg("--permission-mode")
            .arg(mode_id)
            .arg("--model")
            .arg(model);
        if resume {
            cmd.arg("--resume").arg(session_id);
        } else {
            cmd.arg("--session-id").arg(session_id);
        }
        cmd.stdin(Stdio::piped()).stdout(Stdio::null()).stderr(Stdio::null());
        cmd.spawn()
    }

    fn stdin_handle(&self, agent_id: &AgentId) -> Result<Arc<AsyncMutex<ChildStdin>>, ProviderError> {
        self.processes
            .lock()
            .get(agent_id)
            .map(|p| p.stdin.clone())
            .ok_or_else(|| ProviderError::NotFound(agent_id.clone()))
    }
}

impl Default for ClaudeProviderAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProviderAdapter for ClaudeProviderAdapter {
    fn manifest(&self) -> ProviderManifest {
        ProviderManifest {
            capabilities: Capabilities {
                streaming: true,
                persistence: true,
                dynamic_modes: true,
                tool_invocations: true,
                reasoning_stream: true,
            },
            available_modes: CLAUDE_MODES.iter().map(|s| s.to_string()).collect(),
        }
    }

    async fn spawn(
        &self,
        config: ProviderSpawnConfig,
        event_tx: mpsc::Sender<ProviderEvent>,
    ) -> Result<ProviderHandle, ProviderError> {
        if !config.cwd.is_dir() {
            return Err(ProviderError::BadCwd(config.cwd));
        }
        if !CLAUDE_MODES.contains(&config.mode_id.as_str()) {
            return Err(ProviderError::BadMode(config.mode_id));
        }

        let session_id = uuid::Uuid::new_v4().to_string();
        let mut child = self
            .spawn_process(&config.cwd, &session_id, &config.mode_id, &config.model, false)
            .map_err(|e| ProviderError::Unavailable(e.to_string()))?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| ProviderError::Unavailable("claude stdin unavailable".to_string()))?;

        let log_path = session_log_path(&config.cwd, &session_id);
        let shutdown = super::watcher::start(config.agent_id.clone(), log_path, child, event_tx);

        let persistence = PersistenceHandle {
            provider: ProviderKind::Claude,
            session_id,
            metadata: config.extra,
        };
        self.processes.lock().insert(
            config.agent_id.clone(),
            RunningProcess {
                stdin: Arc::new(AsyncMutex::new(stdin)),
                shutdown,
                persistence: persistence.clone(),
            },
        );

        Ok(ProviderHandle {
            agent_id: config.agent_id,
            persistence,
        })
    }

    async fn reconnect(
        &self,
        config: ProviderReconnectConfig,
        event_tx: mpsc::Sender<ProviderEvent>,
    ) -> Result<ProviderHandle, ProviderError> {
        if !config.cwd.is_dir() {
            return Err(ProviderError::BadCwd(config.cwd));
        }
        let session_id = config.persistence.session_id.clone();
        let mut child = self
            .spawn_process(&config.cwd, &session_id, "default", "default", true)
            .map_err(|e| ProviderError::ResumeFailed(e.to_string()))?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| ProviderError::ResumeFailed("claude stdin unavailable".to_string()))?;

        let log_path = session_log_path(&config.cwd, &session_id);
        let shutdown = super::watcher::start(config.agent_id.clone(), log_path, child, event_tx);

        self.processes.lock().insert(
            config.agent_id.clone(),
            RunningProcess {
                stdin: Arc::new(AsyncMutex::new(stdin)),
                shutdown,
                persistence: config.persistence.clone(),
            },
        );

        Ok(ProviderHandle {
            agent_id: config.agent_id,
            persistence: config.persistence,
        })
    }

    async fn send(&self, agent_id: &AgentId, text: &str, images: &[String]) -> Result<(), ProviderError> {
        let mut content = vec![serde_json::json!({"type": "text", "text": text})];
        for image in images {
            content.push(serde_json::json!({
                "type": "image",
                "source": {"type": "base64", "media_type": "image/png", "data": image},
            }));
        }
        let record = serde_json::json!({
            "type": "user",
            "message": {"role": "user", "content": content},
        });
        let line = format!("{record}\n");

        let stdin = self.stdin_handle(agent_id)?;
        stdin
            .lock()
            .await
            .write_all(line.as_bytes())
            .await
            .map_err(ProviderError::Io)?;
        Ok(())
    }

    async fn respond_permission(
        &self,
        agent_id: &AgentId,
        request_id: &PermissionRequestId,
        resolution: &PermissionResolution,
    ) -> Result<(), ProviderError> {
        let raw_id = request_id
            .as_str()
            .strip_prefix("claude:")
            .ok_or(ProviderError::Unsupported("request_id not owned by claude adapter"))?;
        let behavior = match resolution.behavior {
            paseo_core::PermissionBehavior::Allow => "allow",
            paseo_core::PermissionBehavior::Deny => "deny",
        };
        let line = format!(
            "{}\n",
            serde_json::json!({
                "type": "control_response",
                "response": {"request_id": raw_id, "behavior": behavior, "message": resolution.message},
            })
        );

        let stdin = self.stdin_handle(agent_id)?;
        stdin.lock().await.write_all(line.as_bytes()).await.map_err(ProviderError::Io)?;
        Ok(())
    }

    async fn cancel(&self, agent_id: &AgentId) -> Result<(), ProviderError> {
        let line = format!(
            "{}\n",
            serde_json::json!({"type": "control_request", "request": {"subtype": "interrupt"}})
        );
        let stdin = self.stdin_handle(agent_id)?;
        stdin.lock().await.write_all(line.as_bytes()).await.map_err(ProviderError::Io)?;
        Ok(())
    }

    async fn kill(&self, agent_id: &AgentId) -> Result<(), ProviderError> {
        let process = self
            .processes
            .lock()
            .remove(agent_id)
            .ok_or_else(|| ProviderError::NotFound(agent_id.clone()))?;
        let _ = process.shutdown.send(());
        Ok(())
    }
}

/// Claude's own JSONL session log path for a project + session id.
///
/// Uses `CLAUDE_CONFIG_DIR` env var if set, otherwise `~/.claude`, matching
/// the directory-naming scheme Claude Code itself uses (slashes and dots
/// replaced with dashes in the canonicalized project path).
fn session_log_path(cwd: &Path, session_id: &str) -> PathBuf {
    let claude_base = std::env::var("CLAUDE_CONFIG_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| dirs::home_dir().unwrap_or_default().join(".claude"));
    let canonical = std::fs::canonicalize(cwd).unwrap_or_else(|_| cwd.to_path_buf());
    let dir_name = canonical.to_string_lossy().replace(['/', '.'], "-");
    claude_base
        .join("projects")
        .join(dir_name)
        .join(format!("{session_id}.jsonl"))
}

#[cfg(test)]
#[path = "claude_tests.rs"]
mod tests;
