// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Codex CLI provider adapter.
//!
//! Codex's own automation surface is a submission-queue / event-queue JSONL
//! protocol over a long-lived subprocess's stdin/stdout (`codex proto`),
//! rather than a JSONL file on disk the way Claude Code writes its session
//! transcript. So unlike [`super::claude::ClaudeProviderAdapter`], which
//! hands a log path to a file watcher, this adapter reads the child's own
//! stdout directly: a background task reads one `Event` JSON line at a time
//! and translates it into canonical timeline items, the same trip the
//! teacher's watcher made from a tailed log, just sourced from a pipe
//! instead of inotify.

use std::collections::HashMap;
use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use paseo_core::{
    AgentId, CallId, Capabilities, IdGen, PermissionKind, PermissionRequest, PermissionRequestId,
    PermissionResolution, PersistenceHandle, ProviderKind, ToolCallStatus, ToolDetail, UuidIdGen,
};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, Command};
use tokio::sync::{mpsc, oneshot, Mutex as AsyncMutex};

use super::{
    ProviderAdapter, ProviderError, ProviderEvent, ProviderHandle, ProviderManifest,
    ProviderReconnectConfig, ProviderSpawnConfig,
};

/// Codex's approval-policy vocabulary, surfaced as Paseo "modes".
pub const CODEX_MODES: &[&str] = &["untrusted", "on-failure", "on-request", "never"];

struct RunningProcess {
    stdin: Arc<AsyncMutex<ChildStdin>>,
    shutdown: oneshot::Sender<()>,
    persistence: PersistenceHandle,
}

/// Provider adapter driving `codex proto` as a supervised subprocess.
#[derive(Clone)]
pub struct CodexProviderAdapter {
    binary: String,
    processes: Arc<Mutex<HashMap<AgentId, RunningProcess>>>,
}

impl CodexProviderAdapter {
    pub fn new() -> Self {
        let binary = std::env::var("PASEO_CODEX_BIN").unwrap_or_else(|_| "codex".to_string());
        Self {
            binary,
            processes: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn spawn_process(
        &self,
        cwd: &Path,
        mode_id: &str,
        model: &str,
        resume_thread_id: Option<&str>,
    ) -> std::io::Result<Child> {
        let mut cmd = Command::new(&self.binary);
        cmd.current_dir(cwd)
            .arg("proto")
            .arg("--approval-policy")
            .arg(mode_id)
            .arg("--model")
            .arg(model);
        if let Some(thread_id) = resume_thread_id {
            cmd.arg("--resume").arg(thread_id);
        }
        cmd.stdin(Stdio::piped()).stdout(Stdio::piped()).stderr(Stdio::null());
        cmd.spawn()
    }

    fn stdin_handle(&self, agent_id: &AgentId) -> Result<Arc<AsyncMutex<ChildStdin>>, ProviderError> {
        self.processes
            .lock()
            .get(agent_id)
            .map(|p| p.stdin.clone())
            .ok_or_else(|| ProviderError::NotFound(agent_id.clone()))
    }

    fn register(&self, agent_id: AgentId, child: Child, stdin: ChildStdin, persistence: PersistenceHandle, event_tx: mpsc::Sender<ProviderEvent>) {
        let shutdown = spawn_reader(agent_id.clone(), child, event_tx);
        self.processes.lock().insert(
            agent_id,
            RunningProcess {
                stdin: Arc::new(AsyncMutex::new(stdin)),
                shutdown,
                persistence,
            },
        );
    }
}

impl Default for CodexProviderAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProviderAdapter for CodexProviderAdapter {
    fn manifest(&self) -> ProviderManifest {
        ProviderManifest {
            capabilities: Capabilities {
                streaming: true,
                persistence: true,
                dynamic_modes: true,
                tool_invocations: true,
                reasoning_stream: true,
            },
            available_modes: CODEX_MODES.iter().map(|s| s.to_string()).collect(),
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
        if !CODEX_MODES.contains(&config.mode_id.as_str()) {
            return Err(ProviderError::BadMode(config.mode_id));
        }

        let mut child = self
            .spawn_process(&config.cwd, &config.mode_id, &config.model, None)
            .map_err(|e| ProviderError::Unavailable(e.to_string()))?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| ProviderError::Unavailable("codex stdin unavailable".to_string()))?;

        // The real thread id only arrives on the first SessionConfigured event;
        // the reader task fills it in once known, but the session_id recorded
        // here is our own correlator until then.
        let session_id = uuid::Uuid::new_v4().to_string();
        let persistence = PersistenceHandle {
            provider: ProviderKind::Codex,
            session_id,
            metadata: config.extra,
        };
        self.register(config.agent_id.clone(), child, stdin, persistence.clone(), event_tx);

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
        let mut child = self
            .spawn_process(&config.cwd, "on-request", "default", Some(&config.persistence.session_id))
            .map_err(|e| ProviderError::ResumeFailed(e.to_string()))?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| ProviderError::ResumeFailed("codex stdin unavailable".to_string()))?;

        self.register(config.agent_id.clone(), child, stdin, config.persistence.clone(), event_tx);

        Ok(ProviderHandle {
            agent_id: config.agent_id,
            persistence: config.persistence,
        })
    }

    async fn send(&self, agent_id: &AgentId, text: &str, images: &[String]) -> Result<(), ProviderError> {
        let mut items = vec![serde_json::json!({"type": "text", "text": text})];
        for image in images {
            items.push(serde_json::json!({"type": "image", "image_url": image}));
        }
        let submission = serde_json::json!({
            "id": UuidIdGen.next(),
            "op": {"type": "user_input", "items": items},
        });
        write_line(&self.stdin_handle(agent_id)?, &submission).await
    }

    async fn respond_permission(
        &self,
        agent_id: &AgentId,
        request_id: &PermissionRequestId,
        resolution: &PermissionResolution,
    ) -> Result<(), ProviderError> {
        let raw_id = request_id
            .as_str()
            .strip_prefix("codex:")
            .ok_or(ProviderError::Unsupported("request_id not owned by codex adapter"))?;
        let decision = match resolution.behavior {
            paseo_core::PermissionBehavior::Allow => "approved",
            paseo_core::PermissionBehavior::Deny => "denied",
        };
        let submission = serde_json::json!({
            "id": UuidIdGen.next(),
            "op": {"type": "exec_approval", "id": raw_id, "decision": decision},
        });
        write_line(&self.stdin_handle(agent_id)?, &submission).await
    }

    async fn cancel(&self, agent_id: &AgentId) -> Result<(), ProviderError> {
        let submission = serde_json::json!({"id": UuidIdGen.next(), "op": {"type": "interrupt"}});
        write_line(&self.stdin_handle(agent_id)?, &submission).await
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

async fn write_line(
    stdin: &Arc<AsyncMutex<ChildStdin>>,
    value: &serde_json::Value,
) -> Result<(), ProviderError> {
    let line = format!("{value}\n");
    stdin.lock().await.write_all(line.as_bytes()).await.map_err(ProviderError::Io)?;
    Ok(())
}

/// Spawn the stdout-reading task for a freshly-launched `codex proto` child.
/// Returns a shutdown sender; firing it stops the reader and drops the child.
fn spawn_reader(agent_id: AgentId, mut child: Child, event_tx: mpsc::Sender<ProviderEvent>) -> oneshot::Sender<()> {
    let (shutdown_tx, mut shutdown_rx) = oneshot::channel();
    let stdout = child.stdout.take();
    tokio::spawn(async move {
        let Some(stdout) = stdout else {
            let _ = event_tx.send(ProviderEvent::Exited { exit_code: None }).await;
            return;
        };
        let mut lines = BufReader::new(stdout).lines();
        let mut pending_tools: HashMap<String, (CallId, String)> = HashMap::new();

        loop {
            tokio::select! {
                line = lines.next_line() => {
                    match line {
                        Ok(Some(line)) => {
                            if let Ok(json) = serde_json::from_str::<serde_json::Value>(&line) {
                                for event in translate(&agent_id, &json, &mut pending_tools) {
                                    if event_tx.send(event).await.is_err() {
                                        return;
                                    }
                                }
                            }
                        }
                        Ok(None) => {
                            let status = child.wait().await.ok().and_then(|s| s.code());
                            tracing::info!(%agent_id, exit_code = ?status, "provider process exited");
                            let _ = event_tx.send(ProviderEvent::Exited { exit_code: status }).await;
                            return;
                        }
                        Err(err) => {
                            tracing::warn!(%agent_id, %err, "codex stdout read failed");
                            return;
                        }
                    }
                }
                _ = &mut shutdown_rx => {
                    tracing::debug!(%agent_id, "provider reader shutdown requested");
                    let _ = child.start_kill();
                    return;
                }
            }
        }
    });
    shutdown_tx
}

/// Translate one `Event` JSON line from `codex proto`'s event queue into
/// canonical provider events. Mirrors `EventMsg`'s `#[serde(tag = "type")]`
/// vocabulary (task_started/task_complete/agent_message/exec_command_*/...).
fn translate(
    agent_id: &AgentId,
    json: &serde_json::Value,
    pending_tools: &mut HashMap<String, (CallId, String)>,
) -> Vec<ProviderEvent> {
    let mut events = Vec::new();
    let Some(msg) = json.get("msg") else {
        return events;
    };
    let msg_type = msg.get("type").and_then(|v| v.as_str()).unwrap_or("");

    match msg_type {
        "agent_message" => {
            if let Some(text) = msg.get("message").and_then(|v| v.as_str()) {
                events.push(ProviderEvent::Item(paseo_core::TimelineItem::AssistantMessage {
                    text: text.to_string(),
                }));
            }
        }
        "agent_reasoning" => {
            if let Some(text) = msg.get("text").and_then(|v| v.as_str()) {
                events.push(ProviderEvent::Item(paseo_core::TimelineItem::Reasoning {
                    text: text.to_string(),
                    status: paseo_core::ReasoningStatus::Loading,
                }));
            }
        }
        "task_complete" | "turn_complete" => {
            events.push(ProviderEvent::TurnComplete);
        }
        "error" => {
            if let Some(message) = msg.get("message").and_then(|v| v.as_str()) {
                events.push(ProviderEvent::Item(paseo_core::TimelineItem::Error {
                    message: message.to_string(),
                }));
            }
        }
        "exec_command_begin" => {
            let call_id = CallId::new(UuidIdGen.next());
            let raw_id = msg.get("call_id").and_then(|v| v.as_str()).unwrap_or("").to_string();
            let command = msg
                .get("command")
                .and_then(|v| v.as_array())
                .map(|parts| {
                    parts
                        .iter()
                        .filter_map(|p| p.as_str())
                        .collect::<Vec<_>>()
                        .join(" ")
                })
                .unwrap_or_default();
            pending_tools.insert(raw_id, (call_id.clone(), "exec_command".to_string()));
            events.push(ProviderEvent::Item(paseo_core::TimelineItem::ToolCall {
                call_id,
                name: "exec_command".to_string(),
                status: ToolCallStatus::Running,
                detail: ToolDetail::Shell { command },
                error: None,
            }));
        }
        "exec_command_end" => {
            let raw_id = msg.get("call_id").and_then(|v| v.as_str()).unwrap_or("");
            let Some((call_id, name)) = pending_tools.remove(raw_id) else {
                return events;
            };
            let exit_code = msg.get("exit_code").and_then(|v| v.as_i64()).unwrap_or(-1);
            let output = msg.get("aggregated_output").and_then(|v| v.as_str()).map(String::from);
            let (status, error) = if exit_code == 0 {
                (ToolCallStatus::Completed, None)
            } else {
                (ToolCallStatus::Failed, Some(format!("exit code {exit_code}")))
            };
            events.push(ProviderEvent::Item(paseo_core::TimelineItem::ToolCall {
                call_id,
                name,
                status,
                detail: ToolDetail::Unknown {
                    raw_input: serde_json::Value::Null,
                    raw_output: output.map(serde_json::Value::String),
                },
                error,
            }));
        }
        "patch_apply_begin" => {
            let call_id = CallId::new(UuidIdGen.next());
            let raw_id = msg.get("call_id").and_then(|v| v.as_str()).unwrap_or("").to_string();
            pending_tools.insert(raw_id, (call_id.clone(), "apply_patch".to_string()));
            events.push(ProviderEvent::Item(paseo_core::TimelineItem::ToolCall {
                call_id,
                name: "apply_patch".to_string(),
                status: ToolCallStatus::Running,
                detail: ToolDetail::Edit {
                    file_path: msg.get("path").and_then(|v| v.as_str()).unwrap_or("").to_string(),
                },
                error: None,
            }));
        }
        "patch_apply_end" => {
            let raw_id = msg.get("call_id").and_then(|v| v.as_str()).unwrap_or("");
            let Some((call_id, name)) = pending_tools.remove(raw_id) else {
                return events;
            };
            let success = msg.get("success").and_then(|v| v.as_bool()).unwrap_or(false);
            let (status, error) = if success {
                (ToolCallStatus::Completed, None)
            } else {
                (ToolCallStatus::Failed, Some("patch application failed".to_string()))
            };
            events.push(ProviderEvent::Item(paseo_core::TimelineItem::ToolCall {
                call_id,
                name,
                status,
                detail: ToolDetail::Unknown {
                    raw_input: serde_json::Value::Null,
                    raw_output: None,
                },
                error,
            }));
        }
        "exec_approval_request" | "apply_patch_approval_request" => {
            let Some(raw_request_id) = json.get("id").and_then(|v| v.as_str()) else {
                return events;
            };
            let kind = if msg_type == "exec_approval_request" {
                PermissionKind::Bash
            } else {
                PermissionKind::Tool
            };
            let name = if msg_type == "exec_approval_request" {
                "exec_command"
            } else {
                "apply_patch"
            };
            events.push(ProviderEvent::PermissionRequested(PermissionRequest {
                id: PermissionRequestId::new(format!("codex:{raw_request_id}")),
                agent_id: agent_id.clone(),
                kind,
                name: name.to_string(),
                payload: msg.clone(),
                created_at: std::time::SystemTime::now(),
            }));
        }
        _ => {}
    }

    events
}

#[cfg(test)]
#[path = "codex_tests.rs"]
mod tests;
