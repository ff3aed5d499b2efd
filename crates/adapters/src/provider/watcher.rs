// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Background task that tails a provider's JSONL session log and reports the
//! subprocess's liveness.
//!
//! Adapted from the teacher's `agent/watcher.rs`. The teacher watched a
//! tmux-spawned session's log file and polled tmux for pane liveness; here
//! there is no pane, so liveness comes directly from the owned
//! `tokio::process::Child` and the log path is known up front (Claude writes
//! it under `~/.claude/projects/<project>/<session-id>.jsonl`; Codex's
//! watcher resolves the equivalent rollout path, see `codex.rs`).

use std::path::{Path, PathBuf};

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use paseo_core::AgentId;
use tokio::process::Child;
use tokio::sync::{mpsc, oneshot};

use super::log_entry::LogParser;
use super::ProviderEvent;

/// Fallback poll interval when the filesystem watcher can't be installed,
/// and the cadence for checking subprocess liveness regardless.
fn poll_interval() -> std::time::Duration {
    crate::env::watcher_poll_ms()
}

/// Start watching a provider's session log and process liveness. Returns a
/// shutdown sender; dropping or firing it stops the watcher.
pub(crate) fn start(
    agent_id: AgentId,
    log_path: PathBuf,
    mut child: Child,
    event_tx: mpsc::Sender<ProviderEvent>,
) -> oneshot::Sender<()> {
    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    tokio::spawn(async move {
        watch(agent_id, log_path, &mut child, event_tx, shutdown_rx).await;
    });
    shutdown_tx
}

async fn watch(
    agent_id: AgentId,
    log_path: PathBuf,
    child: &mut Child,
    event_tx: mpsc::Sender<ProviderEvent>,
    mut shutdown_rx: oneshot::Receiver<()>,
) {
    let mut parser = LogParser::new(agent_id.clone());
    let (file_tx, mut file_rx) = mpsc::channel(32);
    let _watcher_guard = create_file_watcher(&log_path, file_tx).ok();

    loop {
        tokio::select! {
            _ = file_rx.recv() => {
                for event in parser.parse_new(&log_path) {
                    if event_tx.send(event).await.is_err() {
                        return;
                    }
                }
            }

            status = child.wait() => {
                // Drain anything written just before exit.
                for event in parser.parse_new(&log_path) {
                    let _ = event_tx.send(event).await;
                }
                let exit_code = status.ok().and_then(|s| s.code());
                tracing::info!(%agent_id, ?exit_code, "provider process exited");
                let _ = event_tx.send(ProviderEvent::Exited { exit_code }).await;
                return;
            }

            _ = tokio::time::sleep(poll_interval()) => {
                for event in parser.parse_new(&log_path) {
                    if event_tx.send(event).await.is_err() {
                        return;
                    }
                }
            }

            _ = &mut shutdown_rx => {
                tracing::debug!(%agent_id, "provider watcher shutdown requested");
                return;
            }
        }
    }
}

fn create_file_watcher(
    path: &Path,
    tx: mpsc::Sender<()>,
) -> Result<RecommendedWatcher, notify::Error> {
    let mut watcher = notify::recommended_watcher(move |res: Result<notify::Event, _>| {
        if res.is_ok() {
            let _ = tx.blocking_send(());
        }
    })?;
    // The log file may not exist yet at watcher install time (provider
    // hasn't written its first line); fall back to polling until it does.
    if path.exists() {
        watcher.watch(path, RecursiveMode::NonRecursive)?;
    } else if let Some(parent) = path.parent() {
        watcher.watch(parent, RecursiveMode::NonRecursive)?;
    }
    Ok(watcher)
}

#[cfg(test)]
#[path = "watcher_tests.rs"]
mod tests;
