// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle management: startup, shutdown, recovery.

mod reconcile;
pub(crate) use reconcile::reconcile_agents;

use std::fs::File;
use std::sync::Arc;
use std::time::Instant;

use fs2::FileExt;
use parking_lot::Mutex;
use paseo_adapters::{ClaudeProviderAdapter, CodexProviderAdapter};
use paseo_core::{SystemClock, UuidIdGen};
use paseo_engine::{AgentManager, ProviderRegistry};
use paseo_storage::{load_snapshot, Checkpointer, MaterializedState};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{info, warn};

pub use crate::config::{Config, ConfigError};
use paseo_engine::AttentionEvent;

/// The daemon's agent manager, instantiated with the two concrete providers
/// this daemon ships and the production ID generator/clock.
pub type DaemonManager = AgentManager<ProviderRegistry, UuidIdGen, SystemClock>;

/// Daemon state during operation.
pub struct DaemonState {
    /// Configuration.
    pub config: Config,
    // NOTE(lifetime): Held to maintain exclusive file lock; released on drop
    #[allow(dead_code)]
    lock_file: File,
    /// Materialized state (shared with the manager and the session bridge).
    pub state: Arc<Mutex<MaterializedState>>,
    /// Owns every agent's provider run loop and timeline.
    pub manager: DaemonManager,
    /// Monotonic counter handed to the checkpointer; has no bearing on WAL
    /// truncation since each agent's timeline WAL is self-contained and
    /// truncates independently (unlike the single global event log this
    /// counter used to gate).
    next_checkpoint_seq: u64,
    /// When the daemon started.
    pub start_time: Instant,
}

/// Result of daemon startup.
pub struct StartupResult {
    /// The daemon state for ongoing operation.
    pub daemon: DaemonState,
    /// Attention events (finished/error/permission) for the notification
    /// dispatcher to consume.
    pub attention_rx: mpsc::Receiver<AttentionEvent>,
}

impl DaemonState {
    /// Checkpoint the current state synchronously and bump the generation
    /// counter. Used on shutdown, where we want the snapshot durable before
    /// the process exits rather than racing a background thread.
    fn checkpoint_sync(&mut self) {
        self.next_checkpoint_seq += 1;
        let state_clone = self.state.lock().clone();
        let checkpointer = Checkpointer::new(self.config.snapshot_path.clone());
        match checkpointer.checkpoint_sync(self.next_checkpoint_seq, &state_clone) {
            Ok(result) => info!(
                seq = result.seq,
                size_bytes = result.size_bytes,
                "saved snapshot"
            ),
            Err(e) => warn!("failed to save snapshot: {}", e),
        }
    }

    /// Shut down the daemon gracefully.
    ///
    /// Unlike tmux sessions, provider child processes are not expected to
    /// outlive the daemon, so there is nothing here to leave running across
    /// a restart the way the teacher leaves tmux sessions. A final snapshot
    /// is saved so the next startup's reconciliation has fresh state to
    /// reopen timelines from.
    pub fn shutdown(&mut self) -> Result<(), LifecycleError> {
        info!("shutting down daemon...");

        self.checkpoint_sync();

        if self.config.lock_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.config.lock_path) {
                warn!("failed to remove lock file: {}", e);
            }
        }
        if self.config.version_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.config.version_path) {
                warn!("failed to remove version file: {}", e);
            }
        }

        // Lock file is released automatically when self.lock_file is dropped.

        info!("daemon shutdown complete");
        Ok(())
    }
}

/// Lifecycle errors.
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("could not resolve configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to acquire lock: daemon already running?")]
    LockFailed(#[source] std::io::Error),

    #[error("snapshot error: {0}")]
    Snapshot(#[from] paseo_storage::SnapshotError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Start the daemon.
pub async fn startup(config: &Config) -> Result<StartupResult, LifecycleError> {
    match startup_inner(config).await {
        Ok(result) => Ok(result),
        Err(e) => {
            // Don't clean up if we failed to acquire the lock — those files
            // belong to the already-running daemon.
            if !matches!(e, LifecycleError::LockFailed(_)) {
                cleanup_on_failure(config);
            }
            Err(e)
        }
    }
}

/// Inner startup logic; `cleanup_on_failure` runs if this fails.
async fn startup_inner(config: &Config) -> Result<StartupResult, LifecycleError> {
    // 1. Create the home directory tree.
    std::fs::create_dir_all(&config.home)?;
    std::fs::create_dir_all(&config.agents_dir)?;

    // 2. Acquire the lock file first — prevents races with a second daemon
    // sharing this PASEO_HOME. Avoid truncating before the lock is held,
    // which would wipe the running daemon's PID.
    let lock_file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(&config.lock_path)?;
    lock_file
        .try_lock_exclusive()
        .map_err(LifecycleError::LockFailed)?;

    use std::io::Write;
    let mut lock_file = lock_file;
    lock_file.set_len(0)?;
    writeln!(lock_file, "{}", std::process::id())?;
    let lock_file = lock_file;

    // 3. Write the version marker clients use to detect a stale daemon.
    std::fs::write(&config.version_path, env!("CARGO_PKG_VERSION"))?;

    // 4. Load state from the last snapshot, if any.
    let state = match load_snapshot(&config.snapshot_path)? {
        Some(snapshot) => {
            info!(
                seq = snapshot.seq,
                agents = snapshot.state.agents.len(),
                "loaded snapshot"
            );
            snapshot.state
        }
        None => {
            info!("no snapshot found, starting with empty state");
            MaterializedState::default()
        }
    };
    let state = Arc::new(Mutex::new(state));

    // 5. Wire the agent manager over both providers.
    let registry = ProviderRegistry::new(ClaudeProviderAdapter::new(), CodexProviderAdapter::new());
    let (manager, attention_rx) = AgentManager::new(
        registry,
        UuidIdGen,
        SystemClock,
        config.home.clone(),
        Arc::clone(&state),
        config.snapshot_path.clone(),
    );

    // 6. Reconcile persisted agents against the fact that no provider
    // process survives a restart.
    let reconciled = reconcile_agents(&manager, &state).await;
    info!(reconciled, "reconciliation complete");

    info!("daemon started");

    Ok(StartupResult {
        daemon: DaemonState {
            config: config.clone(),
            lock_file,
            state,
            manager,
            next_checkpoint_seq: 0,
            start_time: Instant::now(),
        },
        attention_rx,
    })
}

/// Clean up resources on startup failure.
fn cleanup_on_failure(config: &Config) {
    if config.version_path.exists() {
        let _ = std::fs::remove_file(&config.version_path);
    }
    if config.lock_path.exists() {
        let _ = std::fs::remove_file(&config.lock_path);
    }
}

#[cfg(test)]
#[path = "../lifecycle_tests/mod.rs"]
mod tests;
