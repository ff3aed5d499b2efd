// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! State reconciliation after daemon restart.
//!
//! Providers are plain child processes (SPEC_FULL.md §13): nothing survives
//! a daemon restart the way a tmux session would. Reconciliation can't
//! resurrect a running turn, so it settles for two things: reopening each
//! agent's timeline so its history is readable again, and moving any agent
//! the daemon crashed mid-turn on into a visible error state. Resuming the
//! agent afterward is a deliberate client-driven `resumeAgent` call.

use std::sync::Arc;

use parking_lot::Mutex;
use paseo_core::{AgentId, Clock, IdGen, LifecycleState};
use paseo_storage::MaterializedState;
use tracing::{info, warn};

use paseo_engine::{AgentManager, ProviderResolver};

/// Reopen every agent's timeline at its existing epoch and mark any agent
/// caught mid-turn as errored. Returns the number of agents reconciled.
pub(crate) async fn reconcile_agents<R: ProviderResolver, G: IdGen, C: Clock>(
    manager: &AgentManager<R, G, C>,
    state: &Arc<Mutex<MaterializedState>>,
) -> usize {
    let agent_ids: Vec<String> = {
        let state = state.lock();
        state.agents.keys().cloned().collect()
    };

    let mut interrupted = 0;
    for id in &agent_ids {
        let agent_id = AgentId::new(id.clone());
        if let Err(err) = manager.timeline().open_agent(&agent_id, 0) {
            warn!(agent = %id, error = %err, "failed to reopen timeline on restart");
            continue;
        }

        let mut state = state.lock();
        if let Some(record) = state.agents.get_mut(id) {
            if matches!(
                record.state,
                LifecycleState::Running | LifecycleState::Permission { .. }
            ) {
                interrupted += 1;
                record.state = LifecycleState::Error {
                    message: "daemon restarted".to_string(),
                };
            }
        }
    }

    if interrupted > 0 {
        info!(
            interrupted,
            total = agent_ids.len(),
            "marked mid-turn agents as errored after daemon restart"
        );
    } else {
        info!(total = agent_ids.len(), "reopened agent timelines on restart");
    }

    agent_ids.len()
}
