// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Materialized daemon state: the durable slice of the world rebuilt by
//! replaying each agent's timeline WAL plus the top-level `pairings.json`.
//!
//! Narrowed from the teacher's `MaterializedState` (which also tracked
//! jobs/workspaces/workers/queues/crons/decisions) down to what Paseo
//! actually persists: agent records and paired-host trust entries. See
//! DESIGN.md for the drop rationale.

use paseo_core::{AgentId, AgentRecord, LifecycleState, PairedHost, TimelineItem};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Materialized state built from replaying agent timelines and `pairings.json`.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct MaterializedState {
    pub agents: HashMap<String, AgentRecord>,
    #[serde(default)]
    pub pairings: Vec<PairedHost>,
}

impl MaterializedState {
    /// Get an agent by ID or unique prefix (like git commit hashes).
    pub fn get_agent(&self, id: &str) -> Option<&AgentRecord> {
        if let Some(agent) = self.agents.get(id) {
            return Some(agent);
        }
        let matches: Vec<_> = self
            .agents
            .iter()
            .filter(|(k, _)| k.starts_with(id))
            .collect();
        if matches.len() == 1 {
            Some(matches[0].1)
        } else {
            None
        }
    }

    pub fn insert_agent(&mut self, record: AgentRecord) {
        self.agents.insert(record.id.as_str().to_string(), record);
    }

    pub fn remove_agent(&mut self, id: &AgentId) {
        self.agents.remove(id.as_str());
    }

    /// Apply one timeline item to the owning agent's durable projection.
    ///
    /// This mirrors only what SPEC_FULL.md §4.2 requires to survive a
    /// restart (last-activity timestamp, lifecycle bookkeeping for
    /// `permission_resolved`); the full lifecycle state machine lives in
    /// the engine's agent manager, which is the single writer of
    /// `AgentRecord.state`.
    ///
    /// # Idempotency
    ///
    /// Applying the same item twice must produce the same state as
    /// applying it once — replay after a crash re-applies from the last
    /// snapshot's sequence number forward.
    pub fn apply_item(&mut self, agent_id: &AgentId, item: &TimelineItem, at: std::time::SystemTime) {
        let Some(record) = self.agents.get_mut(agent_id.as_str()) else {
            return;
        };
        record.last_activity_at = at;
        if let TimelineItem::ModeUpdate { mode_id } = item {
            record.mode_id = mode_id.clone();
        }
        if let TimelineItem::Error { message } = item {
            record.state = LifecycleState::Error {
                message: message.clone(),
            };
        }
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
