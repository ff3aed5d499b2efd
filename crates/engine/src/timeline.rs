// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The canonical timeline engine (SPEC_FULL.md §4.1): one append-only log per
//! agent, served as either the canonical stream or the [`projection`]'d view.
//!
//! Grounded in the teacher's `storage::Wal` group-commit append/read idiom
//! (kept structurally whole in `paseo-storage`) plus the single-writer-per-key
//! locking shape visible in `runtime/mod.rs`'s per-agent state maps: one
//! `Mutex`-guarded slot per agent, never a single lock over every agent.
//!
//! Reads are served from an in-memory ring buffer of the most recent entries
//! per agent rather than re-scanning the WAL file, so `fetchTail`/`subscribe`
//! never touch disk on the hot path; the WAL itself remains the durable
//! record appends are flushed to before `append()` returns.

use std::collections::{HashMap, VecDeque};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use paseo_core::{
    AgentId, Clock, Cursor, Epoch, Projection, Seq, TimelineEntry, TimelineItem, TimelinePage,
};
use paseo_storage::{Wal, WalError};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::warn;

use crate::projection::project;

/// How many of the most recent canonical entries are kept in memory per
/// agent. Bounds `fetchTail`/`subscribe` cost; entries older than this are
/// still durable on disk but can only be reached via a fresh `reset`.
const RETAIN_LIMIT: usize = 2000;

/// Bound on a single agent's live-subscriber fan-out channel. A slow
/// subscriber that falls this far behind is disconnected rather than
/// allowed to backpressure the append path.
const SUBSCRIBER_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Error)]
pub enum TimelineError {
    #[error("agent timeline for {0} is closed")]
    Closed(AgentId),
    #[error("agent timeline for {0} is not open")]
    NotOpen(AgentId),
    #[error("storage error: {0}")]
    Storage(#[from] WalError),
    #[error("corrupt timeline segment for agent {0}, refusing to open")]
    CorruptTimeline(AgentId),
}

/// An event pushed to a live `subscribe` stream.
#[derive(Debug, Clone)]
pub enum TimelineEvent {
    /// A newly appended entry, already in the subscription's chosen shape.
    Append(TimelineEntry),
    /// The subscriber's cursor was stale (or this is the initial message);
    /// replay from this snapshot, then resume on subsequent `Append`s.
    Reset(TimelinePage),
}

struct AgentTimeline {
    epoch: Epoch,
    wal: Wal,
    /// Most recent canonical entries, oldest first. `front().seq` is the
    /// earliest seq servable without a `gap`.
    retained: VecDeque<TimelineEntry>,
    /// True once retained has ever evicted an entry (more was appended to
    /// this epoch than RETAIN_LIMIT holds).
    evicted_any: bool,
    subscribers: Vec<mpsc::Sender<TimelineEvent>>,
    closed: bool,
}

impl AgentTimeline {
    fn earliest_retained_seq(&self) -> Seq {
        self.retained.front().map(|e| e.cursor.seq).unwrap_or(0)
    }

    fn push_retained(&mut self, entry: TimelineEntry) {
        self.retained.push_back(entry);
        if self.retained.len() > RETAIN_LIMIT {
            self.retained.pop_front();
            self.evicted_any = true;
        }
    }
}

/// Owns every agent's timeline. Cheap to clone: the lock table is behind an
/// `Arc`, matching the teacher's `Arc<Mutex<MaterializedState>>` sharing
/// idiom so the engine can be held by multiple tasks (run loops, the session
/// bridge) without a second layer of reference counting.
#[derive(Clone)]
pub struct TimelineEngine<C: Clock> {
    root: PathBuf,
    clock: C,
    agents: Arc<Mutex<HashMap<AgentId, AgentTimeline>>>,
}

impl<C: Clock> TimelineEngine<C> {
    pub fn new(root: impl Into<PathBuf>, clock: C) -> Self {
        Self {
            root: root.into(),
            clock,
            agents: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn segment_path(&self, agent_id: &AgentId, epoch: Epoch) -> PathBuf {
        self.root
            .join("agents")
            .join(agent_id.as_str())
            .join("timeline")
            .join(format!("{epoch}.log"))
    }

    /// Open an agent's timeline at a given epoch, seeding the in-memory tail
    /// from disk. Used both for a brand-new agent (epoch 0) and for daemon
    /// restart (epoch = the last epoch recorded in the agent's persisted
    /// record).
    ///
    /// Fails closed on a corrupt segment (SPEC_FULL.md §4.1): unlike `Wal`'s
    /// own crash-recovery path (which repairs the *active* write tail by
    /// rotating a truncated trailing write to `.bak`), this performs a
    /// read-only corruption scan first and refuses to open at all if it
    /// finds a malformed entry anywhere before the end of file. A segment
    /// this engine opens is never auto-truncated out from under a caller.
    pub fn open_agent(&self, agent_id: &AgentId, epoch: Epoch) -> Result<(), TimelineError> {
        let path = self.segment_path(agent_id, epoch);
        if path.exists() {
            check_not_corrupt(&path).map_err(|_| TimelineError::CorruptTimeline(agent_id.clone()))?;
        }

        let wal = Wal::open(&path, 0)?;
        let seed_from = wal.write_seq().saturating_sub(RETAIN_LIMIT as u64);
        let tail = wal.entries_after(seed_from)?;
        let mut retained = VecDeque::with_capacity(tail.len());
        for e in tail {
            retained.push_back(TimelineEntry {
                cursor: Cursor::new(epoch, e.seq),
                timestamp: e.at,
                item: e.item,
            });
        }

        let mut agents = self.agents.lock();
        agents.insert(
            agent_id.clone(),
            AgentTimeline {
                epoch,
                wal,
                evicted_any: seed_from > 0,
                retained,
                subscribers: Vec::new(),
                closed: false,
            },
        );
        Ok(())
    }

    /// Append a single timeline item. Single-writer: callers must ensure
    /// only the owning agent run loop calls this for a given `agent_id`.
    pub fn append(&self, agent_id: &AgentId, item: TimelineItem) -> Result<Cursor, TimelineError> {
        let now = self.clock.now();
        let mut agents = self.agents.lock();
        let agent = agents
            .get_mut(agent_id)
            .ok_or_else(|| TimelineError::NotOpen(agent_id.clone()))?;
        if agent.closed {
            return Err(TimelineError::Closed(agent_id.clone()));
        }

        let seq = agent.wal.append(&item, now)?;
        agent.wal.flush()?;
        let cursor = Cursor::new(agent.epoch, seq);
        let entry = TimelineEntry {
            cursor,
            timestamp: now,
            item,
        };
        agent.push_retained(entry.clone());

        // Fan out without blocking the writer on a slow reader: a full
        // channel just drops this event for that subscriber, but a closed
        // channel means the subscriber is gone and is pruned here.
        agent.subscribers.retain(|tx| {
            !matches!(
                tx.try_send(TimelineEvent::Append(entry.clone())),
                Err(mpsc::error::TrySendError::Closed(_))
            )
        });

        Ok(cursor)
    }

    /// Serve up to `limit` of the most recent entries, in the requested
    /// projection. See SPEC_FULL.md §4.1 for the cursor-staleness rules.
    pub fn fetch_tail(
        &self,
        agent_id: &AgentId,
        limit: usize,
        projection: Projection,
        cursor: Option<Cursor>,
    ) -> Result<TimelinePage, TimelineError> {
        let agents = self.agents.lock();
        let agent = agents
            .get(agent_id)
            .ok_or_else(|| TimelineError::NotOpen(agent_id.clone()))?;

        let (reset, stale_cursor, gap) = match cursor {
            Some(c) if c.is_stale_for(agent.epoch) => (true, true, false),
            Some(c) if c.seq < agent.earliest_retained_seq() => (false, false, true),
            _ => (false, false, false),
        };

        let canonical: Vec<TimelineEntry> = agent.retained.iter().cloned().collect();
        let shaped = match projection {
            Projection::Canonical => canonical,
            Projection::Projected => project(&canonical),
        };

        let start = shaped.len().saturating_sub(limit);
        let window = &shaped[start..];

        Ok(TimelinePage {
            agent_id: agent_id.clone(),
            entries: window.to_vec(),
            start_cursor: window.first().map(|e| e.cursor),
            end_cursor: window.last().map(|e| e.cursor),
            has_older: start > 0 || agent.evicted_any,
            has_newer: false,
            epoch: agent.epoch,
            reset,
            stale_cursor,
            gap,
        })
    }

    /// Subscribe to live appends. If `from_cursor` is stale (wrong epoch or
    /// below the retained window), the first message is a `Reset` snapshot
    /// of the current tail; otherwise the subscriber only receives
    /// subsequent `Append`s (no replay of entries between the cursor and
    /// now is promised beyond what `fetchTail` already returned).
    pub fn subscribe(
        &self,
        agent_id: &AgentId,
        from_cursor: Option<Cursor>,
    ) -> Result<mpsc::Receiver<TimelineEvent>, TimelineError> {
        let (tx, rx) = mpsc::channel(SUBSCRIBER_CHANNEL_CAPACITY);
        let mut agents = self.agents.lock();
        let agent = agents
            .get_mut(agent_id)
            .ok_or_else(|| TimelineError::NotOpen(agent_id.clone()))?;
        if agent.closed {
            return Err(TimelineError::Closed(agent_id.clone()));
        }

        let needs_reset = match from_cursor {
            Some(c) => c.is_stale_for(agent.epoch) || c.seq < agent.earliest_retained_seq(),
            None => true,
        };
        if needs_reset {
            let canonical: Vec<TimelineEntry> = agent.retained.iter().cloned().collect();
            let page = TimelinePage {
                agent_id: agent_id.clone(),
                entries: canonical.clone(),
                start_cursor: canonical.first().map(|e| e.cursor),
                end_cursor: canonical.last().map(|e| e.cursor),
                has_older: agent.evicted_any,
                has_newer: false,
                epoch: agent.epoch,
                reset: true,
                stale_cursor: from_cursor.is_some(),
                gap: false,
            };
            let _ = tx.try_send(TimelineEvent::Reset(page));
        }

        agent.subscribers.push(tx);
        Ok(rx)
    }

    /// Begin a new epoch for an agent (daemon restart recovery, or provider
    /// re-init after a crash). Canonical ordering never regresses: the new
    /// epoch starts a fresh segment file rather than rewriting the old one,
    /// and any cursor from the old epoch is permanently stale.
    pub fn rotate(&self, agent_id: &AgentId) -> Result<Epoch, TimelineError> {
        let new_epoch = {
            let agents = self.agents.lock();
            let agent = agents
                .get(agent_id)
                .ok_or_else(|| TimelineError::NotOpen(agent_id.clone()))?;
            agent.epoch + 1
        };
        self.open_agent(agent_id, new_epoch)?;
        Ok(new_epoch)
    }

    /// Mark an agent's timeline closed. Further `append`s fail with
    /// `Closed`; existing subscribers are left to observe channel closure.
    pub fn close(&self, agent_id: &AgentId) {
        let mut agents = self.agents.lock();
        if let Some(agent) = agents.get_mut(agent_id) {
            agent.closed = true;
            agent.subscribers.clear();
        }
    }
}

/// Read-only scan for a malformed line anywhere in `path`, without mutating
/// it. Mirrors the parsing `Wal::open` itself performs internally, kept
/// deliberately separate so the timeline engine can fail closed *before*
/// `Wal::open` would otherwise repair the file.
fn check_not_corrupt(path: &Path) -> Result<(), ()> {
    let file = File::open(path).map_err(|_| ())?;
    let reader = BufReader::new(file);
    for line in reader.lines() {
        let line = line.map_err(|_| ())?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if serde_json::from_str::<serde_json::Value>(trimmed).is_err() {
            warn!(path = %path.display(), "corrupt timeline entry detected on open");
            return Err(());
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "timeline_tests.rs"]
mod tests;
