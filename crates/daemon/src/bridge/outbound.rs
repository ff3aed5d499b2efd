// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-session outbound message queue (SPEC_FULL.md §4.3).
//!
//! A slow client must never be allowed to backpressure the agent manager's
//! run loops the way a blocking `mpsc::Sender::send` would. Instead each
//! session owns a bounded queue that drops its oldest *non-essential* entry
//! once it passes a high-water mark, rather than dropping the newest message
//! or blocking the writer. Responses and `welcome`/`pong`/`status`/
//! `attention_required` are essential and are never evicted; `agent_updates`
//! and `agent_stream` entries are droppable, since a subsequent subscription
//! message supersedes anything already in flight for the same subscription.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::protocol::ServerMessage;

/// Queue entries beyond this count start evicting droppable messages.
const HIGH_WATER_MARK: usize = 256;

fn is_droppable(message: &ServerMessage) -> bool {
    matches!(
        message,
        ServerMessage::AgentUpdates { .. } | ServerMessage::AgentStream { .. }
    )
}

#[derive(Default)]
struct Inner {
    queue: VecDeque<ServerMessage>,
    dropped: u64,
    closed: bool,
}

/// A bounded, drop-oldest-non-essential outbound queue shared between the
/// dispatch loop (producer) and the transport write task (consumer).
pub struct OutboundQueue {
    inner: Mutex<Inner>,
    notify: Notify,
}

impl OutboundQueue {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: Mutex::new(Inner::default()),
            notify: Notify::new(),
        })
    }

    /// Enqueue a message, evicting the oldest droppable entry first if the
    /// queue is over its high-water mark. Never blocks.
    pub fn push(&self, message: ServerMessage) {
        let mut inner = self.inner.lock();
        if inner.closed {
            return;
        }
        if inner.queue.len() >= HIGH_WATER_MARK {
            if let Some(pos) = inner.queue.iter().position(is_droppable) {
                inner.queue.remove(pos);
                inner.dropped += 1;
            }
        }
        inner.queue.push_back(message);
        drop(inner);
        self.notify.notify_one();
    }

    /// Wait for and remove the next message, or `None` once the queue is
    /// closed and drained.
    pub async fn recv(&self) -> Option<ServerMessage> {
        loop {
            {
                let mut inner = self.inner.lock();
                if let Some(message) = inner.queue.pop_front() {
                    return Some(message);
                }
                if inner.closed {
                    return None;
                }
            }
            self.notify.notified().await;
        }
    }

    /// Non-blocking pop, for callers (tests) that don't want to await.
    pub fn recv_now(&self) -> Option<ServerMessage> {
        self.inner.lock().queue.pop_front()
    }

    /// Stop accepting new messages and wake any waiting reader so it can
    /// observe closure once the queue drains.
    pub fn close(&self) {
        self.inner.lock().closed = true;
        self.notify.notify_one();
    }

    /// Total droppable messages evicted over this queue's lifetime, for
    /// diagnostics.
    pub fn dropped_count(&self) -> u64 {
        self.inner.lock().dropped
    }
}

#[cfg(test)]
#[path = "outbound_tests.rs"]
mod tests;
