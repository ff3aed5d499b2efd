// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The projected timeline view: a pure function collapsing a window of
//! canonical entries into the display-oriented shape SPEC_FULL.md §4.1
//! describes. Grounded in the teacher's activity-logger idea of deriving a
//! display view from an append-only log (`activity_logger.rs`), rebuilt here
//! as a stateless transform over a slice rather than a second on-disk log.
//!
//! Rules (applied in canonical order, single left-to-right pass):
//! 1. Consecutive `assistant_message`s merge into one; a `reasoning` run may
//!    sit between them without breaking the merge.
//! 2. Consecutive `reasoning` items merge; the merged entry is `Loading`
//!    until a non-reasoning item follows, at which point it becomes `Ready`.
//! 3. A `tool_call` is shown once, at its terminal status, in the position
//!    of its first (`Running`) occurrence.
//! 4. A `user_message` identical in text to the immediately preceding
//!    (projected) `user_message` is suppressed.

use std::collections::HashMap;

use paseo_core::{CallId, ReasoningStatus, TimelineEntry, TimelineItem};

/// Collapse a window of canonical entries into the projected view.
///
/// `entries` must already be in canonical (append) order. The result
/// preserves that order; it never reorders across non-mergeable boundaries.
pub fn project(entries: &[TimelineEntry]) -> Vec<TimelineEntry> {
    let mut out: Vec<TimelineEntry> = Vec::with_capacity(entries.len());
    let mut assistant_open: Option<usize> = None;
    let mut reasoning_open: Option<usize> = None;
    let mut tool_index: HashMap<CallId, usize> = HashMap::new();
    let mut last_user_text: Option<String> = None;

    for entry in entries {
        match &entry.item {
            TimelineItem::AssistantMessage { text } => {
                if let Some(idx) = assistant_open {
                    if let TimelineItem::AssistantMessage { text: merged } = &mut out[idx].item {
                        merged.push_str(text);
                    }
                    out[idx].cursor = entry.cursor;
                    out[idx].timestamp = entry.timestamp;
                } else {
                    out.push(entry.clone());
                    assistant_open = Some(out.len() - 1);
                }
                close_reasoning(&mut out, &mut reasoning_open);
            }
            TimelineItem::Reasoning { text, .. } => {
                if let Some(idx) = reasoning_open {
                    if let TimelineItem::Reasoning { text: merged, .. } = &mut out[idx].item {
                        merged.push_str(text);
                    }
                    out[idx].cursor = entry.cursor;
                    out[idx].timestamp = entry.timestamp;
                } else {
                    let mut loading = entry.clone();
                    if let TimelineItem::Reasoning { status, .. } = &mut loading.item {
                        *status = ReasoningStatus::Loading;
                    }
                    out.push(loading);
                    reasoning_open = Some(out.len() - 1);
                }
                // A reasoning item does not close an open assistant merge group;
                // it may sit between two assistant_message occurrences (rule 1).
            }
            TimelineItem::ToolCall { call_id, .. } => {
                assistant_open = None;
                close_reasoning(&mut out, &mut reasoning_open);
                if let Some(&idx) = tool_index.get(call_id) {
                    out[idx] = entry.clone();
                } else {
                    out.push(entry.clone());
                    tool_index.insert(call_id.clone(), out.len() - 1);
                }
            }
            TimelineItem::UserMessage { text, .. } => {
                assistant_open = None;
                close_reasoning(&mut out, &mut reasoning_open);
                let is_dupe = last_user_text.as_deref() == Some(text.as_str());
                last_user_text = Some(text.clone());
                if !is_dupe {
                    out.push(entry.clone());
                }
            }
            _ => {
                assistant_open = None;
                close_reasoning(&mut out, &mut reasoning_open);
                out.push(entry.clone());
            }
        }
    }

    out
}

fn close_reasoning(out: &mut [TimelineEntry], reasoning_open: &mut Option<usize>) {
    if let Some(idx) = reasoning_open.take() {
        if let TimelineItem::Reasoning { status, .. } = &mut out[idx].item {
            *status = ReasoningStatus::Ready;
        }
    }
}

#[cfg(test)]
#[path = "projection_tests.rs"]
mod tests;
