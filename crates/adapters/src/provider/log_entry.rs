// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Translation from Claude's JSONL session log into canonical timeline items.
//!
//! Adapted from the teacher's `agent/log_entry.rs`, which extracted a
//! human-readable activity feed (`AgentLogEntry`/`EntryKind`) from the same
//! log shape. Here the same incremental-offset line parser instead produces
//! [`ProviderEvent`]s the agent manager folds directly into an agent's
//! timeline, since Paseo's canonical log *is* the provider's own JSONL
//! records reshaped, not a secondary activity feed.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Seek, SeekFrom};
use std::path::Path;

use paseo_core::{
    AgentId, CallId, IdGen, PermissionKind, PermissionRequest, ToolCallStatus, ToolDetail, UuidIdGen,
};

use super::ProviderEvent;

/// Extract a string value from a JSON object by key.
fn get_str<'a>(obj: &'a serde_json::Value, key: &str) -> Option<&'a str> {
    obj.get(key).and_then(|v| v.as_str())
}

/// Incremental parser over Claude's JSONL session log, tracking byte offset
/// and in-flight tool calls across repeated calls as the file grows.
pub struct LogParser {
    agent_id: AgentId,
    offset: u64,
    /// tool_use id -> (call_id, name) for completing terminal status on tool_result.
    pending_tools: HashMap<String, (CallId, String)>,
}

impl LogParser {
    pub fn new(agent_id: AgentId) -> Self {
        Self {
            agent_id,
            offset: 0,
            pending_tools: HashMap::new(),
        }
    }

    /// Parse whatever complete lines have been appended since the last call.
    pub fn parse_new(&mut self, path: &Path) -> Vec<ProviderEvent> {
        let Ok(file) = File::open(path) else {
            return Vec::new();
        };
        let mut reader = BufReader::new(file);
        if reader.seek(SeekFrom::Start(self.offset)).is_err() {
            return Vec::new();
        }

        let mut events = Vec::new();
        let mut line = String::new();
        loop {
            line.clear();
            match reader.read_line(&mut line) {
                Ok(0) => break,
                Ok(n) => {
                    if !line.ends_with('\n') {
                        // Incomplete tail line; don't advance, re-read next time.
                        break;
                    }
                    self.offset += n as u64;
                    let trimmed = line.trim();
                    if trimmed.is_empty() {
                        continue;
                    }
                    let Ok(json) = serde_json::from_str::<serde_json::Value>(trimmed) else {
                        continue;
                    };
                    self.extract(&json, &mut events);
                }
                Err(_) => break,
            }
        }
        events
    }

    fn extract(&mut self, json: &serde_json::Value, events: &mut Vec<ProviderEvent>) {
        let record_type = get_str(json, "type").unwrap_or("");

        if let Some(message) = extract_error(json) {
            events.push(ProviderEvent::Item(paseo_core::TimelineItem::Error { message }));
            return;
        }

        match record_type {
            "assistant" => self.extract_assistant(json, events),
            "user" => self.extract_tool_results(json, events),
            "control_request" => self.extract_control_request(json, events),
            _ => {}
        }
    }

    fn extract_assistant(&mut self, json: &serde_json::Value, events: &mut Vec<ProviderEvent>) {
        let Some(message) = json.get("message") else {
            return;
        };
        if let Some(content) = message.get("content").and_then(|c| c.as_array()) {
            for block in content {
                match get_str(block, "type") {
                    Some("text") => {
                        if let Some(text) = get_str(block, "text") {
                            if !text.is_empty() {
                                events.push(ProviderEvent::Item(
                                    paseo_core::TimelineItem::AssistantMessage {
                                        text: text.to_string(),
                                    },
                                ));
                            }
                        }
                    }
                    Some("thinking") => {
                        if let Some(text) = get_str(block, "thinking") {
                            events.push(ProviderEvent::Item(paseo_core::TimelineItem::Reasoning {
                                text: text.to_string(),
                                status: paseo_core::ReasoningStatus::Loading,
                            }));
                        }
                    }
                    Some("tool_use") => {
                        let Some(tool_use_id) = get_str(block, "id") else {
                            continue;
                        };
                        let Some(name) = get_str(block, "name") else {
                            continue;
                        };
                        let input = block.get("input").cloned().unwrap_or(serde_json::Value::Null);
                        let call_id = CallId::new(UuidIdGen.next());
                        self.pending_tools
                            .insert(tool_use_id.to_string(), (call_id.clone(), name.to_string()));
                        events.push(ProviderEvent::Item(paseo_core::TimelineItem::ToolCall {
                            call_id,
                            name: name.to_string(),
                            status: ToolCallStatus::Running,
                            detail: detail_for(name, &input, None),
                            error: None,
                        }));
                    }
                    _ => {}
                }
            }
        }

        if get_str(message, "stop_reason").unwrap_or("") == "end_turn" {
            events.push(ProviderEvent::TurnComplete);
        }
    }

    fn extract_tool_results(&mut self, json: &serde_json::Value, events: &mut Vec<ProviderEvent>) {
        let Some(content) = json
            .get("message")
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_array())
        else {
            return;
        };
        for block in content {
            if get_str(block, "type") != Some("tool_result") {
                continue;
            }
            let Some(tool_use_id) = get_str(block, "tool_use_id") else {
                continue;
            };
            let Some((call_id, name)) = self.pending_tools.remove(tool_use_id) else {
                continue;
            };
            let is_error = block.get("is_error").and_then(|v| v.as_bool()).unwrap_or(false);
            let output = block.get("content").cloned();
            let (status, error) = if is_error {
                let message = output
                    .as_ref()
                    .and_then(|v| v.as_str())
                    .map(str::to_string)
                    .unwrap_or_else(|| "tool call failed".to_string());
                (ToolCallStatus::Failed, Some(message))
            } else {
                (ToolCallStatus::Completed, None)
            };
            events.push(ProviderEvent::Item(paseo_core::TimelineItem::ToolCall {
                call_id,
                name: name.clone(),
                status,
                detail: ToolDetail::Unknown {
                    raw_input: serde_json::Value::Null,
                    raw_output: output,
                },
                error,
            }));
        }
    }

    fn extract_control_request(&self, json: &serde_json::Value, events: &mut Vec<ProviderEvent>) {
        let Some(request) = json.get("request") else {
            return;
        };
        if get_str(request, "subtype") != Some("can_use_tool") {
            return;
        }
        // The control-protocol request id is reused verbatim (namespaced) as
        // this PermissionRequestId, so `respond_permission` can recover it
        // without the adapter needing a separate correlation table.
        let Some(raw_request_id) = get_str(json, "request_id") else {
            return;
        };
        let name = get_str(request, "tool_name").unwrap_or("tool").to_string();
        let kind = if name.eq_ignore_ascii_case("bash") {
            PermissionKind::Bash
        } else {
            PermissionKind::Tool
        };
        let payload = request.get("input").cloned().unwrap_or(serde_json::Value::Null);
        events.push(ProviderEvent::PermissionRequested(PermissionRequest {
            id: paseo_core::PermissionRequestId::new(format!("claude:{raw_request_id}")),
            agent_id: self.agent_id.clone(),
            kind,
            name,
            payload,
            created_at: std::time::SystemTime::now(),
        }));
    }
}

/// Map a Claude tool name to its structured [`ToolDetail`].
fn detail_for(name: &str, input: &serde_json::Value, output: Option<serde_json::Value>) -> ToolDetail {
    match name {
        "Bash" => ToolDetail::Shell {
            command: get_str(input, "command").unwrap_or("").to_string(),
        },
        "Read" => ToolDetail::Read {
            file_path: get_str(input, "file_path").unwrap_or("").to_string(),
        },
        "Edit" | "NotebookEdit" => ToolDetail::Edit {
            file_path: get_str(input, "file_path")
                .or_else(|| get_str(input, "notebook_path"))
                .unwrap_or("")
                .to_string(),
        },
        "Write" => ToolDetail::Write {
            file_path: get_str(input, "file_path").unwrap_or("").to_string(),
        },
        "Grep" | "Glob" => ToolDetail::Search {
            query: get_str(input, "pattern").unwrap_or("").to_string(),
        },
        "Task" => ToolDetail::SubAgent {
            sub_agent_type: get_str(input, "subagent_type").unwrap_or("").to_string(),
            description: get_str(input, "description").unwrap_or("").to_string(),
            actions: Vec::new(),
        },
        _ => ToolDetail::Unknown {
            raw_input: input.clone(),
            raw_output: output,
        },
    }
}

/// Extract a top-level error message from a JSONL record, if present.
fn extract_error(json: &serde_json::Value) -> Option<String> {
    get_str(json, "error")
        .or_else(|| json.get("message").and_then(|m| get_str(m, "error")))
        .map(String::from)
}

#[cfg(test)]
#[path = "log_entry_tests.rs"]
mod tests;
