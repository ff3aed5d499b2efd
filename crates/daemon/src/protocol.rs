// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire protocol: the JSON message catalog exchanged over a WebSocket
//! connection (SPEC_FULL.md §6). Every message carries a top-level
//! `type: string` tag; requests carry `requestId`, echoed on the response.
//!
//! WebSocket frames are already message-delimited, so unlike the Unix-socket
//! protocol this replaces, there is no length-prefix framing layer here —
//! a frame's text payload is the JSON message, full stop.

use std::collections::HashMap;

use paseo_core::{
    AgentId, AgentRecord, Cursor, DeviceType, ErrorCode, PermissionRequestId, PermissionResolution,
    PersistenceHandle, Projection, ProviderKind, SubscriptionId, TimelineEntry, TimelinePage,
};
use serde::{Deserialize, Serialize};

/// Messages a client sends to the daemon.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    CreateAgentRequest {
        request_id: String,
        provider: ProviderKind,
        cwd: String,
        mode_id: String,
        model: String,
        #[serde(default)]
        extra: serde_json::Value,
        #[serde(default)]
        title: Option<String>,
        #[serde(default)]
        labels: HashMap<String, String>,
    },
    ResumeAgentRequest {
        request_id: String,
        provider: ProviderKind,
        cwd: String,
        persistence: PersistenceHandle,
        #[serde(default)]
        title: Option<String>,
        #[serde(default)]
        labels: HashMap<String, String>,
    },
    ArchiveAgentRequest {
        request_id: String,
        agent_id: AgentId,
        #[serde(default)]
        force: bool,
    },
    SetModeRequest {
        request_id: String,
        agent_id: AgentId,
        mode_id: String,
    },
    SetModelRequest {
        request_id: String,
        agent_id: AgentId,
        model: String,
    },
    SendMessageRequest {
        request_id: String,
        agent_id: AgentId,
        text: String,
        #[serde(default)]
        images: Option<Vec<String>>,
    },
    RespondPermissionRequest {
        request_id: String,
        agent_id: AgentId,
        permission_request_id: PermissionRequestId,
        resolution: PermissionResolution,
    },
    CancelRequest {
        request_id: String,
        agent_id: AgentId,
    },
    FetchAgentTimelineRequest {
        request_id: String,
        agent_id: AgentId,
        direction: FetchDirection,
        #[serde(default)]
        cursor: Option<Cursor>,
        limit: usize,
        projection: Projection,
    },
    SubscribeAgentUpdates {
        request_id: String,
        subscription_id: SubscriptionId,
    },
    UnsubscribeAgentUpdates {
        request_id: String,
        subscription_id: SubscriptionId,
    },
    SubscribeAgentStream {
        request_id: String,
        subscription_id: SubscriptionId,
        agent_id: AgentId,
        #[serde(default)]
        cursor: Option<Cursor>,
    },
    UnsubscribeAgentStream {
        request_id: String,
        subscription_id: SubscriptionId,
    },
    SubscribeCheckoutDiff {
        request_id: String,
        subscription_id: SubscriptionId,
        cwd: String,
    },
    UnsubscribeCheckoutDiff {
        request_id: String,
        subscription_id: SubscriptionId,
    },
    Heartbeat {
        #[serde(default)]
        focused_agent_id: Option<AgentId>,
        last_activity_at: std::time::SystemTime,
        app_visible: bool,
        device_type: DeviceType,
    },
    Ping,
}

/// Direction of a `fetch_agent_timeline_request`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchDirection {
    Tail,
    Before,
    After,
}

/// Outcome envelope shared by every request/response pair: `{status:"ok", ...payload}`
/// or `{status:"error", code, message, details?}` (SPEC_FULL.md §7).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome<T> {
    Ok(T),
    Error {
        code: ErrorCode,
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        details: Option<serde_json::Value>,
    },
}

impl<T> Outcome<T> {
    pub fn ok(payload: T) -> Self {
        Outcome::Ok(payload)
    }

    pub fn err(code: ErrorCode, message: impl Into<String>) -> Self {
        Outcome::Error {
            code,
            message: message.into(),
            details: None,
        }
    }
}

/// Snapshot payload returned by every operation that hands back an agent's
/// current record (`create`, `resume` — `archive` returns just the
/// timestamp instead, see [`ArchiveAgentPayload`]).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSnapshotPayload {
    #[serde(flatten)]
    pub record: AgentRecord,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveAgentPayload {
    pub archived_at: std::time::SystemTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmptyPayload {}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchAgentTimelinePayload {
    #[serde(flatten)]
    pub page: TimelinePage,
}

/// An event delivered on an `agent_stream` subscription.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AgentStreamEvent {
    Append { entry: TimelineEntry },
    Reset { page: TimelinePage },
}

/// Reason an agent needs attention, paired with whether this particular
/// client should be notified (SPEC_FULL.md §4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttentionReasonWire {
    Finished,
    Error,
    Permission,
}

/// Messages the daemon sends to a client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Welcome {
        server_id: String,
        hostname: String,
        version: String,
        resumed: bool,
    },
    CreateAgentResponse {
        request_id: String,
        #[serde(flatten)]
        outcome: Outcome<AgentSnapshotPayload>,
    },
    ResumeAgentResponse {
        request_id: String,
        #[serde(flatten)]
        outcome: Outcome<AgentSnapshotPayload>,
    },
    ArchiveAgentResponse {
        request_id: String,
        #[serde(flatten)]
        outcome: Outcome<ArchiveAgentPayload>,
    },
    SetModeResponse {
        request_id: String,
        #[serde(flatten)]
        outcome: Outcome<EmptyPayload>,
    },
    SetModelResponse {
        request_id: String,
        #[serde(flatten)]
        outcome: Outcome<EmptyPayload>,
    },
    SendMessageResponse {
        request_id: String,
        #[serde(flatten)]
        outcome: Outcome<EmptyPayload>,
    },
    RespondPermissionResponse {
        request_id: String,
        #[serde(flatten)]
        outcome: Outcome<EmptyPayload>,
    },
    CancelResponse {
        request_id: String,
        #[serde(flatten)]
        outcome: Outcome<EmptyPayload>,
    },
    FetchAgentTimelineResponse {
        request_id: String,
        #[serde(flatten)]
        outcome: Outcome<FetchAgentTimelinePayload>,
    },
    SubscribeAgentUpdatesResponse {
        request_id: String,
        #[serde(flatten)]
        outcome: Outcome<EmptyPayload>,
    },
    UnsubscribeAgentUpdatesResponse {
        request_id: String,
        #[serde(flatten)]
        outcome: Outcome<EmptyPayload>,
    },
    SubscribeAgentStreamResponse {
        request_id: String,
        #[serde(flatten)]
        outcome: Outcome<EmptyPayload>,
    },
    UnsubscribeAgentStreamResponse {
        request_id: String,
        #[serde(flatten)]
        outcome: Outcome<EmptyPayload>,
    },
    SubscribeCheckoutDiffResponse {
        request_id: String,
        #[serde(flatten)]
        outcome: Outcome<EmptyPayload>,
    },
    UnsubscribeCheckoutDiffResponse {
        request_id: String,
        #[serde(flatten)]
        outcome: Outcome<EmptyPayload>,
    },
    AgentUpdates {
        subscription_id: SubscriptionId,
        agents: Vec<AgentRecord>,
    },
    AgentStream {
        subscription_id: SubscriptionId,
        agent_id: AgentId,
        event: AgentStreamEvent,
    },
    AttentionRequired {
        agent_id: AgentId,
        reason: AttentionReasonWire,
        should_notify: bool,
    },
    Pong,
    Status {
        status: StatusLevel,
        #[serde(skip_serializing_if = "Option::is_none")]
        code: Option<ErrorCode>,
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusLevel {
    Ok,
    Error,
}

impl ServerMessage {
    /// A transport-level error not tied to any particular request, e.g. an
    /// unparsable frame or an unrecognized `type`. The session stays open.
    pub fn error_status(code: ErrorCode, message: impl Into<String>) -> Self {
        ServerMessage::Status {
            status: StatusLevel::Error,
            code: Some(code),
            message: Some(message.into()),
        }
    }
}

/// Parse an inbound WebSocket text frame into a [`ClientMessage`].
pub fn decode_client_message(text: &str) -> Result<ClientMessage, ProtocolError> {
    serde_json::from_str(text).map_err(|source| {
        let request_id = serde_json::from_str::<serde_json::Value>(text)
            .ok()
            .and_then(|v| v.get("request_id").and_then(|r| r.as_str().map(str::to_string)));
        ProtocolError::Malformed { request_id, source }
    })
}

/// Serialize an outbound [`ServerMessage`] to a WebSocket text frame.
pub fn encode_server_message(message: &ServerMessage) -> Result<String, ProtocolError> {
    serde_json::to_string(message).map_err(ProtocolError::Encode)
}

/// The `requestId` carried by a malformed frame, if the frame was at least
/// valid enough JSON to contain one. Lets the bridge still correlate the
/// error response it sends back (SPEC_FULL.md §4.3: unknown message types
/// elicit an error without closing the session).
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("malformed client message: {source}")]
    Malformed {
        request_id: Option<String>,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to encode server message: {0}")]
    Encode(#[source] serde_json::Error),
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
