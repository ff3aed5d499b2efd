// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire-facing error codes and the core crate's own error type.
//!
//! Internal errors in each crate stay scoped to that crate (see DESIGN.md);
//! `ErrorCode` is the small, serializable surface every internal error maps
//! onto at the session-bridge boundary before it reaches a client.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Stable, client-visible error codes. See SPEC_FULL.md §7.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    BadRequest,
    UnknownMessageType,
    BadCursor,
    WrongState,
    AgentNotFound,
    PermissionNotFound,
    AgentArchived,
    BadMode,
    Unsupported,
    ProviderUnavailable,
    BadCwd,
    Timeout,
    QueueFull,
    CorruptTimeline,
    PersistenceUnavailable,
    Internal,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::BadRequest => "bad_request",
            ErrorCode::UnknownMessageType => "unknown_message_type",
            ErrorCode::BadCursor => "bad_cursor",
            ErrorCode::WrongState => "wrong_state",
            ErrorCode::AgentNotFound => "agent_not_found",
            ErrorCode::PermissionNotFound => "permission_not_found",
            ErrorCode::AgentArchived => "agent_archived",
            ErrorCode::BadMode => "bad_mode",
            ErrorCode::Unsupported => "unsupported",
            ErrorCode::ProviderUnavailable => "provider_unavailable",
            ErrorCode::BadCwd => "bad_cwd",
            ErrorCode::Timeout => "timeout",
            ErrorCode::QueueFull => "queue_full",
            ErrorCode::CorruptTimeline => "corrupt_timeline",
            ErrorCode::PersistenceUnavailable => "persistence_unavailable",
            ErrorCode::Internal => "internal",
        }
    }
}

/// Errors raised directly by `paseo-core` (id/validation helpers).
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid mode {mode_id:?}: not in available_modes")]
    InvalidMode { mode_id: String },
    #[error("agent {0} is archived")]
    Archived(crate::AgentId),
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
