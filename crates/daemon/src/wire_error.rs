// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Maps internal crate errors onto the small, stable [`ErrorCode`] wire
//! surface (SPEC_FULL.md §7) at the session-bridge boundary. Internal error
//! types are never serialized directly to a client.

use paseo_adapters::ProviderError;
use paseo_core::ErrorCode;
use paseo_engine::{ManagerError, TimelineError};

/// Translate a manager-level error into the `(code, message)` a client sees.
pub fn manager_error(err: &ManagerError) -> (ErrorCode, String) {
    let message = err.to_string();
    let code = match err {
        ManagerError::NotFound(_) => ErrorCode::AgentNotFound,
        ManagerError::BadCwd(_) => ErrorCode::BadCwd,
        ManagerError::BadMode(_) => ErrorCode::BadMode,
        ManagerError::WrongState(_) => ErrorCode::WrongState,
        ManagerError::Unsupported(_) => ErrorCode::Unsupported,
        ManagerError::NoPendingPermission(_) => ErrorCode::PermissionNotFound,
        ManagerError::PermissionMismatch { .. } => ErrorCode::PermissionNotFound,
        ManagerError::StillRunning(_) => ErrorCode::WrongState,
        ManagerError::Provider(e) => return provider_error(e),
        ManagerError::Timeline(e) => return timeline_error(e),
        ManagerError::Checkpoint(_) => ErrorCode::PersistenceUnavailable,
        ManagerError::CheckpointPanicked => ErrorCode::Internal,
    };
    (code, message)
}

fn provider_error(err: &ProviderError) -> (ErrorCode, String) {
    let message = err.to_string();
    let code = match err {
        ProviderError::Unavailable(_) => ErrorCode::ProviderUnavailable,
        ProviderError::BadCwd(_) => ErrorCode::BadCwd,
        ProviderError::NotFound(_) => ErrorCode::AgentNotFound,
        ProviderError::BadMode(_) => ErrorCode::BadMode,
        ProviderError::ResumeFailed(_) => ErrorCode::ProviderUnavailable,
        ProviderError::Unsupported(_) => ErrorCode::Unsupported,
        ProviderError::Io(_) | ProviderError::Json(_) => ErrorCode::Internal,
    };
    (code, message)
}

/// Translate a timeline-engine error directly, for callers (`fetch_agent_timeline`)
/// that hold a [`TimelineError`] without a wrapping [`ManagerError`].
pub fn timeline_error(err: &TimelineError) -> (ErrorCode, String) {
    let message = err.to_string();
    let code = match err {
        TimelineError::Closed(_) => ErrorCode::AgentArchived,
        TimelineError::NotOpen(_) => ErrorCode::AgentNotFound,
        TimelineError::Storage(_) => ErrorCode::Internal,
        TimelineError::CorruptTimeline(_) => ErrorCode::CorruptTimeline,
    };
    (code, message)
}

#[cfg(test)]
#[path = "wire_error_tests.rs"]
mod tests;
