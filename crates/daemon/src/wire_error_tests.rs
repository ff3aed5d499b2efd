// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use paseo_adapters::ProviderError;
use paseo_core::AgentId;
use paseo_engine::TimelineError;

#[test]
fn not_found_maps_to_agent_not_found() {
    let (code, _) = manager_error(&ManagerError::NotFound(AgentId::new("a1")));
    assert_eq!(code, ErrorCode::AgentNotFound);
}

#[test]
fn still_running_maps_to_wrong_state() {
    let (code, _) = manager_error(&ManagerError::StillRunning(AgentId::new("a1")));
    assert_eq!(code, ErrorCode::WrongState);
}

#[test]
fn nested_provider_error_unwraps_through() {
    let err = ManagerError::Provider(ProviderError::Unavailable("claude".to_string()));
    let (code, message) = manager_error(&err);
    assert_eq!(code, ErrorCode::ProviderUnavailable);
    assert!(message.contains("claude"));
}

#[test]
fn nested_timeline_error_unwraps_through() {
    let err = ManagerError::Timeline(TimelineError::CorruptTimeline(AgentId::new("a1")));
    let (code, _) = manager_error(&err);
    assert_eq!(code, ErrorCode::CorruptTimeline);
}

#[test]
fn checkpoint_panic_maps_to_internal() {
    let (code, _) = manager_error(&ManagerError::CheckpointPanicked);
    assert_eq!(code, ErrorCode::Internal);
}
