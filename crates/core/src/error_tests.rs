// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn error_code_as_str_is_snake_case() {
    assert_eq!(ErrorCode::AgentNotFound.as_str(), "agent_not_found");
    assert_eq!(ErrorCode::WrongState.as_str(), "wrong_state");
}

#[test]
fn error_code_serializes_snake_case() {
    let json = serde_json::to_string(&ErrorCode::BadCursor).unwrap();
    assert_eq!(json, "\"bad_cursor\"");
}

#[test]
fn core_error_messages() {
    let err = CoreError::InvalidMode {
        mode_id: "ghost".to_string(),
    };
    assert!(err.to_string().contains("ghost"));
}
