// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn parses_a_well_formed_announcement() {
    let public_key = vec![1u8, 2, 3, 4];
    let text = serde_json::json!({ "daemon_public_key": STANDARD.encode(&public_key) }).to_string();
    assert_eq!(parse_peer_public_key(&text), Some(public_key));
}

#[test]
fn rejects_malformed_json() {
    assert_eq!(parse_peer_public_key("not json"), None);
}

#[test]
fn rejects_missing_field() {
    let text = serde_json::json!({ "signature": "xyz" }).to_string();
    assert_eq!(parse_peer_public_key(&text), None);
}

#[test]
fn rejects_non_base64_value() {
    let text = serde_json::json!({ "daemon_public_key": "not base64!!" }).to_string();
    assert_eq!(parse_peer_public_key(&text), None);
}
