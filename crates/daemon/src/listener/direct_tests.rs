// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn headers_with_host(host: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(axum::http::header::HOST, host.parse().unwrap());
    headers
}

#[test]
fn allows_a_host_in_the_allowlist() {
    let allowed = vec!["localhost".to_string(), "127.0.0.1".to_string()];
    assert!(host_is_allowed(&headers_with_host("localhost"), &allowed));
}

#[test]
fn allows_a_host_with_a_port_suffix() {
    let allowed = vec!["127.0.0.1".to_string()];
    assert!(host_is_allowed(&headers_with_host("127.0.0.1:4317"), &allowed));
}

#[test]
fn rejects_a_host_outside_the_allowlist() {
    let allowed = vec!["localhost".to_string()];
    assert!(!host_is_allowed(&headers_with_host("evil.example"), &allowed));
}

#[test]
fn rejects_a_missing_host_header() {
    let allowed = vec!["localhost".to_string()];
    assert!(!host_is_allowed(&HeaderMap::new(), &allowed));
}
