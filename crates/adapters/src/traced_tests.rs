// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::provider::{FakeProviderAdapter, ProviderCall, ProviderSpawnConfig};
use paseo_core::AgentId;
use serial_test::{parallel, serial};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tracing_subscriber::fmt::MakeWriter;

/// A writer that captures log output for testing
#[derive(Clone, Default)]
struct CapturedLogs {
    logs: Arc<Mutex<Vec<u8>>>,
}

impl CapturedLogs {
    fn new() -> Self {
        Self::default()
    }

    fn contents(&self) -> String {
        let logs = self.logs.lock().unwrap();
        String::from_utf8_lossy(&logs).to_string()
    }
}

impl std::io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.logs.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = CapturedLogs;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Run a test with captured tracing output
fn with_tracing<F, Fut>(f: F) -> (String, Fut::Output)
where
    F: FnOnce() -> Fut,
    Fut: std::future::Future,
{
    let logs = CapturedLogs::new();
    let logs_clone = logs.clone();

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_writer(logs_clone)
        .with_ansi(false)
        .without_time()
        .finish();

    let result = tracing::subscriber::with_default(subscriber, || {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap()
            .block_on(f())
    });

    (logs.contents(), result)
}

/// Assert that captured logs contain the expected substring
fn assert_log(logs: &str, label: &str, expected: &str) {
    assert!(logs.contains(expected), "Should log {label}. Logs:\n{logs}",);
}

fn test_spawn_config() -> ProviderSpawnConfig {
    ProviderSpawnConfig {
        agent_id: AgentId::new("test-agent-1"),
        cwd: PathBuf::from("/tmp"),
        mode_id: "default".to_string(),
        model: "default".to_string(),
        extra: serde_json::Value::Null,
    }
}

/// Spawn a traced provider, returning the fake adapter, traced wrapper, and agent id
async fn spawn_traced_provider() -> (FakeProviderAdapter, TracedProvider<FakeProviderAdapter>, AgentId) {
    let fake = FakeProviderAdapter::new();
    let traced = TracedProvider::new(fake.clone());
    let (tx, _rx) = mpsc::channel(10);
    traced.spawn(test_spawn_config(), tx).await.unwrap();
    (fake, traced, AgentId::new("test-agent-1"))
}

#[test]
#[serial(tracing)]
fn traced_provider_spawn_logs_entry_and_completion() {
    let (logs, result) = with_tracing(|| async {
        let fake = FakeProviderAdapter::new();
        let traced = TracedProvider::new(fake);
        let (tx, _rx) = mpsc::channel(10);
        traced.spawn(test_spawn_config(), tx).await
    });

    assert!(result.is_ok(), "spawn should succeed: {:?}", result);
    assert_log(&logs, "span name", "provider.spawn");
    assert_log(&logs, "agent_id", "test-agent-1");
    assert_log(&logs, "entry message", "starting");
    assert_log(&logs, "completion", "provider spawned");
    assert_log(&logs, "timing", "elapsed_ms");
}

#[test]
#[serial(tracing)]
fn traced_provider_send_logs_operation() {
    let (logs, _) = with_tracing(|| async {
        let (_, traced, agent_id) = spawn_traced_provider().await;
        traced.send(&agent_id, "hello", &[]).await
    });

    assert_log(&logs, "send span", "provider.send");
    assert_log(&logs, "send entry", "sending");
}

#[test]
#[serial(tracing)]
fn traced_provider_kill_logs_operation() {
    let (logs, _) = with_tracing(|| async {
        let (_, traced, agent_id) = spawn_traced_provider().await;
        traced.kill(&agent_id).await
    });

    assert_log(&logs, "kill span", "provider.kill");
    assert_log(&logs, "kill completion", "killed");
}

#[test]
#[serial(tracing)]
fn traced_provider_send_logs_error_on_failure() {
    let (logs, result) = with_tracing(|| async {
        let fake = FakeProviderAdapter::new();
        let traced = TracedProvider::new(fake);
        traced.send(&AgentId::new("nonexistent"), "hello", &[]).await
    });

    assert!(result.is_err());
    assert_log(&logs, "send failure", "send failed");
}

#[test]
#[serial(tracing)]
fn traced_provider_cancel_logs_warning_on_failure() {
    let (logs, result) = with_tracing(|| async {
        let fake = FakeProviderAdapter::new();
        let traced = TracedProvider::new(fake);
        traced.cancel(&AgentId::new("nonexistent")).await
    });

    assert!(result.is_err());
    assert_log(&logs, "cancel failure", "cancel failed");
}

#[tokio::test]
#[parallel(tracing)]
async fn traced_provider_delegates_spawn_to_inner() {
    let fake = FakeProviderAdapter::new();
    let traced = TracedProvider::new(fake.clone());
    let (tx, _rx) = mpsc::channel(10);

    let handle = traced.spawn(test_spawn_config(), tx).await.unwrap();
    assert_eq!(handle.agent_id, AgentId::new("test-agent-1"));

    let calls = fake.calls();
    assert_eq!(calls.len(), 1);
    match &calls[0] {
        ProviderCall::Spawn { agent_id, mode_id, .. } => {
            assert_eq!(agent_id, &AgentId::new("test-agent-1"));
            assert_eq!(mode_id, "default");
        }
        other => panic!("Expected Spawn call, got {:?}", other),
    }
}

#[tokio::test]
#[parallel(tracing)]
async fn traced_provider_delegates_kill_to_inner() {
    let (fake, traced, agent_id) = spawn_traced_provider().await;
    fake.clear_calls();

    traced.kill(&agent_id).await.unwrap();

    let calls = fake.calls();
    assert_eq!(calls.len(), 1);
    match &calls[0] {
        ProviderCall::Kill { agent_id } => {
            assert_eq!(agent_id, &AgentId::new("test-agent-1"));
        }
        other => panic!("Expected Kill call, got {:?}", other),
    }
}

#[tokio::test]
#[parallel(tracing)]
async fn traced_provider_manifest_delegates_to_inner() {
    let fake = FakeProviderAdapter::new();
    let traced = TracedProvider::new(fake);
    let manifest = traced.manifest();
    assert!(manifest.capabilities.streaming);
}
