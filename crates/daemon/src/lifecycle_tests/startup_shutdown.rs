// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::test_config;
use crate::lifecycle::{startup, LifecycleError};
use fs2::FileExt;
use tempfile::tempdir;

#[tokio::test]
async fn startup_creates_home_tree_and_lock_and_version_files() {
    let dir = tempdir().unwrap();
    let config = test_config(dir.path());

    let result = startup(&config).await.unwrap();

    assert!(config.agents_dir.is_dir());
    assert!(config.lock_path.is_file());
    assert!(config.version_path.is_file());
    assert_eq!(result.daemon.state.lock().agents.len(), 0);
}

#[tokio::test]
async fn startup_lock_failed_does_not_remove_existing_files() {
    let dir = tempdir().unwrap();
    let config = test_config(dir.path());

    std::fs::write(&config.version_path, "stale-version").unwrap();
    let held = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .open(&config.lock_path)
        .unwrap();
    held.try_lock_exclusive().unwrap();

    let err = startup(&config).await.unwrap_err();

    assert!(matches!(err, LifecycleError::LockFailed(_)));
    assert_eq!(
        std::fs::read_to_string(&config.version_path).unwrap(),
        "stale-version"
    );
    drop(held);
}

#[tokio::test]
async fn lock_file_not_truncated_before_lock_acquired() {
    let dir = tempdir().unwrap();
    let config = test_config(dir.path());

    std::fs::write(&config.lock_path, "9999\n").unwrap();
    let held = std::fs::OpenOptions::new()
        .write(true)
        .open(&config.lock_path)
        .unwrap();
    held.try_lock_exclusive().unwrap();

    let err = startup(&config).await.unwrap_err();

    assert!(matches!(err, LifecycleError::LockFailed(_)));
    assert_eq!(
        std::fs::read_to_string(&config.lock_path).unwrap(),
        "9999\n"
    );
    drop(held);
}

#[tokio::test]
async fn cleanup_on_failure_removes_created_files() {
    let dir = tempdir().unwrap();
    let config = test_config(dir.path());
    std::fs::create_dir_all(&config.home).unwrap();
    // Not a valid zstd frame: load_snapshot will fail.
    std::fs::write(&config.snapshot_path, b"not a snapshot").unwrap();

    let err = startup(&config).await.unwrap_err();

    assert!(matches!(err, LifecycleError::Snapshot(_)));
    assert!(!config.lock_path.exists());
    assert!(!config.version_path.exists());
}

#[tokio::test]
async fn shutdown_saves_snapshot_and_removes_lock_and_version_files() {
    let dir = tempdir().unwrap();
    let config = test_config(dir.path());

    let mut result = startup(&config).await.unwrap();
    result.daemon.shutdown().unwrap();

    assert!(config.snapshot_path.exists());
    assert!(!config.lock_path.exists());
    assert!(!config.version_path.exists());
}
