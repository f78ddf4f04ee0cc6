// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Syncer construction workflow tests.

use booksync_core::{SyncError, Syncer, WindowEnd};
use jiff::civil::date;

use crate::common::{Harness, test_config};

#[tokio::test]
async fn new_creates_state_dir_and_store() {
    // Arrange
    let temp = tempfile::tempdir().unwrap();
    let state_dir = temp.path().join("state");
    let mut config = test_config();
    config.state_dir = Some(state_dir.clone());

    // Act
    let syncer = Syncer::new(config).await.unwrap();

    // Assert
    assert!(state_dir.is_dir());
    assert!(state_dir.join("booksync.db").exists());
    syncer.close().await;
}

#[tokio::test]
async fn new_rejects_empty_prefix() {
    // Arrange
    let temp = tempfile::tempdir().unwrap();
    let mut config = test_config();
    config.state_dir = Some(temp.path().to_path_buf());
    config.sync.uid_prefix = String::new();

    // Act
    let result = Syncer::new(config).await;

    // Assert
    assert!(matches!(result, Err(SyncError::Config(_))));
}

#[tokio::test]
async fn unknown_time_zone_is_rejected() {
    // Arrange
    let temp = tempfile::tempdir().unwrap();
    let mut config = test_config();
    config.state_dir = Some(temp.path().to_path_buf());
    config.source.time_zone = Some("Mars/Olympus_Mons".to_string());

    // Act
    let result = Syncer::new(config).await;

    // Assert
    assert!(result.is_err());
}

#[tokio::test]
async fn default_end_adds_window_days() {
    // Arrange
    let h = Harness::new().await;

    // Act
    let end = h.syncer.default_end(date(2024, 1, 8));

    // Assert
    assert_eq!(end, WindowEnd::Until(date(2024, 1, 15)));
    assert_eq!(WindowEnd::Unbounded.to_string(), "max");
}
