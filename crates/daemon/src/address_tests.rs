// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tokio::net::UnixStream;

#[tokio::test]
async fn bind_path_listens_and_needs_cleanup() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("endpoint.sock");
    let endpoint = Endpoint::bind_path(&path).unwrap();

    UnixStream::connect(&path).await.unwrap();

    let (_, cleanup) = endpoint.into_parts();
    assert_eq!(cleanup, Some(path));
}

#[cfg(target_os = "linux")]
#[tokio::test]
async fn abstract_endpoints_leave_nothing_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let endpoint = Endpoint::bind_in(dir.path(), "retest-test").unwrap();

    let (_, cleanup) = endpoint.into_parts();
    assert_eq!(cleanup, None);
    assert!(std::fs::read_dir(dir.path()).unwrap().next().is_none());
}

#[cfg(target_os = "linux")]
#[test]
fn endpoints_in_different_directories_do_not_collide() {
    let first = tempfile::tempdir().unwrap();
    let second = tempfile::tempdir().unwrap();
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();
    let _guard = runtime.enter();
    let _a = Endpoint::bind_in(first.path(), "retest-test").unwrap();
    let _b = Endpoint::bind_in(second.path(), "retest-test").unwrap();
}
