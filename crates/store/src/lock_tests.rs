// SPDX-License-Identifier: MIT

use super::*;

#[tokio::test]
async fn acquire_creates_and_release_removes_the_lockfile() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("history.lock");
    let lock = SessionLock::new(path.clone(), "runs");
    let guard = lock.acquire().await.unwrap();
    assert!(path.exists());
    drop(guard);
    assert!(!path.exists());
}

#[tokio::test]
async fn second_acquire_waits_for_release() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("history.lock");
    let lock = SessionLock::new(path.clone(), "runs")
        .with_grace_and_timeout(Duration::from_secs(60), Duration::from_secs(2));
    let guard = lock.acquire().await.unwrap();

    let path_clone = path.clone();
    let release = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        drop(guard);
        path_clone
    });

    let second = lock.acquire().await.unwrap();
    release.await.unwrap();
    drop(second);
    assert!(!path.exists());
}

#[tokio::test]
async fn acquire_times_out_against_a_held_fresh_lock() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("history.lock");
    let lock = SessionLock::new(path.clone(), "runs")
        .with_grace_and_timeout(Duration::from_secs(60), Duration::from_millis(100));
    let _guard = lock.acquire().await.unwrap();

    let err = lock.acquire().await.unwrap_err();
    assert!(matches!(err, StoreError::LockTimeout { .. }));
}

#[tokio::test]
async fn acquire_reclaims_a_stale_lockfile() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("history.lock");
    std::fs::write(&path, "99999\n").unwrap();
    let old = std::time::SystemTime::now() - Duration::from_secs(120);
    filetime_touch(&path, old);

    let lock = SessionLock::new(path.clone(), "runs")
        .with_grace_and_timeout(Duration::from_secs(1), Duration::from_secs(2));
    let guard = lock.acquire().await.unwrap();
    assert!(path.exists());
    drop(guard);
}

fn filetime_touch(path: &std::path::Path, time: std::time::SystemTime) {
    let file = std::fs::OpenOptions::new().write(true).open(path).unwrap();
    file.set_modified(time).unwrap();
}
