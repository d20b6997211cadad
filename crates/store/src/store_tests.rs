// SPDX-License-Identifier: MIT

use super::*;
use voratiq_core::{RunId, RunRecord};

fn temp_root() -> (tempfile::TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().to_path_buf();
    (dir, root)
}

fn run_record(id: &str) -> RunRecord {
    RunRecord::new(
        RunId::from_string(id),
        "deadbeef",
        "specs/foo.md",
        vec![voratiq_core::AgentInvocation::queued(
            voratiq_core::AgentInvocationId::from_string("agt-1-aaaaaaaa"),
            "claude",
            "anthropic",
            "claude-sonnet",
        )],
        0,
    )
    .unwrap()
}

#[tokio::test]
async fn append_writes_record_and_index() {
    let (_dir, root) = temp_root();
    let store = Store::<RunRecord>::new(root.clone(), Domain::Runs);
    store.append(run_record("run-1-aaaaaaaa")).await.unwrap();

    let record_path = Domain::Runs.record_path(&root, "run-1-aaaaaaaa");
    assert!(record_path.exists());
    let index_path = Domain::Runs.index_path(&root);
    let index: SessionIndex = serde_json::from_slice(&tokio::fs::read(&index_path).await.unwrap()).unwrap();
    assert!(index.contains("run-1-aaaaaaaa"));
}

#[tokio::test]
async fn append_fails_if_record_already_exists() {
    let (_dir, root) = temp_root();
    let store = Store::<RunRecord>::new(root, Domain::Runs);
    store.append(run_record("run-1-aaaaaaaa")).await.unwrap();
    let err = store.append(run_record("run-1-aaaaaaaa")).await.unwrap_err();
    assert!(matches!(err, StoreError::AlreadyExists { .. }));
}

#[tokio::test]
async fn snapshot_returns_buffered_copy_before_any_flush() {
    let (_dir, root) = temp_root();
    let store = Store::<RunRecord>::new(root, Domain::Runs);
    store.append(run_record("run-1-aaaaaaaa")).await.unwrap();
    store
        .rewrite("run-1-aaaaaaaa", |mut r| {
            r.status = voratiq_core::RunStatus::Running;
            r
        })
        .await
        .unwrap();
    let snapshot = store.snapshot("run-1-aaaaaaaa").await.unwrap().unwrap();
    assert_eq!(snapshot.status, voratiq_core::RunStatus::Running);
}

#[tokio::test]
async fn rewrite_to_terminal_status_force_flushes_and_disposes() {
    let (_dir, root) = temp_root();
    let store = Store::<RunRecord>::new(root.clone(), Domain::Runs);
    store.append(run_record("run-1-aaaaaaaa")).await.unwrap();
    store
        .rewrite("run-1-aaaaaaaa", |mut r| {
            r.agent_invocations[0].status = voratiq_core::AgentInvocationStatus::Succeeded;
            r.status = voratiq_core::RunStatus::Succeeded;
            r
        })
        .await
        .unwrap();

    let bytes = tokio::fs::read(Domain::Runs.record_path(&root, "run-1-aaaaaaaa"))
        .await
        .unwrap();
    let persisted: RunRecord = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(persisted.status, voratiq_core::RunStatus::Succeeded);

    let index: SessionIndex = serde_json::from_slice(
        &tokio::fs::read(Domain::Runs.index_path(&root)).await.unwrap(),
    )
    .unwrap();
    assert_eq!(index.sessions[0].status, "succeeded");
}

#[tokio::test]
async fn rewrite_to_non_terminal_status_schedules_a_coalesced_flush() {
    let (_dir, root) = temp_root();
    let store = Store::<RunRecord>::new(root.clone(), Domain::Runs);
    store.append(run_record("run-1-aaaaaaaa")).await.unwrap();
    store
        .rewrite("run-1-aaaaaaaa", |mut r| {
            r.status = voratiq_core::RunStatus::Running;
            r
        })
        .await
        .unwrap();

    // Immediately after rewrite, disk still holds the append-time value.
    let bytes = tokio::fs::read(Domain::Runs.record_path(&root, "run-1-aaaaaaaa"))
        .await
        .unwrap();
    let persisted: RunRecord = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(persisted.status, voratiq_core::RunStatus::Queued);

    tokio::time::sleep(FLUSH_COALESCE + Duration::from_millis(50)).await;
    let bytes = tokio::fs::read(Domain::Runs.record_path(&root, "run-1-aaaaaaaa"))
        .await
        .unwrap();
    let persisted: RunRecord = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(persisted.status, voratiq_core::RunStatus::Running);
}

#[tokio::test]
async fn repeated_rewrites_within_the_window_coalesce_into_one_flush() {
    let (_dir, root) = temp_root();
    let store = Store::<RunRecord>::new(root, Domain::Runs);
    store.append(run_record("run-1-aaaaaaaa")).await.unwrap();
    for _ in 0..5 {
        store
            .rewrite("run-1-aaaaaaaa", |mut r| {
                r.status = voratiq_core::RunStatus::Running;
                r
            })
            .await
            .unwrap();
    }
    // Only one flush should be scheduled; verified indirectly by the final
    // on-disk value matching the last rewrite after the coalescing window.
    tokio::time::sleep(FLUSH_COALESCE + Duration::from_millis(50)).await;
    let snapshot = store.snapshot("run-1-aaaaaaaa").await.unwrap().unwrap();
    assert_eq!(snapshot.status, voratiq_core::RunStatus::Running);
}

#[tokio::test]
async fn rewrite_on_unknown_id_is_not_found() {
    let (_dir, root) = temp_root();
    let store = Store::<RunRecord>::new(root, Domain::Runs);
    let err = store
        .rewrite("run-missing", |r| r)
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::NotFound { .. }));
}

#[tokio::test]
async fn flush_all_persists_every_dirty_buffered_record() {
    let (_dir, root) = temp_root();
    let store = Store::<RunRecord>::new(root.clone(), Domain::Runs);
    store.append(run_record("run-1-aaaaaaaa")).await.unwrap();
    store.append(run_record("run-2-aaaaaaaa")).await.unwrap();
    store
        .rewrite("run-1-aaaaaaaa", |mut r| {
            r.status = voratiq_core::RunStatus::Running;
            r
        })
        .await
        .unwrap();
    store
        .rewrite("run-2-aaaaaaaa", |mut r| {
            r.status = voratiq_core::RunStatus::Running;
            r
        })
        .await
        .unwrap();
    store.flush_all().await.unwrap();

    for id in ["run-1-aaaaaaaa", "run-2-aaaaaaaa"] {
        let bytes = tokio::fs::read(Domain::Runs.record_path(&root, id)).await.unwrap();
        let persisted: RunRecord = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(persisted.status, voratiq_core::RunStatus::Running);
    }
}

#[tokio::test]
async fn apply_status_merge_keeps_the_later_timestamp_on_flush() {
    let (_dir, root) = temp_root();
    let store = Store::<RunRecord>::new(root.clone(), Domain::Runs);
    store.append(run_record("run-1-aaaaaaaa")).await.unwrap();

    // Force an on-disk apply_status with applied_at_ms=100.
    store
        .rewrite("run-1-aaaaaaaa", |mut r| {
            r.apply_status = Some(voratiq_core::ApplyStatus {
                applied_at_ms: 100,
                commit_sha: "older".into(),
                target_agent_id: None,
            });
            r.agent_invocations[0].status = voratiq_core::AgentInvocationStatus::Succeeded;
            r.status = voratiq_core::RunStatus::Succeeded;
            r
        })
        .await
        .unwrap();

    // Re-append is impossible (already exists); simulate a second writer by
    // rewriting the on-disk copy directly, then rewrite through the store
    // with a stale (earlier) apply_status and confirm the later one wins.
    let record_path = Domain::Runs.record_path(&root, "run-1-aaaaaaaa");
    let mut on_disk: RunRecord =
        serde_json::from_slice(&tokio::fs::read(&record_path).await.unwrap()).unwrap();
    on_disk.apply_status = Some(voratiq_core::ApplyStatus {
        applied_at_ms: 200,
        commit_sha: "newer".into(),
        target_agent_id: None,
    });
    tokio::fs::write(&record_path, serde_json::to_vec_pretty(&on_disk).unwrap())
        .await
        .unwrap();

    store.dispose("run-1-aaaaaaaa");
    let current = store.snapshot("run-1-aaaaaaaa").await.unwrap().unwrap();
    store
        .rewrite("run-1-aaaaaaaa", move |mut r| {
            r.apply_status = Some(voratiq_core::ApplyStatus {
                applied_at_ms: 150,
                commit_sha: "stale-writer".into(),
                target_agent_id: None,
            });
            r.status = current.status;
            r.agent_invocations = current.agent_invocations.clone();
            r
        })
        .await
        .unwrap();

    let persisted: RunRecord =
        serde_json::from_slice(&tokio::fs::read(&record_path).await.unwrap()).unwrap();
    assert_eq!(persisted.apply_status.unwrap().commit_sha, "newer");
}
