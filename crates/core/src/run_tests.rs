// SPDX-License-Identifier: MIT

use super::*;
use crate::clock::{Clock, FakeClock};

fn new_run_id(clock: &FakeClock) -> RunId {
    RunId::new(clock)
}

fn new_invocation(clock: &FakeClock, agent_id: &str) -> AgentInvocation {
    AgentInvocation::queued(AgentInvocationId::new(clock), agent_id, "codex", "gpt-5")
}

#[test]
fn new_rejects_empty_invocation_list() {
    let clock = FakeClock::new();
    let err = RunRecord::new(new_run_id(&clock), "abc123", "spec.md", vec![], clock.epoch_ms())
        .unwrap_err();
    assert!(matches!(err, CoreError::EmptyRun { .. }));
}

#[test]
fn new_run_starts_queued_with_no_apply_status() {
    let clock = FakeClock::new();
    let run = RunRecord::new(
        new_run_id(&clock),
        "abc123",
        "spec.md",
        vec![new_invocation(&clock, "reviewer")],
        clock.epoch_ms(),
    )
    .unwrap();
    assert_eq!(run.status, RunStatus::Queued);
    assert!(run.apply_status.is_none());
}

#[test]
fn invocation_lookup_fails_for_unknown_id() {
    let clock = FakeClock::new();
    let run = RunRecord::new(
        new_run_id(&clock),
        "abc123",
        "spec.md",
        vec![new_invocation(&clock, "reviewer")],
        clock.epoch_ms(),
    )
    .unwrap();
    let unknown = AgentInvocationId::new(&clock);
    assert!(matches!(
        run.invocation(&unknown),
        Err(CoreError::InvocationNotInRun { .. })
    ));
}

#[test]
fn derive_status_running_while_any_invocation_unfinished() {
    let clock = FakeClock::new();
    let run = RunRecord::new(
        new_run_id(&clock),
        "abc123",
        "spec.md",
        vec![new_invocation(&clock, "reviewer")],
        clock.epoch_ms(),
    )
    .unwrap();
    assert_eq!(run.derive_status(), RunStatus::Running);
}

#[test]
fn derive_status_aborted_wins_over_failed() {
    let clock = FakeClock::new();
    let mut a = new_invocation(&clock, "a");
    a.status = AgentInvocationStatus::Aborted;
    let mut b = new_invocation(&clock, "b");
    b.status = AgentInvocationStatus::Failed;
    let run = RunRecord::new(new_run_id(&clock), "abc123", "spec.md", vec![a, b], clock.epoch_ms()).unwrap();
    assert_eq!(run.derive_status(), RunStatus::Aborted);
}

#[test]
fn derive_status_succeeded_when_all_succeed() {
    let clock = FakeClock::new();
    let mut a = new_invocation(&clock, "a");
    a.status = AgentInvocationStatus::Succeeded;
    let run = RunRecord::new(new_run_id(&clock), "abc123", "spec.md", vec![a], clock.epoch_ms()).unwrap();
    assert_eq!(run.derive_status(), RunStatus::Succeeded);
}

#[test]
fn apply_status_merge_prefers_later_timestamp() {
    let current = ApplyStatus {
        applied_at_ms: 100,
        commit_sha: "aaa".into(),
        target_agent_id: None,
    };
    let incoming = ApplyStatus {
        applied_at_ms: 200,
        commit_sha: "bbb".into(),
        target_agent_id: None,
    };
    let merged = ApplyStatus::merge(Some(current), incoming);
    assert_eq!(merged.commit_sha, "bbb");
}

#[test]
fn apply_status_merge_ties_keep_buffered_value() {
    let current = ApplyStatus {
        applied_at_ms: 100,
        commit_sha: "buffered".into(),
        target_agent_id: None,
    };
    let incoming = ApplyStatus {
        applied_at_ms: 100,
        commit_sha: "incoming".into(),
        target_agent_id: None,
    };
    let merged = ApplyStatus::merge(Some(current), incoming);
    assert_eq!(merged.commit_sha, "buffered");
}

#[test]
fn merge_apply_status_on_run_applies_monotonic_rule() {
    let clock = FakeClock::new();
    let mut run = RunRecord::new(
        new_run_id(&clock),
        "abc123",
        "spec.md",
        vec![new_invocation(&clock, "reviewer")],
        clock.epoch_ms(),
    )
    .unwrap();
    run.merge_apply_status(ApplyStatus {
        applied_at_ms: 10,
        commit_sha: "first".into(),
        target_agent_id: None,
    });
    run.merge_apply_status(ApplyStatus {
        applied_at_ms: 5,
        commit_sha: "stale".into(),
        target_agent_id: None,
    });
    assert_eq!(run.apply_status.unwrap().commit_sha, "first");
}
