// SPDX-License-Identifier: MIT

use super::*;

#[yare::parameterized(
    queued    = { RunStatus::Queued,    false },
    running   = { RunStatus::Running,   false },
    succeeded = { RunStatus::Succeeded, true },
    failed    = { RunStatus::Failed,    true },
    aborted   = { RunStatus::Aborted,   true },
    pruned    = { RunStatus::Pruned,    true },
)]
fn run_status_terminal_states(status: RunStatus, expected: bool) {
    assert_eq!(status.is_terminal(), expected);
}

#[yare::parameterized(
    queued    = { AgentInvocationStatus::Queued,    false },
    running   = { AgentInvocationStatus::Running,   false },
    succeeded = { AgentInvocationStatus::Succeeded, true },
    failed    = { AgentInvocationStatus::Failed,    true },
    aborted   = { AgentInvocationStatus::Aborted,   true },
)]
fn agent_invocation_status_terminal_states(status: AgentInvocationStatus, expected: bool) {
    assert_eq!(status.is_terminal(), expected);
}

#[yare::parameterized(
    queued    = { ReviewStatus::Queued,    false },
    running   = { ReviewStatus::Running,   false },
    succeeded = { ReviewStatus::Succeeded, true },
    failed    = { ReviewStatus::Failed,    true },
    aborted   = { ReviewStatus::Aborted,   true },
)]
fn review_status_terminal_states(status: ReviewStatus, expected: bool) {
    assert_eq!(status.is_terminal(), expected);
}

#[test]
fn display_impls_match_wire_strings() {
    assert_eq!(RunStatus::Running.to_string(), "running");
    assert_eq!(WatchdogTrigger::WallClock.to_string(), "wall-clock");
    assert_eq!(FailFastOperation::NetworkConnect.to_string(), "network-connect");
    assert_eq!(ChatFormat::Jsonl.to_string(), "jsonl");
}

#[test]
fn serde_round_trip_uses_expected_case() {
    let json = serde_json::to_string(&RunStatus::Running).unwrap();
    assert_eq!(json, "\"running\"");
    let back: RunStatus = serde_json::from_str(&json).unwrap();
    assert_eq!(back, RunStatus::Running);

    let json = serde_json::to_string(&WatchdogTrigger::FatalPattern).unwrap();
    assert_eq!(json, "\"fatal-pattern\"");
}
