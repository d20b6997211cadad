// SPDX-License-Identifier: MIT

//! Error taxonomy for the core domain types.
//!
//! Downstream crates define their own `thiserror` enums (`SchedulerError`,
//! `ProcessError`, `StoreError`, `CoordinatorError`) and convert from this
//! one with `#[from]` where a core validation failure propagates.

use crate::ids::{AgentInvocationId, RunId};

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("run {run_id} has no agent invocations")]
    EmptyRun { run_id: RunId },

    #[error("agent invocation {agent_invocation_id} is not a member of run {run_id}")]
    InvocationNotInRun {
        run_id: RunId,
        agent_invocation_id: AgentInvocationId,
    },

    #[error("apply-status timestamp {incoming_ms} is not newer than recorded {current_ms} for run {run_id}")]
    StaleApplyStatus {
        run_id: RunId,
        current_ms: u64,
        incoming_ms: u64,
    },

    #[error("invalid run status transition from {from} to {to}")]
    InvalidRunTransition { from: String, to: String },

    #[error("invalid agent invocation status transition from {from} to {to}")]
    InvalidInvocationTransition { from: String, to: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{Clock, FakeClock};

    #[test]
    fn empty_run_error_includes_run_id() {
        let clock = FakeClock::new();
        let run_id = RunId::new(&clock);
        let err = CoreError::EmptyRun {
            run_id: run_id.clone(),
        };
        assert!(err.to_string().contains(run_id.as_str()));
    }
}
