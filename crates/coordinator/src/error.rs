// SPDX-License-Identifier: MIT

use voratiq_core::{AgentInvocationId, ReviewId, RunId};

/// Errors the coordinator itself raises (as opposed to a candidate's own
/// `failed` status, which is recorded, not propagated).
///
/// Preflight and contract variants use a tagged result shape:
/// `headline`/`detail_lines`/`hint_lines` let an external CLI render the
/// failure without interpreting an error string.
#[derive(Debug, thiserror::Error)]
pub enum CoordinatorError {
    #[error("{headline}")]
    Preflight {
        headline: String,
        detail_lines: Vec<String>,
        hint_lines: Vec<String>,
    },

    #[error("{headline}")]
    ReviewContractViolation {
        review_id: ReviewId,
        alias: String,
        headline: String,
        detail_lines: Vec<String>,
        hint_lines: Vec<String>,
    },

    #[error("run {run_id} already has an active invocation for agent {agent_invocation_id}")]
    DuplicateInvocation {
        run_id: RunId,
        agent_invocation_id: AgentInvocationId,
    },

    #[error("another session is already active: {active_id}")]
    SessionAlreadyActive { active_id: String },

    #[error("store error: {0}")]
    Store(#[from] voratiq_store::StoreError),

    #[error("process error: {0}")]
    Process(#[from] voratiq_process::ProcessError),

    #[error("scheduler error: {0}")]
    Scheduler(String),

    #[error("core error: {0}")]
    Core(#[from] voratiq_core::CoreError),
}

impl CoordinatorError {
    pub fn preflight(headline: impl Into<String>) -> Self {
        Self::Preflight {
            headline: headline.into(),
            detail_lines: Vec::new(),
            hint_lines: Vec::new(),
        }
    }
}
