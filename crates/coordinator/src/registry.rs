// SPDX-License-Identifier: MIT

//! Run Abort Orchestrator (C8): a process-scoped registry of at most one
//! active run or review, and the abort sequence that cascades an external
//! termination request through every registered in-flight child.
//!
//! A single process-wide instance backs the real signal handler, but every
//! test constructs its own via [`ActiveRunRegistry::new`] and resets it with
//! [`ActiveRunRegistry::clear`] rather than sharing global mutable state.

use crate::error::CoordinatorError;
use parking_lot::Mutex;
use std::sync::{Arc, OnceLock};
use tokio_util::sync::CancellationToken;
use voratiq_core::{AgentInvocationId, AgentInvocationStatus, Clock, ReviewId, ReviewStatus, RunId, RunStatus, SystemClock};
use voratiq_store::Store;

pub const RUN_ABORT_DETAIL: &str = "Run aborted before agent completed.";
pub const REVIEW_ABORT_DETAIL: &str = "Review aborted before reviewer completed.";

/// One in-flight child's abort handle, registered by the lifecycle
/// coordinator right after C2's spawn call starts.
#[derive(Clone)]
pub struct InFlightChild {
    pub agent_invocation_id: AgentInvocationId,
    pub abort: CancellationToken,
}

enum ActiveSession {
    Run { run_id: RunId, children: Vec<InFlightChild> },
    Review { review_id: ReviewId, children: Vec<InFlightChild> },
}

impl ActiveSession {
    fn id_str(&self) -> &str {
        match self {
            Self::Run { run_id, .. } => run_id.as_str(),
            Self::Review { review_id, .. } => review_id.as_str(),
        }
    }
}

struct RegistryState {
    active: Option<ActiveSession>,
    terminating: bool,
}

pub struct ActiveRunRegistry<C: Clock = SystemClock> {
    clock: C,
    state: Mutex<RegistryState>,
}

static PROCESS_REGISTRY: OnceLock<Arc<ActiveRunRegistry<SystemClock>>> = OnceLock::new();

/// The process-wide registry backing the real OS signal handler.
pub fn process_registry() -> Arc<ActiveRunRegistry<SystemClock>> {
    PROCESS_REGISTRY
        .get_or_init(|| ActiveRunRegistry::new(SystemClock))
        .clone()
}

impl<C: Clock> ActiveRunRegistry<C> {
    pub fn new(clock: C) -> Arc<Self> {
        Arc::new(Self {
            clock,
            state: Mutex::new(RegistryState { active: None, terminating: false }),
        })
    }

    pub fn register_run(&self, run_id: RunId) -> Result<(), CoordinatorError> {
        let mut state = self.state.lock();
        if let Some(active) = &state.active {
            return Err(CoordinatorError::SessionAlreadyActive {
                active_id: active.id_str().to_string(),
            });
        }
        state.active = Some(ActiveSession::Run { run_id, children: Vec::new() });
        Ok(())
    }

    pub fn register_review(&self, review_id: ReviewId) -> Result<(), CoordinatorError> {
        let mut state = self.state.lock();
        if let Some(active) = &state.active {
            return Err(CoordinatorError::SessionAlreadyActive {
                active_id: active.id_str().to_string(),
            });
        }
        state.active = Some(ActiveSession::Review { review_id, children: Vec::new() });
        Ok(())
    }

    /// Register an in-flight child under whichever session is currently
    /// active. A no-op if nothing is registered (the coordinator always
    /// registers the session before spawning any child).
    pub fn add_child(&self, child: InFlightChild) {
        match &mut self.state.lock().active {
            Some(ActiveSession::Run { children, .. }) => children.push(child),
            Some(ActiveSession::Review { children, .. }) => children.push(child),
            None => {}
        }
    }

    pub fn is_terminating(&self) -> bool {
        self.state.lock().terminating
    }

    /// Clear the registration. Called once the coordinator's run/review
    /// completes naturally, or at the end of the abort sequence.
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.active = None;
        state.terminating = false;
    }

    /// C8's abort sequence for a run. A no-op if no run is currently active
    /// (including when a review is active instead). Idempotent: a second
    /// call while already terminating does nothing.
    pub async fn abort_run(self: &Arc<Self>, store: &Arc<Store<voratiq_core::RunRecord>>) -> Result<(), CoordinatorError> {
        let (run_id, children) = {
            let mut state = self.state.lock();
            if state.terminating {
                return Ok(());
            }
            let Some(ActiveSession::Run { run_id, children }) = &state.active else {
                return Ok(());
            };
            let snapshot = (run_id.clone(), children.clone());
            state.terminating = true;
            snapshot
        };

        // C2's abort branch resolves the spawn call immediately (it does not
        // wait for the child to actually exit), so firing every token here
        // already bounds this loop well under `hardAbortMs`.
        for child in &children {
            child.abort.cancel();
        }

        let now_ms = self.clock.epoch_ms();
        store
            .rewrite(run_id.as_str(), move |mut record| {
                record.status = RunStatus::Aborted;
                for inv in &mut record.agent_invocations {
                    if !inv.status.is_terminal() {
                        inv.status = AgentInvocationStatus::Aborted;
                        inv.error_message = Some(RUN_ABORT_DETAIL.to_string());
                        inv.completed_at_ms = Some(now_ms);
                    }
                }
                record
            })
            .await?;

        self.clear();
        Ok(())
    }

    /// C8's abort sequence for a review; mirrors `abort_run` over reviewers.
    pub async fn abort_review(self: &Arc<Self>, store: &Arc<Store<voratiq_core::ReviewSession>>) -> Result<(), CoordinatorError> {
        let (review_id, children) = {
            let mut state = self.state.lock();
            if state.terminating {
                return Ok(());
            }
            let Some(ActiveSession::Review { review_id, children }) = &state.active else {
                return Ok(());
            };
            let snapshot = (review_id.clone(), children.clone());
            state.terminating = true;
            snapshot
        };

        for child in &children {
            child.abort.cancel();
        }

        store
            .rewrite(review_id.as_str(), move |mut record| {
                record.status = ReviewStatus::Aborted;
                for reviewer in &mut record.reviewers {
                    if !matches!(reviewer.status, ReviewStatus::Succeeded | ReviewStatus::Failed | ReviewStatus::Aborted) {
                        reviewer.status = ReviewStatus::Aborted;
                        reviewer.error_message = Some(REVIEW_ABORT_DETAIL.to_string());
                    }
                }
                record
            })
            .await?;

        self.clear();
        Ok(())
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
