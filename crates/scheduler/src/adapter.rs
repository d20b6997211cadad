// SPDX-License-Identifier: MIT

//! The adapter trait a caller implements to drive [`crate::run`] over its
//! own candidate/outcome types.

use async_trait::async_trait;
use std::fmt::Display;

/// Returned by [`SchedulerAdapter::prepare_candidates`]. `ready` entries carry
/// the original input index alongside the prepared payload so result
/// collation can restore input order; `failures` are already fully-formed
/// outcomes, likewise indexed.
pub struct PrepareOutcome<Prepared, Outcome> {
    pub ready: Vec<(usize, Prepared)>,
    pub failures: Vec<(usize, Outcome)>,
}

/// Hooks invoked by the bounded scheduler (C1) over the lifetime of one
/// `run()` call. Every hook may suspend. See [`crate::run`] for the
/// ordering and exactly-once guarantees each hook is called under.
#[async_trait]
pub trait SchedulerAdapter: Send + Sync {
    type Candidate: Send + 'static;
    type Prepared: Send + 'static;
    type Outcome: Send + 'static;
    type Error: Display + Send + 'static;

    async fn queue_candidate(&self, candidate: &Self::Candidate);

    async fn prepare_candidates(
        &self,
        candidates: Vec<Self::Candidate>,
    ) -> PrepareOutcome<Self::Prepared, Self::Outcome>;

    async fn on_preparation_failure(&self, outcome: &Self::Outcome);

    async fn on_candidate_prepared(&self, prepared: &Self::Prepared);

    async fn on_candidate_running(&self, prepared: &Self::Prepared);

    async fn execute_candidate(&self, prepared: &Self::Prepared) -> Result<Self::Outcome, Self::Error>;

    async fn on_candidate_completed(&self, outcome: &Self::Outcome);

    /// Called when `execute_candidate` returns an error. Returning `Some`
    /// treats the value as the candidate's result and suppresses the
    /// failure policy; returning `None` applies [`crate::FailurePolicy`]. The
    /// error is borrowed (not consumed) so the scheduler can still propagate
    /// it under `FailurePolicy::Abort` when the hook declines to capture it.
    async fn capture_execution_failure(
        &self,
        prepared: &Self::Prepared,
        error: &Self::Error,
    ) -> Option<Self::Outcome>;

    async fn cleanup_prepared_candidate(&self, prepared: &Self::Prepared);

    async fn finalize_competition(&self);

    /// Stable comparator applied to the collated result list. The default
    /// leaves input order (restored via original index) untouched.
    fn sort_results(&self, _results: &mut [Self::Outcome]) {}
}
