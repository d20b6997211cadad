// SPDX-License-Identifier: MIT

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! voratiq-scheduler: bounded-parallelism driver for a set of candidates
//! (agent invocations, reviewers) executed against a caller-supplied
//! [`SchedulerAdapter`] (C1 in the component design).
//!
//! `run` owns admission order, concurrency, failure policy, and result
//! collation; it holds no opinion on what a candidate or outcome *is* — the
//! competition review engine and the run coordinator each bring their own
//! adapter over their own candidate/outcome types.

mod adapter;
mod error;
mod policy;

pub use adapter::{PrepareOutcome, SchedulerAdapter};
pub use error::SchedulerError;
pub use policy::FailurePolicy;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Per-candidate execution outcome, tracked internally to distinguish a
/// genuine result from a candidate skipped by the abort admission gate.
enum TaskOutcome<O, E> {
    Completed(O),
    Failed(E),
    Skipped,
}

/// Run `candidates` through `adapter` admitting at most `max_parallel`
/// concurrent `execute_candidate` calls. See the module-level docs and
/// [`SchedulerAdapter`] for the hook contract.
pub async fn run<A>(
    candidates: Vec<A::Candidate>,
    max_parallel: usize,
    failure_policy: FailurePolicy,
    adapter: Arc<A>,
) -> Result<Vec<A::Outcome>, SchedulerError<A::Error>>
where
    A: SchedulerAdapter + 'static,
{
    if max_parallel == 0 {
        return Err(SchedulerError::InvalidMaxParallel(max_parallel));
    }

    tracing::debug!(candidates = candidates.len(), max_parallel, "scheduler run starting");

    for candidate in &candidates {
        adapter.queue_candidate(candidate).await;
    }

    let prepared = adapter.prepare_candidates(candidates).await;

    for (_, outcome) in &prepared.failures {
        adapter.on_preparation_failure(outcome).await;
    }
    for (_, ready) in &prepared.ready {
        adapter.on_candidate_prepared(ready).await;
    }

    let mut collected: Vec<(usize, A::Outcome)> = prepared.failures;

    let semaphore = Arc::new(Semaphore::new(max_parallel));
    let aborting = Arc::new(AtomicBool::new(false));
    let mut first_error: Option<A::Error> = None;
    let mut join_set: JoinSet<(usize, TaskOutcome<A::Outcome, A::Error>)> = JoinSet::new();

    for (idx, prepared_candidate) in prepared.ready {
        let adapter = Arc::clone(&adapter);
        let semaphore = Arc::clone(&semaphore);
        let aborting = Arc::clone(&aborting);
        join_set.spawn(async move {
            let permit = semaphore
                .acquire_owned()
                .await
                .unwrap_or_else(|_| unreachable!("semaphore is never closed"));

            // Admission gate: a candidate whose permit comes up after an
            // abort was triggered is never executed, only cleaned up.
            if matches!(failure_policy, FailurePolicy::Abort) && aborting.load(Ordering::SeqCst) {
                adapter.cleanup_prepared_candidate(&prepared_candidate).await;
                drop(permit);
                return (idx, TaskOutcome::Skipped);
            }

            adapter.on_candidate_running(&prepared_candidate).await;
            let outcome = adapter.execute_candidate(&prepared_candidate).await;
            let result = match outcome {
                Ok(outcome) => {
                    adapter.on_candidate_completed(&outcome).await;
                    TaskOutcome::Completed(outcome)
                }
                Err(err) => match adapter.capture_execution_failure(&prepared_candidate, &err).await {
                    Some(outcome) => {
                        adapter.on_candidate_completed(&outcome).await;
                        TaskOutcome::Completed(outcome)
                    }
                    None => {
                        if matches!(failure_policy, FailurePolicy::Abort) {
                            aborting.store(true, Ordering::SeqCst);
                        }
                        TaskOutcome::Failed(err)
                    }
                },
            };
            adapter.cleanup_prepared_candidate(&prepared_candidate).await;
            drop(permit);
            (idx, result)
        });
    }

    while let Some(joined) = join_set.join_next().await {
        let (idx, result) = joined.map_err(|_| SchedulerError::TaskPanicked)?;
        match result {
            TaskOutcome::Completed(outcome) => collected.push((idx, outcome)),
            TaskOutcome::Skipped => {}
            TaskOutcome::Failed(err) => {
                if matches!(failure_policy, FailurePolicy::Abort) {
                    aborting.store(true, Ordering::SeqCst);
                    if first_error.is_none() {
                        first_error = Some(err);
                    }
                }
            }
        }
    }

    adapter.finalize_competition().await;

    if let Some(err) = first_error {
        return Err(SchedulerError::Execution(err));
    }

    collected.sort_by_key(|(idx, _)| *idx);
    let mut results: Vec<A::Outcome> = collected.into_iter().map(|(_, outcome)| outcome).collect();
    adapter.sort_results(&mut results);
    Ok(results)
}
