// SPDX-License-Identifier: MIT

use std::fmt::Display;

#[derive(Debug, thiserror::Error)]
pub enum SchedulerError<E: Display> {
    #[error("max_parallel must be at least 1, got {0}")]
    InvalidMaxParallel(usize),

    #[error("candidate execution failed: {0}")]
    Execution(E),

    #[error("a candidate execution task panicked")]
    TaskPanicked,
}
