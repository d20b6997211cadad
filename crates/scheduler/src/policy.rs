// SPDX-License-Identifier: MIT

/// How the scheduler reacts to an uncaptured execution error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Record the error through `capture_execution_failure`/`on_preparation_failure`
    /// and keep driving remaining candidates.
    #[default]
    Continue,
    /// Stop admitting new candidates once the first uncaptured execution
    /// error is seen; in-flight candidates still drain, cleanup and
    /// finalize still run, then the error is rethrown from `run`.
    Abort,
}
