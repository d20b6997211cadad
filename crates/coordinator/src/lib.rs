// SPDX-License-Identifier: MIT

#![cfg_attr(test, allow(clippy::panic, clippy::unwrap_used, clippy::expect_used))]

//! voratiq-coordinator: the Agent Lifecycle Coordinator (C7), the Run Abort
//! Orchestrator (C8), and the Competition Review Engine (C9) — the three
//! components that sit directly on top of the scheduler (C1), process
//! supervisor (C2/C3/C4), and session record store (C5/C6).

pub mod collaborators;
pub mod error;
pub mod lifecycle;
pub mod registry;
pub mod review;

pub use error::CoordinatorError;
pub use lifecycle::{execute_agent_invocation, scan_failure_detail};
pub use registry::{process_registry, ActiveRunRegistry, InFlightChild};
pub use review::{enforce_output_contract, run_review, ReviewAdapter, ReviewCandidate, ReviewOutcome};
