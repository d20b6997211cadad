// SPDX-License-Identifier: MIT

#![cfg_attr(test, allow(clippy::panic, clippy::unwrap_used, clippy::expect_used))]

//! Process supervision for a single agent invocation: spawning and signaling
//! a child (C2), watching its output and wall-clock budget for trouble (C3),
//! and classifying repeated sandbox denials into warn/delay/fail-fast
//! decisions (C4).

pub mod denial;
pub mod error;
pub mod supervisor;
pub mod watchdog;

pub use denial::{DenialAction, DenialClassification, DenialEvent, DenialThresholds, DenialTracker};
pub use error::ProcessError;
pub use supervisor::{spawn, EscalationTrigger, SpawnConfig, SpawnOutcome};
pub use watchdog::{default_fatal_patterns, TriggerOutcome, Watchdog};
