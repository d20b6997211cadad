// SPDX-License-Identifier: MIT

//! Denial Backoff Tracker (C4): classifies repeated sandbox denials per
//! `(operation, target)` into `warn` / `delay` / `fail-fast` actions.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;
use voratiq_core::{Clock, FailFastOperation};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DenialEvent {
    pub operation: FailFastOperation,
    pub target: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenialAction {
    None,
    Warn,
    Delay,
    FailFast,
}

#[derive(Debug, Clone, Copy)]
pub struct DenialThresholds {
    pub warning: u32,
    pub delay: u32,
    pub fail_fast: u32,
    pub warning_window: Duration,
    pub delay_duration: Duration,
    pub window: Duration,
}

impl Default for DenialThresholds {
    fn default() -> Self {
        Self {
            warning: 2,
            delay: 3,
            fail_fast: 4,
            warning_window: Duration::from_secs(30),
            delay_duration: Duration::from_secs(5),
            window: Duration::from_secs(120),
        }
    }
}

struct Counter {
    count: u32,
    first_seen_at: std::time::Instant,
    last_seen_at: std::time::Instant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DenialClassification {
    pub action: DenialAction,
    pub count: u32,
}

pub struct DenialTracker<C: Clock> {
    clock: C,
    thresholds: DenialThresholds,
    counters: Mutex<HashMap<DenialEvent, Counter>>,
}

impl<C: Clock> DenialTracker<C> {
    pub fn new(clock: C, thresholds: DenialThresholds) -> Self {
        Self {
            clock,
            thresholds,
            counters: Mutex::new(HashMap::new()),
        }
    }

    /// Classify one denial event observed at `clock.now()` using a
    /// per-`(operation, target)` counter.
    pub fn observe(&self, event: DenialEvent) -> DenialClassification {
        let now = self.clock.now();
        let mut counters = self.counters.lock();
        let counter = counters.entry(event).or_insert_with(|| Counter {
            count: 0,
            first_seen_at: now,
            last_seen_at: now,
        });

        if now.duration_since(counter.first_seen_at) > self.thresholds.window {
            counter.count = 1;
            counter.first_seen_at = now;
            counter.last_seen_at = now;
            return DenialClassification {
                action: DenialAction::None,
                count: 1,
            };
        }

        counter.count += 1;
        counter.last_seen_at = now;

        let action = match counter.count {
            1 => DenialAction::None,
            n if n == self.thresholds.warning => {
                if now.duration_since(counter.first_seen_at) <= self.thresholds.warning_window {
                    DenialAction::Warn
                } else {
                    DenialAction::None
                }
            }
            n if n == self.thresholds.delay => DenialAction::Delay,
            n if n >= self.thresholds.fail_fast => DenialAction::FailFast,
            _ => DenialAction::None,
        };

        DenialClassification {
            action,
            count: counter.count,
        }
    }

    /// The line written to the stderr sink for a `warn`/`delay`/`fail-fast`
    /// classification. A `none` classification writes nothing.
    pub fn observability_line(action: DenialAction, event: &DenialEvent) -> Option<String> {
        let label = match action {
            DenialAction::Warn => "WARN",
            DenialAction::Delay => "DELAY",
            DenialAction::FailFast => "ERROR",
            DenialAction::None => return None,
        };
        Some(format!(
            "SandboxBackoff: {label} denied {} on {}",
            event.operation, event.target
        ))
    }

    pub fn delay_duration(&self) -> Duration {
        self.thresholds.delay_duration
    }
}

#[cfg(test)]
#[path = "denial_tests.rs"]
mod tests;
