// SPDX-License-Identifier: MIT

//! Watchdog (C3): monitors one child's combined output for silence, a
//! wall-clock cap, and provider-specific fatal patterns, and asks the
//! supervisor to escalate via an [`EscalationTrigger`].

use crate::denial::DenialEvent;
use crate::supervisor::EscalationTrigger;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use voratiq_core::{Clock, WatchdogTrigger};

pub const SILENCE_TIMEOUT: Duration = Duration::from_secs(15 * 60);
pub const WALL_CLOCK_CAP: Duration = Duration::from_secs(120 * 60);
pub const FATAL_RETRY_WINDOW: Duration = Duration::from_secs(60);
/// How often the supervisor's timer loop calls [`Watchdog::tick`] to
/// evaluate the silence and wall-clock deadlines.
pub const TICK_INTERVAL: Duration = Duration::from_secs(30);

/// Provider-specific fatal substrings. Matched literally
/// against the combined output stream; a second match within
/// `FATAL_RETRY_WINDOW` of the first fires the `fatal-pattern` trigger.
/// Extensions register additional entries; a provider id absent from this
/// table never fires `fatal-pattern`.
pub fn default_fatal_patterns() -> HashMap<&'static str, &'static str> {
    HashMap::from([
        ("gemini", "You have exhausted your capacity on this model."),
        ("codex", "Connection failed: error sending request for url."),
    ])
}

struct State {
    trigger: Option<WatchdogTrigger>,
    last_output_at: std::time::Instant,
    spawned_at: std::time::Instant,
    fatal_first_seen_at: Option<std::time::Instant>,
}

/// Owns the silence/wall-clock timers and fatal-pattern matching for one
/// child process. `handle_output` must be called on every stdout/stderr
/// chunk; `tick` must be called periodically (or driven by a timer task) to
/// evaluate the silence and wall-clock deadlines.
pub struct Watchdog<C: Clock> {
    clock: C,
    provider_id: String,
    fatal_pattern: Option<&'static str>,
    state: Mutex<State>,
    trigger_handle: EscalationTrigger,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerOutcome {
    pub trigger: WatchdogTrigger,
    pub reason: String,
    pub denial: Option<DenialEvent>,
}

impl<C: Clock> Watchdog<C> {
    pub fn new(clock: C, provider_id: impl Into<String>) -> Self {
        let provider_id = provider_id.into();
        let fatal_pattern = default_fatal_patterns().get(provider_id.as_str()).copied();
        let now = clock.now();
        Self {
            clock,
            provider_id,
            fatal_pattern,
            state: Mutex::new(State {
                trigger: None,
                last_output_at: now,
                spawned_at: now,
                fatal_first_seen_at: None,
            }),
            trigger_handle: EscalationTrigger::new(),
        }
    }

    pub fn trigger_handle(&self) -> EscalationTrigger {
        self.trigger_handle.clone()
    }

    pub fn triggered(&self) -> Option<WatchdogTrigger> {
        self.state.lock().trigger
    }

    /// Feed one output chunk. Resets the silence timer and checks for a
    /// repeated fatal-pattern match. Returns `Some` the first time a trigger
    /// fires (triggers are exclusive and terminal: once set, later calls
    /// are no-ops).
    pub fn handle_output(&self, chunk: &str) -> Option<TriggerOutcome> {
        let now = self.clock.now();
        let mut state = self.state.lock();
        if state.trigger.is_some() {
            return None;
        }
        state.last_output_at = now;

        let Some(pattern) = self.fatal_pattern else {
            return None;
        };
        if !chunk.contains(pattern) {
            return None;
        }
        match state.fatal_first_seen_at {
            None => {
                state.fatal_first_seen_at = Some(now);
                None
            }
            Some(first) if now.duration_since(first) <= FATAL_RETRY_WINDOW => {
                state.trigger = Some(WatchdogTrigger::FatalPattern);
                drop(state);
                let outcome = TriggerOutcome {
                    trigger: WatchdogTrigger::FatalPattern,
                    reason: format!("provider {} fatal pattern matched twice", self.provider_id),
                    denial: None,
                };
                self.fire(&outcome);
                Some(outcome)
            }
            Some(_) => {
                state.fatal_first_seen_at = Some(now);
                None
            }
        }
    }

    /// Evaluate the silence and wall-clock deadlines. Call periodically
    /// from a timer loop driven by the supervisor's event loop.
    pub fn tick(&self) -> Option<TriggerOutcome> {
        let now = self.clock.now();
        let mut state = self.state.lock();
        if state.trigger.is_some() {
            return None;
        }
        if now.duration_since(state.spawned_at) > WALL_CLOCK_CAP {
            state.trigger = Some(WatchdogTrigger::WallClock);
            drop(state);
            let outcome = TriggerOutcome {
                trigger: WatchdogTrigger::WallClock,
                reason: format!("exceeded wall-clock cap of {WALL_CLOCK_CAP:?}"),
                denial: None,
            };
            self.fire(&outcome);
            return Some(outcome);
        }
        if now.duration_since(state.last_output_at) > SILENCE_TIMEOUT {
            state.trigger = Some(WatchdogTrigger::Silence);
            drop(state);
            let outcome = TriggerOutcome {
                trigger: WatchdogTrigger::Silence,
                reason: format!("no output for {SILENCE_TIMEOUT:?}"),
                denial: None,
            };
            self.fire(&outcome);
            return Some(outcome);
        }
        None
    }

    /// Called by the denial backoff tracker (C4) when a `fail-fast`
    /// decision is reached; fires the terminal `sandbox-denial` trigger.
    pub fn trigger_sandbox_denial(&self, denial: DenialEvent) -> Option<TriggerOutcome> {
        let mut state = self.state.lock();
        if state.trigger.is_some() {
            return None;
        }
        state.trigger = Some(WatchdogTrigger::SandboxDenial);
        drop(state);
        let outcome = TriggerOutcome {
            trigger: WatchdogTrigger::SandboxDenial,
            reason: format!(
                "sandbox denied {} on {}",
                denial.operation, denial.target
            ),
            denial: Some(denial),
        };
        self.fire(&outcome);
        Some(outcome)
    }

    /// Render the one-line banner written to the stderr sink on trigger.
    pub fn banner(outcome: &TriggerOutcome) -> String {
        format!("\n[WATCHDOG: {}] {}\n", outcome.trigger, outcome.reason)
    }

    fn fire(&self, outcome: &TriggerOutcome) {
        tracing::warn!(trigger = %outcome.trigger, reason = %outcome.reason, "watchdog triggered");
        self.trigger_handle.fire();
    }
}

impl<C: Clock + Send + Sync + 'static> Watchdog<C> {
    /// Run `tick` on a [`TICK_INTERVAL`] cadence until it fires a trigger or
    /// `stop` is cancelled (the child exited or was aborted first). The
    /// supervisor's `select!` races `trigger_handle.triggered()` against the
    /// child's exit and the external abort, so a fired tick reaches the same
    /// escalation path as `handle_output`'s fatal-pattern match.
    pub async fn run_tick_loop(self: Arc<Self>, stop: tokio_util::sync::CancellationToken) {
        loop {
            tokio::select! {
                _ = tokio::time::sleep(TICK_INTERVAL) => {
                    if self.tick().is_some() {
                        return;
                    }
                }
                _ = stop.cancelled() => return,
            }
        }
    }
}

#[cfg(test)]
#[path = "watchdog_tests.rs"]
mod tests;
