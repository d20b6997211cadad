// SPDX-License-Identifier: MIT

use super::*;
use voratiq_core::FakeClock;

#[test]
fn silence_trigger_fires_after_timeout_with_no_output() {
    let clock = FakeClock::new();
    let watchdog = Watchdog::new(clock.clone(), "codex");
    assert!(watchdog.tick().is_none());
    clock.advance(SILENCE_TIMEOUT + Duration::from_secs(1));
    let outcome = watchdog.tick().unwrap();
    assert_eq!(outcome.trigger, WatchdogTrigger::Silence);
    assert_eq!(watchdog.triggered(), Some(WatchdogTrigger::Silence));
}

#[test]
fn output_resets_the_silence_timer() {
    let clock = FakeClock::new();
    let watchdog = Watchdog::new(clock.clone(), "codex");
    clock.advance(SILENCE_TIMEOUT - Duration::from_secs(5));
    assert!(watchdog.handle_output("still working").is_none());
    clock.advance(SILENCE_TIMEOUT - Duration::from_secs(5));
    assert!(watchdog.tick().is_none());
}

#[test]
fn wall_clock_trigger_fires_past_the_cap() {
    let clock = FakeClock::new();
    let watchdog = Watchdog::new(clock.clone(), "codex");
    clock.advance(WALL_CLOCK_CAP + Duration::from_secs(1));
    let outcome = watchdog.tick().unwrap();
    assert_eq!(outcome.trigger, WatchdogTrigger::WallClock);
}

#[test]
fn fatal_pattern_fires_on_second_match_within_window() {
    let clock = FakeClock::new();
    let watchdog = Watchdog::new(clock.clone(), "gemini");
    let pattern = "You have exhausted your capacity on this model.";
    assert!(watchdog.handle_output(pattern).is_none());
    clock.advance(Duration::from_secs(10));
    let outcome = watchdog.handle_output(pattern).unwrap();
    assert_eq!(outcome.trigger, WatchdogTrigger::FatalPattern);
}

#[test]
fn fatal_pattern_match_outside_window_resets_instead_of_firing() {
    let clock = FakeClock::new();
    let watchdog = Watchdog::new(clock.clone(), "gemini");
    let pattern = "You have exhausted your capacity on this model.";
    assert!(watchdog.handle_output(pattern).is_none());
    clock.advance(FATAL_RETRY_WINDOW + Duration::from_secs(1));
    assert!(watchdog.handle_output(pattern).is_none());
    assert!(watchdog.triggered().is_none());
}

#[test]
fn unknown_provider_never_fires_fatal_pattern() {
    let clock = FakeClock::new();
    let watchdog = Watchdog::new(clock.clone(), "unknown-provider");
    assert!(watchdog
        .handle_output("You have exhausted your capacity on this model.")
        .is_none());
    clock.advance(Duration::from_secs(10));
    assert!(watchdog
        .handle_output("You have exhausted your capacity on this model.")
        .is_none());
    assert!(watchdog.triggered().is_none());
}

#[test]
fn sandbox_denial_trigger_is_terminal_and_exclusive() {
    let clock = FakeClock::new();
    let watchdog = Watchdog::new(clock.clone(), "codex");
    let denial = DenialEvent {
        operation: voratiq_core::FailFastOperation::NetworkConnect,
        target: "api.example.com".into(),
    };
    let first = watchdog.trigger_sandbox_denial(denial.clone()).unwrap();
    assert_eq!(first.trigger, WatchdogTrigger::SandboxDenial);

    // Already triggered: later calls, of any kind, are no-ops.
    assert!(watchdog.trigger_sandbox_denial(denial).is_none());
    clock.advance(WALL_CLOCK_CAP * 2);
    assert!(watchdog.tick().is_none());
    assert_eq!(watchdog.triggered(), Some(WatchdogTrigger::SandboxDenial));
}

#[test]
fn banner_renders_trigger_and_reason() {
    let outcome = TriggerOutcome {
        trigger: WatchdogTrigger::Silence,
        reason: "no output for 900s".into(),
        denial: None,
    };
    let banner = Watchdog::<FakeClock>::banner(&outcome);
    assert!(banner.contains("WATCHDOG: silence"));
    assert!(banner.contains("no output for 900s"));
}

#[tokio::test]
async fn escalation_trigger_handle_fires_alongside_the_trigger() {
    let clock = FakeClock::new();
    let watchdog = Watchdog::new(clock.clone(), "codex");
    let handle = watchdog.trigger_handle();
    clock.advance(SILENCE_TIMEOUT + Duration::from_secs(1));
    watchdog.tick().unwrap();
    tokio::time::timeout(Duration::from_millis(100), handle.triggered())
        .await
        .unwrap();
}
