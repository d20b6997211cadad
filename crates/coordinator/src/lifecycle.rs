// SPDX-License-Identifier: MIT

//! Agent Lifecycle Coordinator (C7): stages, spawns, and settles one agent
//! invocation, publishing every transition through the session record store.
//!
//! Also wires the denial backoff tracker (C4) to the spawned child's output:
//! every `[SandboxDebug] Denied by config rule: <target>` line is classified,
//! `warn`/`delay` pause the process group for the configured delay, and
//! `fail-fast` fires the watchdog's terminal `sandbox-denial` trigger.

use crate::collaborators::{ArtifactStager, CredentialStager, EvalRunner, ManifestBuilder};
use crate::error::CoordinatorError;
use crate::registry::{ActiveRunRegistry, InFlightChild};
use parking_lot::Mutex as SyncMutex;
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use voratiq_core::{
    AgentInvocationId, AgentInvocationStatus, Clock, FailFastDescriptor, FailFastOperation,
    RunId, RunRecord, WatchdogMeta,
};
use voratiq_process::denial::{DenialAction, DenialEvent, DenialTracker};
use voratiq_process::supervisor::{pause, resume, spawn, SpawnConfig};
use voratiq_process::Watchdog;
use voratiq_store::Store;

const SANDBOX_DENIAL_PREFIX: &str = "[SandboxDebug] Denied by config rule: ";

/// Every wire-level sandbox denial line carries only a target, not an
/// operation kind; the denial tracker's `(operation, target)` key still
/// needs one, so every wire denial is classified as a network-connect
/// attempt.
const WIRE_DENIAL_OPERATION: FailFastOperation = FailFastOperation::NetworkConnect;

/// Scans a failed invocation's stderr for a provider-specific hint (Claude
/// reauth, Gemini quota, Codex malformed request). Returns `None` when
/// nothing recognizable is found, in which case the raw exit status stands
/// as the failure detail.
pub fn scan_failure_detail(provider_id: &str, stderr: &str) -> Option<String> {
    match provider_id {
        "anthropic" if stderr.contains("/login") => {
            Some("Claude session expired; run `claude /login` to reauthenticate.".to_string())
        }
        "gemini" if stderr.to_lowercase().contains("quota") => stderr
            .lines()
            .find(|line| line.to_lowercase().contains("quota"))
            .map(|line| line.trim().to_string()),
        "codex" if stderr.contains("invalid_request_error") => stderr
            .lines()
            .find(|line| line.contains("invalid_request_error"))
            .map(|line| line.trim().to_string()),
        _ => None,
    }
}

fn parse_sandbox_denial(line: &str) -> Option<&str> {
    line.strip_prefix(SANDBOX_DENIAL_PREFIX).map(str::trim)
}

/// Shared state one invocation's stdout/stderr pumps both feed: the
/// watchdog, the denial tracker, and (once known) the child's pid, needed to
/// pause/resume the process group on a `delay` classification.
struct DenialWiring<C: Clock> {
    watchdog: Arc<Watchdog<C>>,
    denial_tracker: Arc<DenialTracker<C>>,
    pid: Arc<AtomicU32>,
    fail_fast: Arc<SyncMutex<Option<FailFastDescriptor>>>,
}

/// Write every chunk received on `rx` to `path` (append), mirror it into
/// `capture`, and feed each line to the watchdog and denial tracker.
async fn pump_output<C: Clock + 'static>(
    mut rx: mpsc::UnboundedReceiver<Vec<u8>>,
    path: std::path::PathBuf,
    capture: Arc<SyncMutex<String>>,
    wiring: Arc<DenialWiring<C>>,
) {
    let mut file = match tokio::fs::OpenOptions::new().create(true).append(true).open(&path).await {
        Ok(file) => file,
        Err(source) => {
            tracing::warn!(path = %path.display(), error = %source, "failed to open artifact log for append");
            return;
        }
    };
    while let Some(chunk) = rx.recv().await {
        if let Err(source) = file.write_all(&chunk).await {
            tracing::warn!(path = %path.display(), error = %source, "failed to append artifact chunk");
        }
        let text = String::from_utf8_lossy(&chunk).into_owned();
        capture.lock().push_str(&text);

        if let Some(outcome) = wiring.watchdog.handle_output(&text) {
            tracing::warn!(trigger = %outcome.trigger, "watchdog trigger fired mid-stream");
        }

        for line in text.lines() {
            let Some(target) = parse_sandbox_denial(line) else { continue };
            let event = DenialEvent { operation: WIRE_DENIAL_OPERATION, target: target.to_string() };
            let classification = wiring.denial_tracker.observe(event.clone());
            if let Some(observability_line) = DenialTracker::<C>::observability_line(classification.action, &event) {
                tracing::warn!(target = %event.target, count = classification.count, "{observability_line}");
            }
            match classification.action {
                DenialAction::Delay => {
                    let pid = wiring.pid.load(Ordering::SeqCst);
                    if pid != 0 {
                        let _ = pause(pid, true);
                        let delay = wiring.denial_tracker.delay_duration();
                        tokio::spawn(async move {
                            tokio::time::sleep(delay).await;
                            let _ = resume(pid, true);
                        });
                    }
                }
                DenialAction::FailFast => {
                    *wiring.fail_fast.lock() = Some(FailFastDescriptor { operation: event.operation, target: event.target.clone() });
                    wiring.watchdog.trigger_sandbox_denial(event);
                }
                DenialAction::Warn | DenialAction::None => {}
            }
        }
    }
}

/// Drive one agent invocation end to end: stage credentials, build the
/// manifest, spawn under a watchdog, and settle the record as `succeeded` or
/// `failed`. `artifacts_dir` is `.../sessions/<runId>/<agentId>/artifacts`.
#[allow(clippy::too_many_arguments)]
pub async fn execute_agent_invocation<C, Cred, Manifest, Artifacts, Evals>(
    clock: &C,
    store: &Arc<Store<RunRecord>>,
    registry: &Arc<ActiveRunRegistry<C>>,
    credential_stager: &Cred,
    manifest_builder: &Manifest,
    artifact_stager: &Artifacts,
    eval_runner: &Evals,
    run_id: &RunId,
    agent_invocation_id: &AgentInvocationId,
    artifacts_dir: &Path,
    workspace_dir: &Path,
) -> Result<(), CoordinatorError>
where
    C: Clock + 'static,
    Cred: CredentialStager,
    Manifest: ManifestBuilder,
    Artifacts: ArtifactStager,
    Evals: EvalRunner,
{
    let span = tracing::info_span!("agent.invocation", run_id = %run_id, agent_invocation_id = %agent_invocation_id);
    let _enter = span.enter();

    let (agent_id, provider_id) = {
        let record = store
            .snapshot(run_id.as_str())
            .await?
            .ok_or_else(|| CoordinatorError::preflight(format!("run {run_id} not found")))?;
        let invocation = record.invocation(agent_invocation_id)?;
        (invocation.agent_id.clone(), invocation.provider_id.clone())
    };

    // The invocation is already `queued` from the run's initial append;
    // force a flush so it is independently observable before staging begins.
    store.flush(run_id.as_str()).await?;

    let credentials = credential_stager.stage(&agent_id).await.map_err(|err| {
        CoordinatorError::preflight(format!("failed to stage credentials for {agent_id}: {err}"))
    })?;

    let sandbox_invocation = match manifest_builder.build(&agent_id, &credentials).await {
        Ok(invocation) => invocation,
        Err(err) => {
            credential_stager.release(credentials).await;
            return Err(CoordinatorError::preflight(format!(
                "failed to build manifest for {agent_id}: {err}"
            )));
        }
    };

    let started_at_ms = clock.epoch_ms();
    store
        .rewrite(run_id.as_str(), {
            let agent_invocation_id = agent_invocation_id.clone();
            move |mut record| {
                if let Ok(inv) = record.invocation_mut(&agent_invocation_id) {
                    inv.status = AgentInvocationStatus::Running;
                    inv.started_at_ms = Some(started_at_ms);
                }
                record
            }
        })
        .await?;

    tokio::fs::create_dir_all(artifacts_dir).await.map_err(|source| {
        CoordinatorError::preflight(format!("failed to create {}: {source}", artifacts_dir.display()))
    })?;

    let watchdog = Arc::new(Watchdog::new(clock.clone(), provider_id.clone()));
    let denial_tracker = Arc::new(DenialTracker::new(clock.clone(), Default::default()));
    let pid_cell = Arc::new(AtomicU32::new(0));
    let fail_fast_cell: Arc<SyncMutex<Option<FailFastDescriptor>>> = Arc::new(SyncMutex::new(None));
    let wiring = Arc::new(DenialWiring {
        watchdog: Arc::clone(&watchdog),
        denial_tracker,
        pid: Arc::clone(&pid_cell),
        fail_fast: Arc::clone(&fail_fast_cell),
    });
    let stderr_capture = Arc::new(SyncMutex::new(String::new()));

    let (stdout_tx, stdout_rx) = mpsc::unbounded_channel();
    let (stderr_tx, stderr_rx) = mpsc::unbounded_channel();
    let stdout_pump = tokio::spawn(pump_output(
        stdout_rx,
        artifacts_dir.join("stdout.log"),
        Arc::new(SyncMutex::new(String::new())),
        Arc::clone(&wiring),
    ));
    let stderr_pump = tokio::spawn(pump_output(
        stderr_rx,
        artifacts_dir.join("stderr.log"),
        Arc::clone(&stderr_capture),
        wiring,
    ));

    let abort = CancellationToken::new();
    let trigger = watchdog.trigger_handle();
    let tick_stop = CancellationToken::new();
    let tick_loop = tokio::spawn(Arc::clone(&watchdog).run_tick_loop(tick_stop.clone()));
    let spawn_config = SpawnConfig {
        command: sandbox_invocation.command,
        args: sandbox_invocation.args,
        cwd: sandbox_invocation.cwd,
        env: sandbox_invocation.env,
        detached: true,
    };

    let registered_child = InFlightChild { agent_invocation_id: agent_invocation_id.clone(), abort: abort.clone() };
    let registry_for_spawn = Arc::clone(registry);
    let spawn_result = spawn(
        spawn_config,
        stdout_tx,
        stderr_tx,
        move |pid| {
            pid_cell.store(pid, Ordering::SeqCst);
            registry_for_spawn.add_child(registered_child);
        },
        trigger,
        abort,
    )
    .await;

    tick_stop.cancel();
    let _ = tokio::join!(stdout_pump, stderr_pump, tick_loop);
    credential_stager.release(credentials).await;

    let completed_at_ms = clock.epoch_ms();
    let watchdog_trigger = watchdog.triggered();
    let watchdog_meta = WatchdogMeta {
        silence_timeout_ms: voratiq_process::watchdog::SILENCE_TIMEOUT.as_millis() as u64,
        wall_clock_cap_ms: voratiq_process::watchdog::WALL_CLOCK_CAP.as_millis() as u64,
        trigger: watchdog_trigger,
    };

    let outcome = match spawn_result {
        Ok(outcome) => outcome,
        Err(err) => {
            settle_failed(store, run_id, agent_invocation_id, completed_at_ms, Some(watchdog_meta), None, err.to_string())
                .await?;
            return Ok(());
        }
    };

    let failed = outcome.aborted || outcome.exit_code != 0;
    if failed {
        let stderr_text = stderr_capture.lock().clone();
        let detail = scan_failure_detail(&provider_id, &stderr_text).unwrap_or_else(|| {
            if outcome.aborted {
                "agent process did not exit after escalation".to_string()
            } else {
                format!("agent exited with status {}", outcome.exit_code)
            }
        });
        let fail_fast = fail_fast_cell.lock().clone();
        settle_failed(store, run_id, agent_invocation_id, completed_at_ms, Some(watchdog_meta), fail_fast, detail).await?;
        return Ok(());
    }

    let staged = artifact_stager
        .promote(&agent_id, workspace_dir)
        .await
        .map_err(|err| CoordinatorError::preflight(format!("failed to promote artifacts for {agent_id}: {err}")))?;
    let evals = eval_runner
        .run_evals(&agent_id)
        .await
        .map_err(|err| CoordinatorError::preflight(format!("failed to run evals for {agent_id}: {err}")))?;

    store
        .rewrite(run_id.as_str(), {
            let agent_invocation_id = agent_invocation_id.clone();
            let staged_diff_stats = staged.diff_stats;
            let summary_captured = staged.summary_captured;
            let chat_captured = staged.chat_captured;
            let watchdog_meta = watchdog_meta.clone();
            move |mut record| {
                if let Ok(inv) = record.invocation_mut(&agent_invocation_id) {
                    // An external abort may have already marked this invocation
                    // terminal (and cancelled this invocation's own settle path
                    // concurrently); don't clobber that outcome.
                    if !inv.status.is_terminal() {
                        inv.status = AgentInvocationStatus::Succeeded;
                        inv.completed_at_ms = Some(completed_at_ms);
                        inv.artifacts.diff_attempted = true;
                        inv.artifacts.diff_captured = staged_diff_stats.is_some();
                        inv.artifacts.summary_captured = summary_captured;
                        inv.artifacts.chat_captured = chat_captured;
                        inv.diff_stats = staged_diff_stats;
                        inv.evals = evals.clone();
                        inv.watchdog = Some(watchdog_meta.clone());
                    }
                }
                record.status = record.derive_status();
                record
            }
        })
        .await?;

    Ok(())
}

async fn settle_failed(
    store: &Arc<Store<RunRecord>>,
    run_id: &RunId,
    agent_invocation_id: &AgentInvocationId,
    completed_at_ms: u64,
    watchdog_meta: Option<WatchdogMeta>,
    fail_fast: Option<FailFastDescriptor>,
    error_message: String,
) -> Result<(), CoordinatorError> {
    store
        .rewrite(run_id.as_str(), {
            let agent_invocation_id = agent_invocation_id.clone();
            move |mut record| {
                if let Ok(inv) = record.invocation_mut(&agent_invocation_id) {
                    // Same race as the success path: an external abort may
                    // have already settled this invocation as `aborted`.
                    if !inv.status.is_terminal() {
                        inv.status = AgentInvocationStatus::Failed;
                        inv.completed_at_ms = Some(completed_at_ms);
                        inv.artifacts.diff_attempted = false;
                        inv.artifacts.diff_captured = false;
                        inv.watchdog = watchdog_meta.clone();
                        inv.fail_fast = fail_fast.clone();
                        inv.error_message = Some(error_message.clone());
                    }
                }
                record.status = record.derive_status();
                record
            }
        })
        .await?;
    Ok(())
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
