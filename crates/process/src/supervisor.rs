// SPDX-License-Identifier: MIT

//! Process Supervisor (C2): spawns a child, pipes its output to caller
//! sinks, and couples natural exit, watchdog escalation, and external abort
//! into one bounded `spawn()` call.

use crate::error::ProcessError;
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio::sync::Notify;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

/// How long to wait after `SIGTERM` before escalating to `SIGKILL`.
pub const KILL_GRACE: Duration = Duration::from_secs(5);
/// How long to wait after `SIGKILL` before giving up and firing `abortSignal`.
pub const HARD_ABORT: Duration = Duration::from_secs(10);

const PIPE_CHUNK_SIZE: usize = 8192;

#[derive(Debug, Clone)]
pub struct SpawnConfig {
    pub command: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
    pub env: HashMap<String, String>,
    /// When true the child starts in its own process group; termination
    /// targets the negative pid (the whole group) rather than just the child.
    pub detached: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpawnOutcome {
    pub exit_code: i32,
    pub signal: Option<i32>,
    pub aborted: bool,
}

/// A handle the watchdog holds to ask the supervisor to begin escalation.
/// `fire()` is idempotent: only the first call has any effect.
#[derive(Clone, Default)]
pub struct EscalationTrigger(std::sync::Arc<Notify>);

impl EscalationTrigger {
    pub fn new() -> Self {
        Self(std::sync::Arc::new(Notify::new()))
    }

    pub fn fire(&self) {
        self.0.notify_one();
    }

    pub async fn triggered(&self) {
        self.0.notified().await;
    }
}

/// Spawn `config`, streaming stdout/stderr chunks to the given channels.
/// `on_spawn` is called once the child's pid is known. Resolves once the
/// child exits naturally, is escalated to death by `trigger`, or `abort`
/// fires (in which case the call resolves immediately with
/// `{exit_code:1, signal:SIGKILL, aborted:true}` without waiting for the
/// pipe tasks to finish).
#[allow(clippy::too_many_arguments)]
pub async fn spawn(
    config: SpawnConfig,
    stdout_tx: mpsc::UnboundedSender<Vec<u8>>,
    stderr_tx: mpsc::UnboundedSender<Vec<u8>>,
    on_spawn: impl FnOnce(u32) + Send,
    trigger: EscalationTrigger,
    abort: CancellationToken,
) -> Result<SpawnOutcome, ProcessError> {
    let mut cmd = Command::new(&config.command);
    cmd.args(&config.args)
        .current_dir(&config.cwd)
        .envs(&config.env)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    if config.detached {
        cmd.process_group(0);
    }

    let mut child = cmd.spawn().map_err(|source| ProcessError::Spawn {
        command: config.command.clone(),
        source,
    })?;

    let pid = child.id().unwrap_or(0);
    on_spawn(pid);
    tracing::debug!(pid, detached = config.detached, "process spawned");

    let stdout = child.stdout.take();
    let stderr = child.stderr.take();
    let stdout_task = tokio::spawn(pipe_to_channel(stdout, stdout_tx));
    let stderr_task = tokio::spawn(pipe_to_channel(stderr, stderr_tx));

    tokio::select! {
        status = child.wait() => {
            let status = status.map_err(ProcessError::Wait)?;
            let _ = tokio::join!(stdout_task, stderr_task);
            Ok(SpawnOutcome {
                exit_code: status.code().unwrap_or(-1),
                signal: unix_signal_number(&status),
                aborted: false,
            })
        }
        _ = trigger.triggered() => {
            escalate(pid, config.detached, &mut child).await
        }
        _ = abort.cancelled() => {
            kill_now(pid, config.detached);
            Ok(SpawnOutcome { exit_code: 1, signal: Some(Signal::SIGKILL as i32), aborted: true })
        }
    }
}

/// Escalation (C2): `SIGTERM` the group, wait `KILL_GRACE`, `SIGKILL`, wait
/// `HARD_ABORT`; if the child still hasn't exited, give up and report aborted.
async fn escalate(
    pid: u32,
    detached: bool,
    child: &mut tokio::process::Child,
) -> Result<SpawnOutcome, ProcessError> {
    signal(pid, detached, Signal::SIGTERM)?;
    tracing::info!(pid, "watchdog escalation: sent SIGTERM");

    if let Some(status) = wait_with_timeout(child, KILL_GRACE).await? {
        return Ok(SpawnOutcome {
            exit_code: status.code().unwrap_or(-1),
            signal: unix_signal_number(&status),
            aborted: false,
        });
    }

    signal(pid, detached, Signal::SIGKILL)?;
    tracing::warn!(pid, "watchdog escalation: sent SIGKILL");

    if let Some(status) = wait_with_timeout(child, HARD_ABORT).await? {
        return Ok(SpawnOutcome {
            exit_code: status.code().unwrap_or(-1),
            signal: unix_signal_number(&status),
            aborted: false,
        });
    }

    tracing::error!(pid, "child did not exit after SIGKILL, giving up");
    Ok(SpawnOutcome {
        exit_code: 1,
        signal: Some(Signal::SIGKILL as i32),
        aborted: true,
    })
}

async fn wait_with_timeout(
    child: &mut tokio::process::Child,
    timeout: Duration,
) -> Result<Option<std::process::ExitStatus>, ProcessError> {
    tokio::select! {
        status = child.wait() => status.map(Some).map_err(ProcessError::Wait),
        _ = sleep(timeout) => Ok(None),
    }
}

fn kill_now(pid: u32, detached: bool) {
    if signal(pid, detached, Signal::SIGKILL).is_err() {
        let _ = signal(pid, false, Signal::SIGKILL);
    }
}

/// Signal `pid`. If `detached`, targets the process group (negative pid);
/// on failure (e.g. the child already exited and the group is gone) retries
/// once against the single process and swallows the second error.
pub fn signal(pid: u32, detached: bool, sig: Signal) -> Result<(), ProcessError> {
    let target = if detached { -(pid as i32) } else { pid as i32 };
    match kill(Pid::from_raw(target), sig) {
        Ok(()) => Ok(()),
        Err(_) if detached => kill(Pid::from_raw(pid as i32), sig).or(Ok(())),
        Err(source) => Err(ProcessError::Signal { pid: target, source }),
    }
}

/// Pause the process group. Used by the denial backoff tracker (C4) around
/// a `delay` decision; never resolves the spawn call.
pub fn pause(pid: u32, detached: bool) -> Result<(), ProcessError> {
    signal(pid, detached, Signal::SIGSTOP)
}

/// Resume a paused process group.
pub fn resume(pid: u32, detached: bool) -> Result<(), ProcessError> {
    signal(pid, detached, Signal::SIGCONT)
}

async fn pipe_to_channel(
    stream: Option<impl tokio::io::AsyncRead + Unpin>,
    tx: mpsc::UnboundedSender<Vec<u8>>,
) {
    let Some(stream) = stream else { return };
    let mut reader = BufReader::new(stream);
    let mut buf = vec![0u8; PIPE_CHUNK_SIZE];
    loop {
        match reader.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => {
                if tx.send(buf[..n].to_vec()).is_err() {
                    break;
                }
            }
            Err(_) => break,
        }
    }
}

fn unix_signal_number(status: &std::process::ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal()
}

#[cfg(test)]
#[path = "supervisor_tests.rs"]
mod tests;
