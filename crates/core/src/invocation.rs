// SPDX-License-Identifier: MIT

//! The agent invocation record: one agent's run within a session.

use crate::eval::EvalSnapshot;
use crate::ids::AgentInvocationId;
use crate::status::{AgentInvocationStatus, ChatFormat, FailFastOperation, WatchdogTrigger};
use serde::{Deserialize, Serialize};

/// Which artifacts were attempted/captured for an agent invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ArtifactFlags {
    pub diff_attempted: bool,
    pub diff_captured: bool,
    pub stdout_captured: bool,
    pub stderr_captured: bool,
    pub summary_captured: bool,
    pub chat_captured: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chat_format: Option<ChatFormat>,
}

/// Watchdog configuration and outcome recorded on a terminal invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchdogMeta {
    pub silence_timeout_ms: u64,
    pub wall_clock_cap_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trigger: Option<WatchdogTrigger>,
}

/// Sandbox fail-fast descriptor: set iff the watchdog fired on a
/// `sandbox-denial` trigger raised by the denial backoff tracker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailFastDescriptor {
    pub operation: FailFastOperation,
    pub target: String,
}

/// Line-item statistics for a captured diff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DiffStats {
    pub files_changed: u32,
    pub insertions: u32,
    pub deletions: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentInvocation {
    pub id: AgentInvocationId,
    pub agent_id: String,
    pub provider_id: String,
    pub model: String,
    pub status: AgentInvocationStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commit_sha: Option<String>,
    pub artifacts: ArtifactFlags,
    #[serde(default)]
    pub evals: Vec<EvalSnapshot>,
    #[serde(default)]
    pub warnings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diff_stats: Option<DiffStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub watchdog: Option<WatchdogMeta>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fail_fast: Option<FailFastDescriptor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl AgentInvocation {
    pub fn queued(id: AgentInvocationId, agent_id: impl Into<String>, provider_id: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            id,
            agent_id: agent_id.into(),
            provider_id: provider_id.into(),
            model: model.into(),
            status: AgentInvocationStatus::Queued,
            started_at_ms: None,
            completed_at_ms: None,
            commit_sha: None,
            artifacts: ArtifactFlags::default(),
            evals: Vec::new(),
            warnings: Vec::new(),
            diff_stats: None,
            watchdog: None,
            fail_fast: None,
            error_message: None,
        }
    }

    /// Invariant 5: `failFastTriggered` holds iff both operation and target are present.
    /// `fail_fast` is an `Option<FailFastDescriptor>` so this holds by construction;
    /// this predicate exists for callers that need a boolean.
    pub fn fail_fast_triggered(&self) -> bool {
        self.fail_fast.is_some()
    }

    /// Invariant 4: terminal statuses require `started_at`/`completed_at`;
    /// `succeeded` additionally requires an (possibly empty) `evals` list, which
    /// this struct always carries, so only the timestamps are checked here.
    pub fn satisfies_terminal_invariant(&self) -> bool {
        if !self.status.is_terminal() {
            return true;
        }
        self.started_at_ms.is_some() && self.completed_at_ms.is_some()
    }

    /// Invariant 6: a watchdog-triggered termination always carries both
    /// `watchdog.trigger` and an `error_message`.
    pub fn satisfies_watchdog_invariant(&self) -> bool {
        match &self.watchdog {
            Some(meta) if meta.trigger.is_some() => self.error_message.is_some(),
            _ => true,
        }
    }
}

#[cfg(test)]
#[path = "invocation_tests.rs"]
mod tests;
