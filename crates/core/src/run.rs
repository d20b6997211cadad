// SPDX-License-Identifier: MIT

//! The run session record: a spec submitted to one or more agent invocations.

use crate::error::CoreError;
use crate::ids::{AgentInvocationId, RunId};
use crate::invocation::AgentInvocation;
use crate::status::{AgentInvocationStatus, RunStatus};
use serde::{Deserialize, Serialize};

/// Apply-status is monotonic by timestamp (invariant 7): on merge, the entry
/// with the later `applied_at_ms` wins; ties keep the existing (buffered) value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplyStatus {
    pub applied_at_ms: u64,
    pub commit_sha: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_agent_id: Option<String>,
}

impl ApplyStatus {
    /// Merge `incoming` into `current` per invariant 7. Returns the value that wins.
    pub fn merge(current: Option<Self>, incoming: Self) -> Self {
        match current {
            Some(current) if current.applied_at_ms > incoming.applied_at_ms => current,
            Some(current) if current.applied_at_ms == incoming.applied_at_ms => current,
            _ => incoming,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    pub id: RunId,
    pub base_revision: String,
    pub spec_path: String,
    pub agent_invocations: Vec<AgentInvocation>,
    pub status: RunStatus,
    pub created_at_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub apply_status: Option<ApplyStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at_ms: Option<u64>,
}

impl RunRecord {
    pub fn new(
        id: RunId,
        base_revision: impl Into<String>,
        spec_path: impl Into<String>,
        agent_invocations: Vec<AgentInvocation>,
        created_at_ms: u64,
    ) -> Result<Self, CoreError> {
        if agent_invocations.is_empty() {
            return Err(CoreError::EmptyRun { run_id: id });
        }
        Ok(Self {
            id,
            base_revision: base_revision.into(),
            spec_path: spec_path.into(),
            agent_invocations,
            status: RunStatus::Queued,
            created_at_ms,
            apply_status: None,
            deleted_at_ms: None,
        })
    }

    pub fn invocation(&self, id: &AgentInvocationId) -> Result<&AgentInvocation, CoreError> {
        self.agent_invocations
            .iter()
            .find(|inv| &inv.id == id)
            .ok_or_else(|| CoreError::InvocationNotInRun {
                run_id: self.id.clone(),
                agent_invocation_id: id.clone(),
            })
    }

    pub fn invocation_mut(&mut self, id: &AgentInvocationId) -> Result<&mut AgentInvocation, CoreError> {
        let run_id = self.id.clone();
        self.agent_invocations
            .iter_mut()
            .find(|inv| &inv.id == id)
            .ok_or(CoreError::InvocationNotInRun {
                run_id,
                agent_invocation_id: id.clone(),
            })
    }

    /// Overall run status derives from the invocations: `running` until every
    /// invocation reaches a terminal status, then the aggregate per the
    /// component design (any aborted wins over any failed, which wins over
    /// all-succeeded).
    pub fn derive_status(&self) -> RunStatus {
        if self
            .agent_invocations
            .iter()
            .any(|inv| inv.status == AgentInvocationStatus::Queued || inv.status == AgentInvocationStatus::Running)
        {
            return RunStatus::Running;
        }
        if self
            .agent_invocations
            .iter()
            .any(|inv| inv.status == AgentInvocationStatus::Aborted)
        {
            return RunStatus::Aborted;
        }
        if self
            .agent_invocations
            .iter()
            .any(|inv| inv.status == AgentInvocationStatus::Failed)
        {
            return RunStatus::Failed;
        }
        RunStatus::Succeeded
    }

    pub fn merge_apply_status(&mut self, incoming: ApplyStatus) {
        self.apply_status = Some(ApplyStatus::merge(self.apply_status.take(), incoming));
    }
}

#[cfg(test)]
#[path = "run_tests.rs"]
mod tests;
