// SPDX-License-Identifier: MIT

//! Status enums for the session/agent-invocation/evaluation data model.

use serde::{Deserialize, Serialize};

/// Lifecycle status of a run session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Queued,
    Running,
    Succeeded,
    Failed,
    Aborted,
    Pruned,
}

impl RunStatus {
    /// A run is terminal once every agent invocation has reached a terminal status.
    /// `Pruned` is terminal by construction: it only follows a prior terminal status.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Succeeded | Self::Failed | Self::Aborted | Self::Pruned
        )
    }
}

crate::simple_display! {
    RunStatus {
        Queued => "queued",
        Running => "running",
        Succeeded => "succeeded",
        Failed => "failed",
        Aborted => "aborted",
        Pruned => "pruned",
    }
}

/// Lifecycle status of a single agent invocation within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentInvocationStatus {
    Queued,
    Running,
    Succeeded,
    Failed,
    Aborted,
}

impl AgentInvocationStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Aborted)
    }
}

crate::simple_display! {
    AgentInvocationStatus {
        Queued => "queued",
        Running => "running",
        Succeeded => "succeeded",
        Failed => "failed",
        Aborted => "aborted",
    }
}

/// Status of an evaluation snapshot captured for an agent invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvalStatus {
    Queued,
    Running,
    Succeeded,
    Failed,
    Skipped,
}

crate::simple_display! {
    EvalStatus {
        Queued => "queued",
        Running => "running",
        Succeeded => "succeeded",
        Failed => "failed",
        Skipped => "skipped",
    }
}

/// Lifecycle status of a competition review session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    Queued,
    Running,
    Succeeded,
    Failed,
    Aborted,
}

impl ReviewStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Aborted)
    }
}

crate::simple_display! {
    ReviewStatus {
        Queued => "queued",
        Running => "running",
        Succeeded => "succeeded",
        Failed => "failed",
        Aborted => "aborted",
    }
}

/// Status of a spec-descriptor record in the session index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpecStatus {
    Saved,
    Failed,
    Aborted,
}

crate::simple_display! {
    SpecStatus {
        Saved => "saved",
        Failed => "failed",
        Aborted => "aborted",
    }
}

/// What tripped a watchdog on a running agent invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WatchdogTrigger {
    Silence,
    WallClock,
    FatalPattern,
    SandboxDenial,
}

crate::simple_display! {
    WatchdogTrigger {
        Silence => "silence",
        WallClock => "wall-clock",
        FatalPattern => "fatal-pattern",
        SandboxDenial => "sandbox-denial",
    }
}

/// The filesystem/network operation a sandbox denial was raised against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailFastOperation {
    NetworkConnect,
    FileRead,
    FileWrite,
}

crate::simple_display! {
    FailFastOperation {
        NetworkConnect => "network-connect",
        FileRead => "file-read",
        FileWrite => "file-write",
    }
}

/// Wire format an agent process's transcript is framed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatFormat {
    Json,
    Jsonl,
}

crate::simple_display! {
    ChatFormat {
        Json => "json",
        Jsonl => "jsonl",
    }
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
