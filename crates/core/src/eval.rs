// SPDX-License-Identifier: MIT

//! Evaluation snapshots captured for a completed agent invocation.

use crate::status::EvalStatus;
use serde::{Deserialize, Serialize};

/// The result of running one configured evaluation against an agent's work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvalSnapshot {
    pub slug: String,
    pub status: EvalStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_log: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl EvalSnapshot {
    pub fn queued(slug: impl Into<String>) -> Self {
        Self {
            slug: slug.into(),
            status: EvalStatus::Queued,
            exit_code: None,
            command: None,
            has_log: None,
            error: None,
        }
    }

    pub fn skipped(slug: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            slug: slug.into(),
            status: EvalStatus::Skipped,
            exit_code: None,
            command: None,
            has_log: None,
            error: Some(reason.into()),
        }
    }
}
