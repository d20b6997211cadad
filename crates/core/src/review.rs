// SPDX-License-Identifier: MIT

//! The competition review session record: same shape as a run session but
//! keyed by reviewer agents rather than candidate agents.

use crate::ids::ReviewId;
use crate::status::ReviewStatus;
use serde::{Deserialize, Serialize};

const ALIAS_ALPHABET: [char; 16] =
    ['0', '1', '2', '3', '4', '5', '6', '7', '8', '9', 'a', 'b', 'c', 'd', 'e', 'f'];

/// Mint a blinded alias with no relation to input order, so a reviewer can't
/// infer a candidate's position in the original list from its alias.
fn blinded_alias() -> String {
    format!("r_{}", nanoid::nanoid!(10, &ALIAS_ALPHABET))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewerRecord {
    pub reviewer_agent_id: String,
    /// Blinded alias (`r_<10 lowercase hex>`) presented to the reviewer in
    /// place of the real candidate agent id.
    pub alias: String,
    pub output_path: String,
    pub status: ReviewStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewSession {
    pub id: ReviewId,
    pub base_revision: String,
    pub reviewer_agent_ids: Vec<String>,
    pub reviewers: Vec<ReviewerRecord>,
    pub status: ReviewStatus,
    pub created_at_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at_ms: Option<u64>,
}

impl ReviewSession {
    pub fn new(id: ReviewId, base_revision: impl Into<String>, reviewer_agent_ids: Vec<String>, created_at_ms: u64) -> Self {
        let reviewers = reviewer_agent_ids
            .iter()
            .map(|reviewer_agent_id| ReviewerRecord {
                reviewer_agent_id: reviewer_agent_id.clone(),
                alias: blinded_alias(),
                output_path: String::new(),
                status: ReviewStatus::Queued,
                error_message: None,
            })
            .collect();
        Self {
            id,
            base_revision: base_revision.into(),
            reviewer_agent_ids,
            reviewers,
            status: ReviewStatus::Queued,
            created_at_ms,
            deleted_at_ms: None,
        }
    }

    pub fn derive_status(&self) -> ReviewStatus {
        if self
            .reviewers
            .iter()
            .any(|r| matches!(r.status, ReviewStatus::Queued | ReviewStatus::Running))
        {
            return ReviewStatus::Running;
        }
        if self.reviewers.iter().any(|r| r.status == ReviewStatus::Aborted) {
            return ReviewStatus::Aborted;
        }
        if self.reviewers.iter().any(|r| r.status == ReviewStatus::Failed) {
            return ReviewStatus::Failed;
        }
        ReviewStatus::Succeeded
    }
}
