// SPDX-License-Identifier: MIT

//! The spec session record: a saved spec descriptor staged for `run`/`review`.

use crate::ids::SpecId;
use crate::status::SpecStatus;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpecRecord {
    pub id: SpecId,
    pub path: String,
    pub status: SpecStatus,
    pub created_at_ms: u64,
}

impl SpecRecord {
    pub fn saved(id: SpecId, path: impl Into<String>, created_at_ms: u64) -> Self {
        Self {
            id,
            path: path.into(),
            status: SpecStatus::Saved,
            created_at_ms,
        }
    }
}
