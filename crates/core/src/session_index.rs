// SPDX-License-Identifier: MIT

//! The per-domain session index: `index.json` lists every session id that
//! has a record on disk, in insertion order, with its latest terminal status.

use serde::{Deserialize, Serialize};

pub const SESSION_INDEX_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionIndexEntry {
    pub id: String,
    pub created_at_ms: u64,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionIndex {
    pub version: u32,
    #[serde(default)]
    pub sessions: Vec<SessionIndexEntry>,
}

impl Default for SessionIndex {
    fn default() -> Self {
        Self {
            version: SESSION_INDEX_VERSION,
            sessions: Vec::new(),
        }
    }
}

impl SessionIndex {
    /// Invariant 2: a record exists on disk iff its id appears in the index.
    /// Insert on first append; update in place on status change; insertion
    /// order is preserved.
    pub fn upsert(&mut self, id: impl Into<String>, created_at_ms: u64, status: impl Into<String>) {
        let id = id.into();
        let status = status.into();
        if let Some(entry) = self.sessions.iter_mut().find(|e| e.id == id) {
            entry.status = status;
        } else {
            self.sessions.push(SessionIndexEntry {
                id,
                created_at_ms,
                status,
            });
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.sessions.iter().any(|e| e.id == id)
    }

    pub fn remove(&mut self, id: &str) {
        self.sessions.retain(|e| e.id != id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upsert_inserts_new_entry_in_order() {
        let mut index = SessionIndex::default();
        index.upsert("run-1", 10, "queued");
        index.upsert("run-2", 20, "queued");
        let ids: Vec<_> = index.sessions.iter().map(|e| e.id.clone()).collect();
        assert_eq!(ids, vec!["run-1", "run-2"]);
    }

    #[test]
    fn upsert_updates_status_in_place_preserving_order() {
        let mut index = SessionIndex::default();
        index.upsert("run-1", 10, "queued");
        index.upsert("run-2", 20, "queued");
        index.upsert("run-1", 10, "succeeded");
        assert_eq!(index.sessions[0].status, "succeeded");
        assert_eq!(index.sessions[0].id, "run-1");
        assert_eq!(index.sessions.len(), 2);
    }

    #[test]
    fn remove_drops_entry() {
        let mut index = SessionIndex::default();
        index.upsert("run-1", 10, "queued");
        index.remove("run-1");
        assert!(!index.contains("run-1"));
    }

    #[test]
    fn default_carries_current_version() {
        let index = SessionIndex::default();
        assert_eq!(index.version, SESSION_INDEX_VERSION);
        assert!(index.sessions.is_empty());
    }
}
