// SPDX-License-Identifier: MIT

//! The [`SessionRecord`] seam: the store is generic over the record shape so
//! one implementation serves the `runs`, `reviews`, and `specs` domains.

use serde::{de::DeserializeOwned, Serialize};
use voratiq_core::{ReviewSession, RunRecord, SpecRecord};

/// A domain's durable record shape.
pub trait SessionRecord: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    fn id(&self) -> String;
    fn status_str(&self) -> String;
    fn is_terminal(&self) -> bool;
    fn created_at_ms(&self) -> u64;

    /// Apply-status merge policy (runs only): on flush, reconcile the
    /// buffered value against whatever is already on disk. A no-op for
    /// domains without a mergeable sub-record.
    fn merge_on_flush(&mut self, _on_disk: &Self) {}
}

impl SessionRecord for RunRecord {
    fn id(&self) -> String {
        self.id.as_str().to_string()
    }

    fn status_str(&self) -> String {
        self.status.to_string()
    }

    fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    fn created_at_ms(&self) -> u64 {
        self.created_at_ms
    }

    fn merge_on_flush(&mut self, on_disk: &Self) {
        if let Some(on_disk_status) = on_disk.apply_status.clone() {
            self.apply_status = Some(voratiq_core::ApplyStatus::merge(self.apply_status.clone(), on_disk_status));
        }
    }
}

impl SessionRecord for ReviewSession {
    fn id(&self) -> String {
        self.id.as_str().to_string()
    }

    fn status_str(&self) -> String {
        self.status.to_string()
    }

    fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    fn created_at_ms(&self) -> u64 {
        self.created_at_ms
    }
}

impl SessionRecord for SpecRecord {
    fn id(&self) -> String {
        self.id.as_str().to_string()
    }

    fn status_str(&self) -> String {
        self.status.to_string()
    }

    /// Every `specs` status (`saved`/`failed`/`aborted`) is terminal: a spec
    /// descriptor is never revisited after it is written.
    fn is_terminal(&self) -> bool {
        true
    }

    fn created_at_ms(&self) -> u64 {
        self.created_at_ms
    }
}
