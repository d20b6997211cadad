// SPDX-License-Identifier: MIT

//! Session Record Store (C5): append-once + rewrite-with-mutation session
//! records, a write-behind buffer that coalesces repeated rewrites, and a
//! per-domain index kept in sync with every flush.

use crate::domain::Domain;
use crate::error::StoreError;
use crate::lock::SessionLock;
use crate::record::SessionRecord;
use parking_lot::Mutex as SyncMutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex as AsyncMutex;
use voratiq_core::SessionIndex;

/// Coalescing window for a scheduled (non-terminal) flush.
pub const FLUSH_COALESCE: Duration = Duration::from_millis(250);

struct BufferEntry<R> {
    record: R,
    dirty: bool,
    flush_scheduled: bool,
}

pub struct Store<R: SessionRecord> {
    domain: Domain,
    workspace_root: PathBuf,
    lock: SessionLock,
    flush_delay: Duration,
    buffer: SyncMutex<HashMap<String, BufferEntry<R>>>,
    id_locks: SyncMutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl<R: SessionRecord> Store<R> {
    pub fn new(workspace_root: PathBuf, domain: Domain) -> Arc<Self> {
        let lock = SessionLock::new(domain.lock_path(&workspace_root), domain.dir_name());
        Arc::new(Self {
            domain,
            workspace_root,
            lock,
            flush_delay: FLUSH_COALESCE,
            buffer: SyncMutex::new(HashMap::new()),
            id_locks: SyncMutex::new(HashMap::new()),
        })
    }

    /// Fails if the id's `record.json` already exists. Writes synchronously
    /// (not write-behind) and registers the buffer entry clean.
    pub async fn append(self: &Arc<Self>, record: R) -> Result<(), StoreError> {
        let id = record.id();
        let path = self.domain.record_path(&self.workspace_root, &id);
        if path.exists() {
            return Err(StoreError::AlreadyExists {
                domain: self.domain.dir_name(),
                id,
            });
        }
        self.write_record_and_index(&id, &record).await?;
        self.buffer.lock().insert(
            id,
            BufferEntry {
                record,
                dirty: false,
                flush_scheduled: false,
            },
        );
        Ok(())
    }

    /// Load the current record (buffered, else on-disk), apply `mutate`, and
    /// either force-flush (terminal status) or schedule a coalesced flush.
    pub async fn rewrite(
        self: &Arc<Self>,
        id: &str,
        mutate: impl FnOnce(R) -> R,
    ) -> Result<R, StoreError> {
        let current = self.snapshot(id).await?.ok_or_else(|| StoreError::NotFound {
            domain: self.domain.dir_name(),
            id: id.to_string(),
        })?;
        let mutated = mutate(current);
        let terminal = mutated.is_terminal();
        {
            let mut buffer = self.buffer.lock();
            let flush_scheduled = buffer.get(id).map(|e| e.flush_scheduled).unwrap_or(false);
            buffer.insert(
                id.to_string(),
                BufferEntry {
                    record: mutated.clone(),
                    dirty: true,
                    flush_scheduled,
                },
            );
        }
        if terminal {
            self.flush(id).await?;
            self.dispose(id);
        } else {
            self.schedule_flush(id.to_string());
        }
        Ok(mutated)
    }

    /// A deep copy of the buffered record if present, else the on-disk copy.
    pub async fn snapshot(&self, id: &str) -> Result<Option<R>, StoreError> {
        if let Some(entry) = self.buffer.lock().get(id) {
            return Ok(Some(entry.record.clone()));
        }
        self.load_from_disk(id).await
    }

    /// Flush `id`'s buffered record if dirty. A no-op if another caller's
    /// flush already persisted it (observed via the dirty flag after
    /// acquiring the per-id lock, approximating "a single flush promise is
    /// awaited by other callers").
    pub async fn flush(self: &Arc<Self>, id: &str) -> Result<(), StoreError> {
        let id_lock = self.id_lock(id);
        let _guard = id_lock.lock().await;

        let record = match self.buffer.lock().get(id) {
            Some(entry) if entry.dirty => entry.record.clone(),
            _ => return Ok(()),
        };
        self.write_record_and_index(id, &record).await?;
        if let Some(entry) = self.buffer.lock().get_mut(id) {
            entry.dirty = false;
            entry.flush_scheduled = false;
        }
        Ok(())
    }

    pub async fn flush_all(self: &Arc<Self>) -> Result<(), StoreError> {
        let ids: Vec<String> = self.buffer.lock().keys().cloned().collect();
        for id in ids {
            self.flush(&id).await?;
        }
        Ok(())
    }

    /// Tear down the per-id buffer and lock state. Pending writes must
    /// already be flushed; callers that want durability call `flush` first.
    pub fn dispose(&self, id: &str) {
        self.buffer.lock().remove(id);
        self.id_locks.lock().remove(id);
    }

    fn schedule_flush(self: &Arc<Self>, id: String) {
        let already_scheduled = {
            let mut buffer = self.buffer.lock();
            match buffer.get_mut(&id) {
                Some(entry) if entry.flush_scheduled => true,
                Some(entry) => {
                    entry.flush_scheduled = true;
                    false
                }
                None => return,
            }
        };
        if already_scheduled {
            return;
        }
        let this = Arc::clone(self);
        let delay = self.flush_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Err(err) = this.flush(&id).await {
                tracing::warn!(domain = %this.domain, id = %id, error = %err, "coalesced flush failed");
            }
        });
    }

    fn id_lock(&self, id: &str) -> Arc<AsyncMutex<()>> {
        let mut locks = self.id_locks.lock();
        locks
            .entry(id.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }

    async fn load_from_disk(&self, id: &str) -> Result<Option<R>, StoreError> {
        let path = self.domain.record_path(&self.workspace_root, id);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(StoreError::Io { domain: self.domain.dir_name(), source }),
        };
        let record = serde_json::from_slice(&bytes).map_err(|source| StoreError::RecordParse {
            domain: self.domain.dir_name(),
            id: id.to_string(),
            source,
        })?;
        Ok(Some(record))
    }

    /// Acquire the domain lock, merge against any on-disk apply-status
    /// (runs only), atomically write `record.json`, and upsert the index if
    /// the status changed.
    async fn write_record_and_index(&self, id: &str, record: &R) -> Result<(), StoreError> {
        let _guard = self.lock.acquire().await?;

        let mut record = record.clone();
        if let Some(on_disk) = self.load_from_disk(id).await? {
            record.merge_on_flush(&on_disk);
        }

        let session_dir = self.domain.session_dir(&self.workspace_root, id);
        tokio::fs::create_dir_all(&session_dir)
            .await
            .map_err(|source| StoreError::Io { domain: self.domain.dir_name(), source })?;
        let record_path = session_dir.join("record.json");
        let bytes = serde_json::to_vec_pretty(&record).map_err(|source| StoreError::RecordParse {
            domain: self.domain.dir_name(),
            id: id.to_string(),
            source,
        })?;
        atomic_write(&record_path, &bytes)
            .await
            .map_err(|source| StoreError::Io { domain: self.domain.dir_name(), source })?;

        let index_path = self.domain.index_path(&self.workspace_root);
        let mut index = read_index(&index_path).await?;
        index.upsert(id, record.created_at_ms(), record.status_str());
        let index_bytes = serde_json::to_vec_pretty(&index).map_err(|source| StoreError::RecordParse {
            domain: self.domain.dir_name(),
            id: id.to_string(),
            source,
        })?;
        atomic_write(&index_path, &index_bytes)
            .await
            .map_err(|source| StoreError::Io { domain: self.domain.dir_name(), source })?;

        tracing::info!(domain = %self.domain, id, status = %record.status_str(), "flushed session record");
        Ok(())
    }
}

async fn read_index(path: &Path) -> Result<SessionIndex, StoreError> {
    match tokio::fs::read(path).await {
        Ok(bytes) => serde_json::from_slice(&bytes).map_err(|source| StoreError::RecordParse {
            domain: "index",
            id: path.display().to_string(),
            source,
        }),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(SessionIndex::default()),
        Err(source) => Err(StoreError::Io { domain: "index", source }),
    }
}

/// Atomic write: write to a sibling temp file, then rename into place.
async fn atomic_write(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let tmp_path = path.with_extension("json.tmp");
    tokio::fs::write(&tmp_path, bytes).await?;
    tokio::fs::rename(&tmp_path, path).await
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
