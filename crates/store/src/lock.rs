// SPDX-License-Identifier: MIT

//! Session Lock (C6): a coarse, file-based advisory lock on a domain's
//! `history.lock`, used to serialize record and index writes across processes.

use crate::error::StoreError;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tokio::time::sleep;

/// A lockfile untouched for this long is assumed to belong to a process that
/// crashed mid-flush and is taken over rather than waited on.
pub const STALE_GRACE: Duration = Duration::from_secs(30);
/// Total time `acquire` polls before giving up.
pub const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(10);
const POLL_INITIAL: Duration = Duration::from_millis(10);
const POLL_MAX: Duration = Duration::from_millis(250);

pub struct SessionLock {
    path: PathBuf,
    domain: &'static str,
    stale_grace: Duration,
    timeout: Duration,
}

/// Held for the duration of one flush. Releasing removes the lockfile.
pub struct SessionLockGuard {
    path: PathBuf,
}

impl Drop for SessionLockGuard {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

impl SessionLock {
    pub fn new(path: PathBuf, domain: &'static str) -> Self {
        Self {
            path,
            domain,
            stale_grace: STALE_GRACE,
            timeout: ACQUIRE_TIMEOUT,
        }
    }

    #[cfg(test)]
    pub fn with_grace_and_timeout(mut self, stale_grace: Duration, timeout: Duration) -> Self {
        self.stale_grace = stale_grace;
        self.timeout = timeout;
        self
    }

    /// Acquire the lock, polling with exponential backoff and reclaiming a
    /// stale lockfile in place of waiting for it to be released.
    pub async fn acquire(&self) -> Result<SessionLockGuard, StoreError> {
        let deadline = tokio::time::Instant::now() + self.timeout;
        let mut backoff = POLL_INITIAL;
        loop {
            match self.try_create() {
                Ok(()) => return Ok(SessionLockGuard { path: self.path.clone() }),
                Err(source) if source.kind() == std::io::ErrorKind::AlreadyExists => {
                    if self.is_stale() {
                        tracing::warn!(domain = self.domain, path = %self.path.display(), "reclaiming stale session lock");
                        let _ = std::fs::remove_file(&self.path);
                        continue;
                    }
                    if tokio::time::Instant::now() >= deadline {
                        return Err(StoreError::LockTimeout {
                            domain: self.domain,
                            waited_ms: self.timeout.as_millis() as u64,
                        });
                    }
                    sleep(backoff).await;
                    backoff = (backoff * 2).min(POLL_MAX);
                }
                Err(source) => {
                    return Err(StoreError::Io { domain: self.domain, source });
                }
            }
        }
    }

    fn try_create(&self) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        use std::io::Write;
        let mut file = std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.path)?;
        writeln!(file, "{}", std::process::id())
    }

    fn is_stale(&self) -> bool {
        mtime_age(&self.path).map(|age| age > self.stale_grace).unwrap_or(false)
    }
}

fn mtime_age(path: &Path) -> Option<Duration> {
    let metadata = std::fs::metadata(path).ok()?;
    let modified = metadata.modified().ok()?;
    SystemTime::now().duration_since(modified).ok()
}

#[cfg(test)]
#[path = "lock_tests.rs"]
mod tests;
