// SPDX-License-Identifier: MIT

#![cfg_attr(test, allow(clippy::panic, clippy::unwrap_used, clippy::expect_used))]

//! Durable session storage: the per-domain record store with a write-behind
//! buffer (C5) and the coarse cross-process advisory lock that serializes
//! its flushes (C6).

pub mod domain;
pub mod error;
pub mod lock;
pub mod record;
pub mod store;

pub use domain::Domain;
pub use error::StoreError;
pub use lock::{SessionLock, SessionLockGuard};
pub use record::SessionRecord;
pub use store::{Store, FLUSH_COALESCE};
