// SPDX-License-Identifier: MIT

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("session {id} already exists in domain {domain}")]
    AlreadyExists { domain: &'static str, id: String },

    #[error("session {id} not found in domain {domain}")]
    NotFound { domain: &'static str, id: String },

    #[error("failed to parse record.json for {id} in domain {domain}: {source}")]
    RecordParse {
        domain: &'static str,
        id: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("lock acquisition on domain {domain} timed out after {waited_ms}ms")]
    LockTimeout { domain: &'static str, waited_ms: u64 },

    #[error("I/O error on domain {domain}: {source}")]
    Io {
        domain: &'static str,
        #[source]
        source: std::io::Error,
    },
}
