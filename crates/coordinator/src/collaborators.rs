// SPDX-License-Identifier: MIT

//! External collaborators: the CLI, spec authoring, git worktree
//! manipulation, the sandbox runtime binary, credential staging, and YAML
//! config loading are deliberately out of scope for this workspace. Each is
//! represented here as a narrow trait with no concrete production
//! implementation, rather than this crate owning process-backend or
//! source-control details itself.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use voratiq_core::DiffStats;

/// A staged credential sandbox for one agent invocation (HOME override,
/// provider auth files, whatever the provider needs). Torn down by the
/// stager on every exit path, including abort.
pub struct CredentialHandle {
    pub sandbox_home: PathBuf,
}

#[async_trait]
pub trait CredentialStager: Send + Sync + 'static {
    type Error: std::fmt::Display + Send + 'static;

    async fn stage(&self, agent_id: &str) -> Result<CredentialHandle, Self::Error>;
    async fn release(&self, handle: CredentialHandle);
}

/// The resolved sandbox invocation: command, args, and environment for C2 to spawn.
pub struct SandboxInvocation {
    pub command: String,
    pub args: Vec<String>,
    pub env: HashMap<String, String>,
    pub cwd: PathBuf,
}

#[async_trait]
pub trait ManifestBuilder: Send + Sync + 'static {
    type Error: std::fmt::Display + Send + 'static;

    /// Build the manifest for one agent invocation and resolve it into a
    /// sandbox invocation ready for C2.
    async fn build(
        &self,
        agent_id: &str,
        credentials: &CredentialHandle,
    ) -> Result<SandboxInvocation, Self::Error>;
}

/// Workspace artifacts promoted after a successful agent invocation.
///
/// `diffAttempted`/`diffCaptured` are deliberately not reported here: the
/// coordinator is authoritative over those two flags (it knows whether it
/// called `promote` at all). Everything else is the stager's own report.
pub struct StagedArtifacts {
    pub diff_stats: Option<DiffStats>,
    pub summary_captured: bool,
    pub chat_captured: bool,
}

#[async_trait]
pub trait ArtifactStager: Send + Sync + 'static {
    type Error: std::fmt::Display + Send + 'static;

    async fn promote(&self, agent_id: &str, workspace: &Path) -> Result<StagedArtifacts, Self::Error>;
}

#[async_trait]
pub trait EvalRunner: Send + Sync + 'static {
    type Error: std::fmt::Display + Send + 'static;

    async fn run_evals(&self, agent_id: &str) -> Result<Vec<voratiq_core::EvalSnapshot>, Self::Error>;
}

/// What the competition review engine (C9) needs staged before a reviewer
/// runs: the spec, the base snapshot, and every blinded candidate's diff.
pub struct ReviewInputs {
    pub spec_path: PathBuf,
    pub base_snapshot_dir: PathBuf,
    /// Blinded alias -> path to that candidate's diff.
    pub candidate_diffs: HashMap<String, PathBuf>,
}

#[async_trait]
pub trait ReviewInputStager: Send + Sync + 'static {
    type Error: std::fmt::Display + Send + 'static;

    /// Stage a shared inputs directory for one review session and return its path.
    async fn stage(&self, review_id: &str, inputs: &ReviewInputs) -> Result<PathBuf, Self::Error>;
}

#[async_trait]
pub trait ReviewerRunner: Send + Sync + 'static {
    type Error: std::fmt::Display + Send + 'static;

    /// Run one reviewer agent against the shared inputs directory and return
    /// its raw markdown output, before the output contract is enforced.
    async fn run_reviewer(&self, reviewer_agent_id: &str, inputs_dir: &Path) -> Result<String, Self::Error>;
}
