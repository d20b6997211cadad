// SPDX-License-Identifier: MIT

//! Competition Review Engine (C9): reuses the bounded scheduler (C1) with an
//! adapter over blinded reviewer candidates, and enforces the reviewer
//! markdown output contract before a candidate's result is accepted.

use crate::collaborators::ReviewerRunner;
use crate::error::CoordinatorError;
use crate::registry::ActiveRunRegistry;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use voratiq_core::{Clock, ReviewId, ReviewStatus, ReviewSession};
use voratiq_scheduler::{FailurePolicy, PrepareOutcome, SchedulerAdapter};
use voratiq_store::Store;

const REQUIRED_SECTIONS: &[&str] = &[
    "Specification",
    "Key Requirements",
    "Candidate Assessments",
    "Comparison",
    "Ranking",
    "Recommendation",
];

/// One reviewer's blinded work item: the scheduler's `Candidate`.
#[derive(Debug, Clone)]
pub struct ReviewCandidate {
    pub reviewer_agent_id: String,
    pub alias: String,
}

/// One reviewer's settled outcome: the scheduler's `Outcome`.
#[derive(Debug, Clone)]
pub struct ReviewOutcome {
    pub alias: String,
    pub reviewer_agent_id: String,
    pub status: ReviewStatus,
    pub error_message: Option<String>,
}

/// Drives one competition review session's reviewers through the scheduler,
/// staging the shared inputs directory, blinding output against the
/// eligible candidate aliases, and persisting every transition through C5.
pub struct ReviewAdapter<Runner: ReviewerRunner> {
    review_id: ReviewId,
    store: Arc<Store<ReviewSession>>,
    runner: Runner,
    inputs_dir: PathBuf,
    output_dir: PathBuf,
    eligible_aliases: Vec<String>,
}

impl<Runner: ReviewerRunner> ReviewAdapter<Runner> {
    pub fn new(
        review_id: ReviewId,
        store: Arc<Store<ReviewSession>>,
        runner: Runner,
        inputs_dir: PathBuf,
        output_dir: PathBuf,
        eligible_aliases: Vec<String>,
    ) -> Self {
        Self { review_id, store, runner, inputs_dir, output_dir, eligible_aliases }
    }

    async fn record_status(&self, alias: &str, status: ReviewStatus, error_message: Option<String>) {
        let alias = alias.to_string();
        let result = self
            .store
            .rewrite(self.review_id.as_str(), move |mut record| {
                if let Some(reviewer) = record.reviewers.iter_mut().find(|r| r.alias == alias) {
                    // An external abort may have already settled this
                    // reviewer; don't clobber that outcome.
                    if !reviewer.status.is_terminal() {
                        reviewer.status = status;
                        reviewer.error_message = error_message.clone();
                    }
                }
                record.status = record.derive_status();
                record
            })
            .await;
        if let Err(source) = result {
            tracing::warn!(review_id = %self.review_id, alias, error = %source, "failed to record reviewer status");
        }
    }

    fn output_path(&self, alias: &str) -> PathBuf {
        self.output_dir.join(format!("{alias}.md"))
    }
}

#[async_trait]
impl<Runner: ReviewerRunner> SchedulerAdapter for ReviewAdapter<Runner> {
    type Candidate = ReviewCandidate;
    type Prepared = ReviewCandidate;
    type Outcome = ReviewOutcome;
    type Error = CoordinatorError;

    async fn queue_candidate(&self, _candidate: &Self::Candidate) {}

    async fn prepare_candidates(
        &self,
        candidates: Vec<Self::Candidate>,
    ) -> PrepareOutcome<Self::Prepared, Self::Outcome> {
        PrepareOutcome { ready: candidates.into_iter().enumerate().collect(), failures: Vec::new() }
    }

    async fn on_preparation_failure(&self, _outcome: &Self::Outcome) {}

    async fn on_candidate_prepared(&self, _prepared: &Self::Prepared) {}

    async fn on_candidate_running(&self, prepared: &Self::Prepared) {
        self.record_status(&prepared.alias, ReviewStatus::Running, None).await;
    }

    async fn execute_candidate(&self, prepared: &Self::Prepared) -> Result<Self::Outcome, Self::Error> {
        let markdown = self
            .runner
            .run_reviewer(&prepared.reviewer_agent_id, &self.inputs_dir)
            .await
            .map_err(|err| {
                CoordinatorError::preflight(format!("reviewer {} failed: {err}", prepared.alias))
            })?;

        enforce_output_contract(&self.review_id, &prepared.alias, &markdown, &self.eligible_aliases)?;

        tokio::fs::create_dir_all(&self.output_dir).await.map_err(|source| {
            CoordinatorError::preflight(format!("failed to create {}: {source}", self.output_dir.display()))
        })?;
        let output_path = self.output_path(&prepared.alias);
        tokio::fs::write(&output_path, markdown.as_bytes()).await.map_err(|source| {
            CoordinatorError::preflight(format!("failed to write {}: {source}", output_path.display()))
        })?;

        self.record_status(&prepared.alias, ReviewStatus::Succeeded, None).await;
        Ok(ReviewOutcome {
            alias: prepared.alias.clone(),
            reviewer_agent_id: prepared.reviewer_agent_id.clone(),
            status: ReviewStatus::Succeeded,
            error_message: None,
        })
    }

    async fn on_candidate_completed(&self, _outcome: &Self::Outcome) {}

    /// A contract violation or reviewer failure is captured here (not
    /// propagated) so other reviewers still complete.
    async fn capture_execution_failure(
        &self,
        prepared: &Self::Prepared,
        error: &Self::Error,
    ) -> Option<Self::Outcome> {
        let message = error.to_string();
        self.record_status(&prepared.alias, ReviewStatus::Failed, Some(message.clone())).await;
        Some(ReviewOutcome {
            alias: prepared.alias.clone(),
            reviewer_agent_id: prepared.reviewer_agent_id.clone(),
            status: ReviewStatus::Failed,
            error_message: Some(message),
        })
    }

    async fn cleanup_prepared_candidate(&self, _prepared: &Self::Prepared) {}

    async fn finalize_competition(&self) {}

    fn sort_results(&self, results: &mut [Self::Outcome]) {
        results.sort_by(|a, b| a.alias.cmp(&b.alias));
    }
}

/// Run one competition review session to completion: registers it as the
/// active session (C8), drives every reviewer through the scheduler, and
/// clears the registration once every reviewer has settled.
pub async fn run_review<C, Runner>(
    registry: &Arc<ActiveRunRegistry<C>>,
    store: &Arc<Store<ReviewSession>>,
    runner: Runner,
    review_id: ReviewId,
    max_parallel: usize,
    inputs_dir: PathBuf,
    output_dir: PathBuf,
) -> Result<Vec<ReviewOutcome>, CoordinatorError>
where
    C: Clock + 'static,
    Runner: ReviewerRunner,
{
    registry.register_review(review_id.clone())?;

    let record = store
        .snapshot(review_id.as_str())
        .await?
        .ok_or_else(|| CoordinatorError::preflight(format!("review {review_id} not found")))?;
    let candidates: Vec<ReviewCandidate> = record
        .reviewers
        .iter()
        .map(|r| ReviewCandidate { reviewer_agent_id: r.reviewer_agent_id.clone(), alias: r.alias.clone() })
        .collect();
    let eligible_aliases: Vec<String> = record.reviewers.iter().map(|r| r.alias.clone()).collect();

    let adapter = Arc::new(ReviewAdapter::new(
        review_id.clone(),
        Arc::clone(store),
        runner,
        inputs_dir,
        output_dir,
        eligible_aliases,
    ));

    let outcome = voratiq_scheduler::run(candidates, max_parallel, FailurePolicy::Continue, adapter).await;
    registry.clear();

    match outcome {
        Ok(outcomes) => Ok(outcomes),
        Err(err) => Err(CoordinatorError::Scheduler(err.to_string())),
    }
}

/// Split `markdown` into top-level (`## `) sections, mapping each section
/// title to its body text.
fn split_sections(markdown: &str) -> Vec<(String, String)> {
    let mut sections = Vec::new();
    let mut current_title: Option<String> = None;
    let mut current_body = String::new();
    for line in markdown.lines() {
        if let Some(title) = line.strip_prefix("## ") {
            if let Some(title) = current_title.take() {
                sections.push((title, std::mem::take(&mut current_body)));
            }
            current_title = Some(title.trim().to_string());
        } else if current_title.is_some() {
            current_body.push_str(line);
            current_body.push('\n');
        }
    }
    if let Some(title) = current_title {
        sections.push((title, current_body));
    }
    sections
}

/// Enforce the reviewer output contract on one reviewer's raw markdown.
pub fn enforce_output_contract(
    review_id: &ReviewId,
    alias: &str,
    markdown: &str,
    eligible_aliases: &[String],
) -> Result<(), CoordinatorError> {
    let violation = |headline: String, detail_lines: Vec<String>| CoordinatorError::ReviewContractViolation {
        review_id: review_id.clone(),
        alias: alias.to_string(),
        headline,
        detail_lines,
        hint_lines: vec![format!(
            "required sections, in order: {}",
            REQUIRED_SECTIONS.join(", ")
        )],
    };

    let sections = split_sections(markdown);
    let titles: Vec<&str> = sections.iter().map(|(t, _)| t.as_str()).collect();

    let mut cursor = 0usize;
    for required in REQUIRED_SECTIONS {
        match titles[cursor..].iter().position(|t| t == required) {
            Some(offset) => cursor += offset + 1,
            None => {
                return Err(violation(
                    format!("reviewer {alias} output is missing required section \"{required}\" in order"),
                    vec![format!("sections found: {}", titles.join(", "))],
                ));
            }
        }
    }

    let assessments = sections
        .iter()
        .find(|(t, _)| t == "Candidate Assessments")
        .map(|(_, body)| body.as_str())
        .unwrap_or_default();
    let found_aliases = candidate_block_aliases(assessments);
    let mut sorted_aliases = found_aliases.clone();
    sorted_aliases.sort();
    if found_aliases != sorted_aliases {
        return Err(violation(
            format!("reviewer {alias} output's Candidate Assessments blocks are not in lexicographic order"),
            vec![format!("found order: {}", found_aliases.join(", "))],
        ));
    }
    let mut expected_aliases = eligible_aliases.to_vec();
    expected_aliases.sort();
    if found_aliases != expected_aliases {
        return Err(violation(
            format!("reviewer {alias} output's Candidate Assessments does not cover exactly the eligible candidates"),
            vec![
                format!("expected: {}", expected_aliases.join(", ")),
                format!("found: {}", found_aliases.join(", ")),
            ],
        ));
    }

    let ranking_body = sections
        .iter()
        .find(|(t, _)| t == "Ranking")
        .map(|(_, body)| body.as_str())
        .unwrap_or_default();
    let ranked = ranking_list_aliases(ranking_body, eligible_aliases);
    let mut sorted_ranked = ranked.clone();
    sorted_ranked.sort();
    if sorted_ranked != expected_aliases {
        return Err(violation(
            format!("reviewer {alias} output's Ranking does not list every eligible candidate exactly once"),
            vec![format!("found ranking: {}", ranked.join(", "))],
        ));
    }

    let recommendation_body = sections
        .iter()
        .find(|(t, _)| t == "Recommendation")
        .map(|(_, body)| body.as_str())
        .unwrap_or_default();
    let preferred = preferred_candidate(recommendation_body);
    let top_ranked = ranked.first().map(String::as_str);
    if preferred.as_deref() != top_ranked {
        return Err(violation(
            format!("reviewer {alias} output's Recommendation does not match Ranking #1"),
            vec![
                format!("Preferred Candidate: {}", preferred.unwrap_or_else(|| "(missing)".to_string())),
                format!("Ranking #1: {}", top_ranked.unwrap_or("(missing)")),
            ],
        ));
    }

    Ok(())
}

/// Extract `### <alias>` headings from a Candidate Assessments body, in the
/// order they appear.
fn candidate_block_aliases(body: &str) -> Vec<String> {
    body.lines()
        .filter_map(|line| line.strip_prefix("### ").map(|alias| alias.trim().to_string()))
        .collect()
}

/// Extract ordered-list aliases from a Ranking body (`1. r_xxx`, `- r_xxx`),
/// matched against the known eligible set so surrounding prose is ignored.
fn ranking_list_aliases(body: &str, eligible_aliases: &[String]) -> Vec<String> {
    body.lines()
        .filter_map(|line| {
            let trimmed = line.trim_start_matches(|c: char| c.is_ascii_digit() || c == '.' || c == '-' || c == ' ');
            eligible_aliases.iter().find(|alias| trimmed.starts_with(alias.as_str())).cloned()
        })
        .collect()
}

/// Extract the `Preferred Candidate` value from a Recommendation body
/// (`Preferred Candidate: r_xxx` or `**Preferred Candidate:** r_xxx`).
fn preferred_candidate(body: &str) -> Option<String> {
    body.lines().find_map(|line| {
        let line = line.trim_start_matches('*').trim();
        let rest = line.strip_prefix("Preferred Candidate")?;
        let rest = rest.trim_start_matches([':', '*']).trim();
        (!rest.is_empty()).then(|| rest.to_string())
    })
}

#[cfg(test)]
#[path = "review_tests.rs"]
mod tests;
