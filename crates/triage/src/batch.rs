//! Batch evaluation across repositories.
//!
//! Pull requests are fetched, evaluated and acted upon independently with
//! bounded concurrency. A failure for one PR (or one repository listing) is
//! logged and counted, never propagated.

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::engine::{Decision, Engine};
use crate::executor::Executor;
use crate::repo::{PullRequestId, Slug};
use crate::rules::RuleName;
use crate::source::PullRequestSource;

/// What happened to one pull request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrOutcome {
    Applied(RuleName),
    Suppressed(RuleName),
    /// Resolved labels were removed
    Cleared,
    NoAction,
    /// Evaluation could not complete (`data_incomplete`, `template`)
    Skipped(&'static str),
    /// Fetching or applying failed
    Failed(&'static str),
}

/// Counters for one batch run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub repositories: usize,
    pub repositories_failed: usize,
    pub evaluated: usize,
    pub applied: usize,
    pub suppressed: usize,
    pub cleared: usize,
    pub no_action: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl BatchReport {
    fn record(&mut self, outcome: &PrOutcome) {
        self.evaluated += 1;
        match outcome {
            PrOutcome::Applied(_) => self.applied += 1,
            PrOutcome::Suppressed(_) => self.suppressed += 1,
            PrOutcome::Cleared => self.cleared += 1,
            PrOutcome::NoAction => self.no_action += 1,
            PrOutcome::Skipped(_) => self.skipped += 1,
            PrOutcome::Failed(_) => self.failed += 1,
        }
    }
}

/// Fetch, evaluate and act on a single pull request
pub async fn process_pull_request(
    engine: &Engine,
    source: &dyn PullRequestSource,
    executor: &dyn Executor,
    repo: &Slug,
    number: u64,
    now: DateTime<Utc>,
) -> PrOutcome {
    let id = PullRequestId::new(repo, number);

    let raw = match source.pull_request(repo, number).await {
        Ok(raw) => raw,
        Err(e) => {
            warn!(pr = %id, kind = "source", error = %e, "Failed to fetch pull request");
            return PrOutcome::Failed("source");
        }
    };

    let decision = match engine.evaluate(&raw, now) {
        Ok(decision) => decision,
        Err(e) => {
            warn!(pr = %id, kind = e.kind(), error = %e, "Skipping pull request");
            return PrOutcome::Skipped(e.kind());
        }
    };

    match decision {
        Decision::NoAction => {
            debug!(pr = %id, "No rule applies");
            PrOutcome::NoAction
        }
        Decision::Suppressed { rule } => {
            debug!(pr = %id, rule = %rule, "Already applied at this state");
            PrOutcome::Suppressed(rule)
        }
        Decision::ClearLabels { labels } => match executor.clear_labels(&id, &labels).await {
            Ok(()) => {
                info!(pr = %id, labels = ?labels, executor = executor.name(), "Removed resolved labels");
                PrOutcome::Cleared
            }
            Err(e) => {
                warn!(pr = %id, kind = e.kind(), error = %e, "Failed to remove resolved labels");
                PrOutcome::Failed(e.kind())
            }
        },
        Decision::Apply(action) => match executor.apply(&id, &action).await {
            Ok(()) => {
                info!(pr = %id, rule = %action.rule, executor = executor.name(), "Applied triage action");
                PrOutcome::Applied(action.rule)
            }
            Err(e) => {
                warn!(pr = %id, rule = %action.rule, kind = e.kind(), error = %e, "Failed to apply triage action");
                PrOutcome::Failed(e.kind())
            }
        },
    }
}

/// Evaluate every open pull request of every repository
pub async fn run_batch(
    engine: &Engine,
    source: &dyn PullRequestSource,
    executor: &dyn Executor,
    repos: &[Slug],
    now: DateTime<Utc>,
    concurrency: usize,
) -> BatchReport {
    let mut report = BatchReport {
        repositories: repos.len(),
        ..Default::default()
    };

    let mut work: Vec<(&Slug, u64)> = Vec::new();
    for repo in repos {
        match source.open_pull_requests(repo).await {
            Ok(numbers) => {
                info!(repo = %repo, count = numbers.len(), "Open pull requests");
                work.extend(numbers.into_iter().map(|n| (repo, n)));
            }
            Err(e) => {
                warn!(repo = %repo, error = %e, "Failed to list pull requests, skipping repository");
                report.repositories_failed += 1;
            }
        }
    }

    let outcomes: Vec<PrOutcome> = stream::iter(work)
        .map(|(repo, number)| process_pull_request(engine, source, executor, repo, number, now))
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await;

    for outcome in &outcomes {
        report.record(outcome);
    }

    info!(
        evaluated = report.evaluated,
        applied = report.applied,
        suppressed = report.suppressed,
        cleared = report.cleared,
        skipped = report.skipped,
        failed = report.failed,
        "Triage run complete"
    );
    report
}
