//! Pull request data and the activity snapshot derived from it.
//!
//! [`RawPullRequest`] is what a platform source hands over. The
//! [`SignalExtractor`] reduces it to an [`ActivitySnapshot`], the only input the
//! classifier and the idempotency guard look at.

use crate::error::DataIncompleteError;
use crate::marker::{parse_marker, PriorFlag};
use crate::repo::PullRequestId;
use crate::rules::RuleName;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Pull request data as fetched from the hosting platform
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawPullRequest {
    pub owner: String,
    pub repo: String,
    pub number: u64,
    pub created_at: Option<DateTime<Utc>>,
    /// `None` while the platform is still computing mergeability
    pub mergeable: Option<bool>,
    pub head_sha: Option<String>,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub comments: Vec<Comment>,
    #[serde(default)]
    pub reviews: Vec<Review>,
    #[serde(default)]
    pub commits: Vec<Commit>,
    #[serde(default)]
    pub checks: Vec<Check>,
}

/// A PR comment
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Comment {
    pub author: String,
    #[serde(default)]
    pub author_is_bot: bool,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

/// A PR review
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Review {
    pub author: String,
    #[serde(default)]
    pub author_is_bot: bool,
    pub submitted_at: Option<DateTime<Utc>>,
}

/// A commit on the PR branch
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Commit {
    pub sha: String,
    pub committed_at: Option<DateTime<Utc>>,
}

/// A CI check run on the head commit
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Check {
    pub name: String,
    pub conclusion: CheckConclusion,
}

/// CI check conclusion
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckConclusion {
    #[default]
    Pending,
    Success,
    Failure,
    TimedOut,
    Cancelled,
    Skipped,
    Neutral,
    ActionRequired,
}

/// Aggregate CI state of the head commit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CiStatus {
    Passing,
    Failing,
    /// No result yet, or the last run was cancelled
    Pending,
}

impl CiStatus {
    /// Fold check conclusions into one status. Any failure wins.
    ///
    /// Conclusions are per check run, not per suite. A neutral run counts
    /// like a skipped one. A cancelled run keeps the status pending until it
    /// is re-run.
    pub fn from_checks(checks: &[Check]) -> Self {
        if checks.iter().any(|c| {
            matches!(
                c.conclusion,
                CheckConclusion::Failure | CheckConclusion::TimedOut | CheckConclusion::ActionRequired
            )
        }) {
            return Self::Failing;
        }
        let all_done = checks.iter().all(|c| {
            matches!(
                c.conclusion,
                CheckConclusion::Success | CheckConclusion::Skipped | CheckConclusion::Neutral
            )
        });
        if !checks.is_empty() && all_done {
            Self::Passing
        } else {
            Self::Pending
        }
    }
}

/// Normalized view of a pull request, built fresh for every evaluation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivitySnapshot {
    pub owner: String,
    pub repo: String,
    pub number: u64,
    pub last_human_activity_at: DateTime<Utc>,
    pub has_conflicts: bool,
    pub ci_status: CiStatus,
    pub last_commit_hash: String,
    pub existing_labels: BTreeSet<String>,
    /// Earlier triage comments, oldest first
    pub prior_flags: Vec<PriorFlag>,
}

impl ActivitySnapshot {
    pub fn id(&self) -> PullRequestId {
        PullRequestId {
            owner: self.owner.clone(),
            repo: self.repo.clone(),
            number: self.number,
        }
    }

    /// Most recent triage comment for a rule
    pub fn latest_flag(&self, rule: RuleName) -> Option<&PriorFlag> {
        self.prior_flags
            .iter()
            .filter(|f| f.rule == rule)
            .max_by_key(|f| f.posted_at)
    }
}

/// Builds snapshots, telling human activity apart from bot activity
#[derive(Debug, Clone, Default)]
pub struct SignalExtractor {
    bot_logins: BTreeSet<String>,
    /// Account the executor posts as, often a plain user account
    self_login: Option<String>,
}

impl SignalExtractor {
    pub fn new<I, S>(bot_logins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            bot_logins: bot_logins
                .into_iter()
                .map(|s| s.into().to_lowercase())
                .collect(),
            self_login: None,
        }
    }

    /// Set the login our own comments are posted under
    #[must_use]
    pub fn with_self_login(mut self, login: &str) -> Self {
        self.self_login = Some(login.to_lowercase());
        self
    }

    /// Whether activity by this author is automated. Our own account always
    /// counts, whatever the platform reports for it.
    pub fn is_bot(&self, login: &str, flagged_by_platform: bool) -> bool {
        let login = login.to_lowercase();
        flagged_by_platform
            || login.ends_with("[bot]")
            || self.self_login.as_deref() == Some(login.as_str())
            || self.bot_logins.contains(&login)
    }

    pub fn extract(&self, raw: &RawPullRequest) -> Result<ActivitySnapshot, DataIncompleteError> {
        let mergeable = raw
            .mergeable
            .ok_or(DataIncompleteError::new("mergeable"))?;
        let last_commit_hash = raw
            .head_sha
            .clone()
            .filter(|sha| !sha.is_empty())
            .ok_or(DataIncompleteError::new("head_sha"))?;

        let comment_activity = raw
            .comments
            .iter()
            .filter(|c| !self.is_bot(&c.author, c.author_is_bot))
            .map(|c| c.created_at);
        let review_activity = raw
            .reviews
            .iter()
            .filter(|r| !self.is_bot(&r.author, r.author_is_bot))
            .filter_map(|r| r.submitted_at);
        let commit_activity = raw.commits.iter().filter_map(|c| c.committed_at);

        let last_human_activity_at = comment_activity
            .chain(review_activity)
            .chain(commit_activity)
            .max()
            .or(raw.created_at)
            .ok_or(DataIncompleteError::new("activity timestamps"))?;

        let mut prior_flags: Vec<PriorFlag> = raw
            .comments
            .iter()
            .filter(|c| self.is_bot(&c.author, c.author_is_bot))
            .filter_map(|c| {
                parse_marker(&c.body).map(|(rule, commit)| PriorFlag {
                    rule,
                    commit,
                    posted_at: c.created_at,
                })
            })
            .collect();
        prior_flags.sort_by_key(|f| f.posted_at);

        Ok(ActivitySnapshot {
            owner: raw.owner.clone(),
            repo: raw.repo.clone(),
            number: raw.number,
            last_human_activity_at,
            has_conflicts: !mergeable,
            ci_status: CiStatus::from_checks(&raw.checks),
            last_commit_hash,
            existing_labels: raw.labels.iter().cloned().collect(),
            prior_flags,
        })
    }
}
