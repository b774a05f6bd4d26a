//! Sources provide raw pull request data from the hosting platform.

use async_trait::async_trait;

use crate::error::SourceError;
use crate::repo::Slug;
use crate::signals::RawPullRequest;

/// Trait for pull request data providers.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PullRequestSource: Send + Sync {
    /// Numbers of all open pull requests in a repository.
    async fn open_pull_requests(&self, repo: &Slug) -> Result<Vec<u64>, SourceError>;

    /// Full data for one pull request.
    async fn pull_request(&self, repo: &Slug, number: u64) -> Result<RawPullRequest, SourceError>;
}
