//! Executors apply a selected action on the hosting platform.

use async_trait::async_trait;
use tracing::info;

use crate::engine::SelectedAction;
use crate::error::ExecutorError;
use crate::repo::PullRequestId;

/// Trait for applying label + comment actions (GitHub, dry run, etc.).
///
/// Implementations own their timeouts. The engine never retries a failed
/// `apply` within the same run.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Executor: Send + Sync {
    /// Get the name of this executor.
    fn name(&self) -> &'static str;

    /// Apply the action's label (if any) and post its comment.
    async fn apply(&self, pr: &PullRequestId, action: &SelectedAction) -> Result<(), ExecutorError>;

    /// Remove labels whose condition has been resolved. Labels already gone
    /// are not an error.
    async fn clear_labels(&self, pr: &PullRequestId, labels: &[String]) -> Result<(), ExecutorError>;
}

/// Logs what would be done instead of calling the platform
#[derive(Debug, Clone, Copy, Default)]
pub struct DryRunExecutor;

#[async_trait]
impl Executor for DryRunExecutor {
    fn name(&self) -> &'static str {
        "dry-run"
    }

    async fn apply(&self, pr: &PullRequestId, action: &SelectedAction) -> Result<(), ExecutorError> {
        info!(
            pr = %pr,
            rule = %action.rule,
            label = action.label.as_deref().unwrap_or("-"),
            body_len = action.comment_body.len(),
            "Dry run: would apply triage action"
        );
        Ok(())
    }

    async fn clear_labels(&self, pr: &PullRequestId, labels: &[String]) -> Result<(), ExecutorError> {
        info!(
            pr = %pr,
            labels = ?labels,
            "Dry run: would remove resolved labels"
        );
        Ok(())
    }
}
