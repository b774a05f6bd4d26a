//! # GitHub REST client
//!
//! Implements both platform seams against the GitHub REST API: reading open
//! pull requests with their timeline ([`PullRequestSource`]) and applying or
//! removing labels and posting comments ([`Executor`]).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{header, Client as HttpClient, Method, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, instrument};

use crate::engine::SelectedAction;
use crate::error::{ExecutorError, SourceError};
use crate::executor::Executor;
use crate::repo::{PullRequestId, Slug};
use crate::signals::{Check, CheckConclusion, Comment, Commit, RawPullRequest, Review};
use crate::source::PullRequestSource;

pub const DEFAULT_API_URL: &str = "https://api.github.com";
const USER_AGENT: &str = "pr-triage/0.1";
const PER_PAGE: usize = 100;
/// Fetches of a PR while GitHub is still computing `mergeable`
const MERGEABLE_ATTEMPTS: u32 = 4;
const MERGEABLE_RETRY_DELAY: Duration = Duration::from_secs(3);

/// GitHub API client for triage
#[derive(Clone)]
pub struct GitHubClient {
    http_client: HttpClient,
    base_url: String,
    token: Option<String>,
    mergeable_attempts: u32,
    mergeable_retry_delay: Duration,
}

#[derive(Debug, Deserialize)]
struct GitHubError {
    message: String,
}

/// Non-success response from the API
struct ApiFailure {
    status: u16,
    message: String,
}

impl From<ApiFailure> for SourceError {
    fn from(f: ApiFailure) -> Self {
        Self::Api {
            status: f.status,
            message: f.message,
        }
    }
}

impl From<ApiFailure> for ExecutorError {
    fn from(f: ApiFailure) -> Self {
        Self::Api {
            status: f.status,
            message: f.message,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiUser {
    login: String,
    #[serde(rename = "type", default)]
    kind: String,
}

#[derive(Debug, Deserialize)]
struct ApiLabel {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ApiPullSummary {
    number: u64,
}

#[derive(Debug, Deserialize)]
struct ApiHead {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct ApiPull {
    number: u64,
    created_at: Option<DateTime<Utc>>,
    mergeable: Option<bool>,
    head: ApiHead,
    #[serde(default)]
    labels: Vec<ApiLabel>,
}

#[derive(Debug, Deserialize)]
struct ApiComment {
    user: Option<ApiUser>,
    body: Option<String>,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct ApiReview {
    user: Option<ApiUser>,
    submitted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct ApiCommit {
    sha: String,
    commit: ApiCommitDetail,
}

#[derive(Debug, Deserialize)]
struct ApiCommitDetail {
    committer: Option<ApiGitActor>,
}

#[derive(Debug, Deserialize)]
struct ApiGitActor {
    date: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct ApiCombinedStatus {
    #[serde(default)]
    statuses: Vec<ApiStatus>,
}

#[derive(Debug, Deserialize)]
struct ApiStatus {
    context: String,
    state: String,
}

#[derive(Debug, Deserialize)]
struct ApiCheckRuns {
    #[serde(default)]
    check_runs: Vec<ApiCheckRun>,
}

#[derive(Debug, Deserialize)]
struct ApiCheckRun {
    name: String,
    status: String,
    conclusion: Option<String>,
}

/// Login and bot flag of an author. Deleted accounts show up as `ghost`.
fn author(user: Option<ApiUser>) -> (String, bool) {
    match user {
        Some(u) => {
            let is_bot = u.kind == "Bot";
            (u.login, is_bot)
        }
        None => ("ghost".to_string(), false),
    }
}

fn check_conclusion(run: &ApiCheckRun) -> CheckConclusion {
    if run.status != "completed" {
        return CheckConclusion::Pending;
    }
    match run.conclusion.as_deref() {
        Some("success") => CheckConclusion::Success,
        Some("failure") => CheckConclusion::Failure,
        Some("timed_out") => CheckConclusion::TimedOut,
        Some("cancelled") => CheckConclusion::Cancelled,
        Some("skipped") => CheckConclusion::Skipped,
        Some("neutral") => CheckConclusion::Neutral,
        Some("action_required") => CheckConclusion::ActionRequired,
        _ => CheckConclusion::Pending,
    }
}

/// Legacy commit statuses (`error`, `failure`, `pending`, `success`)
fn status_conclusion(status: &ApiStatus) -> CheckConclusion {
    match status.state.as_str() {
        "success" => CheckConclusion::Success,
        "failure" | "error" => CheckConclusion::Failure,
        _ => CheckConclusion::Pending,
    }
}

async fn ensure_success(response: Response) -> Result<Response, ApiFailure> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response
        .json::<GitHubError>()
        .await
        .map_or_else(|_| "unknown error".to_string(), |e| e.message);
    Err(ApiFailure {
        status: status.as_u16(),
        message,
    })
}

impl GitHubClient {
    /// Create a client for api.github.com
    pub fn new(token: Option<String>) -> Result<Self, reqwest::Error> {
        Self::with_base_url(DEFAULT_API_URL, token)
    }

    /// Create a client for a custom API root (GitHub Enterprise, tests)
    pub fn with_base_url(base_url: &str, token: Option<String>) -> Result<Self, reqwest::Error> {
        let http_client = HttpClient::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
            mergeable_attempts: MERGEABLE_ATTEMPTS,
            mergeable_retry_delay: MERGEABLE_RETRY_DELAY,
        })
    }

    /// How often to fetch a PR whose mergeability is still being computed
    #[must_use]
    pub fn with_mergeable_retry(mut self, attempts: u32, delay: Duration) -> Self {
        self.mergeable_attempts = attempts.max(1);
        self.mergeable_retry_delay = delay;
        self
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let request = request.header(header::ACCEPT, "application/vnd.github+json");
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.authorize(
            self.http_client
                .request(method, format!("{}{}", self.base_url, path)),
        )
    }

    /// Login of the account behind the token. Comments the executor posts
    /// are authored by it.
    #[instrument(skip(self))]
    pub async fn authenticated_login(&self) -> Result<String, SourceError> {
        let user: ApiUser = self.get_json("/user").await?;
        debug!(login = %user.login, "Resolved authenticated account");
        Ok(user.login)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, SourceError> {
        let response = self.request(Method::GET, path).send().await?;
        let response = ensure_success(response).await?;
        Ok(response.json().await?)
    }

    /// Follow `page=` pagination until a short page comes back. `items`
    /// pulls the entries out of a page body.
    async fn get_pages<P, T, F>(&self, path: &str, items: F) -> Result<Vec<T>, SourceError>
    where
        P: DeserializeOwned,
        F: Fn(P) -> Vec<T>,
    {
        let sep = if path.contains('?') { '&' } else { '?' };
        let mut all = Vec::new();
        let mut page = 1;
        loop {
            let body: P = self
                .get_json(&format!("{path}{sep}per_page={PER_PAGE}&page={page}"))
                .await?;
            let batch = items(body);
            let last = batch.len() < PER_PAGE;
            all.extend(batch);
            if last {
                return Ok(all);
            }
            page += 1;
        }
    }

    async fn get_all<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>, SourceError> {
        self.get_pages(path, |page: Vec<T>| page).await
    }

    /// Fetch a PR, waiting for GitHub to finish computing `mergeable`. Still
    /// `null` after the last attempt is returned as is.
    async fn get_pull(&self, path: &str) -> Result<ApiPull, SourceError> {
        let mut pull: ApiPull = self.get_json(path).await?;
        for attempt in 1..self.mergeable_attempts {
            if pull.mergeable.is_some() {
                break;
            }
            debug!(attempt, "Mergeability not computed yet, fetching again");
            tokio::time::sleep(self.mergeable_retry_delay).await;
            pull = self.get_json(path).await?;
        }
        Ok(pull)
    }

    async fn post_json(&self, path: &str, body: serde_json::Value) -> Result<(), ExecutorError> {
        let response = self.request(Method::POST, path).json(&body).send().await?;
        ensure_success(response).await?;
        Ok(())
    }

    async fn delete_label(&self, pr: &PullRequestId, label: &str) -> Result<(), ExecutorError> {
        let mut url = Url::parse(&format!(
            "{}/repos/{}/{}/issues/{}/labels",
            self.base_url, pr.owner, pr.repo, pr.number
        ))
        .map_err(|e| ExecutorError::InvalidUrl(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|()| ExecutorError::InvalidUrl(self.base_url.clone()))?
            .push(label);

        let response = self
            .authorize(self.http_client.request(Method::DELETE, url))
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            debug!(label = %label, "Label already absent");
            return Ok(());
        }
        ensure_success(response).await?;
        Ok(())
    }
}

#[async_trait]
impl PullRequestSource for GitHubClient {
    #[instrument(skip(self), fields(repo = %repo))]
    async fn open_pull_requests(&self, repo: &Slug) -> Result<Vec<u64>, SourceError> {
        let pulls: Vec<ApiPullSummary> = self
            .get_all(&format!("/repos/{}/{}/pulls?state=open", repo.owner, repo.repo))
            .await?;
        debug!(count = pulls.len(), "Listed open pull requests");
        Ok(pulls.into_iter().map(|p| p.number).collect())
    }

    #[instrument(skip(self), fields(repo = %repo, number = %number))]
    async fn pull_request(&self, repo: &Slug, number: u64) -> Result<RawPullRequest, SourceError> {
        let base = format!("/repos/{}/{}", repo.owner, repo.repo);

        let pull = self.get_pull(&format!("{base}/pulls/{number}")).await?;

        let comments_path = format!("{base}/issues/{number}/comments");
        let reviews_path = format!("{base}/pulls/{number}/reviews");
        let commits_path = format!("{base}/pulls/{number}/commits");
        let check_runs_path = format!("{base}/commits/{}/check-runs", pull.head.sha);
        let statuses_path = format!("{base}/commits/{}/status", pull.head.sha);
        let (comments, reviews, commits, check_runs, statuses) = tokio::try_join!(
            self.get_all::<ApiComment>(&comments_path),
            self.get_all::<ApiReview>(&reviews_path),
            self.get_all::<ApiCommit>(&commits_path),
            self.get_pages(&check_runs_path, |page: ApiCheckRuns| page.check_runs),
            self.get_pages(&statuses_path, |page: ApiCombinedStatus| page.statuses),
        )?;

        Ok(RawPullRequest {
            owner: repo.owner.clone(),
            repo: repo.repo.clone(),
            number: pull.number,
            created_at: pull.created_at,
            mergeable: pull.mergeable,
            head_sha: Some(pull.head.sha),
            labels: pull.labels.into_iter().map(|l| l.name).collect(),
            comments: comments
                .into_iter()
                .map(|c| {
                    let (author, author_is_bot) = author(c.user);
                    Comment {
                        author,
                        author_is_bot,
                        body: c.body.unwrap_or_default(),
                        created_at: c.created_at,
                    }
                })
                .collect(),
            reviews: reviews
                .into_iter()
                .map(|r| {
                    let (author, author_is_bot) = author(r.user);
                    Review {
                        author,
                        author_is_bot,
                        submitted_at: r.submitted_at,
                    }
                })
                .collect(),
            commits: commits
                .into_iter()
                .map(|c| Commit {
                    sha: c.sha,
                    committed_at: c.commit.committer.and_then(|a| a.date),
                })
                .collect(),
            checks: check_runs
                .iter()
                .map(|run| Check {
                    name: run.name.clone(),
                    conclusion: check_conclusion(run),
                })
                .chain(statuses.iter().map(|status| Check {
                    name: status.context.clone(),
                    conclusion: status_conclusion(status),
                }))
                .collect(),
        })
    }
}

#[async_trait]
impl Executor for GitHubClient {
    fn name(&self) -> &'static str {
        "github"
    }

    #[instrument(skip(self, action), fields(pr = %pr, rule = %action.rule))]
    async fn apply(&self, pr: &PullRequestId, action: &SelectedAction) -> Result<(), ExecutorError> {
        let base = format!("/repos/{}/{}/issues/{}", pr.owner, pr.repo, pr.number);

        if let Some(label) = &action.label {
            self.post_json(
                &format!("{base}/labels"),
                serde_json::json!({ "labels": [label] }),
            )
            .await?;
            debug!(label = %label, "Added label");
        }

        self.post_json(
            &format!("{base}/comments"),
            serde_json::json!({ "body": action.comment_body }),
        )
        .await?;
        info!("Posted triage comment");
        Ok(())
    }

    #[instrument(skip(self), fields(pr = %pr))]
    async fn clear_labels(&self, pr: &PullRequestId, labels: &[String]) -> Result<(), ExecutorError> {
        for label in labels {
            self.delete_label(pr, label).await?;
            info!(label = %label, "Removed label");
        }
        Ok(())
    }
}
