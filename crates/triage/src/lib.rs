//! Pull request lifecycle triage.
//!
//! This crate classifies open pull requests by inactivity and state (merge
//! conflicts, failing CI, plain staleness), then applies at most one label and
//! nudge comment per pull request. Repeated runs against an unchanged pull
//! request never repeat an action.
//!
//! # Usage
//!
//! ```no_run
//! use triage::{Engine, PolicyConfig, RawPullRequest};
//!
//! let config = PolicyConfig::load(std::path::Path::new("triage.yaml")).unwrap();
//! let engine = Engine::from_config(&config);
//!
//! let json = std::fs::read_to_string("pr.json").unwrap();
//! let raw: RawPullRequest = serde_json::from_str(&json).unwrap();
//! let decision = engine.evaluate(&raw, chrono::Utc::now());
//! ```
//!
//! # Architecture
//!
//! - [`SignalExtractor`] turns platform data into an [`ActivitySnapshot`]
//! - [`RuleTable`] holds the priority-ordered rules built from [`PolicyConfig`]
//! - [`classify`] selects at most one rule, [`should_apply_rule`] suppresses
//!   repeats, [`render`] produces the label and comment
//! - [`PullRequestSource`] and [`Executor`] are the platform seams;
//!   [`GitHubClient`] implements both
//! - [`run_batch`] drives everything across repositories

pub mod batch;
pub mod classifier;
pub mod config;
pub mod dedup;
pub mod engine;
pub mod error;
pub mod executor;
pub mod github;
pub mod marker;
pub mod render;
pub mod repo;
pub mod rules;
pub mod signals;
pub mod source;

pub use batch::{process_pull_request, run_batch, BatchReport, PrOutcome};
pub use classifier::{classify, inactive_days};
pub use config::PolicyConfig;
pub use dedup::{labels_to_clear, should_apply, should_apply_rule};
pub use engine::{decide, Decision, Engine, SelectedAction};
pub use error::{
    ConfigError, DataIncompleteError, EvaluationError, ExecutorError, SourceError, TemplateError,
};
pub use executor::{DryRunExecutor, Executor};
pub use github::GitHubClient;
pub use marker::PriorFlag;
pub use render::{render, RenderedAction};
pub use repo::{PullRequestId, Slug};
pub use rules::{PolicyRule, Precondition, RuleName, RuleTable};
pub use signals::{ActivitySnapshot, CiStatus, RawPullRequest, SignalExtractor};
pub use source::PullRequestSource;
