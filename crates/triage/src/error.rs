//! Error types for the triage engine.
//!
//! Only [`ConfigError`] is process-fatal. Everything else is scoped to a single
//! pull request (or a single repository for [`SourceError`]) and is logged
//! before the batch moves on.

use thiserror::Error;

/// Errors raised while loading or validating the policy configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid YAML or has the wrong shape
    #[error("Invalid config YAML: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// A required field is absent
    #[error("Missing required config field `{0}`")]
    MissingField(&'static str),

    /// A threshold is negative
    #[error("Config field `{field}` must be a non-negative integer, got {value}")]
    NegativeThreshold { field: &'static str, value: i64 },

    /// A threshold does not fit the supported range
    #[error("Config field `{field}` is out of range: {value}")]
    ThresholdOutOfRange { field: &'static str, value: i64 },

    /// A label name is empty
    #[error("Config field `{0}` must not be empty")]
    EmptyLabel(&'static str),

    /// A comment template references an unknown placeholder
    #[error("Config field `{field}` has an invalid template: {source}")]
    Template {
        field: &'static str,
        #[source]
        source: TemplateError,
    },
}

/// Errors raised by the action renderer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    /// Template contains a `{name}` token other than `{owner}` and `{repo}`
    #[error("unrecognized placeholder `{{{0}}}`")]
    UnknownPlaceholder(String),
}

/// A pull request snapshot could not be built from the platform data.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("incomplete pull request data: {field} unavailable")]
pub struct DataIncompleteError {
    pub field: &'static str,
}

impl DataIncompleteError {
    pub const fn new(field: &'static str) -> Self {
        Self { field }
    }
}

/// Per-PR evaluation failures. The PR is skipped, the batch continues.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvaluationError {
    #[error(transparent)]
    DataIncomplete(#[from] DataIncompleteError),

    #[error(transparent)]
    Template(#[from] TemplateError),
}

impl EvaluationError {
    /// Stable identifier used in log fields
    pub fn kind(&self) -> &'static str {
        match self {
            Self::DataIncomplete(_) => "data_incomplete",
            Self::Template(_) => "template",
        }
    }
}

/// Errors raised while applying an action on the hosting platform.
#[derive(Debug, Error)]
pub enum ExecutorError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Platform answered with an error status
    #[error("GitHub API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Request URL could not be built
    #[error("Invalid request URL: {0}")]
    InvalidUrl(String),
}

impl ExecutorError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Http(_) => "executor_http",
            Self::Api { .. } => "executor_api",
            Self::InvalidUrl(_) => "executor_url",
        }
    }
}

/// Errors raised while fetching pull request data from the platform.
#[derive(Debug, Error)]
pub enum SourceError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Platform answered with an error status
    #[error("GitHub API error: {status} - {message}")]
    Api { status: u16, message: String },
}
