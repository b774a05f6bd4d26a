//! Per pull request evaluation: extract, classify, guard, render.
//!
//! Evaluation is a pure function of the raw data, the rule table and `now`.
//! It performs no I/O, so many evaluations may run in parallel against the
//! same [`Engine`].
//!
//! Each evaluation yields at most one action. A nudge takes precedence over
//! removing resolved labels; the removal happens on the next run.

use crate::classifier::classify;
use crate::config::PolicyConfig;
use crate::dedup::{labels_to_clear, should_apply_rule};
use crate::error::{EvaluationError, TemplateError};
use crate::marker::marker;
use crate::render::render;
use crate::rules::{RuleName, RuleTable};
use crate::signals::{ActivitySnapshot, RawPullRequest, SignalExtractor};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

/// Label and comment to apply for one pull request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectedAction {
    pub rule: RuleName,
    pub label: Option<String>,
    /// Rendered template, prefixed with the hidden triage marker
    pub comment_body: String,
}

/// Outcome of one evaluation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum Decision {
    NoAction,
    /// A rule matched but was already applied at this state
    Suppressed { rule: RuleName },
    Apply(SelectedAction),
    /// Managed labels whose condition has been resolved (rebased, CI green)
    ClearLabels { labels: Vec<String> },
}

impl Decision {
    pub fn rule(&self) -> Option<RuleName> {
        match self {
            Self::NoAction | Self::ClearLabels { .. } => None,
            Self::Suppressed { rule } => Some(*rule),
            Self::Apply(action) => Some(action.rule),
        }
    }
}

/// Rule table plus signal extraction settings, shared by all evaluations
#[derive(Debug, Clone)]
pub struct Engine {
    table: Arc<RuleTable>,
    extractor: SignalExtractor,
}

impl Engine {
    pub fn new(table: Arc<RuleTable>, extractor: SignalExtractor) -> Self {
        Self { table, extractor }
    }

    pub fn from_config(config: &PolicyConfig) -> Self {
        Self::new(
            Arc::new(RuleTable::from_config(config)),
            SignalExtractor::new(config.bot_logins.iter().cloned()),
        )
    }

    pub fn table(&self) -> &RuleTable {
        &self.table
    }

    pub fn extractor(&self) -> &SignalExtractor {
        &self.extractor
    }

    /// Treat comments by `login` as our own: read for markers, never activity
    #[must_use]
    pub fn with_self_login(mut self, login: &str) -> Self {
        self.extractor = self.extractor.with_self_login(login);
        self
    }

    pub fn evaluate(
        &self,
        raw: &RawPullRequest,
        now: DateTime<Utc>,
    ) -> Result<Decision, EvaluationError> {
        let snapshot = self.extractor.extract(raw)?;
        Ok(decide(&self.table, &snapshot, now)?)
    }
}

/// Classify a snapshot, consult the guard, render the selected rule
pub fn decide(
    table: &RuleTable,
    snapshot: &ActivitySnapshot,
    now: DateTime<Utc>,
) -> Result<Decision, TemplateError> {
    let selected = classify(table, snapshot, now);

    if let Some(rule) = selected.filter(|rule| should_apply_rule(snapshot, rule)) {
        let rendered = render(rule, &snapshot.owner, &snapshot.repo)?;
        return Ok(Decision::Apply(SelectedAction {
            rule: rule.name,
            label: rendered.label,
            comment_body: format!(
                "{}{}",
                marker(rule.name, &snapshot.last_commit_hash),
                rendered.body
            ),
        }));
    }

    let labels = labels_to_clear(table, snapshot);
    if !labels.is_empty() {
        return Ok(Decision::ClearLabels { labels });
    }

    Ok(match selected {
        Some(rule) => Decision::Suppressed { rule: rule.name },
        None => Decision::NoAction,
    })
}
