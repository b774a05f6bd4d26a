//! Policy rules and the priority-ordered rule table.
//!
//! The table is built once from [`PolicyConfig`] and never mutated. Evaluations
//! share it through an `Arc` and read it without locking.

use crate::config::PolicyConfig;
use crate::signals::{ActivitySnapshot, CiStatus};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Unique identifier for each rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleName {
    NeedsRebase,
    CiFailed,
    Stale,
    /// Immediate notice when a conflict first appears
    ConflictNotice,
}

impl RuleName {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NeedsRebase => "needs_rebase",
            Self::CiFailed => "ci_failed",
            Self::Stale => "stale",
            Self::ConflictNotice => "conflict_notice",
        }
    }
}

impl fmt::Display for RuleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RuleName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "needs_rebase" => Ok(Self::NeedsRebase),
            "ci_failed" => Ok(Self::CiFailed),
            "stale" => Ok(Self::Stale),
            "conflict_notice" => Ok(Self::ConflictNotice),
            other => Err(format!("unknown rule '{other}'")),
        }
    }
}

/// Condition a snapshot must meet before a rule's threshold is considered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Precondition {
    HasConflicts,
    CiFailing,
    Always,
}

impl Precondition {
    pub fn holds(self, snapshot: &ActivitySnapshot) -> bool {
        match self {
            Self::HasConflicts => snapshot.has_conflicts,
            Self::CiFailing => snapshot.ci_status == CiStatus::Failing,
            Self::Always => true,
        }
    }

    /// The condition is positively resolved, not just absent. Pending CI
    /// neither holds nor clears.
    pub fn cleared(self, snapshot: &ActivitySnapshot) -> bool {
        match self {
            Self::HasConflicts => !snapshot.has_conflicts,
            Self::CiFailing => snapshot.ci_status == CiStatus::Passing,
            Self::Always => false,
        }
    }
}

/// One configured triage rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyRule {
    pub name: RuleName,
    pub threshold_days: u32,
    pub precondition: Precondition,
    pub label: Option<String>,
    pub comment_template: String,
}

/// Rules in fixed priority order: rebase, CI failed, stale
#[derive(Debug, Clone, Serialize)]
pub struct RuleTable {
    rules: Vec<PolicyRule>,
    conflict_notice: Option<PolicyRule>,
}

impl RuleTable {
    /// Build the table from a validated config
    pub fn from_config(config: &PolicyConfig) -> Self {
        let rules = vec![
            PolicyRule {
                name: RuleName::NeedsRebase,
                threshold_days: config.inactive_rebase_days,
                precondition: Precondition::HasConflicts,
                label: Some(config.needs_rebase_label.clone()),
                comment_template: config.inactive_rebase_comment.clone(),
            },
            PolicyRule {
                name: RuleName::CiFailed,
                threshold_days: config.inactive_ci_days,
                precondition: Precondition::CiFailing,
                label: Some(config.ci_failed_label.clone()),
                comment_template: config.inactive_ci_comment.clone(),
            },
            PolicyRule {
                name: RuleName::Stale,
                threshold_days: config.inactive_stale_days,
                precondition: Precondition::Always,
                label: None,
                comment_template: config.inactive_stale_comment.clone(),
            },
        ];

        let conflict_notice = config
            .needs_rebase_comment
            .as_ref()
            .map(|template| PolicyRule {
                name: RuleName::ConflictNotice,
                threshold_days: 0,
                precondition: Precondition::HasConflicts,
                label: Some(config.needs_rebase_label.clone()),
                comment_template: template.clone(),
            });

        Self::new(rules, conflict_notice)
    }

    pub(crate) fn new(rules: Vec<PolicyRule>, conflict_notice: Option<PolicyRule>) -> Self {
        assert!(!rules.is_empty(), "rule table must not be empty");
        Self {
            rules,
            conflict_notice,
        }
    }

    /// Inactivity rules in priority order. Never empty.
    pub fn rules(&self) -> &[PolicyRule] {
        &self.rules
    }

    /// Immediate conflict notice, if `needs_rebase_comment` is configured
    pub fn conflict_notice(&self) -> Option<&PolicyRule> {
        self.conflict_notice.as_ref()
    }

    pub fn get(&self, name: RuleName) -> Option<&PolicyRule> {
        self.rules
            .iter()
            .chain(self.conflict_notice.iter())
            .find(|r| r.name == name)
    }
}
