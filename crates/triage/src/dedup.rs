//! Idempotency guard for triage actions.
//!
//! Prevents repeating the same label and comment on every run while the pull
//! request has not changed. The only external state consulted is what the
//! platform already shows: labels on the PR and the bot's earlier marked
//! comments.

use crate::marker::PriorFlag;
use crate::rules::{PolicyRule, RuleName, RuleTable};
use crate::signals::ActivitySnapshot;
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;

/// Decide whether a labeled action should be applied.
///
/// Suppressed only when the label is already on the PR and the rule was last
/// flagged at the current head commit. A new commit (e.g. a force-push that
/// did not resolve the conflict) re-arms the rule.
pub fn should_apply(
    existing_labels: &BTreeSet<String>,
    label: &str,
    last_commit_hash: &str,
    previously_flagged_commit_hash: Option<&str>,
) -> bool {
    let label_present = existing_labels.contains(label);
    let commit_unchanged = previously_flagged_commit_hash == Some(last_commit_hash);
    !(label_present && commit_unchanged)
}

/// Whether a comment for `rule` was already posted at or after `since`
pub fn commented_since(prior_flags: &[PriorFlag], rule: RuleName, since: DateTime<Utc>) -> bool {
    prior_flags
        .iter()
        .any(|f| f.rule == rule && f.posted_at >= since)
}

/// Guard entry point used by the engine
pub fn should_apply_rule(snapshot: &ActivitySnapshot, rule: &PolicyRule) -> bool {
    match &rule.label {
        Some(label) => should_apply(
            &snapshot.existing_labels,
            label,
            &snapshot.last_commit_hash,
            snapshot
                .latest_flag(rule.name)
                .map(|f| f.commit.as_str()),
        ),
        // Label-less rules key on comment history instead
        None => !commented_since(
            &snapshot.prior_flags,
            rule.name,
            snapshot.last_human_activity_at,
        ),
    }
}

/// Labels on the PR whose rule condition has since been resolved.
///
/// A label shared by several rules is only cleared when every one of them is
/// resolved. Labels the table does not manage are never touched.
pub fn labels_to_clear(table: &RuleTable, snapshot: &ActivitySnapshot) -> Vec<String> {
    let managed = || {
        table
            .rules()
            .iter()
            .chain(table.conflict_notice())
            .filter_map(|rule| rule.label.as_deref().map(|label| (label, rule)))
    };

    let still_needed: BTreeSet<&str> = managed()
        .filter(|(_, rule)| !rule.precondition.cleared(snapshot))
        .map(|(label, _)| label)
        .collect();

    managed()
        .map(|(label, _)| label)
        .filter(|label| snapshot.existing_labels.contains(*label) && !still_needed.contains(label))
        .collect::<BTreeSet<&str>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}
