//! Lifecycle classification.
//!
//! Rules are consulted in table order. The first rule whose precondition holds
//! claims the pull request: it fires if its threshold is met, and lower
//! priority rules are never consulted for that snapshot. A conflicted PR is
//! therefore never nudged about CI or staleness.
//!
//! When the priority table selects nothing, the optional conflict notice gets
//! a chance, so a fresh conflict is reported before it turns into an
//! inactivity nudge.

use crate::rules::{PolicyRule, RuleTable};
use crate::signals::ActivitySnapshot;
use chrono::{DateTime, Utc};

/// Whole days since the last human activity, truncated. Clock skew that puts
/// the activity in the future counts as zero.
pub fn inactive_days(snapshot: &ActivitySnapshot, now: DateTime<Utc>) -> i64 {
    (now - snapshot.last_human_activity_at).num_days().max(0)
}

/// Select at most one rule for the snapshot
pub fn classify<'a>(
    table: &'a RuleTable,
    snapshot: &ActivitySnapshot,
    now: DateTime<Utc>,
) -> Option<&'a PolicyRule> {
    let days = inactive_days(snapshot, now);

    if let Some(rule) = table
        .rules()
        .iter()
        .find(|rule| rule.precondition.holds(snapshot))
    {
        if days >= i64::from(rule.threshold_days) {
            return Some(rule);
        }
    }

    table.conflict_notice().filter(|notice| {
        notice.precondition.holds(snapshot) && days >= i64::from(notice.threshold_days)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::sample_config;
    use crate::rules::RuleName;
    use crate::signals::CiStatus;
    use chrono::{Duration, TimeZone};
    use std::collections::BTreeSet;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()
    }

    fn snapshot(has_conflicts: bool, inactive: i64, ci_status: CiStatus) -> ActivitySnapshot {
        ActivitySnapshot {
            owner: "acme".to_string(),
            repo: "widgets".to_string(),
            number: 1,
            last_human_activity_at: now() - Duration::days(inactive),
            has_conflicts,
            ci_status,
            last_commit_hash: "abc123".to_string(),
            existing_labels: BTreeSet::new(),
            prior_flags: Vec::new(),
        }
    }

    fn table_without_notice() -> RuleTable {
        let mut config = sample_config();
        config.needs_rebase_comment = None;
        RuleTable::from_config(&config)
    }

    fn selected(table: &RuleTable, snapshot: &ActivitySnapshot) -> Option<RuleName> {
        classify(table, snapshot, now()).map(|r| r.name)
    }

    #[test]
    fn test_inactive_days_truncates() {
        let mut s = snapshot(false, 0, CiStatus::Passing);
        s.last_human_activity_at = now() - Duration::hours(47);
        assert_eq!(inactive_days(&s, now()), 1);

        s.last_human_activity_at = now() + Duration::hours(5);
        assert_eq!(inactive_days(&s, now()), 0);
    }

    #[test]
    fn test_rebase_wins_regardless_of_ci() {
        let table = table_without_notice();
        for ci in [CiStatus::Passing, CiStatus::Failing, CiStatus::Pending] {
            for days in [89, 90, 200, 1000] {
                assert_eq!(
                    selected(&table, &snapshot(true, days, ci)),
                    Some(RuleName::NeedsRebase)
                );
            }
        }
    }

    #[test]
    fn test_ci_failed_when_no_conflicts() {
        let table = table_without_notice();
        for days in [90, 95, 179, 500] {
            assert_eq!(
                selected(&table, &snapshot(false, days, CiStatus::Failing)),
                Some(RuleName::CiFailed)
            );
        }
    }

    #[test]
    fn test_stale_when_no_specific_precondition() {
        let table = table_without_notice();
        for ci in [CiStatus::Passing, CiStatus::Pending] {
            assert_eq!(
                selected(&table, &snapshot(false, 180, ci)),
                Some(RuleName::Stale)
            );
        }
    }

    #[test]
    fn test_no_rule_below_thresholds() {
        let table = table_without_notice();
        assert_eq!(selected(&table, &snapshot(true, 88, CiStatus::Failing)), None);
        assert_eq!(selected(&table, &snapshot(false, 89, CiStatus::Failing)), None);
        assert_eq!(selected(&table, &snapshot(false, 179, CiStatus::Passing)), None);
        assert_eq!(selected(&table, &snapshot(false, 0, CiStatus::Pending)), None);
    }

    #[test]
    fn test_thresholds_are_not_combined_across_rules() {
        let mut config = sample_config();
        config.needs_rebase_comment = None;
        config.inactive_rebase_days = 100;
        config.inactive_ci_days = 10;
        config.inactive_stale_days = 20;
        let table = RuleTable::from_config(&config);

        // Conflicted PR below the rebase threshold: CI and stale would both
        // qualify on their own, yet nothing fires.
        assert_eq!(selected(&table, &snapshot(true, 50, CiStatus::Failing)), None);
        assert_eq!(selected(&table, &snapshot(true, 50, CiStatus::Passing)), None);
        // Failing CI below its own threshold does not fall through to stale
        config.inactive_ci_days = 30;
        let table = RuleTable::from_config(&config);
        assert_eq!(selected(&table, &snapshot(false, 25, CiStatus::Failing)), None);
    }

    #[test]
    fn test_conflict_notice_fires_before_rebase_threshold() {
        let table = RuleTable::from_config(&sample_config());
        assert_eq!(
            selected(&table, &snapshot(true, 0, CiStatus::Passing)),
            Some(RuleName::ConflictNotice)
        );
        assert_eq!(
            selected(&table, &snapshot(true, 89, CiStatus::Passing)),
            Some(RuleName::NeedsRebase)
        );
        // Never selected without a conflict
        assert_eq!(selected(&table, &snapshot(false, 5, CiStatus::Failing)), None);
    }
}
