//! Hidden markers embedded in triage comments.
//!
//! Each comment the bot posts starts with `<!--triage:{rule}:{commit}-->`.
//! Reading them back from the PR timeline tells the idempotency guard which
//! rule already fired and at which head commit, without a local database.

use crate::rules::RuleName;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const PREFIX: &str = "<!--triage:";
const SUFFIX: &str = "-->";

/// A triage comment found on the pull request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorFlag {
    pub rule: RuleName,
    pub commit: String,
    pub posted_at: DateTime<Utc>,
}

/// Marker line prepended to a rendered comment
#[must_use]
pub fn marker(rule: RuleName, commit: &str) -> String {
    format!("{PREFIX}{rule}:{commit}{SUFFIX}\n")
}

/// Decode the marker at the start of a comment body
pub fn parse_marker(body: &str) -> Option<(RuleName, String)> {
    let rest = body.trim_start().strip_prefix(PREFIX)?;
    let (inner, _) = rest.split_once(SUFFIX)?;
    let (rule, commit) = inner.split_once(':')?;
    let rule = rule.parse().ok()?;
    if commit.is_empty() {
        return None;
    }
    Some((rule, commit.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marker_format() {
        assert_eq!(
            marker(RuleName::NeedsRebase, "abc123"),
            "<!--triage:needs_rebase:abc123-->\n"
        );
    }

    #[test]
    fn test_parse_marker_from_comment() {
        let body = format!(
            "{}There hasn't been much activity lately.",
            marker(RuleName::Stale, "f00d")
        );
        assert_eq!(
            parse_marker(&body),
            Some((RuleName::Stale, "f00d".to_string()))
        );
    }

    #[test]
    fn test_parse_marker_rejects_foreign_comments() {
        assert_eq!(parse_marker("LGTM"), None);
        assert_eq!(parse_marker("<!--cf906140f33d8803c4a75a2196329ecb-->"), None);
        assert_eq!(parse_marker("<!--triage:unknown_rule:abc-->"), None);
        assert_eq!(parse_marker("<!--triage:stale:-->"), None);
        assert_eq!(parse_marker("<!--triage:stale:abc"), None);
        // Markers quoted in the middle of a comment do not count
        assert_eq!(parse_marker("> <!--triage:stale:abc-->"), None);
    }
}
