//! Policy configuration loaded from YAML.
//!
//! Loading is fail-fast: any missing field, negative threshold, empty label or
//! unknown template placeholder rejects the whole file.

use crate::error::ConfigError;
use crate::render::validate_template;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Shape of the YAML file before validation
#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    inactive_rebase_days: Option<i64>,
    inactive_rebase_comment: Option<String>,
    inactive_ci_days: Option<i64>,
    inactive_ci_comment: Option<String>,
    inactive_stale_days: Option<i64>,
    inactive_stale_comment: Option<String>,
    needs_rebase_label: Option<String>,
    ci_failed_label: Option<String>,
    needs_rebase_comment: Option<String>,
    #[serde(default)]
    bot_logins: Vec<String>,
}

/// Validated policy configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PolicyConfig {
    /// Days without human activity before a conflicted PR is nudged
    pub inactive_rebase_days: u32,
    pub inactive_rebase_comment: String,
    /// Days without human activity before a CI-failing PR is nudged
    pub inactive_ci_days: u32,
    pub inactive_ci_comment: String,
    /// Days without human activity before any other PR is nudged
    pub inactive_stale_days: u32,
    pub inactive_stale_comment: String,
    pub needs_rebase_label: String,
    pub ci_failed_label: String,
    /// Posted as soon as a conflict is detected
    pub needs_rebase_comment: Option<String>,
    /// Logins whose activity does not count as human
    pub bot_logins: Vec<String>,
}

impl PolicyConfig {
    /// Load and validate a config file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_yaml_str(&contents)?;
        debug!(path = %path.display(), "Loaded policy config");
        Ok(config)
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = serde_yaml::from_str(yaml)?;
        Self::validate(raw)
    }

    fn validate(raw: RawConfig) -> Result<Self, ConfigError> {
        let config = Self {
            inactive_rebase_days: threshold("inactive_rebase_days", raw.inactive_rebase_days)?,
            inactive_rebase_comment: template("inactive_rebase_comment", raw.inactive_rebase_comment)?,
            inactive_ci_days: threshold("inactive_ci_days", raw.inactive_ci_days)?,
            inactive_ci_comment: template("inactive_ci_comment", raw.inactive_ci_comment)?,
            inactive_stale_days: threshold("inactive_stale_days", raw.inactive_stale_days)?,
            inactive_stale_comment: template("inactive_stale_comment", raw.inactive_stale_comment)?,
            needs_rebase_label: label("needs_rebase_label", raw.needs_rebase_label)?,
            ci_failed_label: label("ci_failed_label", raw.ci_failed_label)?,
            needs_rebase_comment: raw
                .needs_rebase_comment
                .map(|t| template("needs_rebase_comment", Some(t)))
                .transpose()?,
            bot_logins: raw.bot_logins,
        };
        Ok(config)
    }
}

fn threshold(field: &'static str, value: Option<i64>) -> Result<u32, ConfigError> {
    let value = value.ok_or(ConfigError::MissingField(field))?;
    if value < 0 {
        return Err(ConfigError::NegativeThreshold { field, value });
    }
    u32::try_from(value).map_err(|_| ConfigError::ThresholdOutOfRange { field, value })
}

fn template(field: &'static str, value: Option<String>) -> Result<String, ConfigError> {
    let value = value.ok_or(ConfigError::MissingField(field))?;
    validate_template(&value).map_err(|source| ConfigError::Template { field, source })?;
    Ok(value)
}

fn label(field: &'static str, value: Option<String>) -> Result<String, ConfigError> {
    let value = value.ok_or(ConfigError::MissingField(field))?;
    if value.trim().is_empty() {
        return Err(ConfigError::EmptyLabel(field));
    }
    Ok(value)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::TemplateError;

    pub(crate) const SAMPLE_YAML: &str = r#"
inactive_rebase_days: 89
inactive_rebase_comment: |
  There hasn't been much activity lately and the patch still needs rebase. What is the status here?

  * Is it still relevant? Please solve the conflicts, see https://github.com/{owner}/{repo}/blob/master/CONTRIBUTING.md#rebasing-changes
  * Is it no longer relevant? Please close.
inactive_ci_days: 90
inactive_ci_comment: |
  There hasn't been much activity lately and the CI seems to be failing.

  If no one reviewed the current pull request by commit hash, a rebase can be considered.
inactive_stale_days: 180
inactive_stale_comment: |
  There hasn't been much activity lately. What is the status here?

  Finding reviewers may take time. However, if the patch is no longer relevant, please close this pull request.
needs_rebase_label: "Needs rebase"
ci_failed_label: "CI failed"
needs_rebase_comment: |
  🐙 This pull request conflicts with the target branch and [needs rebase](https://github.com/{owner}/{repo}/blob/master/CONTRIBUTING.md#rebasing-changes).
bot_logins:
  - DrahtBot
"#;

    pub(crate) fn sample_config() -> PolicyConfig {
        PolicyConfig::from_yaml_str(SAMPLE_YAML).unwrap()
    }

    #[test]
    fn test_load_sample_config() {
        let config = sample_config();
        assert_eq!(config.inactive_rebase_days, 89);
        assert_eq!(config.inactive_ci_days, 90);
        assert_eq!(config.inactive_stale_days, 180);
        assert_eq!(config.needs_rebase_label, "Needs rebase");
        assert_eq!(config.ci_failed_label, "CI failed");
        assert!(config.needs_rebase_comment.is_some());
        assert_eq!(config.bot_logins, vec!["DrahtBot".to_string()]);
    }

    #[test]
    fn test_missing_field_is_reported_by_name() {
        let yaml = SAMPLE_YAML.replace("inactive_ci_days: 90\n", "");
        let err = PolicyConfig::from_yaml_str(&yaml).unwrap_err();
        assert!(matches!(err, ConfigError::MissingField("inactive_ci_days")));
    }

    #[test]
    fn test_optional_fields_may_be_absent() {
        let yaml = r#"
inactive_rebase_days: 1
inactive_rebase_comment: "rebase"
inactive_ci_days: 2
inactive_ci_comment: "ci"
inactive_stale_days: 3
inactive_stale_comment: "stale"
needs_rebase_label: "Needs rebase"
ci_failed_label: "CI failed"
"#;
        let config = PolicyConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.needs_rebase_comment, None);
        assert!(config.bot_logins.is_empty());
    }

    #[test]
    fn test_negative_threshold_is_rejected() {
        let yaml = SAMPLE_YAML.replace("inactive_stale_days: 180", "inactive_stale_days: -1");
        let err = PolicyConfig::from_yaml_str(&yaml).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::NegativeThreshold {
                field: "inactive_stale_days",
                value: -1
            }
        ));
    }

    #[test]
    fn test_non_integer_threshold_is_rejected() {
        let yaml = SAMPLE_YAML.replace("inactive_ci_days: 90", "inactive_ci_days: ninety");
        let err = PolicyConfig::from_yaml_str(&yaml).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));

        let yaml = SAMPLE_YAML.replace("inactive_ci_days: 90", "inactive_ci_days: 9000000000");
        let err = PolicyConfig::from_yaml_str(&yaml).unwrap_err();
        assert!(matches!(err, ConfigError::ThresholdOutOfRange { .. }));
    }

    #[test]
    fn test_unknown_placeholder_is_rejected_at_load() {
        let yaml = SAMPLE_YAML.replace("What is the status here?", "Ping {author}?");
        let err = PolicyConfig::from_yaml_str(&yaml).unwrap_err();
        match err {
            ConfigError::Template { field, source } => {
                assert_eq!(field, "inactive_rebase_comment");
                assert_eq!(source, TemplateError::UnknownPlaceholder("author".to_string()));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_empty_label_is_rejected() {
        let yaml = SAMPLE_YAML.replace("ci_failed_label: \"CI failed\"", "ci_failed_label: \"  \"");
        let err = PolicyConfig::from_yaml_str(&yaml).unwrap_err();
        assert!(matches!(err, ConfigError::EmptyLabel("ci_failed_label")));
    }

    #[test]
    fn test_load_missing_file() {
        let err = PolicyConfig::load(Path::new("/nonexistent/triage.yml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
