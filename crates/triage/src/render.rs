//! Comment template rendering.
//!
//! Templates support exactly two placeholders, `{owner}` and `{repo}`, which
//! are replaced literally. Any other `{identifier}` token is an authoring
//! error. Braces that do not wrap an identifier (JSON snippets, lone `{`) are
//! left alone.

use crate::error::TemplateError;
use crate::rules::PolicyRule;
use regex::Regex;
use std::sync::LazyLock;

const OWNER_TOKEN: &str = "{owner}";
const REPO_TOKEN: &str = "{repo}";

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("placeholder pattern is valid")
});

/// Label and comment body for one rule, ready for the executor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedAction {
    pub label: Option<String>,
    pub body: String,
}

/// Check that a template only uses `{owner}` and `{repo}`
pub fn validate_template(template: &str) -> Result<(), TemplateError> {
    for caps in PLACEHOLDER.captures_iter(template) {
        let name = &caps[1];
        if name != "owner" && name != "repo" {
            return Err(TemplateError::UnknownPlaceholder(name.to_string()));
        }
    }
    Ok(())
}

/// Substitute `{owner}` and `{repo}` into a template
pub fn render_template(template: &str, owner: &str, repo: &str) -> Result<String, TemplateError> {
    validate_template(template)?;
    Ok(template
        .replace(OWNER_TOKEN, owner)
        .replace(REPO_TOKEN, repo))
}

/// Render a rule's comment and resolve its label (verbatim)
pub fn render(rule: &PolicyRule, owner: &str, repo: &str) -> Result<RenderedAction, TemplateError> {
    Ok(RenderedAction {
        label: rule.label.clone(),
        body: render_template(&rule.comment_template, owner, repo)?,
    })
}
