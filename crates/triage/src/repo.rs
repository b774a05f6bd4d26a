//! Repository and pull request identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Repository slug on the hosting platform. Format: `owner/repo`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Slug {
    pub owner: String,
    pub repo: String,
}

impl Slug {
    #[must_use]
    pub fn new(owner: &str, repo: &str) -> Self {
        Self {
            owner: owner.to_string(),
            repo: repo.to_string(),
        }
    }
}

impl fmt::Display for Slug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

impl FromStr for Slug {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split('/').collect::<Vec<_>>().as_slice() {
            [owner, repo] if !owner.is_empty() && !repo.is_empty() => Ok(Self::new(owner, repo)),
            _ => Err(format!("invalid repository slug '{s}', expected owner/repo")),
        }
    }
}

/// Identifies one pull request across repositories
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PullRequestId {
    pub owner: String,
    pub repo: String,
    pub number: u64,
}

impl PullRequestId {
    #[must_use]
    pub fn new(slug: &Slug, number: u64) -> Self {
        Self {
            owner: slug.owner.clone(),
            repo: slug.repo.clone(),
            number,
        }
    }
}

impl fmt::Display for PullRequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}#{}", self.owner, self.repo, self.number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slug_parsing() {
        let slug: Slug = "acme/widgets".parse().unwrap();
        assert_eq!(slug, Slug::new("acme", "widgets"));
        assert_eq!(slug.to_string(), "acme/widgets");

        assert!("acme".parse::<Slug>().is_err());
        assert!("acme/widgets/extra".parse::<Slug>().is_err());
        assert!("/widgets".parse::<Slug>().is_err());
    }

    #[test]
    fn test_pull_request_id_display() {
        let id = PullRequestId::new(&Slug::new("acme", "widgets"), 42);
        assert_eq!(id.to_string(), "acme/widgets#42");
    }
}
