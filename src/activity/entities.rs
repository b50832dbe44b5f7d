use std::{fmt::Display, path::PathBuf, str::FromStr, sync::Arc};

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Appended to the project label of repositories discovered on disk.
pub const LOCAL_MARKER: &str = " (local)";

/// Length of a sha shown to the user.
pub const SHORT_SHA_LEN: usize = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Origin {
    Remote,
    Local,
}

/// Identifies a project across a run. The same `owner/name` seen remotely and on disk are
/// different projects.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProjectKey {
    pub identity: Arc<str>,
    pub origin: Origin,
}

impl ProjectKey {
    pub fn remote(identity: impl Into<Arc<str>>) -> Self {
        Self {
            identity: identity.into(),
            origin: Origin::Remote,
        }
    }

    pub fn local(identity: impl Into<Arc<str>>) -> Self {
        Self {
            identity: identity.into(),
            origin: Origin::Local,
        }
    }

    /// Name of the project as written into the ledger.
    pub fn label(&self) -> String {
        match self.origin {
            Origin::Local if !self.identity.ends_with(LOCAL_MARKER) => {
                format!("{}{LOCAL_MARKER}", self.identity)
            }
            Origin::Remote | Origin::Local => self.identity.to_string(),
        }
    }
}

impl Display for ProjectKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// A discovered unit of source history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryHandle {
    /// `owner/name` for remote repositories and for local ones with a recognised origin,
    /// `<directory> (local)` otherwise.
    pub identity: Arc<str>,
    pub origin: Origin,
    pub default_branch: Option<String>,
    pub local_path: Option<PathBuf>,
}

impl RepositoryHandle {
    pub fn remote(identity: impl Into<Arc<str>>) -> Self {
        Self {
            identity: identity.into(),
            origin: Origin::Remote,
            default_branch: None,
            local_path: None,
        }
    }

    pub fn local(identity: impl Into<Arc<str>>, path: PathBuf) -> Self {
        Self {
            identity: identity.into(),
            origin: Origin::Local,
            default_branch: None,
            local_path: Some(path),
        }
    }

    pub fn project(&self) -> ProjectKey {
        ProjectKey {
            identity: self.identity.clone(),
            origin: self.origin,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    pub sha: String,
    pub short_sha: String,
    pub message: String,
    pub url: String,
    pub repository: ProjectKey,
    pub authored_at: DateTime<Utc>,
}

impl Commit {
    pub fn new(
        sha: String,
        message: String,
        url: String,
        repository: ProjectKey,
        authored_at: DateTime<Utc>,
    ) -> Self {
        let short_sha = sha.chars().take(SHORT_SHA_LEN).collect();
        Self {
            sha,
            short_sha,
            message,
            url,
            repository,
            authored_at,
        }
    }

    pub fn summary(&self) -> &str {
        self.message.lines().next().unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PullRequestState {
    Open,
    Closed,
    Merged,
}

impl FromStr for PullRequestState {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "open" => Ok(Self::Open),
            "closed" => Ok(Self::Closed),
            "merged" => Ok(Self::Merged),
            _ => Err(anyhow!("Unknown pull request state {s}")),
        }
    }
}

impl Display for PullRequestState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PullRequestState::Open => write!(f, "open"),
            PullRequestState::Closed => write!(f, "closed"),
            PullRequestState::Merged => write!(f, "merged"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequest {
    pub number: u64,
    pub title: String,
    pub url: String,
    pub repository: ProjectKey,
    pub state: PullRequestState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::{Commit, ProjectKey, PullRequestState};

    #[test]
    fn test_labels() {
        assert_eq!(ProjectKey::remote("acme/api").label(), "acme/api");
        assert_eq!(ProjectKey::local("acme/api").label(), "acme/api (local)");
        assert_eq!(ProjectKey::local("scratch (local)").label(), "scratch (local)");
    }

    #[test]
    fn test_remote_and_local_keys_differ() {
        assert_ne!(ProjectKey::remote("acme/api"), ProjectKey::local("acme/api"));
    }

    #[test]
    fn test_commit_short_sha_and_summary() {
        let commit = Commit::new(
            "0123456789abcdef".into(),
            "fix bug\n\nbody".into(),
            "url".into(),
            ProjectKey::remote("acme/api"),
            Utc::now(),
        );
        assert_eq!(commit.short_sha, "0123456");
        assert_eq!(commit.summary(), "fix bug");
    }

    #[test]
    fn test_state_parsing_ignores_case() {
        assert_eq!("MERGED".parse::<PullRequestState>().unwrap(), PullRequestState::Merged);
        assert_eq!("open".parse::<PullRequestState>().unwrap(), PullRequestState::Open);
        assert!("draft".parse::<PullRequestState>().is_err());
    }
}
