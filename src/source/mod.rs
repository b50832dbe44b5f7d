//! Contracts for the external tools the activity engine reads from.
//! [HostingApi] covers the code-hosting service, [LocalVcs] covers repositories on disk. Both are
//! implemented on top of command line tools ([gh::GhCli] and [git::GitCli]) and mocked in tests.

pub mod command;
pub mod gh;
pub mod git;

use std::{path::Path, process::ExitStatus, time::Duration};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

/// Reasons a single call to an external source can fail.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to start `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("`{command}` exited with {status}: {stderr}")]
    CommandFailed {
        command: String,
        status: ExitStatus,
        stderr: String,
    },
    #[error("`{command}` timed out after {timeout:?}")]
    Timeout { command: String, timeout: Duration },
    #[error("collection was cancelled")]
    Cancelled,
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl From<serde_json::Error> for SourceError {
    fn from(value: serde_json::Error) -> Self {
        SourceError::Malformed(value.to_string())
    }
}

/// A commit as the hosting service reports it, before authorship filtering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawCommit {
    pub oid: String,
    pub message: String,
    pub url: String,
    pub authored_at: DateTime<Utc>,
    /// Platform account linked to the commit author. Absent when the author email isn't linked to
    /// any account.
    pub author_login: Option<String>,
}

/// A pull request as the hosting service reports it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPullRequest {
    pub number: u64,
    pub title: String,
    pub url: String,
    pub state: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Only filled in by cross-repository search.
    #[serde(default, deserialize_with = "repository_name")]
    pub repository: Option<String>,
}

fn repository_name<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct Repository {
        name_with_owner: String,
    }
    Ok(Option::<Repository>::deserialize(deserializer)?.map(|v| v.name_with_owner))
}

/// The code-hosting service as seen by the engine.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HostingApi: Send + Sync {
    /// Login of the authenticated account.
    async fn current_user(&self) -> Result<String, SourceError>;

    /// `owner/name` of repositories owned by the authenticated account.
    async fn owned_repositories(&self) -> Result<Vec<String>, SourceError>;

    /// `owner/name` of every repository mentioned in the user's public activity feed. May contain
    /// duplicates.
    async fn feed_repositories(&self, user: &str) -> Result<Vec<String>, SourceError>;

    /// Default branch of a repository, if the service reports one.
    async fn default_branch(&self, repository: &str) -> Result<Option<String>, SourceError>;

    /// Commits on `branch` authored since the start of `since`. The service may return commits of
    /// other authors.
    async fn branch_history(
        &self,
        repository: &str,
        branch: &str,
        since: NaiveDate,
    ) -> Result<Vec<RawCommit>, SourceError>;

    /// Pull requests by `author` created since `since`, across all repositories.
    async fn search_pull_requests(
        &self,
        author: &str,
        since: NaiveDate,
    ) -> Result<Vec<RawPullRequest>, SourceError>;

    /// Pull requests by `author` in a single repository, in any state.
    async fn list_pull_requests(
        &self,
        repository: &str,
        author: &str,
    ) -> Result<Vec<RawPullRequest>, SourceError>;
}

/// Local version control as seen by the engine.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LocalVcs: Send + Sync {
    /// URL of the `origin` remote. `None` if the repository has no such remote.
    async fn origin_url(&self, repository: &Path) -> Result<Option<String>, SourceError>;

    /// Raw `sha|subject|date` lines for commits of `author` on all branches since `since`.
    async fn log(
        &self,
        repository: &Path,
        since: NaiveDate,
        author: &str,
    ) -> Result<String, SourceError>;
}

/// Parses a JSON array response. Blank output counts as an empty array. Records of the wrong shape
/// are skipped, only a response that isn't an array at all is an error.
pub fn parse_json_list<T: serde::de::DeserializeOwned>(output: &str) -> Result<Vec<T>, SourceError> {
    let trimmed = output.trim();
    if trimmed.is_empty() {
        return Ok(vec![]);
    }
    let records: Vec<serde_json::Value> = serde_json::from_str(trimmed)?;
    Ok(records
        .into_iter()
        .filter_map(|record| match serde_json::from_value(record) {
            Ok(v) => Some(v),
            Err(e) => {
                warn!("Skipping malformed record {e}");
                None
            }
        })
        .collect())
}
