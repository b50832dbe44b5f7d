use std::{path::Path, sync::Arc};

use chrono::{DateTime, NaiveDate, Utc};
use tracing::{debug, instrument, warn};

use crate::source::{HostingApi, LocalVcs, RawCommit, SourceError};

use super::{
    entities::{Commit, Origin, RepositoryHandle, SHORT_SHA_LEN},
    error::SourceUnavailable,
};

/// Branch assumed when the hosting service can't tell the default one.
pub const FALLBACK_BRANCH: &str = "main";

/// Collects commits of a single author from one repository at a time.
pub struct CommitCollector {
    hosting: Arc<dyn HostingApi>,
    vcs: Arc<dyn LocalVcs>,
    author: Arc<str>,
}

impl CommitCollector {
    pub fn new(hosting: Arc<dyn HostingApi>, vcs: Arc<dyn LocalVcs>, author: Arc<str>) -> Self {
        Self {
            hosting,
            vcs,
            author,
        }
    }

    /// Commits of the author in `handle` made on or after `since`. Remote repositories are read
    /// from their default branch, local ones from every branch.
    #[instrument(skip(self, handle), fields(repository = %handle.identity))]
    pub async fn collect(
        &self,
        handle: &RepositoryHandle,
        since: NaiveDate,
    ) -> Result<Vec<Commit>, SourceUnavailable> {
        let result = match (handle.origin, handle.local_path.as_deref()) {
            (Origin::Local, Some(path)) => self.collect_local(handle, path, since).await,
            (Origin::Local, None) => Err(SourceError::Malformed(
                "local repository without a path".into(),
            )),
            (Origin::Remote, _) => self.collect_remote(handle, since).await,
        };
        let commits = result.map_err(|e| SourceUnavailable::new(handle.identity.clone(), e))?;
        debug!("Collected {} commits", commits.len());
        Ok(commits)
    }

    async fn collect_remote(
        &self,
        handle: &RepositoryHandle,
        since: NaiveDate,
    ) -> Result<Vec<Commit>, SourceError> {
        let branch = match &handle.default_branch {
            Some(branch) => branch.clone(),
            None => self.resolve_default_branch(&handle.identity).await,
        };

        let history = self
            .hosting
            .branch_history(&handle.identity, &branch, since)
            .await?;

        Ok(filter_authored(history, &self.author)
            .map(|raw| {
                Commit::new(
                    raw.oid,
                    raw.message,
                    raw.url,
                    handle.project(),
                    raw.authored_at,
                )
            })
            .collect())
    }

    async fn resolve_default_branch(&self, repository: &str) -> String {
        match self.hosting.default_branch(repository).await {
            Ok(Some(branch)) => branch,
            Ok(None) => FALLBACK_BRANCH.to_string(),
            Err(e) => {
                debug!("Couldn't resolve default branch, assuming {FALLBACK_BRANCH} {e}");
                FALLBACK_BRANCH.to_string()
            }
        }
    }

    async fn collect_local(
        &self,
        handle: &RepositoryHandle,
        path: &Path,
        since: NaiveDate,
    ) -> Result<Vec<Commit>, SourceError> {
        let output = self.vcs.log(path, since, &self.author).await?;
        let project = handle.project();
        Ok(output
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| {
                let parsed = parse_log_line(line);
                if parsed.is_none() {
                    warn!("Skipping malformed log line {line:?} in {path:?}");
                }
                parsed
            })
            .map(|(sha, subject, authored_at)| {
                let url = format!("file://{}/commit/{sha}", path.display());
                Commit::new(
                    sha.to_string(),
                    subject.to_string(),
                    url,
                    project.clone(),
                    authored_at,
                )
            })
            .collect())
    }
}

/// Only commits linked to exactly `author` survive. Queries can return commits the author only
/// co-authored or that match on email.
pub fn filter_authored<'a>(
    history: impl IntoIterator<Item = RawCommit> + 'a,
    author: &'a str,
) -> impl Iterator<Item = RawCommit> + 'a {
    history
        .into_iter()
        .filter(move |raw| raw.author_login.as_deref() == Some(author))
}

/// Splits a `sha|subject|date` line. The subject may itself contain `|`.
pub fn parse_log_line(line: &str) -> Option<(&str, &str, DateTime<Utc>)> {
    let (sha, rest) = line.split_once('|')?;
    let (subject, date) = rest.rsplit_once('|')?;
    let sha = sha.trim();
    if sha.len() < SHORT_SHA_LEN || !sha.chars().all(|v| v.is_ascii_hexdigit()) {
        return None;
    }
    let authored_at = DateTime::parse_from_rfc3339(date.trim()).ok()?.to_utc();
    Some((sha, subject, authored_at))
}
