use std::path::Path;

use async_trait::async_trait;
use chrono::{Local, NaiveDate};

use crate::utils::time::day_start;

use super::{command::CommandRunner, LocalVcs, SourceError};

const GIT: &str = "git";

/// Format of a single `git log` line: full sha, subject, strict ISO-8601 author date.
pub const LOG_FORMAT: &str = "--pretty=format:%H|%s|%aI";

/// [LocalVcs] backed by the `git` executable.
pub struct GitCli {
    runner: CommandRunner,
}

impl GitCli {
    pub fn new(runner: CommandRunner) -> Self {
        Self { runner }
    }
}

#[async_trait]
impl LocalVcs for GitCli {
    async fn origin_url(&self, repository: &Path) -> Result<Option<String>, SourceError> {
        match self
            .runner
            .run(GIT, &["remote", "get-url", "origin"], Some(repository))
            .await
        {
            Ok(output) => {
                let url = output.trim();
                Ok((!url.is_empty()).then(|| url.to_string()))
            }
            // git exits with 2 when the remote doesn't exist
            Err(SourceError::CommandFailed { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn log(
        &self,
        repository: &Path,
        since: NaiveDate,
        author: &str,
    ) -> Result<String, SourceError> {
        // a bare date makes git use the current time of day on it
        let since = format!(
            "--since={}",
            day_start(since)
                .with_timezone(&Local)
                .format("%Y-%m-%d %H:%M:%S")
        );
        let author = format!("--author={author}");
        self.runner
            .run(
                GIT,
                &["log", "--all", &since, &author, LOG_FORMAT, "--no-merges"],
                Some(repository),
            )
            .await
    }
}

#[cfg(all(test, unix))]
mod tests {
    use std::{path::Path, process::Command, time::Duration};

    use anyhow::{ensure, Result};
    use chrono::NaiveDate;
    use tempfile::tempdir;

    use crate::{activity::commits::parse_log_line, source::command::CommandRunner};

    use super::{GitCli, LocalVcs};

    fn git(dir: &Path, args: &[&str], date: &str) -> Result<()> {
        let status = Command::new("git")
            .args(["-c", "commit.gpgsign=false"])
            .args(args)
            .current_dir(dir)
            .env("GIT_AUTHOR_NAME", "octocat")
            .env("GIT_AUTHOR_EMAIL", "octocat@example.com")
            .env("GIT_COMMITTER_NAME", "octocat")
            .env("GIT_COMMITTER_EMAIL", "octocat@example.com")
            .env("GIT_AUTHOR_DATE", date)
            .env("GIT_COMMITTER_DATE", date)
            .status()?;
        ensure!(status.success(), "git {args:?} failed");
        Ok(())
    }

    #[tokio::test]
    async fn test_log_includes_whole_day() -> Result<()> {
        let dir = tempdir()?;
        git(dir.path(), &["init", "-q"], "2026-10-18T12:00:00")?;
        git(
            dir.path(),
            &["commit", "-q", "--allow-empty", "-m", "late evening"],
            "2026-10-18T23:30:00",
        )?;
        git(
            dir.path(),
            &["commit", "-q", "--allow-empty", "-m", "early morning"],
            "2026-10-19T00:30:00",
        )?;

        let vcs = GitCli::new(CommandRunner::new(Duration::from_secs(10)));
        let output = vcs
            .log(
                dir.path(),
                NaiveDate::from_ymd_opt(2026, 10, 19).unwrap(),
                "octocat",
            )
            .await?;

        let subjects = output
            .lines()
            .filter_map(parse_log_line)
            .map(|(_, subject, _)| subject.to_string())
            .collect::<Vec<_>>();
        assert_eq!(subjects, vec!["early morning"]);
        Ok(())
    }
}
