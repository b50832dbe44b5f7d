use std::{fmt::Display, path::PathBuf, sync::Arc, time::Duration};

use anyhow::Result;
use chrono::{Local, NaiveDate};
use chrono_english::parse_date_string;
use clap::{CommandFactory, ValueEnum};

use crate::{
    activity::{
        discovery::{SkipNames, DEFAULT_HOSTS, DEFAULT_SKIPPED},
        fan_out::{DEFAULT_CALL_TIMEOUT, DEFAULT_CONCURRENCY},
        pulls::PullRequestStrategy,
        run::{ActivityEngine, EngineConfig},
    },
    source::{command::CommandRunner, gh::GhCli, git::GitCli},
    utils::{clock::Clock, dir::default_roots},
};

use super::Args;

/// Sequential tool calls a remote repository needs: default branch, then history.
const CALLS_PER_REPOSITORY: u32 = 2;

/// Budget of a single `gh` or `git` invocation. Sequential calls of one repository all fit into the
/// per-repository timeout.
pub fn command_timeout(repository_timeout: Duration) -> Duration {
    repository_timeout / CALLS_PER_REPOSITORY
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DateStyle {
    Uk,
    Us,
}

impl From<DateStyle> for chrono_english::Dialect {
    fn from(value: DateStyle) -> Self {
        match value {
            DateStyle::Uk => Self::Uk,
            DateStyle::Us => Self::Us,
        }
    }
}

impl Display for DateStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DateStyle::Uk => write!(f, "uk"),
            DateStyle::Us => write!(f, "us"),
        }
    }
}

#[derive(Debug, Clone, clap::Args)]
pub struct DateArgs {
    #[arg(
        long,
        help = "Day to work with. Examples are \"today\", \"yesterday\", \"friday\", \"15/03/2025\". Defaults to today"
    )]
    pub date: Option<String>,
    #[arg(long, default_value_t = DateStyle::Uk, help = "Style of dates used during parsing. For Uk it's day/month/year. For Us it's month/day/year")]
    pub date_style: DateStyle,
}

impl DateArgs {
    pub fn resolve(&self, clock: &dyn Clock) -> Result<NaiveDate> {
        let Some(date) = self.date.as_deref() else {
            return Ok(clock.today());
        };
        let now = clock.time().with_timezone(&Local);
        match parse_date_string(date, now, self.date_style.into()) {
            Ok(v) => Ok(v.date_naive()),
            Err(e) => Err(Args::command()
                .error(
                    clap::error::ErrorKind::ValueValidation,
                    format!("Failed to validate date {date}: {e}"),
                )
                .into()),
        }
    }
}

#[derive(Debug, Clone, clap::Args)]
pub struct ActivityArgs {
    #[arg(
        long,
        env = "TIMETRACE_USER",
        help = "Login whose activity is collected. By default the user gh is logged in as"
    )]
    pub user: Option<String>,
    #[arg(
        long,
        env = "TIMETRACE_ROOTS",
        value_delimiter = ',',
        help = "Directories searched for local repositories. By default ~/projects, ~/code, ~/dev, ~/src, ~/work and ~/repos"
    )]
    pub roots: Vec<PathBuf>,
    #[arg(
        long,
        value_delimiter = ',',
        help = "Directory names never entered when searching local repositories, in addition to node_modules, vendor, .cache and target"
    )]
    pub skip: Vec<String>,
    #[arg(
        long,
        value_delimiter = ',',
        help = "Hosts recognised in origin URLs of local repositories. By default github.com"
    )]
    pub hosts: Vec<String>,
    #[arg(long, help = "Don't search local repositories")]
    pub no_local: bool,
    #[arg(long, help = "Don't query the hosting service")]
    pub no_remote: bool,
    #[command(flatten)]
    pub date: DateArgs,
    #[arg(
        long,
        default_value_t = 1,
        help = "Pull requests created or updated within this many days are included"
    )]
    pub pr_days: u32,
    #[arg(long, value_enum, default_value_t = PullRequestStrategy::Auto, help = "How pull requests are found")]
    pub pr_strategy: PullRequestStrategy,
    #[arg(long, default_value_t = DEFAULT_CONCURRENCY, help = "Repositories read at the same time")]
    pub concurrency: usize,
    #[arg(long = "timeout", default_value_t = DEFAULT_CALL_TIMEOUT.as_secs(), help = "Seconds a single repository may take")]
    pub timeout_secs: u64,
}

impl ActivityArgs {
    pub fn engine_config(&self, clock: &dyn Clock) -> Result<EngineConfig> {
        let roots = if self.roots.is_empty() {
            default_roots()
        } else {
            self.roots.clone()
        };
        let hosts = if self.hosts.is_empty() {
            DEFAULT_HOSTS.iter().map(|v| v.to_string()).collect()
        } else {
            self.hosts.clone()
        };

        Ok(EngineConfig {
            user: self.user.clone(),
            roots,
            hosts,
            include_remote: !self.no_remote,
            include_local: !self.no_local,
            date: self.date.resolve(clock)?,
            pr_days: self.pr_days,
            pr_strategy: self.pr_strategy,
            concurrency: self.concurrency,
            call_timeout: Duration::from_secs(self.timeout_secs),
        })
    }

    pub fn skip_names(&self) -> SkipNames {
        SkipNames::new(
            DEFAULT_SKIPPED
                .iter()
                .map(|v| v.to_string())
                .chain(self.skip.iter().cloned()),
        )
    }

    /// Engine reading from `gh` and `git`.
    pub fn build_engine(&self, clock: Arc<dyn Clock>) -> Result<ActivityEngine> {
        let config = self.engine_config(clock.as_ref())?;
        let runner = CommandRunner::new(command_timeout(config.call_timeout));
        Ok(ActivityEngine::new(
            Arc::new(GhCli::new(runner.clone())),
            Arc::new(GitCli::new(runner)),
            clock,
            Arc::new(self.skip_names()),
            config,
        ))
    }
}

#[cfg(test)]
mod tests {
    use std::{path::Path, time::Duration};

    use anyhow::Result;
    use chrono::{NaiveDate, TimeZone, Utc};
    use clap::Parser;

    use crate::{
        activity::{discovery::DirectoryFilter, pulls::PullRequestStrategy},
        cli::{Args, Commands},
        utils::clock::MockClock,
    };

    use super::{command_timeout, ActivityArgs};

    fn clock() -> MockClock {
        let mut clock = MockClock::new();
        clock
            .expect_time()
            .returning(|| Utc.with_ymd_and_hms(2026, 10, 21, 12, 0, 0).unwrap());
        clock
            .expect_today()
            .returning(|| NaiveDate::from_ymd_opt(2026, 10, 21).unwrap());
        clock
    }

    fn activity(args: &[&str]) -> ActivityArgs {
        let args = Args::parse_from(["timetrace", "summary"].iter().chain(args));
        match args.commands {
            Commands::Summary { activity } => activity,
            _ => panic!("unexpected command"),
        }
    }

    #[test]
    fn test_defaults() -> Result<()> {
        let config = activity(&["--user", "octocat"]).engine_config(&clock())?;
        assert_eq!(config.user.as_deref(), Some("octocat"));
        assert_eq!(config.hosts, vec!["github.com"]);
        assert_eq!(config.date, NaiveDate::from_ymd_opt(2026, 10, 21).unwrap());
        assert_eq!(config.pr_days, 1);
        assert_eq!(config.pr_strategy, PullRequestStrategy::Auto);
        assert_eq!(config.concurrency, 4);
        assert_eq!(config.call_timeout, Duration::from_secs(30));
        assert!(config.include_local && config.include_remote);
        Ok(())
    }

    #[test]
    fn test_explicit_values() -> Result<()> {
        let args = activity(&[
            "--user",
            "octocat",
            "--roots",
            "/work,/src",
            "--skip",
            "dist",
            "--no-remote",
            "--date",
            "19/10/2026",
            "--pr-strategy",
            "per-repository",
            "--timeout",
            "5",
        ]);
        let config = args.engine_config(&clock())?;
        assert_eq!(config.roots.len(), 2);
        assert!(!config.include_remote);
        assert_eq!(config.date, NaiveDate::from_ymd_opt(2026, 10, 19).unwrap());
        assert_eq!(config.pr_strategy, PullRequestStrategy::PerRepository);
        assert_eq!(config.call_timeout, Duration::from_secs(5));

        let skip = args.skip_names();
        assert!(skip.skip(Path::new("/work/app/dist")));
        assert!(skip.skip(Path::new("/work/app/node_modules")));
        assert!(!skip.skip(Path::new("/work/app/lib")));
        Ok(())
    }

    #[test]
    fn test_us_dates() -> Result<()> {
        let config = activity(&["--date", "10/19/2026", "--date-style", "us"]).engine_config(&clock())?;
        assert_eq!(config.date, NaiveDate::from_ymd_opt(2026, 10, 19).unwrap());
        Ok(())
    }

    #[test]
    fn test_invalid_date_is_rejected() {
        assert!(activity(&["--date", "not a date at all"])
            .engine_config(&clock())
            .is_err());
    }

    #[test]
    fn test_single_command_leaves_room_for_the_next() {
        let repository = Duration::from_secs(30);
        let command = command_timeout(repository);
        assert!(command < repository);
        assert!(command * 2 <= repository);
    }
}
