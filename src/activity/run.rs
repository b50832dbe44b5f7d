use std::{fmt::Display, path::PathBuf, sync::Arc, time::Duration};

use chrono::NaiveDate;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::{
    source::{HostingApi, LocalVcs},
    utils::clock::Clock,
};

use super::{
    aggregate::{aggregate, ActivityMap},
    commits::CommitCollector,
    discovery::{DirectoryFilter, RepositoryDiscoverer},
    entities::{Commit, PullRequest, RepositoryHandle},
    error::{DiscoveryFailure, RunError, SourceUnavailable},
    fan_out::FanOut,
    pulls::{PullRequestCollector, PullRequestStrategy, RecencyWindow},
    suggest::{synthesize, SuggestedEntry},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Discovering,
    Collecting,
    Aggregating,
    Synthesized,
}

impl Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunState::Idle => write!(f, "idle"),
            RunState::Discovering => write!(f, "discovering"),
            RunState::Collecting => write!(f, "collecting"),
            RunState::Aggregating => write!(f, "aggregating"),
            RunState::Synthesized => write!(f, "synthesized"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Login whose activity is collected. Asked from the hosting service when missing.
    pub user: Option<String>,
    pub roots: Vec<PathBuf>,
    pub hosts: Vec<String>,
    pub include_remote: bool,
    pub include_local: bool,
    /// Commits made before this day are ignored.
    pub date: NaiveDate,
    pub pr_days: u32,
    pub pr_strategy: PullRequestStrategy,
    pub concurrency: usize,
    pub call_timeout: Duration,
}

/// Everything a single run found.
#[derive(Debug)]
pub struct ActivityReport {
    pub user: String,
    pub date: NaiveDate,
    pub handles: Vec<RepositoryHandle>,
    pub commits: Vec<Commit>,
    pub pull_requests: Vec<PullRequest>,
    pub activity: ActivityMap,
    pub suggestions: Vec<SuggestedEntry>,
    /// Repositories that couldn't be read. The rest of the report is still complete.
    pub failures: Vec<SourceUnavailable>,
    /// Set when remote discovery failed but local repositories kept the run going.
    pub discovery_failure: Option<DiscoveryFailure>,
    pub state: RunState,
}

/// Coordinates discovery, collection, aggregation and synthesis. Runs hold no state between each
/// other, so the same inputs produce the same report.
pub struct ActivityEngine {
    hosting: Arc<dyn HostingApi>,
    vcs: Arc<dyn LocalVcs>,
    clock: Arc<dyn Clock>,
    filter: Arc<dyn DirectoryFilter>,
    config: EngineConfig,
}

impl ActivityEngine {
    pub fn new(
        hosting: Arc<dyn HostingApi>,
        vcs: Arc<dyn LocalVcs>,
        clock: Arc<dyn Clock>,
        filter: Arc<dyn DirectoryFilter>,
        config: EngineConfig,
    ) -> Self {
        Self {
            hosting,
            vcs,
            clock,
            filter,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[instrument(skip(self, cancel), fields(date = %self.config.date))]
    pub async fn run(&self, cancel: CancellationToken) -> Result<ActivityReport, RunError> {
        let mut state = RunState::Idle;
        let user = self.resolve_user().await?;

        advance(&mut state, RunState::Discovering);
        let (handles, discovery_failure) = self.discover(&user).await?;

        advance(&mut state, RunState::Collecting);
        let fan_out = FanOut::new(self.config.concurrency, self.config.call_timeout, cancel);
        let author: Arc<str> = user.as_str().into();

        let commit_collector =
            CommitCollector::new(self.hosting.clone(), self.vcs.clone(), author.clone());
        let since = self.config.date;
        let commits = fan_out
            .run(&handles, |handle| commit_collector.collect(handle, since))
            .await;

        let pulls = if self.config.include_remote {
            let window = RecencyWindow::last_days(self.clock.time(), self.config.pr_days);
            PullRequestCollector::new(self.hosting.clone(), author)
                .collect(self.config.pr_strategy, window, &handles, &fan_out)
                .await
        } else {
            Default::default()
        };

        advance(&mut state, RunState::Aggregating);
        let mut failures = commits.failures;
        failures.extend(pulls.failures);
        let activity = aggregate(commits.items.clone(), pulls.items.clone());

        let suggestions = synthesize(&activity, self.config.date);
        advance(&mut state, RunState::Synthesized);

        info!(
            "Found {} commits and {} pull requests across {} projects, {} repositories unavailable",
            commits.items.len(),
            pulls.items.len(),
            activity.len(),
            failures.len()
        );

        Ok(ActivityReport {
            user,
            date: self.config.date,
            handles,
            commits: commits.items,
            pull_requests: pulls.items,
            activity,
            suggestions,
            failures,
            discovery_failure,
            state,
        })
    }

    async fn resolve_user(&self) -> Result<String, RunError> {
        if let Some(user) = self.config.user.as_deref().filter(|v| !v.trim().is_empty()) {
            return Ok(user.trim().to_string());
        }
        self.hosting
            .current_user()
            .await
            .map_err(|e| RunError::FatalConfiguration(e.to_string()))
    }

    async fn discover(
        &self,
        user: &str,
    ) -> Result<(Vec<RepositoryHandle>, Option<DiscoveryFailure>), RunError> {
        let discoverer = RepositoryDiscoverer::new(
            self.hosting.clone(),
            self.vcs.clone(),
            self.filter.clone(),
            self.config.hosts.clone(),
        );

        let remote = if self.config.include_remote {
            discoverer.discover_remote(user).await
        } else {
            Ok(vec![])
        };
        let local = if self.config.include_local {
            discoverer.discover_local(&self.config.roots).await
        } else {
            vec![]
        };

        match remote {
            Ok(mut handles) => {
                handles.extend(local);
                Ok((handles, None))
            }
            Err(e) if local.is_empty() => Err(e.into()),
            Err(e) => {
                warn!("Continuing with local repositories only {e}");
                Ok((local, Some(e)))
            }
        }
    }
}

fn advance(state: &mut RunState, next: RunState) {
    debug!("Run {state} -> {next}");
    *state = next;
}
