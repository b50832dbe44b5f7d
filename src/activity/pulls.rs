use std::{fmt::Display, sync::Arc};

use chrono::{DateTime, Duration, Utc};
use clap::ValueEnum;
use tracing::{debug, instrument, warn};

use crate::source::{HostingApi, RawPullRequest};

use super::{
    entities::{Origin, ProjectKey, PullRequest, PullRequestState, RepositoryHandle},
    error::SourceUnavailable,
    fan_out::{FanOut, Harvest},
};

/// Identity reported for failures of the cross-repository search.
const SEARCH_SOURCE: &str = "pull request search";

/// How pull requests are discovered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum PullRequestStrategy {
    /// Search across repositories, listing per repository when search is unavailable.
    #[default]
    Auto,
    Search,
    PerRepository,
}

impl Display for PullRequestStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PullRequestStrategy::Auto => write!(f, "auto"),
            PullRequestStrategy::Search => write!(f, "search"),
            PullRequestStrategy::PerRepository => write!(f, "per-repository"),
        }
    }
}

/// `(start, end]` interval pull requests must have been created or updated in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecencyWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl RecencyWindow {
    pub fn last_days(now: DateTime<Utc>, days: u32) -> Self {
        Self {
            start: now - Duration::days(days as i64),
            end: now,
        }
    }

    pub fn contains(&self, moment: DateTime<Utc>) -> bool {
        self.start < moment && moment <= self.end
    }

    /// Listing endpoints return pull requests regardless of age, so every result goes through
    /// this check.
    pub fn admits(&self, pull_request: &PullRequest) -> bool {
        self.contains(pull_request.created_at) || self.contains(pull_request.updated_at)
    }
}

/// Collects pull requests authored by a single user.
pub struct PullRequestCollector {
    hosting: Arc<dyn HostingApi>,
    author: Arc<str>,
}

impl PullRequestCollector {
    pub fn new(hosting: Arc<dyn HostingApi>, author: Arc<str>) -> Self {
        Self { hosting, author }
    }

    /// Pull requests in `window` found with `strategy`. Per-repository listing covers the remote
    /// handles only.
    #[instrument(skip(self, handles, fan_out))]
    pub async fn collect(
        &self,
        strategy: PullRequestStrategy,
        window: RecencyWindow,
        handles: &[RepositoryHandle],
        fan_out: &FanOut,
    ) -> Harvest<PullRequest> {
        let mut harvest = Harvest::default();
        match strategy {
            PullRequestStrategy::Search => {
                harvest.absorb(
                    fan_out
                        .guard(SEARCH_SOURCE.into(), self.search(window))
                        .await,
                );
            }
            PullRequestStrategy::PerRepository => {
                harvest = self.list_all(window, handles, fan_out).await;
            }
            PullRequestStrategy::Auto => {
                match fan_out
                    .guard(SEARCH_SOURCE.into(), self.search(window))
                    .await
                {
                    Ok(items) => harvest.items = items,
                    Err(e) => {
                        debug!("Search unavailable, listing per repository {e}");
                        harvest = self.list_all(window, handles, fan_out).await;
                    }
                }
            }
        }
        debug!("Collected {} pull requests", harvest.items.len());
        harvest
    }

    async fn list_all(
        &self,
        window: RecencyWindow,
        handles: &[RepositoryHandle],
        fan_out: &FanOut,
    ) -> Harvest<PullRequest> {
        let remote = handles
            .iter()
            .filter(|v| v.origin == Origin::Remote)
            .cloned()
            .collect::<Vec<_>>();
        fan_out
            .run(&remote, |handle| self.list_repository(handle, window))
            .await
    }

    /// Pull requests of the author in a single repository.
    pub async fn list_repository(
        &self,
        handle: &RepositoryHandle,
        window: RecencyWindow,
    ) -> Result<Vec<PullRequest>, SourceUnavailable> {
        let raw = self
            .hosting
            .list_pull_requests(&handle.identity, &self.author)
            .await
            .map_err(|e| SourceUnavailable::new(handle.identity.clone(), e))?;
        let project = handle.project();
        Ok(raw
            .into_iter()
            .filter_map(|raw| convert(raw, project.clone()))
            .filter(|v| window.admits(v))
            .collect())
    }

    /// Pull requests of the author across every repository, created since the window start.
    pub async fn search(
        &self,
        window: RecencyWindow,
    ) -> Result<Vec<PullRequest>, SourceUnavailable> {
        let raw = self
            .hosting
            .search_pull_requests(&self.author, window.start.date_naive())
            .await
            .map_err(|e| SourceUnavailable::new(SEARCH_SOURCE, e))?;
        Ok(raw
            .into_iter()
            .filter_map(|raw| {
                let Some(repository) = raw.repository.clone() else {
                    warn!("Skipping pull request #{} without a repository", raw.number);
                    return None;
                };
                convert(raw, ProjectKey::remote(repository))
            })
            .filter(|v| window.admits(v))
            .collect())
    }
}

fn convert(raw: RawPullRequest, repository: ProjectKey) -> Option<PullRequest> {
    let state = raw
        .state
        .parse::<PullRequestState>()
        .inspect_err(|e| warn!("Skipping pull request #{} of {repository}: {e}", raw.number))
        .ok()?;
    Some(PullRequest {
        number: raw.number,
        title: raw.title,
        url: raw.url,
        repository,
        state,
        created_at: raw.created_at,
        updated_at: raw.updated_at,
    })
}

#[cfg(test)]
mod tests {
    use std::{path::PathBuf, sync::Arc, time::Duration as StdDuration};

    use chrono::{DateTime, Duration, TimeZone, Utc};
    use tokio_util::sync::CancellationToken;

    use crate::{
        activity::{
            entities::{PullRequestState, RepositoryHandle},
            fan_out::FanOut,
        },
        source::{MockHostingApi, RawPullRequest, SourceError},
    };

    use super::{PullRequestCollector, PullRequestStrategy, RecencyWindow};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, 18, 0, 0).unwrap()
    }

    fn raw(
        number: u64,
        created: DateTime<Utc>,
        updated: DateTime<Utc>,
        repository: Option<&str>,
    ) -> RawPullRequest {
        RawPullRequest {
            number,
            title: format!("PR {number}"),
            url: format!("https://github.com/acme/web/pull/{number}"),
            state: "OPEN".into(),
            created_at: created,
            updated_at: updated,
            repository: repository.map(String::from),
        }
    }

    fn fan_out() -> FanOut {
        FanOut::new(4, StdDuration::from_secs(30), CancellationToken::new())
    }

    fn collector(hosting: MockHostingApi) -> PullRequestCollector {
        PullRequestCollector::new(Arc::new(hosting), "octocat".into())
    }

    fn numbers(items: &[crate::activity::entities::PullRequest]) -> Vec<u64> {
        items.iter().map(|v| v.number).collect()
    }

    #[test]
    fn test_window_bounds() {
        let window = RecencyWindow::last_days(now(), 1);
        assert!(!window.contains(now() - Duration::days(1)));
        assert!(window.contains(now() - Duration::days(1) + Duration::seconds(1)));
        assert!(window.contains(now()));
        assert!(!window.contains(now() + Duration::seconds(1)));
    }

    #[tokio::test]
    async fn test_listing_is_post_filtered_by_window() {
        let mut hosting = MockHostingApi::new();
        // ignores any date argument, returns everything
        hosting.expect_list_pull_requests().returning(|_, _| {
            Ok(vec![
                raw(1, now() - Duration::hours(2), now() - Duration::hours(1), None),
                raw(2, now() - Duration::days(30), now() - Duration::hours(3), None),
                raw(3, now() - Duration::days(30), now() - Duration::days(20), None),
                raw(4, now() + Duration::days(2), now() + Duration::days(2), None),
            ])
        });

        let harvest = collector(hosting)
            .collect(
                PullRequestStrategy::PerRepository,
                RecencyWindow::last_days(now(), 1),
                &[RepositoryHandle::remote("acme/web")],
                &fan_out(),
            )
            .await;

        assert_eq!(numbers(&harvest.items), vec![1, 2]);
        assert_eq!(&*harvest.items[0].repository.identity, "acme/web");
        assert_eq!(harvest.items[0].state, PullRequestState::Open);
    }

    #[tokio::test]
    async fn test_per_repository_errors_are_skipped() {
        let mut hosting = MockHostingApi::new();
        hosting
            .expect_list_pull_requests()
            .returning(|repository, author| {
                assert_eq!(author, "octocat");
                if repository == "acme/private" {
                    Err(SourceError::Malformed("no access".into()))
                } else {
                    Ok(vec![raw(5, now(), now(), None)])
                }
            });

        let handles = [
            RepositoryHandle::remote("acme/private"),
            RepositoryHandle::remote("acme/web"),
            RepositoryHandle::local("acme/web", PathBuf::from("/work/web")),
        ];
        let harvest = collector(hosting)
            .collect(
                PullRequestStrategy::PerRepository,
                RecencyWindow::last_days(now(), 1),
                &handles,
                &fan_out(),
            )
            .await;

        assert_eq!(numbers(&harvest.items), vec![5]);
        assert_eq!(harvest.failures.len(), 1);
        assert_eq!(&*harvest.failures[0].repository, "acme/private");
    }

    #[tokio::test]
    async fn test_search_assigns_repositories_and_filters() {
        let mut hosting = MockHostingApi::new();
        hosting
            .expect_search_pull_requests()
            .withf(|author, since| {
                author == "octocat" && *since == (now() - Duration::days(7)).date_naive()
            })
            .returning(|_, _| {
                let mut merged = raw(7, now() - Duration::days(1), now(), Some("acme/web"));
                merged.state = "MERGED".into();
                Ok(vec![
                    merged,
                    raw(8, now() - Duration::days(1), now(), None),
                    raw(9, now() - Duration::days(40), now() - Duration::days(39), Some("acme/api")),
                ])
            });
        hosting.expect_list_pull_requests().never();

        let harvest = collector(hosting)
            .collect(
                PullRequestStrategy::Search,
                RecencyWindow::last_days(now(), 7),
                &[RepositoryHandle::remote("acme/web")],
                &fan_out(),
            )
            .await;

        assert_eq!(numbers(&harvest.items), vec![7]);
        assert_eq!(harvest.items[0].state, PullRequestState::Merged);
        assert_eq!(&*harvest.items[0].repository.identity, "acme/web");
    }

    #[tokio::test]
    async fn test_auto_falls_back_to_listing() {
        let mut hosting = MockHostingApi::new();
        hosting
            .expect_search_pull_requests()
            .returning(|_, _| Err(SourceError::Malformed("search disabled".into())));
        hosting
            .expect_list_pull_requests()
            .times(1)
            .returning(|_, _| Ok(vec![raw(3, now(), now(), None)]));

        let harvest = collector(hosting)
            .collect(
                PullRequestStrategy::Auto,
                RecencyWindow::last_days(now(), 1),
                &[RepositoryHandle::remote("acme/web")],
                &fan_out(),
            )
            .await;

        assert_eq!(numbers(&harvest.items), vec![3]);
        assert!(harvest.failures.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_states_are_skipped() {
        let mut hosting = MockHostingApi::new();
        hosting.expect_list_pull_requests().returning(|_, _| {
            let mut draft = raw(1, now(), now(), None);
            draft.state = "DRAFTISH".into();
            Ok(vec![draft, raw(2, now(), now(), None)])
        });

        let harvest = collector(hosting)
            .collect(
                PullRequestStrategy::PerRepository,
                RecencyWindow::last_days(now(), 1),
                &[RepositoryHandle::remote("acme/web")],
                &fan_out(),
            )
            .await;

        assert_eq!(numbers(&harvest.items), vec![2]);
    }
}
