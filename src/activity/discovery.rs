use std::{
    collections::HashSet,
    ffi::OsString,
    path::{Path, PathBuf},
    sync::Arc,
};

use futures::{stream, StreamExt};
use tracing::{debug, instrument, trace, warn};
use walkdir::WalkDir;

use crate::source::{HostingApi, LocalVcs};

use super::{
    entities::{RepositoryHandle, LOCAL_MARKER},
    error::DiscoveryFailure,
};

/// A directory holding this entry is the root of a repository.
pub const VCS_MARKER: &str = ".git";

/// Directory names pruned from local walks unless configured otherwise.
pub const DEFAULT_SKIPPED: [&str; 4] = ["node_modules", "vendor", ".cache", "target"];

pub const DEFAULT_HOSTS: [&str; 1] = ["github.com"];

const ORIGIN_RESOLUTION_CONCURRENCY: usize = 4;

/// Decides which directories a local walk never enters.
pub trait DirectoryFilter: Send + Sync {
    fn skip(&self, dir: &Path) -> bool;
}

impl<F: Fn(&Path) -> bool + Send + Sync> DirectoryFilter for F {
    fn skip(&self, dir: &Path) -> bool {
        self(dir)
    }
}

/// Skips directories by their name.
#[derive(Debug, Clone)]
pub struct SkipNames {
    names: HashSet<OsString>,
}

impl SkipNames {
    pub fn new<S: Into<OsString>>(names: impl IntoIterator<Item = S>) -> Self {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }
}

impl Default for SkipNames {
    fn default() -> Self {
        Self::new(DEFAULT_SKIPPED)
    }
}

impl DirectoryFilter for SkipNames {
    fn skip(&self, dir: &Path) -> bool {
        dir.file_name().is_some_and(|v| self.names.contains(v))
    }
}

/// Finds candidate repositories on the hosting service and on disk.
pub struct RepositoryDiscoverer {
    hosting: Arc<dyn HostingApi>,
    vcs: Arc<dyn LocalVcs>,
    filter: Arc<dyn DirectoryFilter>,
    hosts: Vec<String>,
}

impl RepositoryDiscoverer {
    pub fn new(
        hosting: Arc<dyn HostingApi>,
        vcs: Arc<dyn LocalVcs>,
        filter: Arc<dyn DirectoryFilter>,
        hosts: Vec<String>,
    ) -> Self {
        Self {
            hosting,
            vcs,
            filter,
            hosts,
        }
    }

    /// Union of owned repositories and repositories from the activity feed, owned first. One
    /// failing source is tolerated.
    #[instrument(skip(self))]
    pub async fn discover_remote(
        &self,
        user: &str,
    ) -> Result<Vec<RepositoryHandle>, DiscoveryFailure> {
        let (owned, feed) = tokio::join!(
            self.hosting.owned_repositories(),
            self.hosting.feed_repositories(user)
        );

        let (owned, feed) = match (owned, feed) {
            (Err(owned), Err(feed)) => return Err(DiscoveryFailure { owned, feed }),
            (owned, feed) => (
                owned
                    .inspect_err(|e| warn!("Failed to list owned repositories {e}"))
                    .unwrap_or_default(),
                feed.inspect_err(|e| debug!("Activity feed unavailable, using owned only {e}"))
                    .unwrap_or_default(),
            ),
        };

        let mut seen = HashSet::new();
        let handles = owned
            .into_iter()
            .chain(feed)
            .filter(|identity| {
                let valid = identity.split_once('/').is_some_and(|(owner, name)| {
                    !owner.is_empty() && !name.is_empty()
                });
                if !valid {
                    warn!("Ignoring repository with malformed name {identity:?}");
                }
                valid
            })
            .filter(|identity| seen.insert(identity.clone()))
            .map(RepositoryHandle::remote)
            .collect::<Vec<_>>();

        debug!("Discovered {} remote repositories", handles.len());
        Ok(handles)
    }

    /// Repositories under `roots`, identified by their origin remote when possible. Clones of the
    /// same repository collapse into the first one found.
    #[instrument(skip(self))]
    pub async fn discover_local(&self, roots: &[PathBuf]) -> Vec<RepositoryHandle> {
        let roots = roots.to_vec();
        let filter = self.filter.clone();
        let paths = match tokio::task::spawn_blocking(move || {
            find_repositories(&roots, filter.as_ref())
        })
        .await
        {
            Ok(paths) => paths,
            Err(e) => {
                warn!("Local repository walk panicked {e:?}");
                return vec![];
            }
        };

        let handles = stream::iter(paths)
            .map(|path| self.resolve_local(path))
            .buffered(ORIGIN_RESOLUTION_CONCURRENCY)
            .collect::<Vec<_>>()
            .await;

        let mut seen = HashSet::new();
        let handles = handles
            .into_iter()
            .filter(|handle| {
                let first = seen.insert(handle.identity.clone());
                if !first {
                    debug!("Skipping second clone of {} at {:?}", handle.identity, handle.local_path);
                }
                first
            })
            .collect::<Vec<_>>();

        debug!("Discovered {} local repositories", handles.len());
        handles
    }

    async fn resolve_local(&self, path: PathBuf) -> RepositoryHandle {
        let origin = self
            .vcs
            .origin_url(&path)
            .await
            .inspect_err(|e| warn!("Couldn't read origin of {path:?} {e}"))
            .ok()
            .flatten();

        let identity = origin
            .as_deref()
            .and_then(|url| parse_hosting_slug(url, &self.hosts))
            .unwrap_or_else(|| local_identity(&path));

        RepositoryHandle::local(identity, path)
    }
}

fn local_identity(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|v| v.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string_lossy().to_string());
    format!("{name}{LOCAL_MARKER}")
}

/// Walks `roots` and returns every directory holding [VCS_MARKER]. The walk stops at repository
/// boundaries, so nested repositories and submodules are not reported. Roots that don't exist are
/// skipped.
pub fn find_repositories(roots: &[PathBuf], filter: &dyn DirectoryFilter) -> Vec<PathBuf> {
    let mut repositories = vec![];
    for root in roots {
        if !root.is_dir() {
            debug!("Skipping missing root {root:?}");
            continue;
        }

        let mut walker = WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                !(entry.depth() > 0 && entry.file_type().is_dir() && filter.skip(entry.path()))
            });

        while let Some(entry) = walker.next() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    trace!("Skipping unreadable entry {e}");
                    continue;
                }
            };
            if !entry.file_type().is_dir() {
                continue;
            }
            if entry.path().join(VCS_MARKER).exists() {
                trace!("Found repository {:?}", entry.path());
                repositories.push(entry.into_path());
                walker.skip_current_dir();
            }
        }
    }
    repositories
}

/// Extracts `owner/name` from an origin URL on one of `hosts`. Handles `git@host:owner/name.git`,
/// `ssh://git@host/owner/name` and `https://host/owner/name.git`.
pub fn parse_hosting_slug(url: &str, hosts: &[String]) -> Option<String> {
    let url = url.trim();
    hosts.iter().find_map(|host| {
        let position = url.find(host.as_str())?;
        if position > 0 && !url[..position].ends_with(&['@', '/'][..]) {
            return None;
        }
        let rest = &url[position + host.len()..];
        let rest = rest.strip_prefix(':').or_else(|| rest.strip_prefix('/'))?;
        let slug = rest.trim_end_matches('/');
        let slug = slug.strip_suffix(".git").unwrap_or(slug);
        let (owner, name) = slug.split_once('/')?;
        (!owner.is_empty() && !name.is_empty() && !name.contains('/'))
            .then(|| format!("{owner}/{name}"))
    })
}
