use std::collections::HashMap;

use super::entities::{Commit, ProjectKey, PullRequest};

/// Everything one project contributed to a run, in discovery order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityBucket {
    pub project: ProjectKey,
    pub commits: Vec<Commit>,
    pub pull_requests: Vec<PullRequest>,
}

impl ActivityBucket {
    fn new(project: ProjectKey) -> Self {
        Self {
            project,
            commits: vec![],
            pull_requests: vec![],
        }
    }

    pub fn len(&self) -> usize {
        self.commits.len() + self.pull_requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Buckets keyed by project. Iterates in the order projects first contributed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivityMap {
    buckets: Vec<ActivityBucket>,
    index: HashMap<ProjectKey, usize>,
}

impl ActivityMap {
    fn bucket_mut(&mut self, project: &ProjectKey) -> &mut ActivityBucket {
        let position = match self.index.get(project) {
            Some(position) => *position,
            None => {
                self.buckets.push(ActivityBucket::new(project.clone()));
                self.index.insert(project.clone(), self.buckets.len() - 1);
                self.buckets.len() - 1
            }
        };
        &mut self.buckets[position]
    }

    pub fn push_commit(&mut self, commit: Commit) {
        self.bucket_mut(&commit.repository.clone()).commits.push(commit);
    }

    pub fn push_pull_request(&mut self, pull_request: PullRequest) {
        self.bucket_mut(&pull_request.repository.clone())
            .pull_requests
            .push(pull_request);
    }

    pub fn get(&self, project: &ProjectKey) -> Option<&ActivityBucket> {
        self.index.get(project).map(|v| &self.buckets[*v])
    }

    pub fn iter(&self) -> impl Iterator<Item = &ActivityBucket> {
        self.buckets.iter()
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}

impl IntoIterator for ActivityMap {
    type Item = ActivityBucket;
    type IntoIter = std::vec::IntoIter<ActivityBucket>;

    fn into_iter(self) -> Self::IntoIter {
        self.buckets.into_iter()
    }
}

/// Groups commits, then pull requests, by project.
pub fn aggregate(
    commits: impl IntoIterator<Item = Commit>,
    pull_requests: impl IntoIterator<Item = PullRequest>,
) -> ActivityMap {
    let mut map = ActivityMap::default();
    for commit in commits {
        map.push_commit(commit);
    }
    for pull_request in pull_requests {
        map.push_pull_request(pull_request);
    }
    map
}
