use std::sync::Arc;

use thiserror::Error;

use crate::source::SourceError;

/// Collection from a single repository failed. Never stops a run, it is reported next to the
/// results instead.
#[derive(Debug, Error)]
#[error("{repository} is unavailable: {reason}")]
pub struct SourceUnavailable {
    pub repository: Arc<str>,
    #[source]
    pub reason: SourceError,
}

impl SourceUnavailable {
    pub fn new(repository: impl Into<Arc<str>>, reason: SourceError) -> Self {
        Self {
            repository: repository.into(),
            reason,
        }
    }
}

/// Every remote discovery mechanism failed.
#[derive(Debug, Error)]
#[error("remote discovery failed: owned repositories: {owned}; activity feed: {feed}")]
pub struct DiscoveryFailure {
    pub owned: SourceError,
    pub feed: SourceError,
}

#[derive(Debug, Error)]
pub enum RunError {
    #[error("no identity could be resolved: {0}")]
    FatalConfiguration(String),
    #[error("no repositories could be discovered: {0}")]
    Discovery(#[from] DiscoveryFailure),
}
