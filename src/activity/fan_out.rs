use std::{future::Future, sync::Arc, time::Duration};

use futures::{stream, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::source::SourceError;

use super::{entities::RepositoryHandle, error::SourceUnavailable};

pub const DEFAULT_CONCURRENCY: usize = 4;
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// Results of collecting from many repositories. Failures are kept next to the items instead of
/// failing the whole collection.
#[derive(Debug)]
pub struct Harvest<T> {
    pub items: Vec<T>,
    pub failures: Vec<SourceUnavailable>,
}

impl<T> Default for Harvest<T> {
    fn default() -> Self {
        Self {
            items: vec![],
            failures: vec![],
        }
    }
}

impl<T> Harvest<T> {
    pub fn absorb(&mut self, result: Result<Vec<T>, SourceUnavailable>) {
        match result {
            Ok(items) => self.items.extend(items),
            Err(e) => {
                warn!("Skipping repository {e}");
                self.failures.push(e);
            }
        }
    }
}

/// Runs per-repository collection with bounded concurrency. Every call is limited by a timeout
/// and stops early once the token is cancelled. Results keep the order of the handles, so a run
/// over the same repositories always yields the same sequence.
#[derive(Debug, Clone)]
pub struct FanOut {
    concurrency: usize,
    call_timeout: Duration,
    cancel: CancellationToken,
}

impl FanOut {
    pub fn new(concurrency: usize, call_timeout: Duration, cancel: CancellationToken) -> Self {
        Self {
            concurrency: concurrency.max(1),
            call_timeout,
            cancel,
        }
    }

    /// Bounds a single call by the timeout and the cancellation token.
    pub async fn guard<T>(
        &self,
        repository: Arc<str>,
        call: impl Future<Output = Result<Vec<T>, SourceUnavailable>>,
    ) -> Result<Vec<T>, SourceUnavailable> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                Err(SourceUnavailable::new(repository, SourceError::Cancelled))
            }
            result = tokio::time::timeout(self.call_timeout, call) => match result {
                Ok(result) => result,
                Err(_) => {
                    let command = format!("collection from {repository}");
                    Err(SourceUnavailable::new(
                        repository,
                        SourceError::Timeout {
                            command,
                            timeout: self.call_timeout,
                        },
                    ))
                }
            }
        }
    }

    pub async fn run<'a, T, F, Fut>(&self, handles: &'a [RepositoryHandle], call: F) -> Harvest<T>
    where
        F: Fn(&'a RepositoryHandle) -> Fut,
        Fut: Future<Output = Result<Vec<T>, SourceUnavailable>> + 'a,
    {
        let results = stream::iter(handles)
            .map(|handle| self.guard(handle.identity.clone(), call(handle)))
            .buffered(self.concurrency)
            .collect::<Vec<_>>()
            .await;

        let mut harvest = Harvest::default();
        for result in results {
            harvest.absorb(result);
        }
        harvest
    }
}
