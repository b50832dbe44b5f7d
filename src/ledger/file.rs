use std::{
    future,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use anyhow::Result;
use chrono::NaiveDate;
use fs4::tokio::AsyncFileExt;
use futures::{stream, Stream, StreamExt, TryStreamExt};
use serde_json::Value;
use tokio::{
    fs::File,
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
};
use tracing::{debug, warn};

use crate::utils::time::date_to_record_name;

use super::{DateRange, Ledger, LoggedEntry};

/// Days read at the same time by [FileLedger::read_range].
const READ_CONCURRENCY: usize = 4;

/// The main realization of [Ledger]. Entries of a day live in a file named after the day.
pub struct FileLedger {
    ledger_dir: PathBuf,
}

impl FileLedger {
    pub fn new(ledger_dir: PathBuf) -> Result<Self, std::io::Error> {
        std::fs::create_dir_all(&ledger_dir)?;

        Ok(Self { ledger_dir })
    }

    fn path_for(&self, date: NaiveDate) -> PathBuf {
        self.ledger_dir.join(date_to_record_name(date))
    }

    async fn read_day(&self, date: NaiveDate) -> Result<Vec<LoggedEntry>> {
        async fn extract(path: &Path) -> std::result::Result<Vec<LoggedEntry>, std::io::Error> {
            debug!("Extracting {path:?}");
            let file = File::open(path).await?;
            file.lock_shared()?;
            let buffer = BufReader::new(file);
            let mut lines = buffer.lines();
            let mut entries = vec![];
            while let Ok(Some(v)) = lines.next_line().await {
                if v.trim().is_empty() {
                    continue;
                }
                let parsed = serde_json::from_str::<Vec<Value>>(&v)
                    .map_err(anyhow::Error::from)
                    .and_then(|row| LoggedEntry::from_row(&row));
                match parsed {
                    Ok(v) => entries.push(v),
                    Err(e) => {
                        warn!("Skipping malformed row in {:?} {}: {e}", path, &v)
                    }
                }
            }

            lines.into_inner().into_inner().unlock_async().await?;

            Ok(entries)
        }

        match extract(&self.path_for(date)).await {
            Ok(s) => Ok(s),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(vec![]),
            Err(e) => Err(e)?,
        }
    }
}

impl Ledger for FileLedger {
    async fn read_range(&self, range: DateRange) -> Result<Vec<LoggedEntry>> {
        let days = date_range(range.start, range.end)
            .map(|day| self.read_day(day))
            .buffered(READ_CONCURRENCY)
            .try_collect::<Vec<_>>()
            .await?;
        Ok(days.into_iter().flatten().collect())
    }

    async fn append(&self, entry: &LoggedEntry) -> Result<()> {
        let mut line = serde_json::to_vec(&entry.to_row())?;
        line.push(b'\n');

        let mut file = File::options()
            .append(true)
            .create(true)
            .open(self.path_for(entry.date))
            .await?;

        file.lock_exclusive()?;
        let result = async {
            file.write_all(&line).await?;
            file.flush().await
        }
        .await;
        file.unlock_async().await?;
        debug!("Appended entry for {} on {}", entry.project, entry.date);
        Ok(result?)
    }
}

/// Returns a stream of dates between start (inclusive) and end (inclusive).
fn date_range(start: NaiveDate, end: NaiveDate) -> impl Stream<Item = NaiveDate> {
    stream::unfold(Some(start), move |current| {
        future::ready(match current {
            Some(day) if day <= end => Some((day, day.succ_opt())),
            _ => None,
        })
    })
}
