//! Joins activity runs with the ledger: what was done, what is already logged and what could be.

use std::collections::BTreeMap;

use anyhow::{anyhow, Result};
use chrono::NaiveDate;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

use crate::{
    activity::{
        run::{ActivityEngine, ActivityReport},
        suggest::{review, ReviewedSuggestion, SuggestedEntry},
    },
    ledger::{DateRange, Ledger, LoggedEntry},
};

#[derive(Debug)]
pub struct DailySummary {
    pub date: NaiveDate,
    pub report: ActivityReport,
    pub existing: Vec<LoggedEntry>,
    pub suggestions: Vec<ReviewedSuggestion>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WeekSummary {
    pub range: DateRange,
    /// Hours per project, sorted by project.
    pub hours: BTreeMap<String, f64>,
    pub total: f64,
}

pub struct Tracker<L> {
    ledger: L,
}

impl<L: Ledger> Tracker<L> {
    pub fn new(ledger: L) -> Self {
        Self { ledger }
    }

    /// Runs the engine and reviews its suggestions against the entries of the run's day.
    #[instrument(skip_all)]
    pub async fn daily_summary(
        &self,
        engine: &ActivityEngine,
        cancel: CancellationToken,
    ) -> Result<DailySummary> {
        let report = engine.run(cancel).await?;
        let date = report.date;
        let existing = self.ledger.read_range(DateRange::day(date)).await?;
        let suggestions = review(report.suggestions.clone(), &existing);
        debug!(
            "{} suggestions, {} entries already logged",
            suggestions.len(),
            existing.len()
        );
        Ok(DailySummary {
            date,
            report,
            existing,
            suggestions,
        })
    }

    pub async fn week_summary(&self, date: NaiveDate) -> Result<WeekSummary> {
        let range = DateRange::week_of(date);
        let entries = self.ledger.read_range(range).await?;
        let mut hours = BTreeMap::<String, f64>::new();
        for entry in &entries {
            *hours.entry(entry.project.clone()).or_default() += entry.hours;
        }
        let total = hours.values().sum();
        Ok(WeekSummary {
            range,
            hours,
            total,
        })
    }

    pub async fn add_entry(&self, entry: LoggedEntry) -> Result<()> {
        if entry.project.trim().is_empty() {
            return Err(anyhow!("Project can't be empty"));
        }
        if !entry.hours.is_finite() || entry.hours < 0. {
            return Err(anyhow!("Invalid hours {}", entry.hours));
        }
        self.ledger.append(&entry).await
    }

    /// Logs a suggestion once a person gave it hours.
    pub async fn accept(
        &self,
        suggestion: SuggestedEntry,
        hours: f64,
        description: String,
    ) -> Result<LoggedEntry> {
        let entry = suggestion.into_logged(hours, description);
        self.add_entry(entry.clone()).await?;
        Ok(entry)
    }
}
