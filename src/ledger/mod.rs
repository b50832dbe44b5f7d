//! Time-log entries are persisted through [Ledger].
//!  - Every entry is a row of 7 ordered fields: date, project, task, hours, description,
//!    commit notes and pull request notes.
//!  - [file::FileLedger] keeps one file per day with one JSON array per line.

pub mod file;

use std::{future::Future, ops::Deref};

use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use serde_json::Value;

use crate::utils::time::{date_to_record_name, week_start};

/// Number of fields in a stored row.
pub const ROW_FIELDS: usize = 7;

#[derive(Debug, Clone, PartialEq)]
pub struct LoggedEntry {
    pub date: NaiveDate,
    pub project: String,
    pub task: String,
    pub hours: f64,
    pub description: String,
    pub commit_notes: String,
    pub pr_notes: String,
}

impl LoggedEntry {
    pub fn to_row(&self) -> Value {
        Value::Array(vec![
            Value::String(date_to_record_name(self.date)),
            Value::String(self.project.clone()),
            Value::String(self.task.clone()),
            Value::from(self.hours),
            Value::String(self.description.clone()),
            Value::String(self.commit_notes.clone()),
            Value::String(self.pr_notes.clone()),
        ])
    }

    /// Reads a stored row. Rows written by hand may be shorter than [ROW_FIELDS]; missing
    /// trailing fields are empty and missing hours are 0.
    pub fn from_row(row: &[Value]) -> Result<Self> {
        let text = |index: usize| -> String {
            match row.get(index) {
                Some(Value::String(v)) => v.clone(),
                Some(Value::Null) | None => String::new(),
                Some(v) => v.to_string(),
            }
        };

        let date = row
            .first()
            .and_then(Value::as_str)
            .ok_or_else(|| anyhow!("Row has no date"))?;
        let date = NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .with_context(|| format!("Invalid date {date}"))?;

        let project = text(1);
        if project.is_empty() {
            return Err(anyhow!("Row has no project"));
        }

        let hours = match row.get(3) {
            Some(Value::Number(v)) => v.as_f64().unwrap_or_default(),
            Some(Value::String(v)) if !v.trim().is_empty() => v
                .trim()
                .parse()
                .with_context(|| format!("Invalid hours {v}"))?,
            _ => 0.,
        };

        Ok(Self {
            date,
            project,
            task: text(2),
            hours,
            description: text(4),
            commit_notes: text(5),
            pr_notes: text(6),
        })
    }
}

/// Inclusive range of days.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn day(date: NaiveDate) -> Self {
        Self {
            start: date,
            end: date,
        }
    }

    /// Monday to Sunday week containing `date`.
    pub fn week_of(date: NaiveDate) -> Self {
        let start = week_start(date);
        Self {
            start,
            end: start + chrono::Duration::days(6),
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// Interface for abstracting storage of logged entries.
pub trait Ledger {
    /// Entries for every day of `range`, ordered by day and then by the order they were appended.
    fn read_range(&self, range: DateRange) -> impl Future<Output = Result<Vec<LoggedEntry>>> + Send;

    fn append(&self, entry: &LoggedEntry) -> impl Future<Output = Result<()>> + Send;
}

impl<T: Deref> Ledger for T
where
    T::Target: Ledger,
{
    fn read_range(&self, range: DateRange) -> impl Future<Output = Result<Vec<LoggedEntry>>> + Send {
        self.deref().read_range(range)
    }

    fn append(&self, entry: &LoggedEntry) -> impl Future<Output = Result<()>> + Send {
        self.deref().append(entry)
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use serde_json::json;

    use super::{DateRange, LoggedEntry};

    fn entry() -> LoggedEntry {
        LoggedEntry {
            date: NaiveDate::from_ymd_opt(2026, 10, 19).unwrap(),
            project: "acme/api".into(),
            task: "Development".into(),
            hours: 1.5,
            description: "auth work".into(),
            commit_notes: "- fix bug\n- add test".into(),
            pr_notes: String::new(),
        }
    }

    #[test]
    fn test_row_layout() {
        assert_eq!(
            entry().to_row(),
            json!([
                "2026-10-19",
                "acme/api",
                "Development",
                1.5,
                "auth work",
                "- fix bug\n- add test",
                ""
            ])
        );
    }

    #[test]
    fn test_short_rows_are_padded() {
        let row = json!(["2026-10-19", "acme/web", "Code Review", "2"]);
        let entry = LoggedEntry::from_row(row.as_array().unwrap()).unwrap();
        assert_eq!(entry.project, "acme/web");
        assert_eq!(entry.hours, 2.);
        assert!(entry.description.is_empty());
        assert!(entry.pr_notes.is_empty());
    }

    #[test]
    fn test_rows_without_date_or_project_are_rejected() {
        assert!(LoggedEntry::from_row(json!(["yesterday", "acme/api"]).as_array().unwrap()).is_err());
        assert!(LoggedEntry::from_row(json!(["2026-10-19"]).as_array().unwrap()).is_err());
        assert!(LoggedEntry::from_row(&[]).is_err());
        assert!(
            LoggedEntry::from_row(json!(["2026-10-19", "acme/api", "Dev", "many"]).as_array().unwrap())
                .is_err()
        );
    }

    #[test]
    fn test_week_starts_on_monday() {
        // 2026-10-21 is a Wednesday
        let range = DateRange::week_of(NaiveDate::from_ymd_opt(2026, 10, 21).unwrap());
        assert_eq!(range.start, NaiveDate::from_ymd_opt(2026, 10, 19).unwrap());
        assert_eq!(range.end, NaiveDate::from_ymd_opt(2026, 10, 25).unwrap());
        assert!(range.contains(NaiveDate::from_ymd_opt(2026, 10, 25).unwrap()));
        assert!(!range.contains(NaiveDate::from_ymd_opt(2026, 10, 26).unwrap()));
    }
}
