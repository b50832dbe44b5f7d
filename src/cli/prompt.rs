use std::io::Write;

use anyhow::Result;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::info;

use crate::{
    activity::suggest::ReviewedSuggestion,
    ledger::{Ledger, LoggedEntry},
    tracker::Tracker,
};

const SKIP: &str = "skip";

/// Hours typed by the user. `None` means the suggestion is skipped.
pub fn parse_hours(input: &str) -> Option<f64> {
    let input = input.trim();
    if input.is_empty() || input.eq_ignore_ascii_case(SKIP) {
        return None;
    }
    input
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v > 0.)
}

/// Asks for hours and a description of every suggestion and logs the ones given hours.
pub async fn accept_suggestions<L: Ledger>(
    tracker: &Tracker<L>,
    suggestions: Vec<ReviewedSuggestion>,
    input: impl AsyncBufRead + Unpin,
    output: &mut impl Write,
) -> Result<Vec<LoggedEntry>> {
    let mut lines = input.lines();
    let mut accepted = vec![];
    for reviewed in suggestions {
        let suggestion = reviewed.suggestion;
        let note = if reviewed.already_logged {
            " (already logged)"
        } else {
            ""
        };
        write!(
            output,
            "{} [{}]{note}, hours or \"{SKIP}\": ",
            suggestion.project.label(),
            suggestion.task
        )?;
        output.flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let Some(hours) = parse_hours(&line) else {
            writeln!(output, "skipped")?;
            continue;
        };

        write!(output, "description (optional): ")?;
        output.flush()?;
        let description = lines.next_line().await?.unwrap_or_default();

        let entry = tracker
            .accept(suggestion, hours, description.trim().to_string())
            .await?;
        info!("Logged {}h for {}", entry.hours, entry.project);
        accepted.push(entry);
    }
    Ok(accepted)
}
