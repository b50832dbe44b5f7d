use std::fmt::Write;

use ansi_term::{Colour, Style};

use crate::{
    activity::{aggregate::ActivityMap, suggest::ReviewedSuggestion},
    ledger::LoggedEntry,
    tracker::{DailySummary, WeekSummary},
};

/// Commit messages longer than this are cut when listed.
pub const MESSAGE_WIDTH: usize = 60;

/// First line of `message`, at most [MESSAGE_WIDTH] characters.
pub fn truncate_message(message: &str) -> String {
    let line = message.lines().next().unwrap_or_default();
    if line.chars().count() <= MESSAGE_WIDTH {
        line.to_string()
    } else {
        let mut cut = line.chars().take(MESSAGE_WIDTH - 3).collect::<String>();
        cut.push_str("...");
        cut
    }
}

fn heading(out: &mut String, title: &str) {
    let _ = writeln!(out, "{}", Style::new().bold().paint(title));
}

pub fn format_entries(out: &mut String, entries: &[LoggedEntry]) {
    heading(out, "Logged");
    if entries.is_empty() {
        let _ = writeln!(out, "  nothing yet");
    }
    for entry in entries {
        let _ = writeln!(out, "  {}\t{}h\t{}", entry.project, entry.hours, entry.task);
        if !entry.description.is_empty() {
            let _ = writeln!(out, "    {}", entry.description);
        }
    }
}

pub fn format_activity(out: &mut String, activity: &ActivityMap) {
    heading(out, "Commits");
    let mut any = false;
    for bucket in activity.iter().filter(|v| !v.commits.is_empty()) {
        any = true;
        let _ = writeln!(out, "  {}", Colour::Cyan.paint(bucket.project.label()));
        for commit in &bucket.commits {
            let _ = writeln!(
                out,
                "    {} {}",
                Colour::Yellow.paint(&commit.short_sha),
                truncate_message(&commit.message)
            );
        }
    }
    if !any {
        let _ = writeln!(out, "  none");
    }

    heading(out, "Pull requests");
    let mut any = false;
    for bucket in activity.iter() {
        for pull_request in &bucket.pull_requests {
            any = true;
            let _ = writeln!(
                out,
                "  {} #{} {} ({})",
                Colour::Cyan.paint(bucket.project.label()),
                pull_request.number,
                truncate_message(&pull_request.title),
                pull_request.state
            );
        }
    }
    if !any {
        let _ = writeln!(out, "  none");
    }
}

pub fn format_suggestions(out: &mut String, suggestions: &[ReviewedSuggestion]) {
    heading(out, "Suggestions");
    if suggestions.is_empty() {
        let _ = writeln!(out, "  none");
    }
    for (index, reviewed) in suggestions.iter().enumerate() {
        let suggestion = &reviewed.suggestion;
        let flag = if reviewed.already_logged {
            format!(" {}", Colour::Yellow.paint("(already logged)"))
        } else {
            String::new()
        };
        let _ = writeln!(
            out,
            "  {}. {} [{}]{flag}",
            index + 1,
            Colour::Green.paint(suggestion.project.label()),
            suggestion.task
        );
        for line in suggestion
            .commit_notes
            .lines()
            .chain(suggestion.pr_notes.lines())
        {
            let _ = writeln!(out, "     {}", truncate_message(line));
        }
    }
}

pub fn format_daily(summary: &DailySummary) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{}",
        Style::new()
            .bold()
            .underline()
            .paint(format!("Activity of {} on {}", summary.report.user, summary.date))
    );
    format_entries(&mut out, &summary.existing);
    format_activity(&mut out, &summary.report.activity);
    format_suggestions(&mut out, &summary.suggestions);
    if !summary.report.failures.is_empty() {
        let _ = writeln!(
            out,
            "{}",
            Colour::Red.paint(format!(
                "{} repositories couldn't be read, see the logs for details",
                summary.report.failures.len()
            ))
        );
    }
    out
}

pub fn format_week(week: &WeekSummary) -> String {
    let mut out = String::new();
    heading(
        &mut out,
        &format!("Week of {} to {}", week.range.start, week.range.end),
    );
    if week.hours.is_empty() {
        let _ = writeln!(out, "  nothing logged");
    }
    let width = week.hours.keys().map(|v| v.chars().count()).max().unwrap_or(0);
    for (project, hours) in &week.hours {
        let _ = writeln!(out, "  {project:<width$}  {hours:>6.2}h");
    }
    let _ = writeln!(out, "  {:<width$}  {:>6.2}h", "Total", week.total);
    out
}
