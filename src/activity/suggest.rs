use std::collections::HashSet;

use chrono::NaiveDate;

use crate::ledger::LoggedEntry;

use super::{aggregate::ActivityMap, entities::ProjectKey};

pub const DEVELOPMENT_TASK: &str = "Development";
pub const CODE_REVIEW_TASK: &str = "Code Review";

/// A proposed entry. Hours stay at 0 until a person fills them in.
#[derive(Debug, Clone, PartialEq)]
pub struct SuggestedEntry {
    pub date: NaiveDate,
    pub project: ProjectKey,
    pub task: String,
    pub hours: f64,
    pub description: String,
    pub commit_notes: String,
    pub pr_notes: String,
}

impl SuggestedEntry {
    pub fn into_logged(self, hours: f64, description: String) -> LoggedEntry {
        LoggedEntry {
            date: self.date,
            project: self.project.label(),
            task: self.task,
            hours,
            description,
            commit_notes: self.commit_notes,
            pr_notes: self.pr_notes,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReviewedSuggestion {
    pub suggestion: SuggestedEntry,
    /// The project already has an entry for the suggestion's date.
    pub already_logged: bool,
}

/// One suggestion per project of `map`, in bucket order.
pub fn synthesize(map: &ActivityMap, date: NaiveDate) -> Vec<SuggestedEntry> {
    map.iter()
        .map(|bucket| {
            let task = if bucket.commits.is_empty() {
                CODE_REVIEW_TASK
            } else {
                DEVELOPMENT_TASK
            };
            let commit_notes = bucket
                .commits
                .iter()
                .map(|v| format!("- {}", v.summary()))
                .collect::<Vec<_>>()
                .join("\n");
            let pr_notes = bucket
                .pull_requests
                .iter()
                .map(|v| format!("- PR #{}: {}", v.number, v.title))
                .collect::<Vec<_>>()
                .join("\n");

            SuggestedEntry {
                date,
                project: bucket.project.clone(),
                task: task.to_string(),
                hours: 0.,
                description: String::new(),
                commit_notes,
                pr_notes,
            }
        })
        .collect()
}

/// Marks suggestions whose project already has an entry on the same day. Nothing is dropped, a
/// project can legitimately have several entries per day.
pub fn review(suggestions: Vec<SuggestedEntry>, logged: &[LoggedEntry]) -> Vec<ReviewedSuggestion> {
    let logged = logged
        .iter()
        .map(|v| (v.date, v.project.clone()))
        .collect::<HashSet<_>>();

    suggestions
        .into_iter()
        .map(|suggestion| {
            let already_logged = logged.contains(&(suggestion.date, suggestion.project.label()));
            ReviewedSuggestion {
                suggestion,
                already_logged,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, TimeZone, Utc};

    use crate::{
        activity::{
            aggregate::aggregate,
            entities::{Commit, ProjectKey, PullRequest, PullRequestState},
        },
        ledger::LoggedEntry,
    };

    use super::{review, synthesize, CODE_REVIEW_TASK, DEVELOPMENT_TASK};

    const DAY: NaiveDate = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();

    fn commit(sha: &str, message: &str, project: ProjectKey) -> Commit {
        Commit::new(
            sha.into(),
            message.into(),
            "url".into(),
            project,
            Utc.with_ymd_and_hms(2026, 10, 19, 9, 0, 0).unwrap(),
        )
    }

    fn pull_request(number: u64, title: &str, project: ProjectKey) -> PullRequest {
        let moment = Utc.with_ymd_and_hms(2026, 10, 19, 9, 0, 0).unwrap();
        PullRequest {
            number,
            title: title.into(),
            url: "url".into(),
            repository: project,
            state: PullRequestState::Open,
            created_at: moment,
            updated_at: moment,
        }
    }

    fn logged(project: &str, date: NaiveDate) -> LoggedEntry {
        LoggedEntry {
            date,
            project: project.into(),
            task: DEVELOPMENT_TASK.into(),
            hours: 2.,
            description: String::new(),
            commit_notes: String::new(),
            pr_notes: String::new(),
        }
    }

    #[test]
    fn test_commits_make_a_development_entry() {
        let map = aggregate(
            vec![
                commit("aaaaaaa", "fix bug", ProjectKey::remote("acme/api")),
                commit("bbbbbbb", "fix bug\n\nagain", ProjectKey::remote("acme/api")),
            ],
            vec![],
        );

        let suggestions = synthesize(&map, DAY);

        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].project.label(), "acme/api");
        assert_eq!(suggestions[0].task, DEVELOPMENT_TASK);
        assert_eq!(suggestions[0].commit_notes, "- fix bug\n- fix bug");
        assert_eq!(suggestions[0].hours, 0.);
        assert!(suggestions[0].pr_notes.is_empty());
    }

    #[test]
    fn test_pull_requests_alone_make_a_review_entry() {
        let map = aggregate(
            vec![],
            vec![pull_request(7, "Add feature", ProjectKey::remote("acme/web"))],
        );

        let suggestions = synthesize(&map, DAY);

        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].project.label(), "acme/web");
        assert_eq!(suggestions[0].task, CODE_REVIEW_TASK);
        assert_eq!(suggestions[0].pr_notes, "- PR #7: Add feature");
        assert!(suggestions[0].commit_notes.is_empty());
    }

    #[test]
    fn test_commits_take_priority_over_pull_requests() {
        let project = ProjectKey::remote("acme/api");
        let map = aggregate(
            vec![commit("aaaaaaa", "work", project.clone())],
            vec![
                pull_request(1, "First", project.clone()),
                pull_request(2, "Second", project),
            ],
        );

        let suggestions = synthesize(&map, DAY);

        assert_eq!(suggestions[0].task, DEVELOPMENT_TASK);
        assert_eq!(suggestions[0].pr_notes, "- PR #1: First\n- PR #2: Second");
    }

    #[test]
    fn test_remote_and_local_copies_are_separate_suggestions() {
        let map = aggregate(
            vec![
                commit("aaaaaaa", "remote work", ProjectKey::remote("api")),
                commit("bbbbbbb", "local work", ProjectKey::local("api")),
            ],
            vec![],
        );

        let labels = synthesize(&map, DAY)
            .into_iter()
            .map(|v| v.project.label())
            .collect::<Vec<_>>();

        assert_eq!(labels, vec!["api", "api (local)"]);
    }

    #[test]
    fn test_review_flags_without_suppressing() {
        let map = aggregate(
            vec![
                commit("aaaaaaa", "fix", ProjectKey::remote("acme/api")),
                commit("bbbbbbb", "fix", ProjectKey::local("acme/api")),
                commit("ccccccc", "fix", ProjectKey::remote("acme/web")),
            ],
            vec![],
        );
        let yesterday = DAY.pred_opt().unwrap();

        let reviewed = review(
            synthesize(&map, DAY),
            &[
                logged("acme/api", DAY),
                logged("acme/api (local)", DAY),
                logged("acme/web", yesterday),
            ],
        );

        assert_eq!(reviewed.len(), 3);
        let flags = reviewed.iter().map(|v| v.already_logged).collect::<Vec<_>>();
        assert_eq!(flags, vec![true, true, false]);
    }

    #[test]
    fn test_into_logged_uses_label() {
        let map = aggregate(vec![commit("aaaaaaa", "fix", ProjectKey::local("acme/api"))], vec![]);
        let entry = synthesize(&map, DAY)
            .remove(0)
            .into_logged(1.5, "pairing".into());
        assert_eq!(entry.project, "acme/api (local)");
        assert_eq!(entry.hours, 1.5);
        assert_eq!(entry.description, "pairing");
        assert_eq!(entry.commit_notes, "- fix");
    }
}
