use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde::Deserialize;

use crate::utils::time::day_start;

use super::{
    command::CommandRunner, parse_json_list, HostingApi, RawCommit, RawPullRequest, SourceError,
};

const GH: &str = "gh";

const PULL_REQUEST_FIELDS: &str = "number,title,url,state,createdAt,updatedAt";

const SEARCH_LIMIT: &str = "100";

// Only the first 100 commits of a branch since the lower bound are read.
const HISTORY_QUERY: &str = r#"query($owner: String!, $name: String!, $ref: String!, $since: GitTimestamp!) {
  repository(owner: $owner, name: $name) {
    ref(qualifiedName: $ref) {
      target {
        ... on Commit {
          history(first: 100, since: $since) {
            nodes {
              oid
              message
              url
              authoredDate
              author { user { login } }
            }
          }
        }
      }
    }
  }
}"#;

/// [HostingApi] backed by the GitHub command line tool. Authentication is whatever `gh` is
/// already logged in with.
pub struct GhCli {
    runner: CommandRunner,
}

impl GhCli {
    pub fn new(runner: CommandRunner) -> Self {
        Self { runner }
    }

    async fn gh(&self, args: &[&str]) -> Result<String, SourceError> {
        self.runner.run(GH, args, None).await
    }
}

#[async_trait]
impl HostingApi for GhCli {
    async fn current_user(&self) -> Result<String, SourceError> {
        let output = self.gh(&["api", "user", "--jq", ".login"]).await?;
        let login = output.trim();
        if login.is_empty() {
            return Err(SourceError::Malformed("empty login".into()));
        }
        Ok(login.to_string())
    }

    async fn owned_repositories(&self) -> Result<Vec<String>, SourceError> {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Repository {
            name_with_owner: String,
        }

        let output = self
            .gh(&["repo", "list", "--limit", "100", "--json", "nameWithOwner"])
            .await?;
        Ok(parse_json_list::<Repository>(&output)?
            .into_iter()
            .map(|v| v.name_with_owner)
            .collect())
    }

    async fn feed_repositories(&self, user: &str) -> Result<Vec<String>, SourceError> {
        let endpoint = format!("users/{user}/events/public");
        let output = self
            .gh(&["api", &endpoint, "--paginate", "--jq", ".[].repo.name"])
            .await?;
        Ok(output
            .lines()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(String::from)
            .collect())
    }

    async fn default_branch(&self, repository: &str) -> Result<Option<String>, SourceError> {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct View {
            default_branch_ref: Option<BranchRef>,
        }
        #[derive(Deserialize)]
        struct BranchRef {
            name: String,
        }

        let output = self
            .gh(&["repo", "view", repository, "--json", "defaultBranchRef"])
            .await?;
        let view: View = serde_json::from_str(output.trim())?;
        Ok(view
            .default_branch_ref
            .map(|v| v.name)
            .filter(|v| !v.is_empty()))
    }

    async fn branch_history(
        &self,
        repository: &str,
        branch: &str,
        since: NaiveDate,
    ) -> Result<Vec<RawCommit>, SourceError> {
        let Some((owner, name)) = repository.split_once('/') else {
            return Err(SourceError::Malformed(format!(
                "{repository} is not an owner/name pair"
            )));
        };
        let query = format!("query={HISTORY_QUERY}");
        let owner = format!("owner={owner}");
        let name = format!("name={name}");
        let reference = format!("ref=refs/heads/{branch}");
        let since = format!("since={}", history_since(since));
        let output = self
            .gh(&[
                "api", "graphql", "-f", &query, "-f", &owner, "-f", &name, "-f", &reference, "-f",
                &since,
            ])
            .await?;
        parse_history(&output)
    }

    async fn search_pull_requests(
        &self,
        author: &str,
        since: NaiveDate,
    ) -> Result<Vec<RawPullRequest>, SourceError> {
        let created = format!(">={}", since.format("%Y-%m-%d"));
        let fields = format!("{PULL_REQUEST_FIELDS},repository");
        let output = self
            .gh(&[
                "search", "prs", "--author", author, "--created", &created, "--json", &fields,
                "--limit", SEARCH_LIMIT,
            ])
            .await?;
        parse_json_list(&output)
    }

    async fn list_pull_requests(
        &self,
        repository: &str,
        author: &str,
    ) -> Result<Vec<RawPullRequest>, SourceError> {
        let output = self
            .gh(&[
                "pr",
                "list",
                "--repo",
                repository,
                "--author",
                author,
                "--state",
                "all",
                "--json",
                PULL_REQUEST_FIELDS,
                "--limit",
                "20",
            ])
            .await?;
        parse_json_list(&output)
    }
}

#[derive(Deserialize)]
struct HistoryResponse {
    data: Option<HistoryData>,
}

#[derive(Deserialize)]
struct HistoryData {
    repository: Option<HistoryRepository>,
}

#[derive(Deserialize)]
struct HistoryRepository {
    #[serde(rename = "ref")]
    reference: Option<HistoryRef>,
}

#[derive(Deserialize)]
struct HistoryRef {
    target: Option<HistoryTarget>,
}

#[derive(Deserialize)]
struct HistoryTarget {
    history: Option<HistoryConnection>,
}

#[derive(Deserialize)]
struct HistoryConnection {
    nodes: Vec<Option<HistoryNode>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct HistoryNode {
    oid: String,
    message: String,
    url: String,
    authored_date: DateTime<Utc>,
    author: Option<HistoryAuthor>,
}

#[derive(Deserialize)]
struct HistoryAuthor {
    user: Option<HistoryUser>,
}

#[derive(Deserialize)]
struct HistoryUser {
    login: String,
}

/// Lower bound of a history query, the same instant local `git log` starts from.
fn history_since(date: NaiveDate) -> String {
    day_start(date).to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// A missing branch or repository yields an empty history rather than an error.
fn parse_history(output: &str) -> Result<Vec<RawCommit>, SourceError> {
    let response: HistoryResponse = serde_json::from_str(output.trim())?;
    let nodes = response
        .data
        .and_then(|v| v.repository)
        .and_then(|v| v.reference)
        .and_then(|v| v.target)
        .and_then(|v| v.history)
        .map(|v| v.nodes)
        .unwrap_or_default();

    Ok(nodes
        .into_iter()
        .flatten()
        .map(|node| RawCommit {
            oid: node.oid,
            message: node.message,
            url: node.url,
            authored_at: node.authored_date,
            author_login: node.author.and_then(|v| v.user).map(|v| v.login),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, NaiveDate};

    use crate::utils::time::day_start;

    use super::{history_since, parse_history};

    #[test]
    fn test_history_starts_at_local_midnight() {
        let day = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        let since = history_since(day);
        assert!(since.ends_with('Z'));
        assert_eq!(DateTime::parse_from_rfc3339(&since).unwrap(), day_start(day));
    }

    #[test]
    fn test_parse_history() {
        let output = r#"{"data":{"repository":{"ref":{"target":{"history":{"nodes":[
            {"oid":"abcdef1234567","message":"fix bug\n\nlonger body","url":"https://github.com/acme/api/commit/abcdef1234567","authoredDate":"2026-10-19T08:00:00Z","author":{"user":{"login":"octocat"}}},
            {"oid":"1234567abcdef","message":"someone else","url":"u","authoredDate":"2026-10-19T09:00:00Z","author":{"user":null}}
        ]}}}}}}"#;
        let commits = parse_history(output).unwrap();
        assert_eq!(commits.len(), 2);
        assert_eq!(commits[0].author_login.as_deref(), Some("octocat"));
        assert_eq!(commits[0].message, "fix bug\n\nlonger body");
        assert_eq!(commits[1].author_login, None);
    }

    #[test]
    fn test_missing_branch_is_empty_history() {
        let output = r#"{"data":{"repository":{"ref":null}}}"#;
        assert!(parse_history(output).unwrap().is_empty());
    }

    #[test]
    fn test_invalid_history_is_malformed() {
        assert!(parse_history("{").is_err());
    }
}
