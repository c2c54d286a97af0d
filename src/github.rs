//! GitHub access through the `gh` CLI
//!
//! The sync run only needs three operations from the pull-request host, so
//! they sit behind [`PullRequestHost`]; [`GhCli`] implements them with
//! `gh api` calls against the REST API.

use std::process::Command;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::pr::{PullRequest, ReviewComment};

/// The pull-request host operations the sync run consumes
pub trait PullRequestHost {
    /// All open pull requests of the configured repository
    fn open_pull_requests(&self) -> Result<Vec<PullRequest>>;

    /// Review comments of a PR, oldest first
    fn review_comments(&self, number: u64) -> Result<Vec<ReviewComment>>;

    /// Replace the body of a PR
    fn update_body(&self, number: u64, body: &str) -> Result<()>;
}

// Response types for the REST endpoints

#[derive(Serialize, Deserialize, Debug)]
struct Login {
    login: String,
}

#[derive(Serialize, Deserialize, Debug)]
struct BranchRef {
    #[serde(rename = "ref")]
    name: String,
}

#[derive(Serialize, Deserialize, Debug)]
struct ApiPullRequest {
    id: u64,
    number: u64,
    title: String,
    #[serde(default)]
    body: Option<String>,
    html_url: String,
    state: String,
    #[serde(default)]
    user: Option<Login>,
    head: BranchRef,
    base: BranchRef,
}

#[derive(Serialize, Deserialize, Debug)]
struct ApiReviewComment {
    #[serde(default)]
    body: String,
    created_at: String,
}

/// [`PullRequestHost`] backed by `gh api`
#[derive(Debug, Clone)]
pub struct GhCli {
    owner: String,
    repo: String,
    account: String,
    token: String,
}

impl GhCli {
    /// # Arguments
    /// * `owner` - Owner of the repository
    /// * `repo` - Name of the repository
    /// * `account` - Account name sent as the user agent
    /// * `token` - Token passed to `gh` as `GH_TOKEN`
    pub fn new(
        owner: impl Into<String>,
        repo: impl Into<String>,
        account: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
            account: account.into(),
            token: token.into(),
        }
    }

    fn api(&self, args: &[&str]) -> Result<Vec<u8>> {
        debug!("gh api {}", args.join(" "));

        let user_agent = format!("User-Agent: {}", self.account);
        let output = Command::new("gh")
            .arg("api")
            .args(["-H", &user_agent])
            .args(args)
            .env("GH_TOKEN", &self.token)
            .output()
            .map_err(|e| Error::GitHubCli(format!("Failed to execute gh command: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::GitHubCli(stderr.trim().to_string()));
        }

        Ok(output.stdout)
    }

    fn pulls_path(&self) -> String {
        format!("repos/{}/{}/pulls", self.owner, self.repo)
    }
}

impl PullRequestHost for GhCli {
    fn open_pull_requests(&self) -> Result<Vec<PullRequest>> {
        let path = format!("{}?state=open&per_page=100", self.pulls_path());
        let stdout = self.api(&["--paginate", &path])?;

        let pulls: Vec<ApiPullRequest> = decode_pages(&stdout)?;
        Ok(pulls
            .into_iter()
            .map(|pr| into_pull_request(pr, &self.owner, &self.repo))
            .collect())
    }

    fn review_comments(&self, number: u64) -> Result<Vec<ReviewComment>> {
        let path = format!("{}/{}/comments?per_page=100", self.pulls_path(), number);
        let stdout = self.api(&["--paginate", &path])?;

        let comments: Vec<ApiReviewComment> = decode_pages(&stdout)?;
        Ok(sort_comments(
            comments
                .into_iter()
                .map(|c| ReviewComment {
                    body: c.body,
                    created_at: c.created_at,
                })
                .collect(),
        ))
    }

    fn update_body(&self, number: u64, body: &str) -> Result<()> {
        let path = format!("{}/{}", self.pulls_path(), number);
        let field = format!("body={}", body);
        self.api(&["-X", "PATCH", &path, "-f", &field])?;
        Ok(())
    }
}

/// Decode `gh api --paginate` output, which is one JSON array per page
/// written back to back.
fn decode_pages<T: DeserializeOwned>(bytes: &[u8]) -> Result<Vec<T>> {
    let mut items = Vec::new();
    for page in serde_json::Deserializer::from_slice(bytes).into_iter::<Vec<T>>() {
        items.extend(page?);
    }
    Ok(items)
}

fn into_pull_request(pr: ApiPullRequest, owner: &str, repo: &str) -> PullRequest {
    PullRequest {
        number: pr.number,
        id: pr.id,
        title: pr.title,
        body: pr.body.unwrap_or_default(),
        branch: pr.head.name,
        base: pr.base.name,
        url: pr.html_url,
        author: pr.user.map(|u| u.login).unwrap_or_default(),
        state: pr.state,
        owner: owner.to_string(),
        repo: repo.to_string(),
    }
}

/// Order comments by creation time; equal timestamps keep host order
pub fn sort_comments(mut comments: Vec<ReviewComment>) -> Vec<ReviewComment> {
    comments.sort_by(|a, b| a.created_at.cmp(&b.created_at));
    comments
}
