pub mod diff;
pub mod types;

pub use types::{ChangedFile, PrUrl, PullRequest};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument};

use crate::config::GitHubConfig;

const USER_AGENT: &str = "pr-reviewer";

/// GitHub caps `per_page` on the pull request files endpoint.
const MAX_PAGE_SIZE: usize = 100;

#[derive(Debug, Error)]
pub enum PrError {
    #[error("GitHub API request failed: {0}")]
    ApiRequest(#[from] reqwest::Error),

    #[error("Invalid PR URL: {0}")]
    InvalidUrl(String),

    #[error("Failed to parse diff: {0}")]
    DiffParse(String),

    #[error("GitHub token not found in config or environment")]
    MissingToken,
}

/// Inline comments always target the head (post-change) side.
const COMMENT_SIDE: &str = "RIGHT";

/// Location of an inline review comment on the head commit. `end_line`
/// is exclusive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineAnchor {
    pub path: String,
    pub commit_sha: String,
    pub start_line: usize,
    pub end_line: usize,
}

/// Operations the reviewer needs from the source-control host.
#[async_trait]
pub trait SourceHost: Send + Sync {
    /// Fetch pull request metadata and its changed files, in listing order.
    async fn get_pull_request(&self, number: u64) -> Result<PullRequest, PrError>;

    /// Fetch the content of `path` at `git_ref`.
    async fn get_file_content(&self, path: &str, git_ref: &str) -> Result<String, PrError>;

    /// Post a comment on the pull request, inline when `anchor` is given.
    async fn post_review_comment(
        &self,
        number: u64,
        body: &str,
        anchor: Option<&LineAnchor>,
    ) -> Result<(), PrError>;
}

/// Parse a GitHub PR URL into its component parts.
///
/// Expected format: https://github.com/{owner}/{repo}/pull/{number}
pub fn parse_pr_url(url: &str) -> Result<PrUrl, PrError> {
    let parsed = reqwest::Url::parse(url).map_err(|_| PrError::InvalidUrl(url.to_string()))?;

    if parsed.host_str() != Some("github.com") {
        return Err(PrError::InvalidUrl(url.to_string()));
    }

    let segments: Vec<_> = parsed
        .path_segments()
        .ok_or_else(|| PrError::InvalidUrl(url.to_string()))?
        .filter(|segment| !segment.is_empty())
        .collect();

    if segments.len() != 4 || segments[2] != "pull" {
        return Err(PrError::InvalidUrl(url.to_string()));
    }

    let pr_number = segments[3]
        .parse::<u64>()
        .map_err(|_| PrError::InvalidUrl(url.to_string()))?;

    Ok(PrUrl {
        owner: segments[0].to_string(),
        repo: segments[1].to_string(),
        pr_number,
    })
}

/// GitHub REST client bound to one repository.
pub struct GitHubClient {
    client: reqwest::Client,
    token: String,
    repo_url: String,
    max_files: usize,
}

#[derive(Deserialize)]
struct User {
    login: String,
}

#[derive(Deserialize)]
struct Head {
    sha: String,
}

#[derive(Deserialize)]
struct PullResponse {
    number: u64,
    title: String,
    user: User,
    head: Head,
    diff_url: String,
    changed_files: usize,
}

#[derive(Deserialize)]
struct FileResponse {
    filename: String,
    #[serde(default)]
    patch: Option<String>,
}

#[derive(Serialize)]
struct IssueCommentRequest<'a> {
    body: &'a str,
}

#[derive(Serialize)]
struct ReviewCommentRequest<'a> {
    body: &'a str,
    commit_id: &'a str,
    path: &'a str,
    line: usize,
    side: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    start_line: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    start_side: Option<&'a str>,
}

impl GitHubClient {
    /// Build a client for the repository in `pr_url`. At most `max_files`
    /// changed files are ever listed.
    pub fn new(pr_url: &PrUrl, config: &GitHubConfig, max_files: usize) -> Result<Self, PrError> {
        let token = config.resolve_token().ok_or(PrError::MissingToken)?;
        let repo_url = format!(
            "{}/repos/{}/{}",
            config.api_url.trim_end_matches('/'),
            pr_url.owner,
            pr_url.repo
        );
        Ok(Self {
            client: reqwest::Client::new(),
            token,
            repo_url,
            max_files,
        })
    }

    fn get(&self, url: &str) -> reqwest::RequestBuilder {
        self.client
            .get(url)
            .header("User-Agent", USER_AGENT)
            .header("Accept", "application/vnd.github+json")
            .bearer_auth(&self.token)
    }

    fn post(&self, url: &str) -> reqwest::RequestBuilder {
        self.client
            .post(url)
            .header("User-Agent", USER_AGENT)
            .header("Accept", "application/vnd.github+json")
            .bearer_auth(&self.token)
    }

    /// Contents endpoint for `path`, each segment percent-encoded.
    fn contents_url(&self, path: &str) -> Result<reqwest::Url, PrError> {
        let invalid = || PrError::InvalidUrl(format!("{}/contents/{}", self.repo_url, path));
        let mut url = reqwest::Url::parse(&format!("{}/contents", self.repo_url)).map_err(|_| invalid())?;
        url.path_segments_mut()
            .map_err(|_| invalid())?
            .extend(path.split('/'));
        Ok(url)
    }

    async fn list_files(&self, number: u64) -> Result<Vec<ChangedFile>, PrError> {
        let per_page = self.max_files.clamp(1, MAX_PAGE_SIZE);
        let mut files = Vec::new();
        let mut page = 1;
        while files.len() < self.max_files {
            let url = format!(
                "{}/pulls/{}/files?per_page={}&page={}",
                self.repo_url, number, per_page, page
            );
            let batch = self
                .get(&url)
                .send()
                .await?
                .error_for_status()?
                .json::<Vec<FileResponse>>()
                .await?;
            debug!(page, count = batch.len(), "received file listing page");
            let exhausted = batch.len() < per_page;
            files.extend(batch.into_iter().map(|f| ChangedFile {
                path: f.filename,
                patch: f.patch,
            }));
            if exhausted {
                break;
            }
            page += 1;
        }
        files.truncate(self.max_files);
        Ok(files)
    }
}

#[async_trait]
impl SourceHost for GitHubClient {
    #[instrument(skip(self), fields(repo = %self.repo_url))]
    async fn get_pull_request(&self, number: u64) -> Result<PullRequest, PrError> {
        debug!("fetching PR metadata from GitHub API");
        let metadata = self
            .get(&format!("{}/pulls/{}", self.repo_url, number))
            .send()
            .await?
            .error_for_status()?
            .json::<PullResponse>()
            .await?;
        debug!(title = %metadata.title, changed_files = metadata.changed_files, "received PR metadata");

        let files = self.list_files(number).await?;
        debug!(listed_files = files.len(), "received PR file listing");

        Ok(PullRequest {
            number: metadata.number,
            title: metadata.title,
            author: metadata.user.login,
            head_sha: metadata.head.sha,
            diff_url: metadata.diff_url,
            files_changed: metadata.changed_files,
            files,
        })
    }

    #[instrument(skip(self))]
    async fn get_file_content(&self, path: &str, git_ref: &str) -> Result<String, PrError> {
        let url = self.contents_url(path)?;
        let content = self
            .client
            .get(url)
            .query(&[("ref", git_ref)])
            .header("User-Agent", USER_AGENT)
            .header("Accept", "application/vnd.github.raw")
            .bearer_auth(&self.token)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        debug!(bytes = content.len(), "received file content");
        Ok(content)
    }

    #[instrument(skip(self, body), fields(inline = anchor.is_some()))]
    async fn post_review_comment(
        &self,
        number: u64,
        body: &str,
        anchor: Option<&LineAnchor>,
    ) -> Result<(), PrError> {
        let request = match anchor {
            None => self
                .post(&format!("{}/issues/{}/comments", self.repo_url, number))
                .json(&IssueCommentRequest { body }),
            Some(anchor) => {
                // GitHub ranges are inclusive on both ends.
                let last_line = anchor.end_line.saturating_sub(1).max(anchor.start_line);
                let multi_line = last_line > anchor.start_line;
                self.post(&format!("{}/pulls/{}/comments", self.repo_url, number))
                    .json(&ReviewCommentRequest {
                        body,
                        commit_id: &anchor.commit_sha,
                        path: &anchor.path,
                        line: last_line,
                        side: COMMENT_SIDE,
                        start_line: multi_line.then_some(anchor.start_line),
                        start_side: multi_line.then_some(COMMENT_SIDE),
                    })
            }
        };
        request.send().await?.error_for_status()?;
        debug!("posted comment");
        Ok(())
    }
}
