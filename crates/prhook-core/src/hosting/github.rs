//! GitHub REST adapter for [`HostingClient`].

use std::marker::PhantomData;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, LINK, USER_AGENT};
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::debug;

use super::pagination::{first_page, next_page_url};
use super::{CommitStatus, HostingClient};
use crate::domain::{Comment, HookError, PullRequest, RepoRef, Result, Source, Team, User};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
const ERROR_BODY_LIMIT: usize = 800;

/// Bearer-token authenticated client bound to one repository.
#[derive(Clone)]
pub struct GithubClient {
    http: reqwest::Client,
    api_base: String,
    repo: RepoRef,
}

impl GithubClient {
    pub fn new(api_base: &str, token: &str, repo: RepoRef) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("prhook/", env!("CARGO_PKG_VERSION"))),
        );
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            "x-github-api-version",
            HeaderValue::from_static("2022-11-28"),
        );
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", token.trim()))
            .map_err(|e| HookError::Config(format!("access_token is not a valid header: {e}")))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| HookError::RemoteApi(format!("failed to create http client: {e}")))?;

        Ok(Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            repo,
        })
    }

    /// Build a client from a (validated) source.
    pub fn from_source(source: &Source) -> Result<Self> {
        Self::new(source.api_base(), &source.access_token, source.repo_ref()?)
    }

    pub fn repo(&self) -> &RepoRef {
        &self.repo
    }

    fn repo_url(&self, path: &str) -> String {
        format!(
            "{}/repos/{}/{}{}",
            self.api_base, self.repo.owner, self.repo.name, path
        )
    }

    /// Lazily page through a list endpoint starting at `url`.
    fn pages<T: DeserializeOwned>(&self, operation: &'static str, url: &str) -> Pages<'_, T> {
        Pages {
            client: self,
            operation,
            next: Some(first_page(url)),
            fetched: 0,
            _item: PhantomData,
        }
    }

    async fn send(
        &self,
        operation: &str,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response> {
        let response = request
            .send()
            .await
            .map_err(|e| HookError::RemoteApi(format!("{operation} request failed: {e}")))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await;
        Err(status_error(operation, status.as_u16(), body))
    }

    async fn get_json<T: DeserializeOwned>(&self, operation: &str, url: &str) -> Result<T> {
        let response = self.send(operation, self.http.get(url)).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| HookError::RemoteApi(format!("failed to decode {operation}: {e}")))
    }
}

/// A finite, non-restartable sequence of pages from one list endpoint.
pub struct Pages<'a, T> {
    client: &'a GithubClient,
    operation: &'static str,
    next: Option<String>,
    fetched: usize,
    _item: PhantomData<T>,
}

impl<T: DeserializeOwned> Pages<'_, T> {
    /// Fetch the next page, or `None` once the collection is exhausted.
    pub async fn next_page(&mut self) -> Result<Option<Vec<T>>> {
        let Some(url) = self.next.take() else {
            return Ok(None);
        };

        let response = self
            .client
            .send(self.operation, self.client.http.get(&url))
            .await?;
        self.next = response
            .headers()
            .get(LINK)
            .and_then(|value| value.to_str().ok())
            .and_then(next_page_url);

        let rows = response.json::<Vec<T>>().await.map_err(|e| {
            HookError::RemoteApi(format!("failed to decode {}: {e}", self.operation))
        })?;
        self.fetched += 1;
        Ok(Some(rows))
    }

    /// Retrieve every remaining page.
    pub async fn drain(mut self) -> Result<Vec<T>> {
        let mut rows = Vec::new();
        while let Some(page) = self.next_page().await? {
            rows.extend(page);
        }
        debug!(
            operation = self.operation,
            pages = self.fetched,
            rows = rows.len(),
            "pagination drained"
        );
        Ok(rows)
    }
}

#[async_trait]
impl HostingClient for GithubClient {
    async fn list_pull_requests(&self) -> Result<Vec<PullRequest>> {
        self.pages("list pull requests", &self.repo_url("/pulls?state=open"))
            .drain()
            .await
    }

    async fn list_issue_comments(&self, number: u64) -> Result<Vec<Comment>> {
        self.pages(
            "list issue comments",
            &self.repo_url(&format!("/issues/{number}/comments")),
        )
        .drain()
        .await
    }

    async fn list_team_members(&self, team: &Team) -> Result<Vec<User>> {
        let url = format!(
            "{}/orgs/{}/teams/{}/members",
            self.api_base, team.organization, team.slug
        );
        self.pages("list team members", &url)
            .drain()
            .await
            .map_err(|e| HookError::RemoteApi(format!("team {team}: {e}")))
    }

    async fn get_pull_request(&self, number: u64) -> Result<PullRequest> {
        self.get_json("get pull request", &self.repo_url(&format!("/pulls/{number}")))
            .await
    }

    async fn create_commit_status(&self, sha: &str, status: &CommitStatus) -> Result<()> {
        let request = self
            .http
            .post(self.repo_url(&format!("/statuses/{sha}")))
            .json(status);
        self.send("create commit status", request).await?;
        Ok(())
    }

    async fn create_issue_comment(&self, number: u64, body: &str) -> Result<()> {
        let request = self
            .http
            .post(self.repo_url(&format!("/issues/{number}/comments")))
            .json(&json!({ "body": body }));
        self.send("create issue comment", request).await?;
        Ok(())
    }
}

/// Error for a non-2xx response. A body that cannot be read is logged and
/// replaced by a placeholder.
fn status_error<E: std::fmt::Display>(
    operation: &str,
    status: u16,
    body: std::result::Result<String, E>,
) -> HookError {
    let body = match body {
        Ok(body) => truncate(&body, ERROR_BODY_LIMIT),
        Err(e) => {
            debug!(operation, status, error = %e, "failed to read error response body");
            "<unreadable body>".to_string()
        }
    };
    HookError::RemoteApi(format!("{operation} failed with status {status}: {body}"))
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_chars).collect();
        format!("{head}...")
    }
}
