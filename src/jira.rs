//! Jira integration for jira-github-sync
//!
//! This module provides the ticket-system side of the sync:
//! - Running JQL queries (batch lookup by key, deployment-ready tickets)
//! - Reading ticket comments and remote links
//! - Adding remote links that point back at pull requests
//!
//! The REST v2 API is used with basic authentication. Errors reported by Jira
//! keep their message text intact, since rejected issue keys are named there.

use std::collections::BTreeMap;

use reqwest::blocking::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use crate::error::{Error, Result};
use crate::ticket_id::TicketId;

/// A ticket as returned by a query
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ticket {
    pub key: TicketId,
    pub summary: String,
    pub description: Option<String>,
    pub status: String,
}

impl Ticket {
    pub fn new(key: TicketId) -> Self {
        Self {
            key,
            ..Self::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = status.into();
        self
    }
}

/// A link attached to a ticket that points outside Jira
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteLink {
    pub url: String,
    #[serde(default)]
    pub title: String,
}

/// The ticket-system operations the sync run consumes
pub trait TicketSystem {
    /// Run a JQL query returning at most `max_results` tickets
    fn search(&self, jql: &str, max_results: usize) -> Result<Vec<Ticket>>;

    /// Comment bodies of a ticket
    fn comments(&self, key: &TicketId) -> Result<Vec<String>>;

    /// Remote links of a ticket
    fn remote_links(&self, key: &TicketId) -> Result<Vec<RemoteLink>>;

    /// Attach a remote link to a ticket
    fn add_remote_link(&self, key: &TicketId, url: &str, title: &str) -> Result<()>;
}

// Response types for the REST endpoints

/// Largest page requested from the search endpoint; Jira Cloud caps it anyway
const SEARCH_PAGE_SIZE: usize = 100;

#[derive(Deserialize, Debug)]
struct SearchResponse {
    #[serde(default)]
    issues: Vec<ApiIssue>,
    #[serde(default)]
    total: Option<usize>,
}

impl SearchResponse {
    /// Offset of the next page, or `None` once the result set is exhausted
    ///
    /// `fetched` counts every issue received so far, this page included, and
    /// `requested` is the page size this page was asked for.
    fn next_start(&self, fetched: usize, requested: usize, max_results: usize) -> Option<usize> {
        if self.issues.is_empty() || fetched >= max_results {
            return None;
        }
        let more = match self.total {
            Some(total) => fetched < total,
            None => self.issues.len() >= requested,
        };
        more.then_some(fetched)
    }
}

#[derive(Deserialize, Debug)]
struct ApiIssue {
    key: String,
    fields: ApiFields,
}

#[derive(Deserialize, Debug, Default)]
struct ApiFields {
    #[serde(default)]
    summary: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    status: Option<ApiStatus>,
}

#[derive(Deserialize, Debug)]
struct ApiStatus {
    name: String,
}

#[derive(Deserialize, Debug)]
struct CommentPage {
    #[serde(default)]
    comments: Vec<ApiComment>,
}

#[derive(Deserialize, Debug)]
struct ApiComment {
    #[serde(default)]
    body: String,
}

#[derive(Deserialize, Debug)]
struct ApiRemoteLink {
    object: RemoteLink,
}

#[derive(Deserialize, Debug, Default)]
struct ErrorCollection {
    #[serde(default, rename = "errorMessages")]
    error_messages: Vec<String>,
    #[serde(default)]
    errors: BTreeMap<String, String>,
}

/// [`TicketSystem`] backed by the Jira REST API
#[derive(Debug, Clone)]
pub struct JiraClient {
    base_url: String,
    username: String,
    password: String,
    client: Client,
}

impl JiraClient {
    /// # Arguments
    /// * `base_url` - Scheme and host of the Jira instance (e.g., "https://acme.atlassian.net")
    /// * `username` - Jira username/email
    /// * `password` - Jira password or API token
    pub fn new(
        base_url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            username: username.into(),
            password: password.into(),
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/rest/api/2/{}", self.base_url, path)
    }

    fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = request
            .basic_auth(&self.username, Some(&self.password))
            .header("Accept", "application/json")
            .send()?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().unwrap_or_default();
        Err(Error::Jira {
            status: Some(status.as_u16()),
            message: error_message(&body),
        })
    }
}

impl TicketSystem for JiraClient {
    fn search(&self, jql: &str, max_results: usize) -> Result<Vec<Ticket>> {
        debug!("jql: {}", jql);

        let mut tickets = Vec::new();
        let mut start_at = 0;
        while tickets.len() < max_results {
            let requested = (max_results - tickets.len()).min(SEARCH_PAGE_SIZE);
            let request = self.client.get(self.url("search")).query(&[
                ("jql", jql.to_string()),
                ("startAt", start_at.to_string()),
                ("maxResults", requested.to_string()),
                ("fields", "summary,description,status".to_string()),
            ]);

            let page: SearchResponse = self.send(request)?.json()?;
            let next = page.next_start(tickets.len() + page.issues.len(), requested, max_results);
            tickets.extend(page.issues.into_iter().map(into_ticket));
            debug!("search page at {}: {} tickets so far", start_at, tickets.len());

            match next {
                Some(offset) => start_at = offset,
                None => break,
            }
        }

        tickets.truncate(max_results);
        Ok(tickets)
    }

    fn comments(&self, key: &TicketId) -> Result<Vec<String>> {
        let request = self.client.get(self.url(&format!("issue/{}/comment", key)));
        let page: CommentPage = self.send(request)?.json()?;
        Ok(page.comments.into_iter().map(|c| c.body).collect())
    }

    fn remote_links(&self, key: &TicketId) -> Result<Vec<RemoteLink>> {
        let request = self.client.get(self.url(&format!("issue/{}/remotelink", key)));
        let links: Vec<ApiRemoteLink> = self.send(request)?.json()?;
        Ok(links.into_iter().map(|l| l.object).collect())
    }

    fn add_remote_link(&self, key: &TicketId, url: &str, title: &str) -> Result<()> {
        let request = self
            .client
            .post(self.url(&format!("issue/{}/remotelink", key)))
            .json(&json!({ "object": { "url": url, "title": title } }));
        self.send(request)?;
        Ok(())
    }
}

fn into_ticket(issue: ApiIssue) -> Ticket {
    Ticket {
        key: TicketId::new(issue.key),
        summary: issue.fields.summary,
        description: issue.fields.description,
        status: issue.fields.status.map(|s| s.name).unwrap_or_default(),
    }
}

/// Flatten a Jira error body into one message; falls back to the raw body
fn error_message(body: &str) -> String {
    match serde_json::from_str::<ErrorCollection>(body) {
        Ok(errors) if !errors.error_messages.is_empty() || !errors.errors.is_empty() => errors
            .error_messages
            .into_iter()
            .chain(errors.errors.into_values())
            .collect::<Vec<_>>()
            .join("\n"),
        _ => body.trim().to_string(),
    }
}
