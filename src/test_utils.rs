//! In-memory collaborators for tests. Every write is recorded and also applied
//! to the fake's state, so a second run observes the first run's effects.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};

use crate::error::{Error, Result};
use crate::git::Vcs;
use crate::github::{sort_comments, PullRequestHost};
use crate::jira::{RemoteLink, Ticket, TicketSystem};
use crate::pr::{PullRequest, ReviewComment};
use crate::ticket_id::TicketId;

#[derive(Default)]
pub struct FakeHost {
    pulls: RefCell<Vec<PullRequest>>,
    comments: HashMap<u64, Vec<ReviewComment>>,
    updates: RefCell<Vec<(u64, String)>>,
}

impl FakeHost {
    pub fn new(pulls: Vec<PullRequest>) -> Self {
        Self {
            pulls: RefCell::new(pulls),
            ..Self::default()
        }
    }

    pub fn with_comments(mut self, number: u64, comments: Vec<ReviewComment>) -> Self {
        self.comments.insert(number, comments);
        self
    }

    pub fn updates(&self) -> Vec<(u64, String)> {
        self.updates.borrow().clone()
    }
}

impl PullRequestHost for FakeHost {
    fn open_pull_requests(&self) -> Result<Vec<PullRequest>> {
        Ok(self.pulls.borrow().clone())
    }

    fn review_comments(&self, number: u64) -> Result<Vec<ReviewComment>> {
        Ok(sort_comments(
            self.comments.get(&number).cloned().unwrap_or_default(),
        ))
    }

    fn update_body(&self, number: u64, body: &str) -> Result<()> {
        self.updates.borrow_mut().push((number, body.to_string()));
        for pr in self.pulls.borrow_mut().iter_mut() {
            if pr.number == number {
                pr.body = body.to_string();
            }
        }
        Ok(())
    }
}

/// Fake ticket system. Key queries naming an invalid key fail with a Jira
/// style message that names the first invalid key of the query.
#[derive(Default)]
pub struct FakeTracker {
    tickets: Vec<Ticket>,
    invalid: HashSet<TicketId>,
    comments: HashMap<TicketId, Vec<String>>,
    links: RefCell<HashMap<TicketId, Vec<RemoteLink>>>,
    added: RefCell<Vec<(TicketId, RemoteLink)>>,
    queries: RefCell<Vec<String>>,
    search_error: RefCell<Option<Error>>,
}

impl FakeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ticket(self, key: &str) -> Self {
        self.with_full_ticket(Ticket::new(TicketId::new(key)))
    }

    pub fn with_full_ticket(mut self, ticket: Ticket) -> Self {
        self.tickets.push(ticket);
        self
    }

    pub fn with_invalid(mut self, key: &str) -> Self {
        self.invalid.insert(TicketId::new(key));
        self
    }

    pub fn with_comment(mut self, key: &str, body: &str) -> Self {
        self.comments
            .entry(TicketId::new(key))
            .or_default()
            .push(body.to_string());
        self
    }

    pub fn with_remote_link(self, key: &str, url: &str, title: &str) -> Self {
        self.links
            .borrow_mut()
            .entry(TicketId::new(key))
            .or_default()
            .push(RemoteLink {
                url: url.into(),
                title: title.into(),
            });
        self
    }

    /// Fail the next search with `err`
    pub fn with_search_error(self, err: Error) -> Self {
        *self.search_error.borrow_mut() = Some(err);
        self
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.borrow().clone()
    }

    pub fn added(&self) -> Vec<(TicketId, RemoteLink)> {
        self.added.borrow().clone()
    }
}

fn query_keys(jql: &str) -> Option<Vec<TicketId>> {
    let inner = jql.strip_prefix("issueKey in (")?.strip_suffix(')')?;
    Some(
        inner
            .split(',')
            .filter(|key| !key.is_empty())
            .map(TicketId::new)
            .collect(),
    )
}

impl TicketSystem for FakeTracker {
    fn search(&self, jql: &str, max_results: usize) -> Result<Vec<Ticket>> {
        self.queries.borrow_mut().push(jql.to_string());

        if let Some(err) = self.search_error.borrow_mut().take() {
            return Err(err);
        }

        let found: Vec<Ticket> = match query_keys(jql) {
            Some(keys) => {
                if let Some(bad) = keys.iter().find(|key| self.invalid.contains(*key)) {
                    return Err(Error::Jira {
                        status: Some(400),
                        message: format!(
                            "The issue key '{}' for field 'issueKey' is invalid.",
                            bad
                        ),
                    });
                }
                self.tickets
                    .iter()
                    .filter(|t| keys.contains(&t.key))
                    .cloned()
                    .collect()
            }
            None => self
                .tickets
                .iter()
                .filter(|t| !t.status.is_empty())
                .filter(|t| jql.contains(&format!("status = \"{}\"", t.status)))
                .cloned()
                .collect(),
        };

        Ok(found.into_iter().take(max_results).collect())
    }

    fn comments(&self, key: &TicketId) -> Result<Vec<String>> {
        Ok(self.comments.get(key).cloned().unwrap_or_default())
    }

    fn remote_links(&self, key: &TicketId) -> Result<Vec<RemoteLink>> {
        Ok(self.links.borrow().get(key).cloned().unwrap_or_default())
    }

    fn add_remote_link(&self, key: &TicketId, url: &str, title: &str) -> Result<()> {
        let link = RemoteLink {
            url: url.into(),
            title: title.into(),
        };
        self.links
            .borrow_mut()
            .entry(key.clone())
            .or_default()
            .push(link.clone());
        self.added.borrow_mut().push((key.clone(), link));
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeVcs {
    fail_checkout: bool,
    fail_pull: bool,
    failing_merges: HashSet<String>,
    calls: RefCell<Vec<String>>,
}

impl FakeVcs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_checkout(mut self) -> Self {
        self.fail_checkout = true;
        self
    }

    pub fn failing_pull(mut self) -> Self {
        self.fail_pull = true;
        self
    }

    pub fn failing_merge(mut self, reference: &str) -> Self {
        self.failing_merges.insert(reference.to_string());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    fn record(&self, command: String, fail: bool) -> Result<()> {
        self.calls.borrow_mut().push(command.clone());
        if fail {
            return Err(Error::GitCommand {
                command,
                stderr: "CONFLICT (content)".into(),
            });
        }
        Ok(())
    }
}

impl Vcs for FakeVcs {
    fn checkout(&self, branch: &str) -> Result<()> {
        self.record(format!("checkout {}", branch), self.fail_checkout)
    }

    fn pull(&self) -> Result<()> {
        self.record("pull".into(), self.fail_pull)
    }

    fn merge(&self, reference: &str) -> Result<()> {
        self.record(
            format!("merge {}", reference),
            self.failing_merges.contains(reference),
        )
    }
}
