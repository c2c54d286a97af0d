//! Pull request to ticket association
//!
//! Every open PR is scanned for ticket keys in its title, then its source
//! branch, then the oldest review comment that names a key. The first source
//! with a match wins. The resulting map holds one PR per ticket; when two PRs
//! claim the same ticket the one processed later replaces the earlier one.

use std::collections::HashMap;

use tracing::{debug, info};

use crate::error::Result;
use crate::github::PullRequestHost;
use crate::pr::{PullRequest, ReviewComment};
use crate::ticket_id::{Extractor, TicketId};

/// Where a PR's ticket keys were found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Title,
    Branch,
    ReviewComment,
}

/// Ticket to PR mapping with last-write-wins overwrites
///
/// Iteration follows the order in which each ticket was first inserted; an
/// overwrite replaces the PR but keeps the ticket's position.
#[derive(Debug, Clone, Default)]
pub struct Associations {
    order: Vec<TicketId>,
    by_ticket: HashMap<TicketId, PullRequest>,
}

impl Associations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `pr` for `id`, returning the PR it replaced, if any
    pub fn insert(&mut self, id: TicketId, pr: PullRequest) -> Option<PullRequest> {
        let previous = self.by_ticket.insert(id.clone(), pr);
        if previous.is_none() {
            self.order.push(id);
        }
        previous
    }

    pub fn get(&self, id: &TicketId) -> Option<&PullRequest> {
        self.by_ticket.get(id)
    }

    /// Associated ticket ids, in first-insertion order
    pub fn ids(&self) -> impl Iterator<Item = &TicketId> {
        self.order.iter()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&TicketId, &PullRequest)> {
        self.order
            .iter()
            .filter_map(move |id| self.by_ticket.get(id).map(|pr| (id, pr)))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Find the ticket keys a PR refers to, honoring source priority
pub fn identify(
    extractor: &Extractor,
    pr: &PullRequest,
    comments: &[ReviewComment],
) -> Option<(Source, Vec<TicketId>)> {
    let title = extractor.extract(&pr.title);
    if title.found() {
        return Some((Source::Title, title.ids));
    }

    let branch = extractor.extract(&pr.branch);
    if branch.found() {
        return Some((Source::Branch, branch.ids));
    }

    comments
        .iter()
        .map(|comment| extractor.extract(&comment.body))
        .find(|extraction| extraction.found())
        .map(|extraction| (Source::ReviewComment, extraction.ids))
}

/// Associate every open PR of `host` with the tickets it names.
///
/// PRs are processed in ascending number order so that conflicting claims
/// resolve the same way on every run. `link_pr` is invoked once per (PR,
/// ticket) pair before the pair is recorded, and receives the PR mutably so
/// body changes carry over to the next ticket of the same PR.
pub fn build<H, F>(host: &H, extractor: &Extractor, mut link_pr: F) -> Result<Associations>
where
    H: PullRequestHost + ?Sized,
    F: FnMut(&mut PullRequest, &TicketId, &[ReviewComment]) -> Result<()>,
{
    let mut pull_requests = host.open_pull_requests()?;
    pull_requests.sort_by_key(|pr| pr.number);
    info!("Found {} open pull requests", pull_requests.len());

    let mut associations = Associations::new();

    for mut pr in pull_requests {
        let comments = host.review_comments(pr.number)?;

        let Some((source, ids)) = identify(extractor, &pr, &comments) else {
            info!("No issue ID found for PR {}: {}", pr.number, pr.title);
            continue;
        };
        debug!("PR {} references {:?} via {:?}", pr.number, ids, source);

        for id in &ids {
            link_pr(&mut pr, id, &comments)?;
        }

        for id in ids {
            if let Some(previous) = associations.insert(id.clone(), pr.clone()) {
                info!(
                    "{} was claimed by PR {}, now associated with PR {}",
                    id, previous.number, pr.number
                );
            }
        }
    }

    Ok(associations)
}
