//! Cross-link reconciliation
//!
//! Ensures that each associated ticket carries a remote link to its PR and that
//! each PR body links back to its ticket. Every write is preceded by an
//! existence check, so running the sync again with unchanged data writes
//! nothing.

use tracing::{info, warn};

use crate::associate::Associations;
use crate::config::Settings;
use crate::error::Result;
use crate::github::PullRequestHost;
use crate::jira::{Ticket, TicketSystem};
use crate::pr::{PullRequest, ReviewComment};
use crate::template::{self, mentions_link, same_link};
use crate::ticket_id::TicketId;

/// Where an existing link was found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkSurface {
    Description,
    Comment,
    RemoteLink,
    PrBody,
    ReviewComment,
}

/// What a reconciliation call did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkOutcome {
    /// The link already existed; nothing was written
    Present(LinkSurface),
    /// The link was written
    Added,
    /// The link is missing but dry-run mode skipped the write
    DryRun,
}

/// Options controlling both reconciliation directions
#[derive(Debug, Clone, Default)]
pub struct LinkOptions {
    pub repo_owner: String,
    pub repo: String,
    pub jira_server: String,
    pub search_description: bool,
    pub search_comments: bool,
    pub pull_request_text: String,
    pub additional_link: Option<String>,
    pub additional_link_text: String,
    pub dry_run: bool,
}

impl From<&Settings> for LinkOptions {
    fn from(settings: &Settings) -> Self {
        Self {
            repo_owner: settings.repo_owner.clone(),
            repo: settings.repo.clone(),
            jira_server: settings.jira_server.clone(),
            search_description: settings.search_description,
            search_comments: settings.search_comments,
            pull_request_text: settings.pull_request_text.clone(),
            additional_link: settings.additional_link.clone(),
            additional_link_text: settings.additional_link_text.clone(),
            dry_run: settings.dry_run,
        }
    }
}

/// Make sure `ticket` has a remote link to `pr`
pub fn ensure_ticket_link<T: TicketSystem + ?Sized>(
    tickets: &T,
    options: &LinkOptions,
    ticket: &Ticket,
    pr: &PullRequest,
) -> Result<LinkOutcome> {
    let link = template::pr_link(&options.repo_owner, &options.repo, pr.number);

    if options.search_description {
        if let Some(description) = &ticket.description {
            if mentions_link(description, &link) {
                return Ok(LinkOutcome::Present(LinkSurface::Description));
            }
        }
    }

    if options.search_comments {
        let comments = tickets.comments(&ticket.key)?;
        if comments.iter().any(|body| mentions_link(body, &link)) {
            return Ok(LinkOutcome::Present(LinkSurface::Comment));
        }
    }

    let existing = tickets.remote_links(&ticket.key)?;
    if existing.iter().any(|l| same_link(&l.url, &link)) {
        return Ok(LinkOutcome::Present(LinkSurface::RemoteLink));
    }

    let primary_url = format!("https://{}", link);
    let primary_text = template::render(&options.pull_request_text, pr);

    if options.dry_run {
        info!(
            "dry-run: would add link {} ({}) to issue {}",
            primary_url, primary_text, ticket.key
        );
        return Ok(LinkOutcome::DryRun);
    }

    info!("Adding links to issue {}", ticket.key);

    if let Some(additional) = &options.additional_link {
        let url = template::render(additional, pr);
        if url.is_empty() {
            warn!("Additional link for issue {} rendered empty, skipping it", ticket.key);
        } else if existing.iter().any(|l| same_link(&l.url, &url)) {
            info!("Issue {} already links {}", ticket.key, url);
        } else {
            let text = template::render(&options.additional_link_text, pr);
            tickets.add_remote_link(&ticket.key, &url, &text)?;
        }
    }

    tickets.add_remote_link(&ticket.key, &primary_url, &primary_text)?;
    Ok(LinkOutcome::Added)
}

/// Make sure the body of `pr` links to ticket `key`
///
/// On a write, `pr.body` is updated in place so that later calls for the same
/// PR build on the new body.
pub fn ensure_pr_link<H: PullRequestHost + ?Sized>(
    host: &H,
    options: &LinkOptions,
    pr: &mut PullRequest,
    key: &TicketId,
    comments: &[ReviewComment],
) -> Result<LinkOutcome> {
    let link = template::ticket_link(&options.jira_server, key.as_str());

    if mentions_link(&pr.body, &link) {
        return Ok(LinkOutcome::Present(LinkSurface::PrBody));
    }
    if let Some(first) = comments.first() {
        if mentions_link(&first.body, &link) {
            return Ok(LinkOutcome::Present(LinkSurface::ReviewComment));
        }
    }

    let body = template::append_link(&pr.body, &link);

    if options.dry_run {
        info!("dry-run: would link PR {} to {}", pr.number, link);
        pr.body = body;
        return Ok(LinkOutcome::DryRun);
    }

    info!("Updating description for PR {}", pr.number);
    host.update_body(pr.number, &body)?;
    pr.body = body;
    Ok(LinkOutcome::Added)
}

/// Link every fetched ticket to its associated PR
///
/// Associations whose ticket was not fetched are logged and skipped.
pub fn reconcile_tickets<T: TicketSystem + ?Sized>(
    tickets: &T,
    options: &LinkOptions,
    associations: &Associations,
    fetched: &[Ticket],
) -> Result<()> {
    for (id, pr) in associations.iter() {
        match fetched.iter().find(|ticket| &ticket.key == id) {
            Some(ticket) => {
                ensure_ticket_link(tickets, options, ticket, pr)?;
            }
            None => warn!("Could not find Jira issue {}", id),
        }
    }
    Ok(())
}
