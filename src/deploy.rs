//! Deployment merge
//!
//! Merges the source branch of every PR whose ticket is in the ready status
//! into the base branch of a local clone. Any failure stops the sequence: a
//! clone that cannot be opened or a failed checkout or pull merges nothing,
//! and a failed merge leaves every later ticket unmerged. A dry run skips the
//! checkout and pull and only lists the branches it would merge.

use tracing::{error, info, warn};

use crate::associate::Associations;
use crate::error::Result;
use crate::fetch::{ready_query, READY_QUERY_LIMIT};
use crate::git::Vcs;
use crate::jira::TicketSystem;
use crate::ticket_id::TicketId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployState {
    NotStarted,
    CheckoutBaseBranch,
    PullLatest,
    MergeAssociatedBranch,
    Done,
    Halted,
}

#[derive(Debug, Clone)]
pub struct DeployOptions {
    pub base_branch: String,
    pub ready_status: String,
    pub dry_run: bool,
}

/// What a deployment run did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployReport {
    pub state: DeployState,
    pub merged: Vec<TicketId>,
    /// Ready tickets a dry run would have merged
    pub would_merge: Vec<TicketId>,
    /// Ready tickets with no associated PR
    pub skipped: Vec<TicketId>,
    /// The ticket whose merge failed, when halted during merging
    pub failed: Option<TicketId>,
}

impl DeployReport {
    fn new() -> Self {
        Self {
            state: DeployState::NotStarted,
            merged: Vec::new(),
            would_merge: Vec::new(),
            skipped: Vec::new(),
            failed: None,
        }
    }

    /// Report for a run that stopped before touching the working tree
    pub fn not_ready() -> Self {
        Self::new().halt()
    }

    fn halt(mut self) -> Self {
        self.state = DeployState::Halted;
        self
    }
}

/// Merge the branches of ready tickets into the base branch, in query order
///
/// VCS failures halt the run and are reported in the returned state; only a
/// failing ticket query is returned as an error.
pub fn deploy<V, T>(
    vcs: &V,
    tickets: &T,
    associations: &Associations,
    options: &DeployOptions,
) -> Result<DeployReport>
where
    V: Vcs + ?Sized,
    T: TicketSystem + ?Sized,
{
    let mut report = DeployReport::new();

    if !options.dry_run {
        report.state = DeployState::CheckoutBaseBranch;
        if let Err(err) = vcs.checkout(&options.base_branch) {
            error!("Repository is not ready: {}", err);
            return Ok(report.halt());
        }

        report.state = DeployState::PullLatest;
        if let Err(err) = vcs.pull() {
            error!("Repository is not ready: {}", err);
            return Ok(report.halt());
        }
    }

    report.state = DeployState::MergeAssociatedBranch;
    let ready = tickets.search(&ready_query(&options.ready_status), READY_QUERY_LIMIT)?;
    info!("{} tickets are {}", ready.len(), options.ready_status);

    for ticket in ready {
        let Some(pr) = associations.get(&ticket.key) else {
            warn!("No PR found for {}", ticket.key);
            report.skipped.push(ticket.key);
            continue;
        };

        let reference = format!("origin/{}", pr.branch);
        if options.dry_run {
            info!("dry-run: would merge {} for {}", reference, ticket.key);
            report.would_merge.push(ticket.key);
            continue;
        }

        info!("Branch {} for {} is being merged", pr.branch, ticket.key);
        if let Err(err) = vcs.merge(&reference) {
            error!("Failed to merge {}: {}", pr.branch, err);
            report.failed = Some(ticket.key);
            return Ok(report.halt());
        }
        report.merged.push(ticket.key);
    }

    report.state = DeployState::Done;
    Ok(report)
}
