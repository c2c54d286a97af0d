use tracing::{error, info, warn};

use crate::associate::{self, Associations};
use crate::cli::Args;
use crate::config::{ConfigSource, Settings};
use crate::deploy::{self, DeployOptions, DeployReport};
use crate::error::{Error, Result};
use crate::fetch;
use crate::git::GitCli;
use crate::github::{GhCli, PullRequestHost};
use crate::jira::{JiraClient, TicketSystem};
use crate::reconcile::{self, LinkOptions};
use crate::ticket_id::Extractor;

/// Main application entry point
pub fn run(args: Args) -> Result<()> {
    let source = ConfigSource::load(&args.config, &args.set)?;
    let mut settings = Settings::from_source(&source)?;
    settings.dry_run |= args.dry_run;

    // Clients are built once and shared by every step of the run
    let host = GhCli::new(
        &settings.repo_owner,
        &settings.repo,
        &settings.github_account,
        &settings.github_token,
    );
    let jira = JiraClient::new(
        settings.jira_base_url(),
        &settings.jira_username,
        &settings.jira_password,
    )?;

    let associations = sync(&settings, &host, &jira)?;

    if settings.merge_deployment {
        warn!("MergeDeployment is an experimental feature.");
        run_deployment(&settings, &jira, &associations)?;
    }

    Ok(())
}

/// Associate open PRs with tickets and make sure both sides link each other
///
/// Returns the associations so the deployment step can reuse them.
pub fn sync<H, T>(settings: &Settings, host: &H, tickets: &T) -> Result<Associations>
where
    H: PullRequestHost + ?Sized,
    T: TicketSystem + ?Sized,
{
    let extractor = Extractor::new(&settings.jira_prefix)?;
    let options = LinkOptions::from(settings);

    let associations = associate::build(host, &extractor, |pr, id, comments| {
        reconcile::ensure_pr_link(host, &options, pr, id, comments).map(|_| ())
    })?;
    info!("{} tickets referenced by open pull requests", associations.len());

    let fetched =
        fetch::fetch_tickets(tickets, &extractor, associations.ids().cloned())?;
    reconcile::reconcile_tickets(tickets, &options, &associations, &fetched)?;

    Ok(associations)
}

/// Merge ready tickets in the configured clone
///
/// A clone that cannot be opened, or has a merge or rebase in progress, halts
/// the deployment the same way a failed checkout does.
fn run_deployment<T: TicketSystem + ?Sized>(
    settings: &Settings,
    tickets: &T,
    associations: &Associations,
) -> Result<DeployReport> {
    let path = settings
        .local_repository
        .as_ref()
        .ok_or_else(|| Error::MissingConfig(vec!["localRepository".into()]))?;
    let vcs = match GitCli::open(path) {
        Ok(vcs) => vcs,
        Err(err) => {
            error!("Repository is not ready: {}", err);
            return Ok(DeployReport::not_ready());
        }
    };

    let options = DeployOptions {
        base_branch: settings.base_branch.clone(),
        ready_status: settings.ready_status.clone(),
        dry_run: settings.dry_run,
    };
    let report = deploy::deploy(&vcs, tickets, associations, &options)?;
    info!(
        "Deployment {:?}: {} merged, {} dry-run, {} without PR",
        report.state,
        report.merged.len(),
        report.would_merge.len(),
        report.skipped.len()
    );
    Ok(report)
}
