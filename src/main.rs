use std::process;

use clap::Parser;
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use jira_github_sync::app;
use jira_github_sync::cli::Args;

fn main() {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .init();

    match app::run(args) {
        Ok(()) => println!("{} Sync finished", "+".bright_green()),
        Err(err) => {
            println!("{} {}", "x".red(), err);
            process::exit(1);
        }
    }
}
