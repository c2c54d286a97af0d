//! # jira-github-sync
//!
//! Keeps GitHub pull requests and Jira tickets cross-linked, and optionally
//! merges the branches of deployment-ready tickets.

pub mod app;
pub mod associate;
pub mod cli;
pub mod config;
pub mod deploy;
pub mod error;
pub mod fetch;
pub mod git;
pub mod github;
pub mod jira;
pub mod pr;
pub mod reconcile;
pub mod template;
pub mod ticket_id;

#[cfg(test)]
mod test_utils;

// Re-export commonly used types
pub use config::Settings;
pub use error::{Error, Result};
pub use pr::PullRequest;
pub use ticket_id::TicketId;
