//! Configuration management for jira-github-sync
//!
//! Values are flat string pairs looked up, in priority order, in command-line
//! `--set key=value` pairs, the config file, and the process environment. The
//! resolved values are validated once into an immutable [`Settings`].

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde_yaml::Value;
use tracing::error;

use crate::error::{Error, Result};

/// Default config file name, looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "jira-github-sync.yaml";

/// Configuration key names
pub mod keys {
    pub const GITHUB_ACCOUNT: &str = "githubAccount";
    pub const GITHUB_TOKEN: &str = "githubToken";
    pub const GITHUB_REPO_OWNER: &str = "githubRepoOwner";
    pub const GITHUB_REPO: &str = "githubRepo";
    pub const BASE_BRANCH: &str = "baseBranch";
    pub const JIRA_SERVER: &str = "jiraServer";
    pub const JIRA_USERNAME: &str = "jiraUsername";
    pub const JIRA_PASSWORD: &str = "jiraPassword";
    pub const JIRA_PREFIX: &str = "jiraPrefix";
    pub const READY_STATUS: &str = "jiraProductionReadyStatus";
    pub const PULL_REQUEST_TEXT: &str = "pullRequestText";
    pub const ADDITIONAL_LINK: &str = "additionalLink";
    pub const ADDITIONAL_LINK_TEXT: &str = "additionalLinkText";
    pub const LOCAL_REPOSITORY: &str = "localRepository";
    pub const MERGE_DEPLOYMENT: &str = "MergeDeployment";
    pub const SEARCH_DESCRIPTION: &str = "searchDescription";
    pub const SEARCH_COMMENTS: &str = "searchComments";
    pub const DRY_RUN: &str = "dryRun";
}

/// Keys that must be present before the run contacts either service
pub const REQUIRED_KEYS: [&str; 9] = [
    keys::GITHUB_ACCOUNT,
    keys::GITHUB_TOKEN,
    keys::GITHUB_REPO_OWNER,
    keys::GITHUB_REPO,
    keys::BASE_BRANCH,
    keys::JIRA_SERVER,
    keys::JIRA_USERNAME,
    keys::JIRA_PASSWORD,
    keys::JIRA_PREFIX,
];

fn default_for(key: &str) -> Option<&'static str> {
    match key {
        keys::BASE_BRANCH => Some("main"),
        keys::READY_STATUS => Some("Production Ready"),
        keys::PULL_REQUEST_TEXT => Some("Pull Request {number}"),
        _ => None,
    }
}

/// Parse a boolean-like configuration value
///
/// `true`, `1`, `on` and `yes` (any case) are true; everything else is false.
pub fn to_bool(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "on" | "yes"
    )
}

/// Layered lookup over command-line pairs, config file and environment
#[derive(Debug, Default, Clone)]
pub struct ConfigSource {
    overrides: HashMap<String, String>,
    file: HashMap<String, String>,
    env: HashMap<String, String>,
}

impl ConfigSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the source for a run: CLI pairs, the config file at `path`, and
    /// the current process environment
    pub fn load(path: &Path, overrides: &[(String, String)]) -> Result<Self> {
        Ok(Self::new()
            .with_overrides(overrides.iter().cloned())
            .with_file(load_file(path)?)
            .with_env(std::env::vars()))
    }

    pub fn with_overrides(mut self, pairs: impl IntoIterator<Item = (String, String)>) -> Self {
        self.overrides = lowercase_keys(pairs);
        self
    }

    pub fn with_file(mut self, pairs: impl IntoIterator<Item = (String, String)>) -> Self {
        self.file = lowercase_keys(pairs);
        self
    }

    /// Environment variables are matched by exact name
    pub fn with_env(mut self, vars: impl IntoIterator<Item = (String, String)>) -> Self {
        self.env = vars.into_iter().collect();
        self
    }

    /// Resolve `key`, falling back to its default; empty values count as unset
    pub fn get(&self, key: &str) -> Option<String> {
        let lower = key.to_ascii_lowercase();
        self.overrides
            .get(&lower)
            .or_else(|| self.file.get(&lower))
            .or_else(|| self.env.get(key))
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .or_else(|| default_for(key).map(String::from))
    }

    pub fn get_bool(&self, key: &str) -> bool {
        self.get(key).map(|value| to_bool(&value)).unwrap_or(false)
    }
}

fn lowercase_keys(pairs: impl IntoIterator<Item = (String, String)>) -> HashMap<String, String> {
    pairs
        .into_iter()
        .map(|(key, value)| (key.trim_start_matches('-').to_ascii_lowercase(), value))
        .collect()
}

/// Read a flat key/value config file. YAML and JSON are both accepted.
///
/// A missing file is not an error: every key may come from the environment.
pub fn load_file(path: &Path) -> Result<HashMap<String, String>> {
    if !path.exists() {
        return Ok(HashMap::new());
    }

    let contents = std::fs::read_to_string(path)?;
    if contents.trim().is_empty() {
        return Ok(HashMap::new());
    }

    let raw: HashMap<String, Value> = serde_yaml::from_str(&contents)?;
    let mut values = HashMap::with_capacity(raw.len());

    for (key, value) in raw {
        let value = match value {
            Value::Null => continue,
            Value::String(s) => s,
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => n.to_string(),
            _ => {
                return Err(Error::Config(format!(
                    "{}: value of {} must be a scalar",
                    path.display(),
                    key
                )))
            }
        };
        values.insert(key, value);
    }

    Ok(values)
}

/// Validated settings for one run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings {
    pub github_account: String,
    pub github_token: String,
    pub repo_owner: String,
    pub repo: String,
    pub base_branch: String,
    /// Jira host without scheme, e.g. `acme.atlassian.net`
    pub jira_server: String,
    pub jira_username: String,
    pub jira_password: String,
    pub jira_prefix: String,
    pub ready_status: String,
    pub pull_request_text: String,
    pub additional_link: Option<String>,
    pub additional_link_text: String,
    pub local_repository: Option<PathBuf>,
    pub merge_deployment: bool,
    pub search_description: bool,
    pub search_comments: bool,
    pub dry_run: bool,
}

impl Settings {
    /// Validate `source` and resolve typed settings
    ///
    /// Every missing required key is logged and reported together.
    pub fn from_source(source: &ConfigSource) -> Result<Self> {
        let merge_deployment = source.get_bool(keys::MERGE_DEPLOYMENT);

        let mut missing: Vec<String> = REQUIRED_KEYS
            .iter()
            .filter(|key| source.get(key).is_none())
            .map(|key| key.to_string())
            .collect();
        if merge_deployment && source.get(keys::LOCAL_REPOSITORY).is_none() {
            missing.push(keys::LOCAL_REPOSITORY.to_string());
        }

        if !missing.is_empty() {
            for key in &missing {
                error!("{} was not configured and is a required value", key);
            }
            return Err(Error::MissingConfig(missing));
        }

        let required = |key: &str| source.get(key).unwrap_or_default();

        Ok(Self {
            github_account: required(keys::GITHUB_ACCOUNT),
            github_token: required(keys::GITHUB_TOKEN),
            repo_owner: required(keys::GITHUB_REPO_OWNER),
            repo: required(keys::GITHUB_REPO),
            base_branch: required(keys::BASE_BRANCH),
            jira_server: strip_scheme(&required(keys::JIRA_SERVER)),
            jira_username: required(keys::JIRA_USERNAME),
            jira_password: required(keys::JIRA_PASSWORD),
            jira_prefix: required(keys::JIRA_PREFIX),
            ready_status: required(keys::READY_STATUS),
            pull_request_text: required(keys::PULL_REQUEST_TEXT),
            additional_link: source.get(keys::ADDITIONAL_LINK),
            additional_link_text: source.get(keys::ADDITIONAL_LINK_TEXT).unwrap_or_default(),
            local_repository: source.get(keys::LOCAL_REPOSITORY).map(PathBuf::from),
            merge_deployment,
            search_description: source.get_bool(keys::SEARCH_DESCRIPTION),
            search_comments: source.get_bool(keys::SEARCH_COMMENTS),
            dry_run: source.get_bool(keys::DRY_RUN),
        })
    }

    /// Base URL of the Jira REST API host
    pub fn jira_base_url(&self) -> String {
        format!("https://{}", self.jira_server)
    }
}

fn strip_scheme(server: &str) -> String {
    server
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .trim_end_matches('/')
        .to_string()
}
