use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Missing required configuration: {}", .0.join(", "))]
    MissingConfig(Vec<String>),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("GitHub CLI error: {0}")]
    GitHubCli(String),

    #[error("Jira error{}: {message}", .status.map(|s| format!(" ({})", s)).unwrap_or_default())]
    Jira {
        status: Option<u16>,
        message: String,
    },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Git error: {0}")]
    Git(#[from] git2::Error),

    #[error("git {command} failed: {stderr}")]
    GitCommand { command: String, stderr: String },

    #[error("Repository at {0} is not clean")]
    RepositoryNotClean(String),
}

impl Error {
    /// The message a collaborator reported, without the variant prefix.
    ///
    /// The batch fetcher scans this text for rejected ticket keys.
    pub fn detail(&self) -> String {
        match self {
            Error::Jira { message, .. } => message.clone(),
            Error::GitHubCli(message) | Error::Config(message) => message.clone(),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_config_lists_every_key() {
        let err = Error::MissingConfig(vec!["githubToken".into(), "jiraPrefix".into()]);
        assert_eq!(
            err.to_string(),
            "Missing required configuration: githubToken, jiraPrefix"
        );
    }

    #[test]
    fn test_jira_error_display_with_and_without_status() {
        let with = Error::Jira {
            status: Some(400),
            message: "bad key".into(),
        };
        let without = Error::Jira {
            status: None,
            message: "bad key".into(),
        };
        assert_eq!(with.to_string(), "Jira error (400): bad key");
        assert_eq!(without.to_string(), "Jira error: bad key");
        assert_eq!(with.detail(), "bad key");
    }
}
