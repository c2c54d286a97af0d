use std::path::{Path, PathBuf};
use std::process::Command;

use git2::{Repository, RepositoryState};
use tracing::info;

use crate::error::{Error, Result};

/// Working-tree operations used by the deployment merge
pub trait Vcs {
    fn checkout(&self, branch: &str) -> Result<()>;

    fn pull(&self) -> Result<()>;

    /// Merge `reference` (e.g. `origin/feature`) into the checked-out branch
    fn merge(&self, reference: &str) -> Result<()>;
}

/// Check that `path` is a git repository with no operation in progress
pub fn ensure_clean(path: &Path) -> Result<()> {
    let repo = Repository::open(path)?;
    if repo.state() != RepositoryState::Clean {
        return Err(Error::RepositoryNotClean(path.display().to_string()));
    }
    Ok(())
}

/// [`Vcs`] backed by the `git` executable in a local clone
#[derive(Debug, Clone)]
pub struct GitCli {
    workdir: PathBuf,
}

impl GitCli {
    /// Open the clone at `workdir`, refusing one with a merge or rebase in progress
    pub fn open(workdir: impl Into<PathBuf>) -> Result<Self> {
        let workdir = workdir.into();
        ensure_clean(&workdir)?;
        Ok(Self { workdir })
    }

    fn run(&self, args: &[&str]) -> Result<()> {
        let command = args.join(" ");
        info!("git {}", command);

        let output = Command::new("git")
            .args(args)
            .current_dir(&self.workdir)
            .output()?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        for line in stdout.lines().chain(stderr.lines()) {
            if !line.trim().is_empty() {
                info!("{}", line);
            }
        }

        if !output.status.success() {
            return Err(Error::GitCommand {
                command,
                stderr: stderr.trim().to_string(),
            });
        }
        Ok(())
    }
}

impl Vcs for GitCli {
    fn checkout(&self, branch: &str) -> Result<()> {
        self.run(&["checkout", branch])
    }

    fn pull(&self) -> Result<()> {
        self.run(&["pull"])
    }

    fn merge(&self, reference: &str) -> Result<()> {
        self.run(&["merge", "--no-edit", reference])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_clean_on_fresh_repository() {
        let dir = tempfile::tempdir().unwrap();
        Repository::init(dir.path()).unwrap();

        assert!(ensure_clean(dir.path()).is_ok());
        assert!(GitCli::open(dir.path()).is_ok());
    }

    #[test]
    fn test_ensure_clean_rejects_non_repository() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(ensure_clean(dir.path()), Err(Error::Git(_))));
    }

    #[test]
    fn test_ensure_clean_rejects_merge_in_progress() {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        std::fs::write(
            repo.path().join("MERGE_HEAD"),
            "0123456789abcdef0123456789abcdef01234567\n",
        )
        .unwrap();

        assert!(matches!(
            ensure_clean(dir.path()),
            Err(Error::RepositoryNotClean(_))
        ));
    }
}
