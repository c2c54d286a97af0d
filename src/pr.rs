/// An open pull request as seen by the sync run
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PullRequest {
    /// The PR number (e.g., 42 for `/owner/repo/pull/42`)
    pub number: u64,
    /// The host's internal id of the PR
    pub id: u64,
    /// The title of the PR (e.g., "PROJ-7: Fix login bug")
    pub title: String,
    /// The body/description of the PR
    pub body: String,
    /// The source branch the PR merges from
    pub branch: String,
    /// The branch the PR merges into
    pub base: String,
    /// The web URL of the PR
    pub url: String,
    /// Login of the PR author
    pub author: String,
    /// "open" or "closed"
    pub state: String,
    /// Owner of the repository the PR belongs to
    pub owner: String,
    /// Name of the repository the PR belongs to
    pub repo: String,
}

/// A review comment on a pull request
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReviewComment {
    pub body: String,
    /// RFC 3339 creation timestamp, as reported by the host
    pub created_at: String,
}

impl PullRequest {
    /// Creates a new PullRequest with default values
    pub fn new(number: u64) -> Self {
        Self {
            number,
            state: "open".into(),
            ..Self::default()
        }
    }

    /// Sets the title and returns self for chaining
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Sets the body and returns self for chaining
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// Sets the source branch and returns self for chaining
    pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = branch.into();
        self
    }

    /// Sets the base branch and returns self for chaining
    pub fn with_base(mut self, base: impl Into<String>) -> Self {
        self.base = base.into();
        self
    }

    /// Sets the owning repository and returns self for chaining
    pub fn with_repo(mut self, owner: impl Into<String>, repo: impl Into<String>) -> Self {
        self.owner = owner.into();
        self.repo = repo.into();
        self
    }

    /// Sets the author and returns self for chaining
    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = author.into();
        self
    }

    /// Sets the web URL and returns self for chaining
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Look up a named attribute for template substitution.
    ///
    /// Names are matched case-insensitively; unknown names yield `None`.
    pub fn field(&self, name: &str) -> Option<String> {
        let value = match name.to_ascii_lowercase().as_str() {
            "number" => self.number.to_string(),
            "id" => self.id.to_string(),
            "title" => self.title.clone(),
            "body" => self.body.clone(),
            "branch" | "head" => self.branch.clone(),
            "base" => self.base.clone(),
            "url" | "htmlurl" => self.url.clone(),
            "author" | "user" => self.author.clone(),
            "state" => self.state.clone(),
            "owner" => self.owner.clone(),
            "repo" => self.repo.clone(),
            _ => return None,
        };
        Some(value)
    }
}
