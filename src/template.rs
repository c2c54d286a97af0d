//! Link text templates
//!
//! Remote-link display text and the optional additional link are configured as
//! templates with `{field}` placeholders, filled in from the pull request.

use lazy_static::lazy_static;
use regex::{Captures, Regex};

use crate::pr::PullRequest;

lazy_static! {
    static ref PLACEHOLDER: Regex = Regex::new(r"\{(\w+)\}").unwrap();
}

/// Render `template` against the attributes of `pr`
///
/// Placeholder names are case-insensitive (`{Number}` and `{number}` are the
/// same). Placeholders that name no PR attribute render as an empty string.
pub fn render(template: &str, pr: &PullRequest) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &Captures| {
            pr.field(&caps[1]).unwrap_or_default()
        })
        .into_owned()
}

/// The scheme-less link identifying a PR, e.g. `github.com/owner/repo/pull/42`
///
/// Both existence checks and writes use this form so that `http://` and
/// `https://` variants of the same URL are recognized.
pub fn pr_link(owner: &str, repo: &str, number: u64) -> String {
    format!("github.com/{}/{}/pull/{}", owner, repo, number)
}

/// The scheme-less browse link of a ticket, e.g. `jira.example.com/browse/PROJ-7`
pub fn ticket_link(jira_server: &str, key: &str) -> String {
    format!("{}/browse/{}", jira_server.trim_end_matches('/'), key)
}

/// Append a markdown link line to a PR body
pub fn append_link(body: &str, link: &str) -> String {
    let line = format!("[{}](https://{})", link, link);
    if body.trim().is_empty() {
        line
    } else {
        format!("{}\r\n{}", body, line)
    }
}

/// Whether free text mentions `link`, ignoring case
///
/// A mention must end where the link ends: `.../pull/4` is not mentioned by
/// `.../pull/42`, nor `browse/PROJ-1` by `browse/PROJ-12`.
pub fn mentions_link(haystack: &str, link: &str) -> bool {
    let haystack = haystack.to_lowercase();
    let link = link.to_lowercase();
    if link.is_empty() {
        return false;
    }

    haystack.match_indices(&link).any(|(start, _)| {
        !haystack[start + link.len()..].starts_with(|c: char| c.is_alphanumeric() || c == '_')
    })
}

/// Whether `url` targets the same place as `link`
///
/// The scheme and a trailing slash are ignored on both sides, and the
/// comparison ignores case.
pub fn same_link(url: &str, link: &str) -> bool {
    let normalize = |value: &str| {
        let value = value.trim();
        let value = value
            .split_once("://")
            .map(|(_, rest)| rest)
            .unwrap_or(value);
        value.trim_end_matches('/').to_lowercase()
    };
    normalize(url) == normalize(link)
}
