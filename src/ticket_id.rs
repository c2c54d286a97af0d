//! Ticket identifier extraction
//!
//! Pulls Jira keys such as `PROJ-123` out of free text. Matching is tolerant of
//! case and of the separator between prefix and number, so `proj 123`,
//! `PROJ - 123` and `Proj-123` all canonicalize to `PROJ-123`.

use std::fmt;

use regex::{Regex, RegexBuilder};

use crate::error::{Error, Result};

/// A canonical ticket key: uppercase prefix, a dash, and a digit run
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TicketId(String);

impl TicketId {
    /// Wraps a key that is already in `PREFIX-123` form, uppercasing it
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into().to_uppercase())
    }

    fn from_parts(prefix: &str, digits: &str) -> Self {
        Self(format!("{}-{}", prefix.to_uppercase(), digits))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TicketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for TicketId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Identifiers found in one piece of text, in order of first appearance
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    pub ids: Vec<TicketId>,
}

impl Extraction {
    /// Whether at least one identifier was found
    pub fn found(&self) -> bool {
        !self.ids.is_empty()
    }
}

/// Finds ticket identifiers for one configured project prefix
#[derive(Debug, Clone)]
pub struct Extractor {
    prefix: String,
    pattern: Regex,
}

impl Extractor {
    /// Build an extractor for `prefix`.
    ///
    /// An empty prefix degrades to matching any `<word>-<digits>` run. That
    /// matches version strings and similar noise, so configuration validation
    /// rejects an empty `jiraPrefix` before an extractor is ever built for a run.
    pub fn new(prefix: &str) -> Result<Self> {
        let prefix = prefix.trim();
        let source = if prefix.is_empty() {
            r"\b(?P<prefix>[a-z][a-z0-9]*)-(?P<digits>[0-9]+)".to_string()
        } else {
            format!(r"(?P<prefix>{})\W+(?P<digits>[0-9]+)", regex::escape(prefix))
        };

        let pattern = RegexBuilder::new(&source)
            .case_insensitive(true)
            .multi_line(true)
            .build()
            .map_err(|e| Error::Config(format!("Invalid ticket prefix {:?}: {}", prefix, e)))?;

        Ok(Self {
            prefix: prefix.to_uppercase(),
            pattern,
        })
    }

    /// The configured prefix, uppercased
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Extract every distinct identifier in `text`
    pub fn extract(&self, text: &str) -> Extraction {
        let mut ids: Vec<TicketId> = Vec::new();

        for caps in self.pattern.captures_iter(text) {
            let digits = &caps["digits"];
            let id = if self.prefix.is_empty() {
                TicketId::from_parts(&caps["prefix"], digits)
            } else {
                TicketId::from_parts(&self.prefix, digits)
            };

            if !ids.contains(&id) {
                ids.push(id);
            }
        }

        Extraction { ids }
    }
}
