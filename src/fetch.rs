//! Batch ticket lookup with shrink-and-retry
//!
//! All associated tickets are fetched with a single `issueKey in (...)` query.
//! Jira rejects the whole query when any key is invalid or inaccessible, naming
//! the offending keys in its error text. Those keys are dropped and the query
//! is reissued until it succeeds or no keys remain.

use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::jira::{Ticket, TicketSystem};
use crate::ticket_id::{Extractor, TicketId};

/// Maximum number of tickets returned by the deployment-ready query
pub const READY_QUERY_LIMIT: usize = 100;

/// Classified result of one batch query
#[derive(Debug)]
pub enum QueryOutcome {
    Success(Vec<Ticket>),
    /// The service rejected the batch, naming these keys from the batch
    RejectedKeys(Vec<TicketId>),
    Fatal(Error),
}

/// JQL selecting exactly `ids`
pub fn key_query(ids: &[TicketId]) -> String {
    let keys: Vec<&str> = ids.iter().map(|id| id.as_str()).collect();
    format!("issueKey in ({})", keys.join(","))
}

/// JQL selecting tickets in `status` within open sprints
pub fn ready_query(status: &str) -> String {
    format!(
        "status = \"{}\" and sprint in openSprints()",
        status.replace('"', "\\\"")
    )
}

/// Classify a query result against the keys that were requested.
///
/// Only errors reported by the ticket service are scanned for keys. A report
/// that names no key from `requested` is fatal, since dropping nothing would
/// reissue the same query.
pub fn classify(
    result: Result<Vec<Ticket>>,
    extractor: &Extractor,
    requested: &[TicketId],
) -> QueryOutcome {
    let err = match result {
        Ok(tickets) => return QueryOutcome::Success(tickets),
        Err(err) => err,
    };

    if !matches!(err, Error::Jira { .. }) {
        return QueryOutcome::Fatal(err);
    }

    let rejected: Vec<TicketId> = extractor
        .extract(&err.detail())
        .ids
        .into_iter()
        .filter(|id| requested.contains(id))
        .collect();

    if rejected.is_empty() {
        QueryOutcome::Fatal(err)
    } else {
        QueryOutcome::RejectedKeys(rejected)
    }
}

/// Fetch the tickets for `ids`, dropping keys the service rejects
///
/// Returns an empty list without querying when no keys are given or every
/// key has been rejected.
pub fn fetch_tickets<T, I>(tickets: &T, extractor: &Extractor, ids: I) -> Result<Vec<Ticket>>
where
    T: TicketSystem + ?Sized,
    I: IntoIterator<Item = TicketId>,
{
    let mut remaining: Vec<TicketId> = Vec::new();
    for id in ids {
        if !remaining.contains(&id) {
            remaining.push(id);
        }
    }

    while !remaining.is_empty() {
        let jql = key_query(&remaining);
        debug!("Fetching {} tickets", remaining.len());

        match classify(tickets.search(&jql, remaining.len()), extractor, &remaining) {
            QueryOutcome::Success(found) => return Ok(found),
            QueryOutcome::RejectedKeys(rejected) => {
                for id in &rejected {
                    warn!("Jira rejected issue key {}, retrying without it", id);
                }
                remaining.retain(|id| !rejected.contains(id));
            }
            QueryOutcome::Fatal(err) => return Err(err),
        }
    }

    warn!("No valid issue keys left to fetch");
    Ok(Vec::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::FakeTracker;

    fn extractor() -> Extractor {
        Extractor::new("PROJ").unwrap()
    }

    fn ids(keys: &[&str]) -> Vec<TicketId> {
        keys.iter().map(|k| TicketId::new(*k)).collect()
    }

    #[test]
    fn test_key_query() {
        assert_eq!(
            key_query(&ids(&["PROJ-1", "PROJ-2"])),
            "issueKey in (PROJ-1,PROJ-2)"
        );
    }

    #[test]
    fn test_ready_query_escapes_quotes() {
        assert_eq!(
            ready_query("Production Ready"),
            "status = \"Production Ready\" and sprint in openSprints()"
        );
        assert_eq!(
            ready_query("Say \"go\""),
            "status = \"Say \\\"go\\\"\" and sprint in openSprints()"
        );
    }

    #[test]
    fn test_classify_rejected_keys_limited_to_request() {
        let err = Error::Jira {
            status: Some(400),
            message: "The issue key 'PROJ-2' is invalid. PROJ-99 too.".into(),
        };
        match classify(Err(err), &extractor(), &ids(&["PROJ-1", "PROJ-2"])) {
            QueryOutcome::RejectedKeys(rejected) => assert_eq!(rejected, ids(&["PROJ-2"])),
            other => panic!("expected rejected keys, got {:?}", other),
        }
    }

    #[test]
    fn test_classify_error_without_keys_is_fatal() {
        let err = Error::Jira {
            status: Some(401),
            message: "Unauthorized".into(),
        };
        assert!(matches!(
            classify(Err(err), &extractor(), &ids(&["PROJ-1"])),
            QueryOutcome::Fatal(Error::Jira { .. })
        ));
    }

    #[test]
    fn test_classify_non_service_error_is_fatal() {
        let err = Error::Config("issueKey in (PROJ-1)".into());
        assert!(matches!(
            classify(Err(err), &extractor(), &ids(&["PROJ-1"])),
            QueryOutcome::Fatal(Error::Config(_))
        ));
    }

    #[test]
    fn test_shrinks_until_accepted() {
        let tracker = FakeTracker::new()
            .with_ticket("PROJ-1")
            .with_invalid("PROJ-2")
            .with_invalid("PROJ-3");

        let found = fetch_tickets(&tracker, &extractor(), ids(&["PROJ-1", "PROJ-2", "PROJ-3"]))
            .unwrap();

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].key.as_str(), "PROJ-1");
        assert_eq!(
            tracker.queries(),
            vec![
                "issueKey in (PROJ-1,PROJ-2,PROJ-3)".to_string(),
                "issueKey in (PROJ-1,PROJ-3)".to_string(),
                "issueKey in (PROJ-1)".to_string(),
            ]
        );
    }

    #[test]
    fn test_every_key_rejected_returns_empty_without_empty_query() {
        let tracker = FakeTracker::new().with_invalid("PROJ-1").with_invalid("PROJ-2");

        let found = fetch_tickets(&tracker, &extractor(), ids(&["PROJ-1", "PROJ-2"])).unwrap();

        assert!(found.is_empty());
        assert_eq!(tracker.queries().len(), 2);
        assert!(tracker.queries().iter().all(|q| q != "issueKey in ()"));
    }

    #[test]
    fn test_no_ids_issues_no_query() {
        let tracker = FakeTracker::new();
        let found = fetch_tickets(&tracker, &extractor(), Vec::new()).unwrap();
        assert!(found.is_empty());
        assert!(tracker.queries().is_empty());
    }

    #[test]
    fn test_duplicate_ids_are_queried_once() {
        let tracker = FakeTracker::new().with_ticket("PROJ-1");
        fetch_tickets(&tracker, &extractor(), ids(&["PROJ-1", "PROJ-1"])).unwrap();
        assert_eq!(tracker.queries(), vec!["issueKey in (PROJ-1)".to_string()]);
    }

    #[test]
    fn test_unattributable_failure_propagates() {
        let tracker = FakeTracker::new().with_search_error(Error::Jira {
            status: Some(503),
            message: "Service Unavailable".into(),
        });

        let result = fetch_tickets(&tracker, &extractor(), ids(&["PROJ-1"]));
        assert!(matches!(result, Err(Error::Jira { status: Some(503), .. })));
        assert_eq!(tracker.queries().len(), 1);
    }
}
